//! Lexical scanner for uiscript source text
//!
//! The scanner never fails. An unterminated
//! quote or block comment absorbs the remainder of the input and the stream
//! still finishes with a single `End` token.

use tracing::debug;

use crate::config::LexerConfig;
use crate::token::{Token, TokenKind};

/// Character classes used to split the input
#[derive(Debug, Clone)]
struct CharClasses {
    quotes: Vec<char>,
    word: Vec<char>,
    whitespace: Vec<char>,
    slash_slash: bool,
    slash_star: bool,
}

impl CharClasses {
    fn from_config(config: &LexerConfig) -> Self {
        Self {
            quotes: config.quote_chars.chars().collect(),
            word: config.word_chars.chars().collect(),
            whitespace: config.whitespace.chars().collect(),
            slash_slash: config.slash_slash_comments,
            slash_star: config.slash_star_comments,
        }
    }

    fn is_whitespace(&self, ch: char) -> bool {
        self.whitespace.contains(&ch)
    }

    fn is_quote(&self, ch: char) -> bool {
        self.quotes.contains(&ch)
    }

    fn is_word(&self, ch: char) -> bool {
        ch.is_ascii_alphanumeric() || self.word.contains(&ch)
    }

    /// `-` only counts as numeric at the start of a token
    fn is_numeric(&self, ch: char, pos: usize) -> bool {
        ch.is_ascii_digit() || ch == '.' || (pos == 0 && ch == '-')
    }
}

/// Streaming scanner with one token of lookahead
pub struct Scanner {
    chars: Vec<char>,
    pos: usize,
    line: u32,
    classes: CharClasses,
    peeked: Option<Token>,
    finished: bool,
}

impl Scanner {
    pub fn new(source: &str, config: &LexerConfig) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            classes: CharClasses::from_config(config),
            peeked: None,
            finished: false,
        }
    }

    /// Consume and return the next token. After `End` has been returned,
    /// further calls keep returning `End`.
    pub fn next_token(&mut self) -> Token {
        match self.peeked.take() {
            Some(token) => token,
            None => self.scan(),
        }
    }

    /// Look at the next token without consuming it
    pub fn peek_token(&mut self) -> &Token {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.scan(),
        };
        self.peeked.insert(token)
    }

    /// Current line of the scan cursor
    pub fn line(&self) -> u32 {
        self.line
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn lookahead(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
        }
        Some(ch)
    }

    /// Consume whitespace and comments, returning the whitespace seen
    fn skip_trivia(&mut self) -> String {
        let mut leading = String::new();
        loop {
            while let Some(ch) = self.current() {
                if !self.classes.is_whitespace(ch) {
                    break;
                }
                leading.push(ch);
                self.bump();
            }

            match (self.current(), self.lookahead(1)) {
                (Some('/'), Some('/')) if self.classes.slash_slash => {
                    while let Some(ch) = self.current() {
                        if ch == '\n' {
                            break;
                        }
                        self.bump();
                    }
                }
                (Some('/'), Some('*')) if self.classes.slash_star => {
                    let start_line = self.line;
                    self.pos += 2;
                    loop {
                        match (self.current(), self.lookahead(1)) {
                            (None, _) => {
                                debug!("Unterminated block comment starting at line {}", start_line);
                                break;
                            }
                            (Some('*'), Some('/')) => {
                                self.pos += 2;
                                break;
                            }
                            _ => {
                                self.bump();
                            }
                        }
                    }
                }
                _ => return leading,
            }
        }
    }

    fn scan(&mut self) -> Token {
        if self.finished {
            return Token::end(self.line);
        }

        let leading = self.skip_trivia();
        let start = self.pos;
        let line = self.line;

        let Some(first) = self.current() else {
            self.finished = true;
            let mut end = Token::end(line);
            end.leading = leading;
            return end;
        };

        let classes = &self.classes;
        if !classes.is_word(first) && !classes.is_numeric(first, 0) && !classes.is_quote(first) {
            self.bump();
            let mut symbol = Token::symbol(first, line);
            symbol.leading = leading;
            return symbol;
        }

        let mut text = String::new();
        let mut numeric = true;
        let mut quote = None;
        let mut after_quote = false;

        while let Some(ch) = self.current() {
            if self.classes.is_quote(ch) {
                if after_quote {
                    break;
                }
                numeric = false;
                quote.get_or_insert(ch);
                self.read_quoted(ch, &mut text);
                after_quote = true;
                continue;
            }
            if numeric && self.classes.is_numeric(ch, text.len()) {
                text.push(ch);
            } else if self.classes.is_word(ch) {
                numeric = false;
                text.push(ch);
            } else {
                break;
            }
            after_quote = false;
            self.bump();
        }

        let raw: String = self.chars[start..self.pos].iter().collect();
        let number = if numeric { text.parse::<f64>().ok() } else { None };

        Token {
            kind: if number.is_some() { TokenKind::Number } else { TokenKind::Word },
            text,
            number,
            line,
            quote,
            leading,
            raw,
        }
    }

    /// Read a quoted segment starting at the opening quote
    fn read_quoted(&mut self, quote: char, text: &mut String) {
        let start_line = self.line;
        self.bump();
        loop {
            match self.current() {
                None => {
                    debug!("Unterminated {} string starting at line {}", quote, start_line);
                    return;
                }
                Some('\\') => match self.lookahead(1) {
                    Some(next) if next == quote || next == '\\' => {
                        text.push(next);
                        self.pos += 2;
                    }
                    _ => {
                        text.push('\\');
                        self.bump();
                    }
                },
                Some(ch) if ch == quote => {
                    self.bump();
                    return;
                }
                Some(ch) => {
                    text.push(ch);
                    self.bump();
                }
            }
        }
    }
}

/// Scan a whole source into a token vector ending in `End`
pub fn tokenize(source: &str, config: &LexerConfig) -> Vec<Token> {
    let mut scanner = Scanner::new(source, config);
    let mut tokens = Vec::new();
    loop {
        let token = scanner.next_token();
        let done = token.is_end();
        tokens.push(token);
        if done {
            return tokens;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scan(source: &str) -> Vec<Token> {
        tokenize(source, &LexerConfig::default())
    }

    fn texts(source: &str) -> Vec<(TokenKind, String, u32)> {
        scan(source)
            .into_iter()
            .map(|t| (t.kind, t.text, t.line))
            .collect()
    }

    #[test]
    fn test_mixed_token_fixture() {
        let script = "\nL2 hello world \nL3 /* 1000 1.2 */ \nL4 -1000 -01.20 \nL5\t100,100 \nL6\tabc\"123\" /* humm */\nL7\tabc\"\"123 /* abc123 */\nL8\t123abc /* is a string */\n\tabc123 /* is a string */\n\tabc-123 /* is a string */\n\t// ignore this line\n\t\"hello,there\"\n\t/* hello */\n";
        let tokens = scan(script);
        let simple: Vec<(TokenKind, &str, u32)> = tokens
            .iter()
            .map(|t| (t.kind, t.text.as_str(), t.line))
            .collect();

        use TokenKind::*;
        assert_eq!(
            simple,
            vec![
                (Word, "L2", 2),
                (Word, "hello", 2),
                (Word, "world", 2),
                (Word, "L3", 3),
                (Word, "L4", 4),
                (Number, "-1000", 4),
                (Number, "-01.20", 4),
                (Word, "L5", 5),
                (Number, "100", 5),
                (Symbol, ",", 5),
                (Number, "100", 5),
                (Word, "L6", 6),
                (Word, "abc123", 6),
                (Word, "L7", 7),
                (Word, "abc123", 7),
                (Word, "L8", 8),
                (Word, "123abc", 8),
                (Word, "abc123", 9),
                (Word, "abc-123", 10),
                (Word, "hello,there", 12),
                (End, "", 14),
            ]
        );
        assert_eq!(tokens[6].number, Some(-1.2));
        assert_eq!(tokens[5].number, Some(-1000.0));
    }

    #[test]
    fn test_pair_tokenizes_as_number_symbol_number() {
        let tokens = texts("at 10,20\nsize\n  30 , 40");
        assert_eq!(
            tokens,
            vec![
                (TokenKind::Word, "at".into(), 1),
                (TokenKind::Number, "10".into(), 1),
                (TokenKind::Symbol, ",".into(), 1),
                (TokenKind::Number, "20".into(), 1),
                (TokenKind::Word, "size".into(), 2),
                (TokenKind::Number, "30".into(), 3),
                (TokenKind::Symbol, ",".into(), 3),
                (TokenKind::Number, "40".into(), 3),
                (TokenKind::End, "".into(), 3),
            ]
        );
    }

    #[test]
    fn test_exactly_one_end_token() {
        for source in ["", "   ", "// only a comment", "/* open", "\"open", "a b c", "{ } ( )"] {
            let tokens = scan(source);
            let ends = tokens.iter().filter(|t| t.is_end()).count();
            assert_eq!(ends, 1, "source {:?}", source);
            assert!(tokens.last().map(Token::is_end).unwrap_or(false));
        }
    }

    #[test]
    fn test_reconstructs_source_without_comments() {
        let source = "alias greet(name) {\n  echo \"hello $name\" // say it\n}\n/* block\ncomment */ greet 'Bob'\n";
        let rebuilt: String = scan(source)
            .iter()
            .map(|t| format!("{}{}", t.leading, t.raw))
            .collect();
        assert_eq!(
            rebuilt,
            "alias greet(name) {\n  echo \"hello $name\" \n}\n greet 'Bob'\n"
        );
    }

    #[test]
    fn test_escaped_quotes() {
        let tokens = scan(r#"echo "say \"hi\" \\ \n" 'it\'s'"#);
        assert_eq!(tokens[1].text, r#"say "hi" \ \n"#);
        assert_eq!(tokens[1].quote, Some('"'));
        assert_eq!(tokens[2].text, "it's");
        assert_eq!(tokens[2].quote, Some('\''));
    }

    #[test]
    fn test_unterminated_quote_absorbs_rest() {
        let tokens = scan("echo \"never closed\nclick");
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[1].text, "never closed\nclick");
        assert!(tokens[2].is_end());
        assert_eq!(tokens[2].line, 2);
    }

    #[test]
    fn test_dash_words_and_lone_symbols() {
        let tokens = texts("alias --onfail { click-now } - . *");
        let kinds: Vec<(TokenKind, &str)> = tokens.iter().map(|(k, t, _)| (*k, t.as_str())).collect();
        assert_eq!(
            kinds,
            vec![
                (TokenKind::Word, "alias"),
                (TokenKind::Word, "--onfail"),
                (TokenKind::Symbol, "{"),
                (TokenKind::Word, "click-now"),
                (TokenKind::Symbol, "}"),
                (TokenKind::Word, "-"),
                (TokenKind::Word, "."),
                (TokenKind::Symbol, "*"),
                (TokenKind::End, ""),
            ]
        );
    }

    #[test]
    fn test_adjacent_quoted_strings_split() {
        let tokens = texts("\"a\"\"b\"");
        assert_eq!(tokens[0].1, "a");
        assert_eq!(tokens[1].1, "b");
    }

    #[test]
    fn test_block_comment_counts_lines() {
        let tokens = texts("/* one\ntwo\nthree */ click");
        assert_eq!(tokens[0], (TokenKind::Word, "click".into(), 3));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut scanner = Scanner::new("select \"#id\"", &LexerConfig::default());
        assert_eq!(scanner.peek_token().text, "select");
        assert_eq!(scanner.next_token().text, "select");
        assert_eq!(scanner.next_token().text, "#id");
        assert!(scanner.next_token().is_end());
        assert!(scanner.next_token().is_end());
    }
}
