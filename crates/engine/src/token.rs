//! Tokens produced by the scanner and replayed by token sources

use std::fmt;

/// Lexical category of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenKind {
    /// Numeric literal, optionally negative or decimal
    Number,
    /// Bare word or quoted string
    Word,
    /// Single punctuation character
    Symbol,
    /// End of input; every stream ends with exactly one
    End,
}

impl TokenKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TokenKind::Number => "number",
            TokenKind::Word => "string",
            TokenKind::Symbol => "symbol",
            TokenKind::End => "end of input",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single lexical unit
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,

    /// Literal text with quotes and escapes resolved
    pub text: String,

    /// Parsed value for `Number` tokens
    pub number: Option<f64>,

    /// 1-based line the token starts on
    pub line: u32,

    /// Quote character of the first quoted segment, if any
    pub quote: Option<char>,

    /// Whitespace consumed before the token (comments removed)
    pub leading: String,

    /// Exact source slice of the token
    pub raw: String,
}

impl Token {
    pub fn word(text: impl Into<String>, line: u32) -> Self {
        let text = text.into();
        Self {
            kind: TokenKind::Word,
            raw: text.clone(),
            text,
            number: None,
            line,
            quote: None,
            leading: String::new(),
        }
    }

    pub fn number(value: f64, line: u32) -> Self {
        let text = format_number(value);
        Self {
            kind: TokenKind::Number,
            raw: text.clone(),
            text,
            number: Some(value),
            line,
            quote: None,
            leading: String::new(),
        }
    }

    pub fn symbol(ch: char, line: u32) -> Self {
        Self {
            kind: TokenKind::Symbol,
            text: ch.to_string(),
            raw: ch.to_string(),
            number: None,
            line,
            quote: None,
            leading: String::new(),
        }
    }

    pub fn end(line: u32) -> Self {
        Self {
            kind: TokenKind::End,
            text: String::new(),
            raw: String::new(),
            number: None,
            line,
            quote: None,
            leading: String::new(),
        }
    }

    pub fn is_end(&self) -> bool {
        self.kind == TokenKind::End
    }

    pub fn is_symbol(&self, ch: char) -> bool {
        self.kind == TokenKind::Symbol && self.text.len() == ch.len_utf8() && self.text.starts_with(ch)
    }

    /// Bare (unquoted) word equal to `word`
    pub fn is_keyword(&self, word: &str) -> bool {
        self.kind == TokenKind::Word && self.quote.is_none() && self.text == word
    }

    pub fn is_quoted(&self) -> bool {
        self.quote.is_some()
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::End => f.write_str("<end of input>"),
            _ => f.write_str(&self.text),
        }
    }
}

/// Render a number the way scripts write it: integers without a fraction
pub fn format_number(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        format!("{}", value)
    }
}
