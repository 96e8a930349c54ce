//! Token sources: a scanner over text, or a replay of tokens held in the arena
//!
//! Alias bodies and loop blocks live in a single append-only [`TokenArena`].
//! Replaying one is a [`Span`] plus a cursor, so nested invocation is index
//! manipulation rather than copying.

use std::collections::HashMap;
use std::sync::Arc;

use crate::config::LexerConfig;
use crate::error::{Failure, ScriptResult};
use crate::lexer::Scanner;
use crate::substitute::substitute;
use crate::token::Token;

/// Parameter name to bound argument token
pub type Bindings = HashMap<String, Token>;

/// Half-open index range into the arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn len(&self) -> usize {
        self.end.saturating_sub(self.start)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Append-only storage for captured tokens
#[derive(Debug, Default)]
pub struct TokenArena {
    tokens: Vec<Token>,
}

impl TokenArena {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn alloc(&mut self, tokens: impl IntoIterator<Item = Token>) -> Span {
        let start = self.tokens.len();
        self.tokens.extend(tokens);
        Span {
            start,
            end: self.tokens.len(),
        }
    }

    pub fn push(&mut self, token: Token) {
        self.tokens.push(token);
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Token> {
        self.tokens.get(index)
    }

    pub fn slice(&self, span: Span) -> &[Token] {
        let end = span.end.min(self.tokens.len());
        let start = span.start.min(end);
        &self.tokens[start..end]
    }
}

/// A captured `{ ... }` block together with the bindings active where it was read
#[derive(Debug, Clone)]
pub struct Block {
    pub span: Span,
    pub bindings: Arc<Bindings>,
}

/// Pluggable producer of tokens with one-token lookahead
pub trait TokenSource: Send {
    fn next_token(&mut self, arena: &TokenArena) -> Token;

    fn peek_token(&mut self, arena: &TokenArena) -> Token;

    /// Capture the tokens up to the `}` matching the already consumed `open`.
    /// With `rebase`, captured line numbers become relative to `open`.
    fn capture_block(
        &mut self,
        arena: &mut TokenArena,
        open: &Token,
        rebase: bool,
    ) -> ScriptResult<Block>;
}

/// Tokens scanned from source text
pub struct ScannerSource {
    scanner: Scanner,
}

impl ScannerSource {
    pub fn new(text: &str, config: &LexerConfig) -> Self {
        Self {
            scanner: Scanner::new(text, config),
        }
    }
}

impl TokenSource for ScannerSource {
    fn next_token(&mut self, _arena: &TokenArena) -> Token {
        self.scanner.next_token()
    }

    fn peek_token(&mut self, _arena: &TokenArena) -> Token {
        self.scanner.peek_token().clone()
    }

    fn capture_block(
        &mut self,
        arena: &mut TokenArena,
        open: &Token,
        rebase: bool,
    ) -> ScriptResult<Block> {
        let start = arena.len();
        let mut depth = 1usize;
        loop {
            let mut token = self.scanner.next_token();
            if token.is_end() {
                return Err(Failure::syntax("unterminated block", open));
            }
            if token.is_symbol('{') {
                depth += 1;
            } else if token.is_symbol('}') {
                depth -= 1;
                if depth == 0 {
                    break;
                }
            }
            if rebase {
                token.line = token.line.saturating_sub(open.line) + 1;
            }
            arena.push(token);
        }
        Ok(Block {
            span: Span {
                start,
                end: arena.len(),
            },
            bindings: Arc::new(Bindings::new()),
        })
    }
}

/// Replays an arena span, substituting bound parameters on the way out
pub struct ReplaySource {
    span: Span,
    cursor: usize,
    bindings: Arc<Bindings>,
}

impl ReplaySource {
    pub fn new(span: Span, bindings: Arc<Bindings>) -> Self {
        Self {
            span,
            cursor: span.start,
            bindings,
        }
    }

    pub fn from_block(block: &Block) -> Self {
        Self::new(block.span, Arc::clone(&block.bindings))
    }

    fn end_token(&self, arena: &TokenArena) -> Token {
        let line = self
            .span
            .end
            .checked_sub(1)
            .and_then(|i| arena.get(i))
            .map(|t| t.line)
            .unwrap_or(1);
        Token::end(line)
    }

    fn emit(&self, arena: &TokenArena, index: usize) -> Token {
        match arena.get(index) {
            Some(token) if index < self.span.end => substitute(token, &self.bindings),
            _ => self.end_token(arena),
        }
    }
}

impl TokenSource for ReplaySource {
    fn next_token(&mut self, arena: &TokenArena) -> Token {
        let token = self.emit(arena, self.cursor);
        if self.cursor < self.span.end {
            self.cursor += 1;
        }
        token
    }

    fn peek_token(&mut self, arena: &TokenArena) -> Token {
        self.emit(arena, self.cursor)
    }

    fn capture_block(
        &mut self,
        arena: &mut TokenArena,
        open: &Token,
        _rebase: bool,
    ) -> ScriptResult<Block> {
        let start = self.cursor;
        let mut depth = 1usize;
        let mut index = start;
        while index < self.span.end {
            let Some(token) = arena.get(index) else {
                break;
            };
            if token.is_symbol('{') {
                depth += 1;
            } else if token.is_symbol('}') {
                depth -= 1;
                if depth == 0 {
                    self.cursor = index + 1;
                    return Ok(Block {
                        span: Span { start, end: index },
                        bindings: Arc::clone(&self.bindings),
                    });
                }
            }
            index += 1;
        }
        self.cursor = self.span.end;
        Err(Failure::syntax("unterminated block", open))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;

    #[test]
    fn test_scanner_capture_rebases_lines() {
        let config = LexerConfig::default();
        let mut arena = TokenArena::new();
        let mut source = ScannerSource::new("\n\n{\n  click\n  mouse { up }\n} echo", &config);
        let open = source.next_token(&arena);
        assert!(open.is_symbol('{'));

        let block = source.capture_block(&mut arena, &open, true).unwrap();
        let texts: Vec<&str> = arena.slice(block.span).iter().map(|t| t.text.as_str()).collect();
        assert_eq!(texts, vec!["click", "mouse", "{", "up", "}"]);
        assert_eq!(arena.slice(block.span)[0].line, 2);
        assert_eq!(source.next_token(&arena).text, "echo");
    }

    #[test]
    fn test_replay_substitutes_and_ends() {
        let config = LexerConfig::default();
        let mut arena = TokenArena::new();
        let span = arena.alloc(
            tokenize("echo \"hi $who\"", &config)
                .into_iter()
                .filter(|t| !t.is_end()),
        );
        let mut bindings = Bindings::new();
        bindings.insert("who".into(), Token::word("Ann", 1));

        let mut replay = ReplaySource::new(span, Arc::new(bindings));
        assert_eq!(replay.peek_token(&arena).text, "echo");
        assert_eq!(replay.next_token(&arena).text, "echo");
        assert_eq!(replay.next_token(&arena).text, "hi Ann");
        assert!(replay.next_token(&arena).is_end());
        assert!(replay.next_token(&arena).is_end());
    }

    #[test]
    fn test_replay_capture_is_a_subspan() {
        let config = LexerConfig::default();
        let mut arena = TokenArena::new();
        let span = arena.alloc(
            tokenize("while { check \"a\" } echo \"done\"", &config)
                .into_iter()
                .filter(|t| !t.is_end()),
        );
        let before = arena.len();
        let mut replay = ReplaySource::new(span, Arc::new(Bindings::new()));
        replay.next_token(&arena);
        let open = replay.next_token(&arena);
        let block = replay.capture_block(&mut arena, &open, false).unwrap();

        assert_eq!(arena.len(), before);
        assert_eq!(block.span.len(), 2);
        assert_eq!(replay.next_token(&arena).text, "echo");
    }

    #[test]
    fn test_unterminated_block() {
        let config = LexerConfig::default();
        let mut arena = TokenArena::new();
        let mut source = ScannerSource::new("{ click", &config);
        let open = source.next_token(&arena);
        let err = source.capture_block(&mut arena, &open, true).unwrap_err();
        assert!(err.is_syntax());
    }
}
