//! Per-token parameter substitution for alias bodies
//!
//! A word token may reference a bound parameter as `$name`, `$(name)` or
//! `$I(name)`. A token that is exactly one reference is replaced by the bound
//! token, taking its kind; `$I(...)` coerces the value to an integer number.
//! References embedded in longer text are interpolated into a word.

use crate::source::Bindings;
use crate::token::{format_number, Token, TokenKind};

#[derive(Debug, PartialEq)]
enum Piece<'a> {
    Text(&'a str),
    Ref {
        name: &'a str,
        integer: bool,
        source: &'a str,
    },
}

fn is_name_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

fn split_refs(text: &str) -> Vec<Piece<'_>> {
    let mut pieces = Vec::new();
    let mut literal_start = 0;
    let mut pos = 0;
    let bytes = text.as_bytes();

    while pos < bytes.len() {
        if bytes[pos] != b'$' {
            pos += 1;
            continue;
        }
        let rest = &text[pos + 1..];
        let (integer, name, consumed) = if let Some(inner) = rest.strip_prefix("I(") {
            match inner.find(')') {
                Some(close) => (true, &inner[..close], 3 + close),
                None => (false, "", 0),
            }
        } else if let Some(inner) = rest.strip_prefix('(') {
            match inner.find(')') {
                Some(close) => (false, &inner[..close], 2 + close),
                None => (false, "", 0),
            }
        } else {
            let len = rest.find(|c: char| !is_name_char(c)).unwrap_or(rest.len());
            (false, &rest[..len], len)
        };

        if name.is_empty() || !name.chars().all(is_name_char) {
            pos += 1;
            continue;
        }
        if literal_start < pos {
            pieces.push(Piece::Text(&text[literal_start..pos]));
        }
        let end = pos + 1 + consumed;
        pieces.push(Piece::Ref {
            name,
            integer,
            source: &text[pos..end],
        });
        pos = end;
        literal_start = end;
    }
    if literal_start < text.len() {
        pieces.push(Piece::Text(&text[literal_start..]));
    }
    pieces
}

fn bound_text(token: &Token, integer: bool) -> String {
    match (integer, token.number.or_else(|| token.text.trim().parse::<f64>().ok())) {
        (true, Some(value)) => format_number(value.trunc()),
        _ => token.text.clone(),
    }
}

fn coerce_integer(bound: &Token, template: &Token) -> Token {
    match bound.number.or_else(|| bound.text.trim().parse::<f64>().ok()) {
        Some(value) => {
            let mut token = Token::number(value.trunc(), template.line);
            token.leading = template.leading.clone();
            token
        }
        None => relocate(bound, template),
    }
}

fn relocate(bound: &Token, template: &Token) -> Token {
    let mut token = bound.clone();
    token.line = template.line;
    token.leading = template.leading.clone();
    token
}

/// Substitute bound parameters into `token`, producing a new token
pub fn substitute(token: &Token, bindings: &Bindings) -> Token {
    if token.kind != TokenKind::Word || bindings.is_empty() || !token.text.contains('$') {
        return token.clone();
    }

    let pieces = split_refs(&token.text);
    if let [Piece::Ref { name, integer, .. }] = pieces.as_slice() {
        if let Some(bound) = bindings.get(*name) {
            return if *integer {
                coerce_integer(bound, token)
            } else {
                relocate(bound, token)
            };
        }
    }

    let mut text = String::with_capacity(token.text.len());
    for piece in &pieces {
        match piece {
            Piece::Text(literal) => text.push_str(literal),
            Piece::Ref {
                name,
                integer,
                source,
            } => match bindings.get(*name) {
                Some(bound) => text.push_str(&bound_text(bound, *integer)),
                None => text.push_str(source),
            },
        }
    }

    let mut result = token.clone();
    result.text = text;
    result
}
