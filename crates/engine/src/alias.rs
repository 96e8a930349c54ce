//! Alias (macro) table

use std::collections::HashMap;
use tracing::debug;

use crate::source::Span;

/// A named, parameterized block of unexpanded tokens
#[derive(Debug, Clone, PartialEq)]
pub struct Alias {
    pub name: String,
    pub params: Vec<String>,
    pub body: Span,
}

/// Flat, run-wide alias table; later definitions replace earlier ones
#[derive(Debug, Default)]
pub struct AliasTable {
    aliases: HashMap<String, Alias>,
}

impl AliasTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn define(&mut self, alias: Alias) {
        if self.aliases.contains_key(&alias.name) {
            debug!("Redefining alias {}", alias.name);
        }
        self.aliases.insert(alias.name.clone(), alias);
    }

    pub fn get(&self, name: &str) -> Option<&Alias> {
        self.aliases.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.aliases.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }
}
