//! # symbols
//!
//! Symbol table of the identifiers, operators and number literals that an
//! analysis actually consumed, built on [`indexmap::IndexMap`] so that entries
//! come back in first-seen order.
//!
//! Each distinct `(name, kind)` pair has exactly one entry. Recording the same
//! pair again bumps its occurrence count and appends the position.
//!
//! ## Example
//! ```rust
//! # use lexparse::{SymbolTable, SymbolKind};
//! let mut table = SymbolTable::new();
//! table.record("x", SymbolKind::Identifier, 0);
//! table.record("x", SymbolKind::Identifier, 4);
//! let entry = table.get("x", SymbolKind::Identifier).unwrap();
//! assert_eq!(entry.occurrence_count, 2);
//! assert_eq!(entry.first_position, 0);
//! ```

use crate::ast::{Associativity, BinOp};
use indexmap::{IndexMap, map::Entry};
use lexparse_core::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SymbolKind {
    Identifier,
    Operator,
    Number,
}

impl SymbolKind {
    /// Symbol kind for a token kind; delimiters, EOF and INVALID have none
    pub fn from_token_kind(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Identifier => Some(SymbolKind::Identifier),
            TokenKind::Operator => Some(SymbolKind::Operator),
            TokenKind::Number => Some(SymbolKind::Number),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            SymbolKind::Identifier => "IDENTIFIER",
            SymbolKind::Operator => "OPERATOR",
            SymbolKind::Number => "NUMBER",
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LetterCase {
    Lower,
    Upper,
    Mixed,
    /// No letters at all, e.g. `_1`
    None,
}

impl LetterCase {
    fn of(name: &str) -> Self {
        let letters: Vec<char> = name.chars().filter(|c| c.is_alphabetic()).collect();
        if letters.is_empty() {
            LetterCase::None
        } else if letters.iter().all(|c| c.is_lowercase()) {
            LetterCase::Lower
        } else if letters.iter().all(|c| c.is_uppercase()) {
            LetterCase::Upper
        } else {
            LetterCase::Mixed
        }
    }
}

/// Attributes derived from the symbol's name and kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "category", rename_all = "lowercase")]
pub enum SymbolAttributes {
    Identifier { case: LetterCase },
    Operator {
        /// Binary precedence; `None` for operators outside the arithmetic grammar
        #[serde(skip_serializing_if = "Option::is_none")]
        precedence: Option<u8>,
        #[serde(skip_serializing_if = "Option::is_none")]
        associativity: Option<Associativity>,
    },
    Number { integral: bool },
}

impl SymbolAttributes {
    fn derive(name: &str, kind: SymbolKind) -> Self {
        match kind {
            SymbolKind::Identifier => SymbolAttributes::Identifier { case: LetterCase::of(name) },
            SymbolKind::Operator => {
                let op = BinOp::from_lexeme(name);
                SymbolAttributes::Operator {
                    precedence: op.map(|o| o.precedence()),
                    associativity: op.map(|o| o.associativity()),
                }
            }
            SymbolKind::Number => SymbolAttributes::Number { integral: !name.contains('.') },
        }
    }
}

impl fmt::Display for SymbolAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SymbolAttributes::Identifier { case } => {
                let case = match case {
                    LetterCase::Lower => "lower",
                    LetterCase::Upper => "upper",
                    LetterCase::Mixed => "mixed",
                    LetterCase::None => "none",
                };
                write!(f, "case={}", case)
            }
            SymbolAttributes::Operator { precedence: Some(p), associativity: Some(a) } => {
                write!(f, "precedence={}, associativity={}", p, a)
            }
            SymbolAttributes::Operator { .. } => f.write_str("not in grammar"),
            SymbolAttributes::Number { integral } => write!(f, "integral={}", integral),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolEntry {
    pub name: String,
    pub kind: SymbolKind,
    /// Always >= 1
    pub occurrence_count: usize,
    pub first_position: usize,
    /// Every recorded position, in recording order
    pub positions: Vec<usize>,
    pub attributes: SymbolAttributes,
}

/// Aggregate counts over a table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolStats {
    pub total_occurrences: usize,
    pub unique: usize,
    pub identifiers: usize,
    pub operators: usize,
    pub numbers: usize,
}

impl SymbolStats {
    pub fn from_entries(entries: &[SymbolEntry]) -> Self {
        let mut stats = SymbolStats { unique: entries.len(), ..Default::default() };
        for entry in entries {
            stats.total_occurrences += entry.occurrence_count;
            match entry.kind {
                SymbolKind::Identifier => stats.identifiers += entry.occurrence_count,
                SymbolKind::Operator => stats.operators += entry.occurrence_count,
                SymbolKind::Number => stats.numbers += entry.occurrence_count,
            }
        }
        stats
    }
}

/// Insertion-ordered table keyed by `(name, kind)`
#[derive(Debug, Default)]
pub struct SymbolTable {
    entries: IndexMap<(String, SymbolKind), SymbolEntry>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self { entries: IndexMap::new() }
    }

    /// Insert a new entry or count another occurrence of an existing one
    pub fn record(&mut self, name: &str, kind: SymbolKind, position: usize) {
        match self.entries.entry((name.to_string(), kind)) {
            Entry::Occupied(mut o) => {
                let entry = o.get_mut();
                entry.occurrence_count += 1;
                entry.positions.push(position);
            }
            Entry::Vacant(v) => {
                v.insert(SymbolEntry {
                    name: name.to_string(),
                    kind,
                    occurrence_count: 1,
                    first_position: position,
                    positions: vec![position],
                    attributes: SymbolAttributes::derive(name, kind),
                });
            }
        }
    }

    /// Record a token if its kind is a symbol kind; returns whether it was recorded
    pub fn record_token(&mut self, token: &Token) -> bool {
        match SymbolKind::from_token_kind(token.kind) {
            Some(kind) => {
                self.record(&token.lexeme, kind, token.position);
                true
            }
            None => false,
        }
    }

    pub fn get(&self, name: &str, kind: SymbolKind) -> Option<&SymbolEntry> {
        self.entries.get(&(name.to_string(), kind))
    }

    /// Entries in first-seen order
    pub fn snapshot(&self) -> Vec<SymbolEntry> {
        self.entries.values().cloned().collect()
    }

    pub fn statistics(&self) -> SymbolStats {
        SymbolStats::from_entries(&self.snapshot())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
