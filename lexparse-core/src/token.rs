//! Lexical tokens
//!
//! Tokens are created by the lexer in source order and never mutated.
//! Positions are character offsets (not byte offsets) so that they line up
//! with what a user sees in a text field.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Classification of a token
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TokenKind {
    Number,
    Identifier,
    Operator,
    #[serde(rename = "LPAREN")]
    LParen,
    #[serde(rename = "RPAREN")]
    RParen,
    Eof,
    Invalid,
}

impl TokenKind {
    /// Display name used in tables and reports
    pub fn name(&self) -> &'static str {
        match self {
            TokenKind::Number => "NUMBER",
            TokenKind::Identifier => "IDENTIFIER",
            TokenKind::Operator => "OPERATOR",
            TokenKind::LParen => "LPAREN",
            TokenKind::RParen => "RPAREN",
            TokenKind::Eof => "EOF",
            TokenKind::Invalid => "INVALID",
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A classified lexeme with its location in the source
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    /// Exact source substring (empty for EOF)
    pub lexeme: String,
    /// Character offset of the first character
    pub position: usize,
    /// 1-based line
    pub line: usize,
    /// 1-based column
    pub column: usize,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: impl Into<String>, position: usize) -> Self {
        Self {
            kind,
            lexeme: lexeme.into(),
            position,
            line: 1,
            column: position + 1,
        }
    }

    /// Builder: set line/column explicitly
    pub fn at_line_column(mut self, line: usize, column: usize) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    pub fn is_eof(&self) -> bool {
        self.kind == TokenKind::Eof
    }

    /// Human-readable description used in diagnostics: `number '3'`, `end of input`
    pub fn describe(&self) -> String {
        match self.kind {
            TokenKind::Eof => "end of input".to_string(),
            TokenKind::Number => format!("number '{}'", self.lexeme),
            TokenKind::Identifier => format!("identifier '{}'", self.lexeme),
            TokenKind::Operator => format!("operator '{}'", self.lexeme),
            TokenKind::LParen | TokenKind::RParen => format!("'{}'", self.lexeme),
            TokenKind::Invalid => format!("invalid input '{}'", self.lexeme),
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Token({}, '{}', pos:{})", self.kind, self.lexeme, self.position)
    }
}
