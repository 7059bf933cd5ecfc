//! Structured diagnostics
//!
//! Diagnostics never abort an analysis. They are values collected by the
//! lexer and parser and handed back to the caller together with whatever
//! partial results could be built.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Standard diagnostic codes (machine-readable)
pub mod codes {
    pub const LEXICAL_ERROR: &str = "LEXICAL_ERROR";
    pub const SYNTAX_ERROR: &str = "SYNTAX_ERROR";
}

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Unrecognized character or malformed literal
    LexicalError,
    /// Token sequence does not match the grammar
    SyntaxError,
}

impl Severity {
    pub fn code(&self) -> &'static str {
        match self {
            Severity::LexicalError => codes::LEXICAL_ERROR,
            Severity::SyntaxError => codes::SYNTAX_ERROR,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// A lexical or syntax problem at a source position
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,

    /// Human-readable message
    pub message: String,

    /// Character offset into the source
    pub position: usize,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,

    /// Suggestion for fixing the input
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
}

impl Diagnostic {
    pub fn new(severity: Severity, message: impl Into<String>, position: usize) -> Self {
        Self {
            severity,
            message: message.into(),
            position,
            line: None,
            column: None,
            suggestion: None,
        }
    }

    /// Builder: add suggestion
    pub fn with_suggestion(mut self, suggestion: impl Into<String>) -> Self {
        self.suggestion = Some(suggestion.into());
        self
    }

    /// Builder: attach line/column
    pub fn at_line_column(mut self, line: usize, column: usize) -> Self {
        self.line = Some(line);
        self.column = Some(column);
        self
    }

    // ========== Common Constructors ==========

    pub fn invalid_character(ch: char, position: usize) -> Self {
        Self::new(Severity::LexicalError, format!("invalid character '{}'", ch), position)
            .with_suggestion("Use digits, identifiers, operators + - * / % ^ and parentheses")
    }

    pub fn malformed_number(literal: &str, position: usize) -> Self {
        Self::new(
            Severity::LexicalError,
            format!("malformed number literal '{}'", literal),
            position,
        )
        .with_suggestion("A number may contain at most one '.' followed by digits")
    }

    /// Input cut at the configured character limit. There is no third
    /// severity, so this reuses `LexicalError`: the cut happens before lexing.
    pub fn input_truncated(limit: usize) -> Self {
        Self::new(
            Severity::LexicalError,
            format!("input exceeds {} characters and was truncated", limit),
            limit,
        )
    }

    /// `expected {expected}, found {found}`
    pub fn unexpected(expected: &str, found: &str, position: usize) -> Self {
        Self::new(
            Severity::SyntaxError,
            format!("expected {}, found {}", expected, found),
            position,
        )
    }

    pub fn too_deep(limit: usize, position: usize) -> Self {
        Self::new(
            Severity::SyntaxError,
            format!("expression nested too deeply (limit {})", limit),
            position,
        )
        .with_suggestion("Split the expression or remove redundant parentheses")
    }

    pub fn unmatched_close(position: usize) -> Self {
        Self::new(Severity::SyntaxError, "unmatched ')' ignored", position)
            .with_suggestion("Remove the ')' or add a matching '('")
    }

    pub fn is_lexical(&self) -> bool {
        self.severity == Severity::LexicalError
    }

    pub fn is_syntax(&self) -> bool {
        self.severity == Severity::SyntaxError
    }
}

/// Render a diagnostic as `"{severity} at {position}: {message}"`
pub fn format(diagnostic: &Diagnostic) -> String {
    format!(
        "{} at {}: {}",
        diagnostic.severity, diagnostic.position, diagnostic.message
    )
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&format(self))?;
        if let Some(ref suggestion) = self.suggestion {
            write!(f, " (suggestion: {})", suggestion)?;
        }
        Ok(())
    }
}
