//! Lexparse - Expression analysis
//!
//! Turns one line of text into a token stream, a symbol table and a parse
//! tree. Problems in the input never fail an analysis; they come back as
//! [`Diagnostic`]s next to whatever partial results could be built.
//!
//! ```rust
//! use lexparse::Analyzer;
//!
//! let result = Analyzer::new().analyze("2 + 3 * 4");
//! assert!(result.is_accepted());
//! assert_eq!(result.tree.unwrap().to_string(), "(+ 2 (* 3 4))");
//! ```

mod lexer;
mod symbols;
mod ast;
mod parser;
mod render;
mod config;
pub mod batch;

pub use lexer::{tokenize, token_statistics, Lexer};
pub use symbols::{LetterCase, SymbolAttributes, SymbolEntry, SymbolKind, SymbolStats, SymbolTable};
pub use ast::{Associativity, BinOp, ParseNode, UnaryOp};
pub use parser::{parse, ParseOutcome, ParseStep, Parser};
pub use render::Renderer;
pub use config::{AnalyzerConfig, ENV_MAX_INPUT, ENV_RECORD_STEPS};
pub use lexparse_core::{codes, format, Diagnostic, LexparseError, Result, Severity, Token, TokenKind};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use tracing::debug;

/// Overall verdict of one analysis
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Accepted,
    Rejected,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Accepted => f.write_str("ACCEPTED"),
            Status::Rejected => f.write_str("REJECTED"),
        }
    }
}

/// Everything produced by one analysis call
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    /// The text that was analyzed (after any truncation)
    pub source: String,
    pub tokens: Vec<Token>,
    /// Symbol table snapshot in first-seen order
    pub symbols: Vec<SymbolEntry>,
    pub tree: Option<ParseNode>,
    /// Lexical diagnostics first, then syntax diagnostics
    pub diagnostics: Vec<Diagnostic>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub steps: Vec<ParseStep>,
}

impl AnalysisResult {
    /// A tree was built and nothing was reported
    pub fn is_accepted(&self) -> bool {
        self.tree.is_some() && self.diagnostics.is_empty()
    }

    pub fn status(&self) -> Status {
        if self.is_accepted() {
            Status::Accepted
        } else {
            Status::Rejected
        }
    }

    pub fn has_lexical_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_lexical())
    }

    pub fn has_syntax_errors(&self) -> bool {
        self.diagnostics.iter().any(|d| d.is_syntax())
    }

    pub fn symbol_stats(&self) -> SymbolStats {
        SymbolStats::from_entries(&self.symbols)
    }

    pub fn token_statistics(&self) -> BTreeMap<&'static str, usize> {
        token_statistics(&self.tokens)
    }

    /// First diagnostic formatted as `"{severity} at {position}: {message}"`
    pub fn first_error(&self) -> Option<String> {
        self.diagnostics.first().map(format)
    }
}

/// Main analysis engine
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    config: AnalyzerConfig,
}

impl Analyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self { config }
    }

    pub fn with_steps(mut self, enabled: bool) -> Self {
        self.config.record_steps = enabled;
        self
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Tokenize, parse and collect symbols for `source`
    pub fn analyze(&self, source: &str) -> AnalysisResult {
        let mut diagnostics = Vec::new();
        let text: String = match self.config.max_input_chars {
            Some(limit) if source.chars().count() > limit => {
                diagnostics.push(Diagnostic::input_truncated(limit));
                source.chars().take(limit).collect()
            }
            _ => source.to_string(),
        };

        let (tokens, lexical) = tokenize(&text);
        diagnostics.extend(lexical);

        let mut symbols = SymbolTable::new();
        let outcome = Parser::new(&tokens, &mut symbols)
            .with_steps(self.config.record_steps)
            .parse();
        diagnostics.extend(outcome.diagnostics);

        let result = AnalysisResult {
            source: text,
            tokens,
            symbols: symbols.snapshot(),
            tree: outcome.tree,
            diagnostics,
            steps: outcome.steps,
        };

        debug!(
            chars = result.source.chars().count(),
            tokens = result.tokens.len(),
            symbols = result.symbols.len(),
            diagnostics = result.diagnostics.len(),
            status = %result.status(),
            "analyzed expression"
        );
        result
    }
}

/// Analyze with the default configuration
pub fn analyze(source: &str) -> AnalysisResult {
    Analyzer::new().analyze(source)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn symbol_summary(result: &AnalysisResult) -> Vec<(String, SymbolKind, usize)> {
        result
            .symbols
            .iter()
            .map(|e| (e.name.clone(), e.kind, e.occurrence_count))
            .collect()
    }

    #[test]
    fn test_whitespace_only_input() {
        let result = analyze("  \t ");
        assert_eq!(result.tokens.len(), 1);
        assert!(result.tokens[0].is_eof());
        assert!(!result.has_lexical_errors());
        assert!(result.tree.is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert_eq!(
            result.first_error().unwrap(),
            "SYNTAX_ERROR at 4: expected expression, found end of input"
        );
    }

    #[test]
    fn test_well_formed_expressions_are_accepted() {
        for input in [
            "3+4*5",
            "a+b",
            "(1+2)*3",
            "x",
            "(a+b)*(c+d)",
            "1*2*3*4",
            "((1+2)+(3+4))*5",
            "-x ^ 2 % 7",
            "rate * (1 + pct / 100)",
        ] {
            let result = analyze(input);
            assert!(result.is_accepted(), "{:?}: {:?}", input, result.diagnostics);
            assert!(!result.has_syntax_errors());
            assert!(result.tree.as_ref().unwrap().is_well_formed());
        }
    }

    #[test]
    fn test_malformed_expressions_are_rejected() {
        for input in ["3+", "3**4", "(1+2", ")", "+3 )", "a b"] {
            let result = analyze(input);
            assert_eq!(result.status(), Status::Rejected, "{:?}", input);
            assert!(result.has_syntax_errors());
        }
    }

    #[test]
    fn test_deterministic() {
        let a = analyze("(x + y) * x - 3.5 / z");
        let b = analyze("(x + y) * x - 3.5 / z");
        assert_eq!(a, b);
    }

    #[test]
    fn test_symbol_order_and_counts() {
        let result = analyze("x + x * 2");
        assert_eq!(
            symbol_summary(&result),
            vec![
                ("x".to_string(), SymbolKind::Identifier, 2),
                ("+".to_string(), SymbolKind::Operator, 1),
                ("*".to_string(), SymbolKind::Operator, 1),
                ("2".to_string(), SymbolKind::Number, 1),
            ]
        );
    }

    #[test]
    fn test_missing_close_paren() {
        let result = analyze("(1 + 2");
        assert!(result.has_syntax_errors());
        assert!(result.diagnostics.iter().any(|d| d.message.contains("')'")));
        let tree = result.tree.unwrap();
        assert!(matches!(tree, ParseNode::BinaryOp { op: BinOp::Add, .. }));
    }

    #[test]
    fn test_invalid_character() {
        let result = analyze("3 @ 4");
        let lexical: Vec<&Diagnostic> = result.diagnostics.iter().filter(|d| d.is_lexical()).collect();
        assert_eq!(lexical.len(), 1);
        assert!(lexical[0].message.contains('@'));
        let kinds: Vec<TokenKind> = result.tokens.iter().map(|t| t.kind).collect();
        assert_eq!(
            kinds,
            vec![TokenKind::Number, TokenKind::Invalid, TokenKind::Number, TokenKind::Eof]
        );
        assert_eq!(result.tokens[1].lexeme, "@");
        // lexical diagnostics come before syntax ones
        assert!(result.diagnostics[0].is_lexical());
        assert!(result.diagnostics[1].is_syntax());
    }

    #[test]
    fn test_product_is_right_child() {
        let result = analyze("2 + 3 * 4");
        match result.tree.unwrap() {
            ParseNode::BinaryOp { op: BinOp::Add, right, .. } => {
                assert!(matches!(*right, ParseNode::BinaryOp { op: BinOp::Mul, .. }));
            }
            other => panic!("unexpected root {}", other),
        }
    }

    #[test]
    fn test_truncation() {
        let analyzer = Analyzer::with_config(AnalyzerConfig::new().with_max_input_chars(5));
        let result = analyzer.analyze("1 + 2 + 3");
        assert_eq!(result.source, "1 + 2");
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].is_lexical());
        assert!(result.diagnostics[0].message.contains("truncated"));
        assert_eq!(result.tree.unwrap().to_string(), "(+ 1 2)");
    }

    #[test]
    fn test_deeply_nested_input_is_rejected() {
        let input = format!("{}x{}", "(".repeat(10_000), ")".repeat(10_000));
        let result = analyze(&input);
        assert_eq!(result.status(), Status::Rejected);
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.first_error().unwrap().contains("nested too deeply"));
    }

    #[test]
    fn test_limit_not_reached() {
        let analyzer = Analyzer::with_config(AnalyzerConfig::new().with_max_input_chars(5));
        assert!(analyzer.analyze("a+b").is_accepted());
    }

    #[test]
    fn test_steps_only_when_enabled() {
        assert!(analyze("a + b").steps.is_empty());
        let result = Analyzer::new().with_steps(true).analyze("a + b");
        assert!(!result.steps.is_empty());
        assert!(result.steps.iter().any(|s| s.description == "consumed operator '+'"));
    }

    #[test]
    fn test_statistics_helpers() {
        let result = analyze("a * (b + 1)");
        let stats = result.symbol_stats();
        assert_eq!(stats.identifiers, 2);
        assert_eq!(stats.operators, 2);
        assert_eq!(stats.numbers, 1);
        let tokens = result.token_statistics();
        assert_eq!(tokens.get("LPAREN"), Some(&1));
        assert_eq!(tokens.get("RPAREN"), Some(&1));
    }

    #[test]
    fn test_result_serializes() {
        let result = analyze("-a");
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["tree"]["node"], "unary_op");
        assert_eq!(json["tokens"][0]["kind"], "OPERATOR");
        assert_eq!(json["symbols"][1]["attributes"]["category"], "identifier");
        assert!(json.get("steps").is_none());
        let back: AnalysisResult = serde_json::from_value(json).unwrap();
        assert_eq!(back, result);
    }
}
