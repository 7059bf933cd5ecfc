//! Lexical analyzer
//!
//! Single left-to-right pass over the input characters. Bad input never
//! stops the scan: it becomes an `INVALID` token plus a diagnostic, and
//! scanning resumes right after it. The token list always ends with `EOF`.

use lexparse_core::{Diagnostic, Token, TokenKind};
use std::collections::BTreeMap;
use tracing::debug;

/// Operators made of two characters, matched before single characters
const TWO_CHAR_OPERATORS: [&str; 6] = ["==", "!=", "<=", ">=", "&&", "||"];

const SINGLE_CHAR_OPERATORS: &str = "+-*/%^=<>!&|";

/// Tokenize `source` into tokens and lexical diagnostics
pub fn tokenize(source: &str) -> (Vec<Token>, Vec<Diagnostic>) {
    Lexer::new(source).run()
}

/// Count tokens per kind (EOF excluded)
pub fn token_statistics(tokens: &[Token]) -> BTreeMap<&'static str, usize> {
    let mut stats = BTreeMap::new();
    for token in tokens.iter().filter(|t| !t.is_eof()) {
        *stats.entry(token.kind.name()).or_insert(0) += 1;
    }
    stats
}

/// Scratch state for one tokenize call
pub struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    tokens: Vec<Token>,
    diagnostics: Vec<Diagnostic>,
}

impl Lexer {
    pub fn new(source: &str) -> Self {
        Self {
            chars: source.chars().collect(),
            pos: 0,
            line: 1,
            column: 1,
            tokens: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    pub fn run(mut self) -> (Vec<Token>, Vec<Diagnostic>) {
        while let Some(c) = self.peek() {
            if c.is_whitespace() {
                self.bump();
                continue;
            }

            let start = self.pos;
            let (line, column) = (self.line, self.column);

            if c.is_ascii_digit() {
                self.number(start, line, column);
            } else if c.is_alphabetic() || c == '_' {
                let lexeme = self.take_while(|c| c.is_alphanumeric() || c == '_');
                self.push(TokenKind::Identifier, lexeme, start, line, column);
            } else if c == '(' {
                self.bump();
                self.push(TokenKind::LParen, "(".to_string(), start, line, column);
            } else if c == ')' {
                self.bump();
                self.push(TokenKind::RParen, ")".to_string(), start, line, column);
            } else if let Some(op) = self.operator() {
                self.push(TokenKind::Operator, op, start, line, column);
            } else {
                self.bump();
                self.diagnostics.push(
                    Diagnostic::invalid_character(c, start).at_line_column(line, column),
                );
                self.push(TokenKind::Invalid, c.to_string(), start, line, column);
            }
        }

        let (line, column) = (self.line, self.column);
        self.push(TokenKind::Eof, String::new(), self.pos, line, column);

        debug!(
            tokens = self.tokens.len(),
            errors = self.diagnostics.len(),
            "tokenized input"
        );
        (self.tokens, self.diagnostics)
    }

    /// Digits with at most one embedded '.'; anything else in the run is malformed
    fn number(&mut self, start: usize, line: usize, column: usize) {
        let lexeme = self.take_while(|c| c.is_ascii_digit() || c == '.');
        let dots = lexeme.chars().filter(|&c| c == '.').count();

        if dots > 1 || lexeme.ends_with('.') {
            self.diagnostics.push(
                Diagnostic::malformed_number(&lexeme, start).at_line_column(line, column),
            );
            self.push(TokenKind::Invalid, lexeme, start, line, column);
        } else {
            self.push(TokenKind::Number, lexeme, start, line, column);
        }
    }

    /// Longest operator match at the cursor, consuming it
    fn operator(&mut self) -> Option<String> {
        let first = self.peek()?;
        if let Some(second) = self.peek_at(1) {
            let pair: String = [first, second].iter().collect();
            if TWO_CHAR_OPERATORS.contains(&pair.as_str()) {
                self.bump();
                self.bump();
                return Some(pair);
            }
        }
        if SINGLE_CHAR_OPERATORS.contains(first) {
            self.bump();
            return Some(first.to_string());
        }
        None
    }

    fn take_while(&mut self, pred: impl Fn(char) -> bool) -> String {
        let mut out = String::new();
        while let Some(c) = self.peek() {
            if !pred(c) {
                break;
            }
            out.push(c);
            self.bump();
        }
        out
    }

    fn push(&mut self, kind: TokenKind, lexeme: String, position: usize, line: usize, column: usize) {
        self.tokens
            .push(Token::new(kind, lexeme, position).at_line_column(line, column));
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn bump(&mut self) {
        if let Some(c) = self.peek() {
            self.pos += 1;
            if c == '\n' {
                self.line += 1;
                self.column = 1;
            } else {
                self.column += 1;
            }
        }
    }
}
