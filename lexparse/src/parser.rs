//! Recursive descent expression parser
//!
//! ```text
//! expression  := addExpr
//! addExpr     := mulExpr (('+'|'-') mulExpr)*
//! mulExpr     := unaryExpr (('*'|'/'|'%') unaryExpr)*
//! unaryExpr   := ('-'|'+')? powerExpr
//! powerExpr   := primary ('^' unaryExpr)?
//! primary     := NUMBER | IDENTIFIER | '(' expression ')'
//! ```
//!
//! Every terminal is recorded in the symbol table at the moment it is
//! consumed, so tokens past a syntax error are never registered. INVALID
//! tokens were already reported by the lexer and are skipped.
//!
//! Recursion is bounded: open groups plus pending `^` exponents may not
//! exceed [`MAX_NESTING`], and an operator chain may not build a tree deeper
//! than [`MAX_TREE_DEPTH`]. Past either limit the parser reports a syntax
//! error and recovers like any other error.

use crate::ast::{BinOp, ParseNode, UnaryOp};
use crate::symbols::SymbolTable;
use lexparse_core::{Diagnostic, Token, TokenKind};
use serde::{Deserialize, Serialize};
use tracing::{debug, trace};

/// Open groups plus pending `^` exponents allowed at once
pub const MAX_NESTING: usize = 64;

/// Deepest tree a chain of binary operators may build
pub const MAX_TREE_DEPTH: usize = 512;

/// One entry of the derivation trace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseStep {
    /// Rule nesting depth, 0 for `expression`
    pub depth: usize,
    pub description: String,
}

#[derive(Debug, Clone)]
pub struct ParseOutcome {
    pub tree: Option<ParseNode>,
    pub diagnostics: Vec<Diagnostic>,
    pub steps: Vec<ParseStep>,
}

/// Parse `tokens`, recording consumed terminals into `symbols`
pub fn parse(tokens: &[Token], symbols: &mut SymbolTable) -> (Option<ParseNode>, Vec<Diagnostic>) {
    let outcome = Parser::new(tokens, symbols).parse();
    (outcome.tree, outcome.diagnostics)
}

/// A rule gave up after reporting a diagnostic. `partial` is the most
/// recently completed sub-expression, if any.
#[derive(Debug)]
struct Failed {
    partial: Option<ParseNode>,
}

type Parsed = Result<ParseNode, Failed>;

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    /// Currently open '(' groups
    open_groups: usize,
    /// Open groups plus exponents being parsed
    nesting: usize,
    level: usize,
    symbols: &'a mut SymbolTable,
    diagnostics: Vec<Diagnostic>,
    steps: Vec<ParseStep>,
    record_steps: bool,
    eof: Token,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token], symbols: &'a mut SymbolTable) -> Self {
        // Stands in for a missing trailing EOF token
        let eof = tokens
            .last()
            .filter(|t| t.is_eof())
            .cloned()
            .unwrap_or_else(|| {
                let end = tokens
                    .last()
                    .map(|t| t.position + t.lexeme.chars().count())
                    .unwrap_or(0);
                Token::new(TokenKind::Eof, "", end)
            });

        Self {
            tokens,
            pos: 0,
            open_groups: 0,
            nesting: 0,
            level: 0,
            symbols,
            diagnostics: Vec::new(),
            steps: Vec::new(),
            record_steps: false,
            eof,
        }
    }

    /// Builder: record the derivation trace
    pub fn with_steps(mut self, enabled: bool) -> Self {
        self.record_steps = enabled;
        self
    }

    pub fn parse(mut self) -> ParseOutcome {
        let tree = match self.expression() {
            Ok(node) => {
                self.expect_end();
                Some(node)
            }
            Err(failed) => failed.partial,
        };

        debug!(
            tree = tree.is_some(),
            errors = self.diagnostics.len(),
            symbols = self.symbols.len(),
            "parsed tokens"
        );

        ParseOutcome {
            tree,
            diagnostics: self.diagnostics,
            steps: self.steps,
        }
    }

    // ========== Grammar Rules ==========

    fn expression(&mut self) -> Parsed {
        self.rule("expression := addExpr", |p| p.additive())
    }

    fn additive(&mut self) -> Parsed {
        self.rule("addExpr := mulExpr (('+'|'-') mulExpr)*", |p| {
            p.chain(&[BinOp::Add, BinOp::Sub], Self::multiplicative)
        })
    }

    fn multiplicative(&mut self) -> Parsed {
        self.rule("mulExpr := unaryExpr (('*'|'/'|'%') unaryExpr)*", |p| {
            p.chain(&[BinOp::Mul, BinOp::Div, BinOp::Rem], Self::unary)
        })
    }

    /// `operand (op operand)*`, folded to the left
    fn chain(&mut self, ops: &[BinOp], operand: fn(&mut Self) -> Parsed) -> Parsed {
        let mut left = operand(self)?;
        let mut depth = left.depth();
        loop {
            self.skip_stray_closers();
            let Some((op, token)) = self.binary_operator(ops) else {
                return Ok(left);
            };
            self.consume(&token);
            let right = match operand(self) {
                Ok(right) => right,
                Err(failed) => return Err(failed.or_partial(left)),
            };
            depth = 1 + depth.max(right.depth());
            if depth > MAX_TREE_DEPTH {
                self.too_deep(MAX_TREE_DEPTH, &token);
                return Err(Failed { partial: Some(left) });
            }
            left = ParseNode::binary(op, token, left, right);
        }
    }

    fn unary(&mut self) -> Parsed {
        self.rule("unaryExpr := ('-'|'+')? powerExpr", |p| {
            let token = p.current().clone();
            match UnaryOp::from_lexeme(&token.lexeme).filter(|_| token.kind == TokenKind::Operator) {
                Some(op) => {
                    p.consume(&token);
                    let operand = p.power()?;
                    Ok(ParseNode::unary(op, token, operand))
                }
                None => p.power(),
            }
        })
    }

    fn power(&mut self) -> Parsed {
        self.rule("powerExpr := primary ('^' unaryExpr)?", |p| {
            let base = p.primary()?;
            let Some((op, token)) = p.binary_operator(&[BinOp::Pow]) else {
                return Ok(base);
            };
            if p.nesting >= MAX_NESTING {
                p.too_deep(MAX_NESTING, &token);
                return Err(Failed { partial: Some(base) });
            }
            p.consume(&token);
            p.nesting += 1;
            let exponent = p.unary();
            p.nesting -= 1;
            match exponent {
                Ok(exponent) => Ok(ParseNode::binary(op, token, base, exponent)),
                Err(failed) => Err(failed.or_partial(base)),
            }
        })
    }

    fn primary(&mut self) -> Parsed {
        self.rule("primary := NUMBER | IDENTIFIER | '(' expression ')'", |p| loop {
            let token = p.current().clone();
            match token.kind {
                TokenKind::Number | TokenKind::Identifier => {
                    p.consume(&token);
                    return Ok(ParseNode::leaf(token));
                }
                TokenKind::LParen if p.nesting >= MAX_NESTING => {
                    p.too_deep(MAX_NESTING, &token);
                    return Err(Failed { partial: None });
                }
                TokenKind::LParen => {
                    p.consume(&token);
                    return p.group(&token);
                }
                TokenKind::RParen if p.open_groups == 0 => {
                    p.diagnostics.push(Diagnostic::unmatched_close(token.position));
                    p.advance();
                }
                _ => {
                    p.error("expression", &token);
                    return Err(Failed { partial: None });
                }
            }
        })
    }

    /// Rest of `'(' expression ')'` after the '(' was consumed
    fn group(&mut self, open: &Token) -> Parsed {
        self.open_groups += 1;
        self.nesting += 1;
        let result = self.group_body(open);
        self.nesting -= 1;
        self.open_groups -= 1;
        result
    }

    fn group_body(&mut self, open: &Token) -> Parsed {
        let inner = self.expression()?;

        let close = self.current().clone();
        if close.kind == TokenKind::RParen {
            self.consume(&close);
            return Ok(ParseNode::grouping(inner));
        }

        let expected = format!("')' to close '(' at position {}", open.position);
        self.diagnostics.push(
            Diagnostic::unexpected(&expected, &close.describe(), close.position)
                .at_line_column(close.line, close.column)
                .with_suggestion("Add the missing ')'"),
        );
        self.synchronize();
        Err(Failed { partial: Some(inner) })
    }

    /// Anything left after a complete expression is an error
    fn expect_end(&mut self) {
        let token = self.current().clone();
        if token.is_eof() {
            return;
        }
        self.diagnostics.push(
            Diagnostic::unexpected("end of input", &token.describe(), token.position)
                .at_line_column(token.line, token.column)
                .with_suggestion("Join the operands with an operator + - * / % ^"),
        );
        self.synchronize();
    }

    // ========== Token Helpers ==========

    /// Current token, skipping INVALID placeholders
    fn current(&mut self) -> &Token {
        while self
            .tokens
            .get(self.pos)
            .map_or(false, |t| t.kind == TokenKind::Invalid)
        {
            self.pos += 1;
        }
        self.tokens.get(self.pos).unwrap_or(&self.eof)
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() {
            self.pos += 1;
        }
    }

    /// Move past `token`, recording it as a symbol when it is one
    fn consume(&mut self, token: &Token) {
        self.symbols.record_token(token);
        self.step(format!("consumed {}", token.describe()));
        self.advance();
    }

    /// Current token as one of `ops`, without consuming it
    fn binary_operator(&mut self, ops: &[BinOp]) -> Option<(BinOp, Token)> {
        let token = self.current();
        if token.kind != TokenKind::Operator {
            return None;
        }
        let op = BinOp::from_lexeme(&token.lexeme).filter(|op| ops.contains(op))?;
        Some((op, token.clone()))
    }

    /// Report and drop ')' tokens that close nothing
    fn skip_stray_closers(&mut self) {
        while self.open_groups == 0 {
            let token = self.current();
            if token.kind != TokenKind::RParen {
                break;
            }
            let position = token.position;
            self.diagnostics.push(Diagnostic::unmatched_close(position));
            self.advance();
        }
    }

    fn error(&mut self, expected: &str, found: &Token) {
        self.diagnostics.push(
            Diagnostic::unexpected(expected, &found.describe(), found.position)
                .at_line_column(found.line, found.column),
        );
        self.synchronize();
    }

    /// Report a depth limit at `at` and skip past the offending construct
    fn too_deep(&mut self, limit: usize, at: &Token) {
        self.diagnostics.push(
            Diagnostic::too_deep(limit, at.position).at_line_column(at.line, at.column),
        );
        self.synchronize();
    }

    /// Discard tokens up to the ')' balancing the innermost open group, or EOF
    fn synchronize(&mut self) {
        let mut nested = 0usize;
        loop {
            let kind = self.current().kind;
            match kind {
                TokenKind::Eof => break,
                TokenKind::LParen => nested += 1,
                TokenKind::RParen if nested > 0 => nested -= 1,
                TokenKind::RParen if self.open_groups > 0 => break,
                _ => {}
            }
            self.advance();
            if self.pos >= self.tokens.len() {
                break;
            }
        }
        trace!(position = self.pos, "resynchronized");
    }

    // ========== Derivation Trace ==========

    fn rule(&mut self, name: &'static str, body: impl FnOnce(&mut Self) -> Parsed) -> Parsed {
        self.step(name.to_string());
        self.level += 1;
        let result = body(self);
        self.level -= 1;
        result
    }

    fn step(&mut self, description: String) {
        trace!(depth = self.level, step = %description);
        if self.record_steps {
            self.steps.push(ParseStep { depth: self.level, description });
        }
    }
}

impl Failed {
    fn or_partial(self, fallback: ParseNode) -> Self {
        Failed {
            partial: self.partial.or(Some(fallback)),
        }
    }
}
