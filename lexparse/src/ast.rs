//! Parse tree

use lexparse_core::{Token, TokenKind};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum ParseNode {
    /// A NUMBER or IDENTIFIER token
    Leaf { token: Token },
    BinaryOp {
        op: BinOp,
        operator: Token,
        left: Box<ParseNode>,
        right: Box<ParseNode>,
    },
    UnaryOp {
        op: UnaryOp,
        operator: Token,
        operand: Box<ParseNode>,
    },
    /// Parenthesized sub-expression
    Grouping { inner: Box<ParseNode> },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BinOp { Add, Sub, Mul, Div, Rem, Pow }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnaryOp { Neg, Plus }

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Associativity { Left, Right }

impl fmt::Display for Associativity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Associativity::Left => f.write_str("left"),
            Associativity::Right => f.write_str("right"),
        }
    }
}

impl BinOp {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "+" => Some(BinOp::Add),
            "-" => Some(BinOp::Sub),
            "*" => Some(BinOp::Mul),
            "/" => Some(BinOp::Div),
            "%" => Some(BinOp::Rem),
            "^" => Some(BinOp::Pow),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            BinOp::Add => "+",
            BinOp::Sub => "-",
            BinOp::Mul => "*",
            BinOp::Div => "/",
            BinOp::Rem => "%",
            BinOp::Pow => "^",
        }
    }

    /// Binding strength; higher binds tighter
    pub fn precedence(&self) -> u8 {
        match self {
            BinOp::Add | BinOp::Sub => 1,
            BinOp::Mul | BinOp::Div | BinOp::Rem => 2,
            BinOp::Pow => 3,
        }
    }

    pub fn associativity(&self) -> Associativity {
        match self {
            BinOp::Pow => Associativity::Right,
            _ => Associativity::Left,
        }
    }
}

impl UnaryOp {
    pub fn from_lexeme(lexeme: &str) -> Option<Self> {
        match lexeme {
            "-" => Some(UnaryOp::Neg),
            "+" => Some(UnaryOp::Plus),
            _ => None,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Neg => "-",
            UnaryOp::Plus => "+",
        }
    }
}

impl ParseNode {
    pub fn leaf(token: Token) -> Self {
        ParseNode::Leaf { token }
    }

    pub fn binary(op: BinOp, operator: Token, left: ParseNode, right: ParseNode) -> Self {
        ParseNode::BinaryOp {
            op,
            operator,
            left: Box::new(left),
            right: Box::new(right),
        }
    }

    pub fn unary(op: UnaryOp, operator: Token, operand: ParseNode) -> Self {
        ParseNode::UnaryOp {
            op,
            operator,
            operand: Box::new(operand),
        }
    }

    pub fn grouping(inner: ParseNode) -> Self {
        ParseNode::Grouping { inner: Box::new(inner) }
    }

    /// Children in left-to-right order
    pub fn children(&self) -> Vec<&ParseNode> {
        match self {
            ParseNode::Leaf { .. } => Vec::new(),
            ParseNode::BinaryOp { left, right, .. } => vec![left.as_ref(), right.as_ref()],
            ParseNode::UnaryOp { operand, .. } => vec![operand.as_ref()],
            ParseNode::Grouping { inner } => vec![inner.as_ref()],
        }
    }

    /// One-line label used by the tree renderer
    pub fn label(&self) -> String {
        match self {
            ParseNode::Leaf { token } => format!("{} '{}'", token.kind, token.lexeme),
            ParseNode::BinaryOp { operator, .. } => format!("BinaryOp '{}'", operator.lexeme),
            ParseNode::UnaryOp { operator, .. } => format!("UnaryOp '{}'", operator.lexeme),
            ParseNode::Grouping { .. } => "Grouping ( )".to_string(),
        }
    }

    /// Number of levels; a single leaf has depth 1
    pub fn depth(&self) -> usize {
        1 + self.children().iter().map(|c| c.depth()).max().unwrap_or(0)
    }

    pub fn node_count(&self) -> usize {
        1 + self.children().iter().map(|c| c.node_count()).sum::<usize>()
    }

    /// Leaf tokens in source order
    pub fn leaves(&self) -> Vec<&Token> {
        let mut out = Vec::new();
        self.collect_leaves(&mut out);
        out
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a Token>) {
        match self {
            ParseNode::Leaf { token } => out.push(token),
            _ => {
                for child in self.children() {
                    child.collect_leaves(out);
                }
            }
        }
    }

    /// True when every leaf is NUMBER/IDENTIFIER and every operator node holds an OPERATOR token
    pub fn is_well_formed(&self) -> bool {
        match self {
            ParseNode::Leaf { token } => {
                matches!(token.kind, TokenKind::Number | TokenKind::Identifier)
            }
            ParseNode::BinaryOp { operator, left, right, .. } => {
                operator.kind == TokenKind::Operator
                    && left.is_well_formed()
                    && right.is_well_formed()
            }
            ParseNode::UnaryOp { operator, operand, .. } => {
                operator.kind == TokenKind::Operator && operand.is_well_formed()
            }
            ParseNode::Grouping { inner } => inner.is_well_formed(),
        }
    }
}

/// S-expression form: `(+ 2 (* 3 4))`
impl fmt::Display for ParseNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseNode::Leaf { token } => f.write_str(&token.lexeme),
            ParseNode::BinaryOp { op, left, right, .. } => {
                write!(f, "({} {} {})", op.symbol(), left, right)
            }
            ParseNode::UnaryOp { op, operand, .. } => write!(f, "({} {})", op.symbol(), operand),
            ParseNode::Grouping { inner } => write!(f, "(group {})", inner),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn num(s: &str, pos: usize) -> ParseNode {
        ParseNode::leaf(Token::new(TokenKind::Number, s, pos))
    }

    fn op(s: &str, pos: usize) -> Token {
        Token::new(TokenKind::Operator, s, pos)
    }

    fn sample() -> ParseNode {
        // 2 + (3 * -4)
        let neg = ParseNode::unary(UnaryOp::Neg, op("-", 9), num("4", 10));
        let mul = ParseNode::binary(BinOp::Mul, op("*", 7), num("3", 5), neg);
        ParseNode::binary(BinOp::Add, op("+", 2), num("2", 0), ParseNode::grouping(mul))
    }

    #[test]
    fn test_display_sexpr() {
        assert_eq!(sample().to_string(), "(+ 2 (group (* 3 (- 4))))");
    }

    #[test]
    fn test_metrics() {
        let tree = sample();
        assert_eq!(tree.depth(), 5);
        assert_eq!(tree.node_count(), 7);
        let leaves: Vec<&str> = tree.leaves().iter().map(|t| t.lexeme.as_str()).collect();
        assert_eq!(leaves, vec!["2", "3", "4"]);
    }

    #[test]
    fn test_well_formed() {
        assert!(sample().is_well_formed());
        let bad = ParseNode::leaf(Token::new(TokenKind::Operator, "+", 0));
        assert!(!bad.is_well_formed());
    }

    #[test]
    fn test_operator_table() {
        assert_eq!(BinOp::from_lexeme("%"), Some(BinOp::Rem));
        assert_eq!(BinOp::from_lexeme("=="), None);
        assert!(BinOp::Mul.precedence() > BinOp::Add.precedence());
        assert!(BinOp::Pow.precedence() > BinOp::Div.precedence());
        assert_eq!(BinOp::Pow.associativity(), Associativity::Right);
        assert_eq!(BinOp::Sub.associativity(), Associativity::Left);
        assert_eq!(UnaryOp::from_lexeme("-"), Some(UnaryOp::Neg));
        assert_eq!(UnaryOp::from_lexeme("*"), None);
    }

    #[test]
    fn test_labels() {
        assert_eq!(num("7", 0).label(), "NUMBER '7'");
        assert_eq!(sample().label(), "BinaryOp '+'");
    }
}
