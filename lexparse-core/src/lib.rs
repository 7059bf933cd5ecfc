//! Lexparse Core - Fundamental types
//!
//! This crate provides the core types used throughout Lexparse:
//! - `Token`: Classified lexemes with positions
//! - `Diagnostic`: Structured lexical/syntax problems
//! - `LexparseError`: Errors for I/O, export and configuration

mod token;
mod diagnostic;
mod error;

pub use token::{Token, TokenKind};
pub use diagnostic::{Diagnostic, Severity, codes, format};
pub use error::{LexparseError, Result};

#[cfg(test)]
mod tests {
    use super::*;

    mod token_tests {
        use super::*;

        #[test]
        fn test_new_sets_column_from_position() {
            let t = Token::new(TokenKind::Identifier, "abc", 4);
            assert_eq!(t.line, 1);
            assert_eq!(t.column, 5);
        }

        #[test]
        fn test_describe() {
            assert_eq!(Token::new(TokenKind::Eof, "", 3).describe(), "end of input");
            assert_eq!(Token::new(TokenKind::Number, "42", 0).describe(), "number '42'");
            assert_eq!(Token::new(TokenKind::Operator, "*", 0).describe(), "operator '*'");
            assert_eq!(Token::new(TokenKind::RParen, ")", 0).describe(), "')'");
        }

        #[test]
        fn test_kind_serializes_screaming() {
            let json = serde_json::to_string(&TokenKind::LParen).unwrap();
            assert_eq!(json, "\"LPAREN\"");
            let json = serde_json::to_string(&TokenKind::Identifier).unwrap();
            assert_eq!(json, "\"IDENTIFIER\"");
        }
    }

    mod diagnostic_tests {
        use super::*;

        #[test]
        fn test_format() {
            let d = Diagnostic::invalid_character('@', 2);
            assert_eq!(format(&d), "LEXICAL_ERROR at 2: invalid character '@'");
        }

        #[test]
        fn test_display_includes_suggestion() {
            let d = Diagnostic::unmatched_close(5);
            let s = d.to_string();
            assert!(s.starts_with("SYNTAX_ERROR at 5: unmatched ')'"));
            assert!(s.contains("suggestion"));
        }

        #[test]
        fn test_truncation_and_depth_severities() {
            let truncated = Diagnostic::input_truncated(10);
            assert!(truncated.is_lexical());
            assert_eq!(truncated.position, 10);

            let deep = Diagnostic::too_deep(64, 3);
            assert!(deep.is_syntax());
            assert_eq!(deep.message, "expression nested too deeply (limit 64)");
        }

        #[test]
        fn test_unexpected_message() {
            let d = Diagnostic::unexpected("expression", "end of input", 0);
            assert_eq!(d.message, "expected expression, found end of input");
            assert!(d.is_syntax());
            assert!(!d.is_lexical());
        }

        #[test]
        fn test_serialize_skips_empty_fields() {
            let d = Diagnostic::new(Severity::SyntaxError, "boom", 1);
            let json = serde_json::to_value(&d).unwrap();
            assert_eq!(json["severity"], "SYNTAX_ERROR");
            assert!(json.get("suggestion").is_none());
            assert!(json.get("line").is_none());
        }
    }

    mod error_tests {
        use super::*;

        #[test]
        fn test_unsupported_format_message() {
            let e = LexparseError::unsupported_format("xml", &["txt", "csv", "json"]);
            assert_eq!(e.to_string(), "Unsupported format 'xml'. Supported: txt, csv, json");
        }

        #[test]
        fn test_io_error_mentions_path() {
            let e = LexparseError::io(
                "missing.expr",
                std::io::Error::new(std::io::ErrorKind::NotFound, "not found"),
            );
            assert!(e.to_string().contains("missing.expr"));
        }
    }
}
