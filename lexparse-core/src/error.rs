//! Errors for fallible operations outside an analysis
//!
//! Analysis itself never fails; problems in the input are reported as
//! [`Diagnostic`](crate::Diagnostic)s. This type covers file I/O, export and
//! configuration.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LexparseError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Unsupported format '{format}'. Supported: {supported}")]
    UnsupportedFormat { format: String, supported: String },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration for {key}: {reason}")]
    InvalidConfig { key: String, reason: String },
}

impl LexparseError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io { path: path.into(), source }
    }

    pub fn unsupported_format(format: impl Into<String>, supported: &[&str]) -> Self {
        Self::UnsupportedFormat {
            format: format.into(),
            supported: supported.join(", "),
        }
    }

    pub fn invalid_config(key: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidConfig { key: key.into(), reason: reason.into() }
    }
}

pub type Result<T> = std::result::Result<T, LexparseError>;
