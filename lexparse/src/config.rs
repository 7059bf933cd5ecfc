//! Analyzer configuration
//!
//! Defaults are usable as-is. The server loads overrides from the
//! environment:
//!
//! | variable | meaning |
//! |----------|---------|
//! | `LEXPARSE_RECORD_STEPS` | `1`/`true`/`yes` records the derivation trace |
//! | `LEXPARSE_MAX_INPUT` | maximum number of input characters analyzed |

use lexparse_core::{LexparseError, Result};
use serde::{Deserialize, Serialize};

pub const ENV_RECORD_STEPS: &str = "LEXPARSE_RECORD_STEPS";
pub const ENV_MAX_INPUT: &str = "LEXPARSE_MAX_INPUT";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Record a `ParseStep` for every rule entry and consumed terminal
    pub record_steps: bool,
    /// Inputs longer than this are cut and flagged with a diagnostic
    pub max_input_chars: Option<usize>,
}

impl AnalyzerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_steps(mut self, enabled: bool) -> Self {
        self.record_steps = enabled;
        self
    }

    pub fn with_max_input_chars(mut self, limit: usize) -> Self {
        self.max_input_chars = Some(limit);
        self
    }

    /// Load from process environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load from any key lookup; unset keys keep their defaults
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_RECORD_STEPS) {
            config.record_steps = parse_flag(ENV_RECORD_STEPS, &raw)?;
        }

        if let Some(raw) = lookup(ENV_MAX_INPUT) {
            let limit = raw.trim().parse::<usize>().map_err(|e| {
                LexparseError::invalid_config(ENV_MAX_INPUT, format!("'{}': {}", raw, e))
            })?;
            if limit == 0 {
                return Err(LexparseError::invalid_config(ENV_MAX_INPUT, "must be greater than 0"));
            }
            config.max_input_chars = Some(limit);
        }

        Ok(config)
    }
}

fn parse_flag(key: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        _ => Err(LexparseError::invalid_config(
            key,
            format!("'{}' is not a boolean (use true/false)", raw),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = AnalyzerConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, AnalyzerConfig::default());
        assert!(!config.record_steps);
        assert_eq!(config.max_input_chars, None);
    }

    #[test]
    fn test_values_from_lookup() {
        let config = AnalyzerConfig::from_lookup(lookup(&[
            (ENV_RECORD_STEPS, "TRUE"),
            (ENV_MAX_INPUT, " 256 "),
        ]))
        .unwrap();
        assert!(config.record_steps);
        assert_eq!(config.max_input_chars, Some(256));
    }

    #[test]
    fn test_invalid_flag() {
        let err = AnalyzerConfig::from_lookup(lookup(&[(ENV_RECORD_STEPS, "maybe")])).unwrap_err();
        assert!(matches!(err, LexparseError::InvalidConfig { ref key, .. } if key == ENV_RECORD_STEPS));
    }

    #[test]
    fn test_invalid_limit() {
        let err = AnalyzerConfig::from_lookup(lookup(&[(ENV_MAX_INPUT, "lots")])).unwrap_err();
        assert!(err.to_string().contains(ENV_MAX_INPUT));
        assert!(AnalyzerConfig::from_lookup(lookup(&[(ENV_MAX_INPUT, "0")])).is_err());
    }

    #[test]
    fn test_deserialize_partial() {
        let config: AnalyzerConfig = serde_json::from_str(r#"{"record_steps": true}"#).unwrap();
        assert!(config.record_steps);
        assert_eq!(config.max_input_chars, None);
    }

    #[test]
    fn test_builders() {
        let config = AnalyzerConfig::new().with_steps(true).with_max_input_chars(10);
        assert!(config.record_steps);
        assert_eq!(config.max_input_chars, Some(10));
    }
}
