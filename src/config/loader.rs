//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::VerifierConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<VerifierConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<VerifierConfig, ConfigError> {
    let config: VerifierConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.polling.max_attempts, 10);
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[polling\nmax_attempts = 3").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_validation_errors_are_joined() {
        let err = parse_config("[polling]\nmax_attempts = 0\ninterval_ms = 0\n").unwrap_err();
        let message = err.to_string();
        assert!(message.starts_with("Validation failed: "));
        assert!(message.contains("polling.max_attempts: must be at least 1"));
        assert!(message.contains("polling.interval_ms"));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("does-not-exist.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
