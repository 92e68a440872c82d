//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! constraints. All problems are reported at once, not just the first.

use std::net::SocketAddr;
use std::time::Duration;

use thiserror::Error;
use url::Url;

use crate::config::schema::{StoreKind, StrategyKind, VerifierConfig};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// Upper bound for the configured attempt ceiling.
pub const MAX_ATTEMPTS: u32 = 1000;

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    /// Dotted path of the offending field.
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a configuration: `VerifierConfig → Result<(), Vec<ValidationError>>`.
pub fn validate_config(config: &VerifierConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }
    if let Some(tls) = &config.listener.tls {
        if tls.cert_path.is_empty() || tls.key_path.is_empty() {
            errors.push(ValidationError::new("listener.tls", "cert_path and key_path are required"));
        }
    }

    let polling = &config.polling;
    if polling.max_attempts == 0 {
        errors.push(ValidationError::new("polling.max_attempts", "must be at least 1"));
    } else if polling.max_attempts > MAX_ATTEMPTS {
        errors.push(ValidationError::new(
            "polling.max_attempts",
            format!("must not exceed {}", MAX_ATTEMPTS),
        ));
    }
    if polling.interval_ms == 0 {
        errors.push(ValidationError::new("polling.interval_ms", "must be greater than 0"));
    }
    if polling.strategy == StrategyKind::Exponential && polling.max_interval_ms < polling.interval_ms {
        errors.push(ValidationError::new(
            "polling.max_interval_ms",
            "must not be smaller than interval_ms",
        ));
    }
    if polling.attempt_timeout_ms == 0 {
        errors.push(ValidationError::new("polling.attempt_timeout_ms", "must be greater than 0"));
    }

    if config.store.kind == StoreKind::Firestore {
        if config.store.project_id.trim().is_empty() {
            errors.push(ValidationError::new("store.project_id", "required for the firestore store"));
        }
        if Url::parse(&config.store.base_url).is_err() {
            errors.push(ValidationError::new(
                "store.base_url",
                format!("'{}' is not a valid URL", config.store.base_url),
            ));
        }
        if config.store.timeout_secs == 0 {
            errors.push(ValidationError::new("store.timeout_secs", "must be greater than 0"));
        }
    }

    for (field, name) in [
        ("collections.items", &config.collections.items),
        ("collections.purchases", &config.collections.purchases),
    ] {
        if name.trim().is_empty() || name.contains('/') {
            errors.push(ValidationError::new(field, "must be a non-empty collection id without '/'"));
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::new("timeouts.request_secs", "must be greater than 0"));
    } else {
        // The HTTP timeout must leave room for a full verification.
        let request = Duration::from_secs(config.timeouts.request_secs);
        let budget = polling.policy().worst_case_duration();
        if request <= budget {
            errors.push(ValidationError::new(
                "timeouts.request_secs",
                format!("must exceed the worst-case verification time of {:?}", budget),
            ));
        }
    }

    let level = config.observability.log_level.to_ascii_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ValidationError::new(
            "observability.log_level",
            format!("'{}' is not one of {}", config.observability.log_level, LOG_LEVELS.join(", ")),
        ));
    }
    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields(errors: &[ValidationError]) -> Vec<&'static str> {
        errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn test_default_config_is_valid() {
        assert_eq!(validate_config(&VerifierConfig::default()), Ok(()));
    }

    #[test]
    fn test_reports_all_errors() {
        let mut config = VerifierConfig::default();
        config.polling.max_attempts = 0;
        config.polling.interval_ms = 0;
        config.collections.items = String::new();
        config.observability.log_level = "loud".to_string();

        let errors = validate_config(&config).unwrap_err();
        let fields = fields(&errors);
        assert!(fields.contains(&"polling.max_attempts"));
        assert!(fields.contains(&"polling.interval_ms"));
        assert!(fields.contains(&"collections.items"));
        assert!(fields.contains(&"observability.log_level"));
    }

    #[test]
    fn test_firestore_requires_project() {
        let mut config = VerifierConfig::default();
        config.store.kind = StoreKind::Firestore;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["store.project_id"]);
    }

    #[test]
    fn test_request_timeout_must_cover_polling() {
        let mut config = VerifierConfig::default();
        // 18s of waits + 10 x 5s attempt timeouts = 68s
        config.timeouts.request_secs = 30;

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(fields(&errors), vec!["timeouts.request_secs"]);

        config.timeouts.request_secs = 90;
        config.polling.attempt_timeout_ms = 1000;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_attempt_ceiling_is_bounded() {
        let mut config = VerifierConfig::default();
        config.polling.max_attempts = u32::MAX;

        let errors = validate_config(&config).unwrap_err();
        assert!(fields(&errors).contains(&"polling.max_attempts"));

        config.polling.max_attempts = MAX_ATTEMPTS;
        config.polling.interval_ms = 1;
        config.polling.attempt_timeout_ms = 1;
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn test_bad_addresses() {
        let mut config = VerifierConfig::default();
        config.listener.bind_address = "localhost".to_string();
        config.observability.metrics_enabled = true;
        config.observability.metrics_address = "nope".to_string();

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(
            fields(&errors),
            vec!["listener.bind_address", "observability.metrics_address"]
        );
    }
}
