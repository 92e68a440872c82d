//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the verifier
//! service. All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backoff::BackoffStrategy;
use crate::resilience::poll::PollPolicy;

/// Root configuration for the purchase verifier.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct VerifierConfig {
    /// Listener configuration (bind address, TLS).
    pub listener: ListenerConfig,

    /// Poll loop settings shared by both verification variants.
    pub polling: PollingConfig,

    /// Document store connection settings.
    pub store: StoreConfig,

    /// Collection names for the watched entities.
    pub collections: CollectionsConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Optional TLS configuration.
    pub tls: Option<TlsConfig>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            tls: None,
        }
    }
}

/// TLS configuration for the listener.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct TlsConfig {
    /// Path to certificate file (PEM).
    pub cert_path: String,

    /// Path to private key file (PEM).
    pub key_path: String,
}

/// How the delay between attempts evolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Same delay between every attempt.
    #[default]
    Fixed,
    /// Doubling delay capped at `max_interval_ms`, with jitter.
    Exponential,
}

/// Poll loop configuration.
///
/// The defaults (10 attempts, 2 s apart) give an 18 second worst case before a
/// purchase is reported as not yet confirmed.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct PollingConfig {
    /// Attempt ceiling for a verification call.
    pub max_attempts: u32,

    /// Delay between attempts in milliseconds.
    pub interval_ms: u64,

    /// Delay strategy.
    pub strategy: StrategyKind,

    /// Upper bound for the exponential strategy in milliseconds.
    pub max_interval_ms: u64,

    /// Per-attempt store call timeout in milliseconds.
    pub attempt_timeout_ms: u64,
}

impl Default for PollingConfig {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            interval_ms: 2000,
            strategy: StrategyKind::Fixed,
            max_interval_ms: 2000,
            attempt_timeout_ms: 5000,
        }
    }
}

impl PollingConfig {
    /// Build the runtime poll policy described by this section.
    pub fn policy(&self) -> PollPolicy {
        let backoff = match self.strategy {
            StrategyKind::Fixed => BackoffStrategy::Fixed(Duration::from_millis(self.interval_ms)),
            StrategyKind::Exponential => BackoffStrategy::Exponential {
                base: Duration::from_millis(self.interval_ms),
                max: Duration::from_millis(self.max_interval_ms),
            },
        };

        PollPolicy {
            max_attempts: self.max_attempts,
            backoff,
            attempt_timeout: Some(Duration::from_millis(self.attempt_timeout_ms)),
        }
    }
}

/// Which document store backend to use.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    /// Process-local store, for development and tests.
    #[default]
    Memory,
    /// Firestore over its REST API.
    Firestore,
}

/// Document store configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Backend selection.
    pub kind: StoreKind,

    /// Firestore REST endpoint.
    pub base_url: String,

    /// Firestore project ID.
    pub project_id: String,

    /// Firestore database ID.
    pub database: String,

    /// Optional API key appended as `key=` query parameter.
    pub api_key: Option<String>,

    /// Optional OAuth bearer token.
    pub auth_token: Option<String>,

    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            kind: StoreKind::Memory,
            base_url: "https://firestore.googleapis.com".to_string(),
            project_id: String::new(),
            database: "(default)".to_string(),
            api_key: None,
            auth_token: None,
            timeout_secs: 10,
        }
    }
}

/// Collections holding the entities the verifier observes.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct CollectionsConfig {
    /// Unique sellable items carrying `sold` and `paymentIntentId`.
    pub items: String,

    /// Purchase records written once per captured payment.
    pub purchases: String,
}

impl Default for CollectionsConfig {
    fn default() -> Self {
        Self {
            items: "artworks".to_string(),
            purchases: "purchases".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total HTTP request timeout in seconds.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 90 }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_protocol() {
        let config = VerifierConfig::default();
        assert_eq!(config.polling.max_attempts, 10);
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.collections.items, "artworks");
        assert_eq!(config.collections.purchases, "purchases");
        assert_eq!(config.store.kind, StoreKind::Memory);
    }

    #[test]
    fn test_partial_toml() {
        let config: VerifierConfig = toml::from_str(
            r#"
            [polling]
            max_attempts = 3
            strategy = "exponential"

            [store]
            kind = "firestore"
            project_id = "gallery-prod"
            "#,
        )
        .unwrap();

        assert_eq!(config.polling.max_attempts, 3);
        assert_eq!(config.polling.interval_ms, 2000);
        assert_eq!(config.polling.strategy, StrategyKind::Exponential);
        assert_eq!(config.store.kind, StoreKind::Firestore);
        assert_eq!(config.store.database, "(default)");
        assert_eq!(config.listener.bind_address, "0.0.0.0:8080");
    }

    #[test]
    fn test_policy_from_config() {
        let policy = PollingConfig::default().policy();
        assert_eq!(policy.max_attempts, 10);
        assert_eq!(policy.backoff, BackoffStrategy::Fixed(Duration::from_secs(2)));
        assert_eq!(policy.attempt_timeout, Some(Duration::from_secs(5)));
        assert_eq!(policy.worst_case_wait(), Duration::from_secs(18));
    }
}
