//! Structured logging.
//!
//! `RUST_LOG` takes precedence; otherwise the configured level applies to this
//! crate and to `tower_http`. JSON output is meant for production log
//! shipping, pretty output for development.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::schema::{LogFormat, ObservabilityConfig};

/// Filter directives used when `RUST_LOG` is not set.
pub fn default_directives(level: &str) -> String {
    format!("purchase_verifier={level},tower_http={level}")
}

/// Install the global subscriber. Safe to call more than once.
pub fn init_logging(config: &ObservabilityConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_directives(&config.log_level)));

    let registry = tracing_subscriber::registry().with(filter);
    let result = match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init(),
        LogFormat::Json => registry.with(fmt::layer().json()).try_init(),
    };

    if let Err(e) = result {
        tracing::warn!(error = %e, "tracing init failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directives() {
        assert_eq!(
            default_directives("debug"),
            "purchase_verifier=debug,tower_http=debug"
        );
    }
}
