//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → VerifierConfig (validated, immutable)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads and validates the new file
//!     → HTTP server swaps its verifier (arc-swap)
//!     → in-flight verifications keep the policy they started with
//! ```

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, ConfigError};
pub use schema::{
    CollectionsConfig, ListenerConfig, ObservabilityConfig, PollingConfig, StoreConfig, StoreKind,
    TimeoutConfig, VerifierConfig,
};
