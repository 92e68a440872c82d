//! Purchase verification service library.
//!
//! Confirms that a payment webhook's database write has landed by polling a
//! document store with a bounded, cancellable retry loop.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod store;
pub mod verification;

pub use config::schema::VerifierConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use verification::{PurchaseKey, PurchaseVerifier, VerificationError, VerificationOutcome};
