//! Purchase verification.
//!
//! # Data Flow
//! ```text
//! checkout UI observes payment authorization
//!     → verifier.rs (validate input, pick predicate)
//!     → resilience::poll_until (bounded attempts, fixed interval)
//!     → store::DocumentStore (read-only probe)
//!     → VerificationOutcome: Confirmed | NotYetConfirmed | Cancelled
//! ```
//!
//! # Design Decisions
//! - Never writes; the payment webhook is the only writer
//! - NotYetConfirmed is an outcome, not an error: callers show a neutral
//!   "we're confirming your purchase" state and offer a status check
//! - Only malformed input is raised as an error

pub mod types;
pub mod verifier;

pub use types::{PurchaseKey, VerificationError, VerificationOutcome, VerificationResult};
pub use verifier::PurchaseVerifier;
