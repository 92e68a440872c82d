//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Verification request:
//!     → poll.rs (attempt loop, first match wins)
//!     → timeouts.rs (bound each store probe)
//!     → backoff.rs (wait between missed attempts)
//!     → cancel.rs (caller or shutdown abandons the loop)
//! ```
//!
//! # Design Decisions
//! - Store errors are transient: a failed probe is a miss, never an abort
//! - The attempt ceiling is the only terminal negative outcome
//! - Cancellation is a third outcome, distinct from "not yet confirmed"

pub mod backoff;
pub mod cancel;
pub mod poll;
pub mod timeouts;

pub use cancel::{CancelHandle, Cancellation};
pub use poll::{poll_until, PollOutcome, PollPolicy};
