//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Validate → Logging/metrics → Store → Verifier → Listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → cancel in-flight verifications → stop accepting → exit
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
