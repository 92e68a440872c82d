//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! poll loop, verifier, HTTP handlers produce:
//!     → logging.rs (structured tracing events)
//!     → metrics.rs (attempt/outcome counters, latency histogram)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```

pub mod logging;
pub mod metrics;
