//! HTTP API subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → handlers.rs (decode body, call the verifier)
//!     → error.rs (malformed input → 400, store failure → 502)
//!     → JSON response
//! ```

pub mod error;
pub mod handlers;
pub mod request;
pub mod server;
pub mod tls;

pub use handlers::{VerificationResponse, VerificationStatus};
pub use request::X_REQUEST_ID;
pub use server::{AppState, HttpServer};
