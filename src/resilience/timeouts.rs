//! Timeout enforcement for individual probes.
//!
//! A probe that does not resolve in time is reported as `TimedOut`, distinct
//! from the probe's own error, so the poll loop can log and count the two
//! separately.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;

/// Why a single attempt produced no answer.
#[derive(Debug)]
pub enum AttemptFailure<E> {
    /// The probe returned an error.
    Error(E),
    /// The probe exceeded its time limit.
    TimedOut(Duration),
}

impl<E: fmt::Display> fmt::Display for AttemptFailure<E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AttemptFailure::Error(e) => write!(f, "{}", e),
            AttemptFailure::TimedOut(limit) => write!(f, "attempt timed out after {:?}", limit),
        }
    }
}

/// Run `fut`, bounded by `limit` when one is given.
pub async fn run_with_timeout<F, T, E>(limit: Option<Duration>, fut: F) -> Result<T, AttemptFailure<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match limit {
        Some(limit) => match timeout(limit, fut).await {
            Ok(result) => result.map_err(AttemptFailure::Error),
            Err(_) => Err(AttemptFailure::TimedOut(limit)),
        },
        None => fut.await.map_err(AttemptFailure::Error),
    }
}
