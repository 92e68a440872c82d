//! Bounded poll-until-match.
//!
//! # Contract
//! ```text
//! for attempt in 1..=max_attempts:
//!     probe(attempt) → Ok(true)          → Matched (no further waits)
//!                    → Ok(false) | Err   → miss; wait backoff.delay(attempt)
//!                                          unless this was the last attempt
//! all attempts missed                    → Exhausted
//! cancellation during probe or wait      → Cancelled
//! ```
//!
//! Attempts never overlap. Probe errors and timeouts are absorbed here and
//! only show up in logs and metrics.

use std::fmt;
use std::future::Future;
use std::time::Duration;

use crate::observability::metrics;
use crate::resilience::backoff::BackoffStrategy;
use crate::resilience::cancel::Cancellation;
use crate::resilience::timeouts::{run_with_timeout, AttemptFailure};

/// Attempt ceiling, delay strategy and per-attempt time limit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollPolicy {
    /// Maximum number of probes.
    pub max_attempts: u32,
    /// Wait between a missed attempt and the next one.
    pub backoff: BackoffStrategy,
    /// Optional limit for a single probe.
    pub attempt_timeout: Option<Duration>,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            max_attempts: 10,
            backoff: BackoffStrategy::default(),
            attempt_timeout: None,
        }
    }
}

impl PollPolicy {
    /// Fixed-interval policy without a per-attempt limit.
    pub fn fixed(max_attempts: u32, interval: Duration) -> Self {
        Self {
            max_attempts,
            backoff: BackoffStrategy::Fixed(interval),
            attempt_timeout: None,
        }
    }

    /// Same policy with a different attempt ceiling.
    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    /// Upper bound of the time spent waiting between attempts.
    ///
    /// The last attempt has no trailing wait, so only `max_attempts - 1`
    /// delays count. Probe latency is not included.
    pub fn worst_case_wait(&self) -> Duration {
        let waits = self.max_attempts.saturating_sub(1);
        let ceiling = self.backoff.max_delay(u32::MAX);

        // Delays grow until they hit the ceiling, then stay there.
        let mut total = Duration::ZERO;
        for attempt in 1..=waits {
            let delay = self.backoff.max_delay(attempt);
            if delay >= ceiling {
                let remaining = waits - attempt + 1;
                return total.saturating_add(ceiling.saturating_mul(remaining));
            }
            total = total.saturating_add(delay);
        }
        total
    }

    /// Upper bound of a whole poll: every wait plus every probe running into
    /// its time limit.
    pub fn worst_case_duration(&self) -> Duration {
        let probes = self
            .attempt_timeout
            .unwrap_or(Duration::ZERO)
            .saturating_mul(self.max_attempts);
        self.worst_case_wait().saturating_add(probes)
    }
}

/// Terminal state of a poll.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// A probe reported a match.
    Matched { attempts: u32 },
    /// Every attempt missed.
    Exhausted { attempts: u32 },
    /// The caller gave up before a match or exhaustion.
    Cancelled { attempts: u32 },
}

impl PollOutcome {
    /// Number of probes started.
    pub fn attempts(&self) -> u32 {
        match *self {
            PollOutcome::Matched { attempts }
            | PollOutcome::Exhausted { attempts }
            | PollOutcome::Cancelled { attempts } => attempts,
        }
    }

    pub fn is_matched(&self) -> bool {
        matches!(self, PollOutcome::Matched { .. })
    }
}

/// Poll `probe` until it reports a match, attempts run out, or `cancel` fires.
///
/// `label` names the poll in logs and metrics. A policy with
/// `max_attempts == 0` probes nothing and reports `Exhausted { attempts: 0 }`.
pub async fn poll_until<F, Fut, E>(
    label: &'static str,
    policy: &PollPolicy,
    mut cancel: Cancellation,
    mut probe: F,
) -> PollOutcome
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
    E: fmt::Display,
{
    if cancel.is_cancelled() {
        tracing::debug!(kind = label, "Poll cancelled before first attempt");
        return PollOutcome::Cancelled { attempts: 0 };
    }

    let max_attempts = policy.max_attempts;

    for attempt in 1..=max_attempts {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(kind = label, attempt, "Poll cancelled during attempt");
                return PollOutcome::Cancelled { attempts: attempt };
            }
            result = run_with_timeout(policy.attempt_timeout, probe(attempt)) => result,
        };

        match result {
            Ok(true) => {
                tracing::debug!(kind = label, attempt, max_attempts, "Poll attempt matched");
                metrics::record_attempt(label, "match");
                return PollOutcome::Matched { attempts: attempt };
            }
            Ok(false) => {
                tracing::debug!(kind = label, attempt, max_attempts, "Poll attempt missed");
                metrics::record_attempt(label, "miss");
            }
            Err(failure @ AttemptFailure::Error(_)) => {
                tracing::warn!(kind = label, attempt, max_attempts, error = %failure, "Poll attempt failed, will retry");
                metrics::record_attempt(label, "error");
            }
            Err(failure @ AttemptFailure::TimedOut(_)) => {
                tracing::warn!(kind = label, attempt, max_attempts, error = %failure, "Poll attempt timed out, will retry");
                metrics::record_attempt(label, "timeout");
            }
        }

        if attempt < max_attempts {
            let delay = policy.backoff.delay(attempt);
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(kind = label, attempt, "Poll cancelled while waiting");
                    return PollOutcome::Cancelled { attempts: attempt };
                }
                _ = tokio::time::sleep(delay) => {}
            }
        }
    }

    PollOutcome::Exhausted { attempts: max_attempts }
}
