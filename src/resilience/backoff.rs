//! Delay between poll attempts.
//!
//! The protocol default is a fixed interval. Exponential backoff with jitter is
//! available for stores that throttle aggressive readers.

use std::time::Duration;
use rand::Rng;

/// Strategy used to compute the wait after a failed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackoffStrategy {
    /// Same delay after every attempt.
    Fixed(Duration),
    /// `base * 2^(attempt-1)` capped at `max`, plus up to 10% jitter.
    Exponential { base: Duration, max: Duration },
}

impl Default for BackoffStrategy {
    fn default() -> Self {
        BackoffStrategy::Fixed(Duration::from_millis(2000))
    }
}

impl BackoffStrategy {
    /// Delay to wait after the given (1-based) attempt.
    pub fn delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffStrategy::Fixed(interval) => interval,
            BackoffStrategy::Exponential { base, max } => {
                calculate_backoff(attempt, millis(base), millis(max))
            }
        }
    }

    /// Largest delay `delay(attempt)` can return.
    pub fn max_delay(&self, attempt: u32) -> Duration {
        match *self {
            BackoffStrategy::Fixed(interval) => interval,
            BackoffStrategy::Exponential { base, max } => {
                let capped = capped_delay_ms(attempt, millis(base), millis(max));
                Duration::from_millis(capped + capped / 10)
            }
        }
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

fn capped_delay_ms(attempt: u32, base_ms: u64, max_ms: u64) -> u64 {
    if attempt == 0 {
        return 0;
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    base_ms.saturating_mul(exponential_base).min(max_ms)
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    let capped_delay = capped_delay_ms(attempt, base_ms, max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}
