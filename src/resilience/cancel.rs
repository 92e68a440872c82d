//! Cancellation signal for in-flight polls.
//!
//! A `CancelHandle` owns the signal; every `Cancellation` derived from it
//! observes `cancel()`. A cancellation may also carry a deadline, after which
//! it reports cancelled on its own.

use std::future::pending;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Owner side of a cancellation signal.
#[derive(Debug, Clone)]
pub struct CancelHandle {
    tx: Arc<watch::Sender<bool>>,
}

impl CancelHandle {
    /// Create a new, not yet cancelled, handle.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx: Arc::new(tx) }
    }

    /// Cancel every derived `Cancellation`. Idempotent.
    pub fn cancel(&self) {
        self.tx.send_replace(true);
    }

    /// Whether `cancel()` has been called.
    pub fn is_cancelled(&self) -> bool {
        *self.tx.borrow()
    }

    /// Derive a cancellation observer.
    pub fn token(&self) -> Cancellation {
        Cancellation {
            rx: Some(self.tx.subscribe()),
            deadline: None,
        }
    }
}

impl Default for CancelHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation signal.
#[derive(Debug, Clone, Default)]
pub struct Cancellation {
    rx: Option<watch::Receiver<bool>>,
    deadline: Option<Instant>,
}

impl Cancellation {
    /// A cancellation that never fires.
    pub fn never() -> Self {
        Self::default()
    }

    /// Also cancel once `deadline` passes. The earliest deadline wins.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    /// Also cancel after `timeout` from now.
    pub fn with_timeout(self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Whether the signal has fired or the deadline has passed.
    pub fn is_cancelled(&self) -> bool {
        let signalled = self.rx.as_ref().is_some_and(|rx| *rx.borrow());
        let expired = self.deadline.is_some_and(|d| d <= Instant::now());
        signalled || expired
    }

    /// Resolve once cancelled. Pends forever for `never()`.
    ///
    /// A dropped `CancelHandle` that never called `cancel()` does not count as
    /// cancellation.
    pub async fn cancelled(&mut self) {
        let deadline = self.deadline;
        let rx = self.rx.as_mut();

        let signal = async move {
            match rx {
                Some(rx) => {
                    let closed = rx.wait_for(|cancelled| *cancelled).await.is_err();
                    if closed {
                        pending::<()>().await;
                    }
                }
                None => pending::<()>().await,
            }
        };

        match deadline {
            Some(deadline) => {
                tokio::select! {
                    _ = signal => {}
                    _ = tokio::time::sleep_until(deadline) => {}
                }
            }
            None => signal.await,
        }
    }
}
