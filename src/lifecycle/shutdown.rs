//! Shutdown coordination for the verifier service.

use tokio::sync::broadcast;

use crate::resilience::{CancelHandle, Cancellation};

/// Coordinator for graceful shutdown.
///
/// Long-running tasks subscribe to a broadcast channel; in-flight
/// verifications hold a `Cancellation` derived from the same trigger so they
/// end with a `Cancelled` outcome instead of running out their attempts.
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    cancel: CancelHandle,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            cancel: CancelHandle::new(),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Cancellation that fires when shutdown is triggered.
    pub fn cancellation(&self) -> Cancellation {
        self.cancel.token()
    }

    /// Handle for components that cancel work on shutdown.
    pub fn cancel_handle(&self) -> CancelHandle {
        self.cancel.clone()
    }

    /// Trigger the shutdown signal.
    pub fn trigger(&self) {
        self.cancel.cancel();
        // No subscribers left is fine.
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Get the number of active subscribers (tasks still running).
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
