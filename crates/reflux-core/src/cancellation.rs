//! Cooperative cancellation for asynchronous recomputation.
//!
//! A [`CancellationSource`] owns the right to cancel; any number of
//! [`CancellationSignal`]s observe it. Calculations are never preempted: a
//! cancelable calculation calls [`CancellationToken::check`] (or awaits
//! [`CancellationToken::cancelled`]) at points where abandoning is safe.

use async_trait::async_trait;
use tokio::sync::watch;

use crate::errors::CalculationError;

/// Cooperative cancellation token.
#[async_trait]
pub trait CancellationToken: Send + Sync {
    /// Resolves when cancellation is requested.
    async fn cancelled(&self);

    /// Non-blocking cancellation check.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// Checkpoint for `?`: fails with a cancellation error once cancelled.
    fn check(&self) -> Result<(), CalculationError> {
        if self.is_cancelled() {
            Err(CalculationError::cancelled())
        } else {
            Ok(())
        }
    }
}

/// Owner side of a cancellation pair.
///
/// Dropping the source without calling [`cancel`](Self::cancel) also cancels
/// every signal, so abandoned work always observes cancellation.
#[derive(Debug)]
pub struct CancellationSource {
    sender: watch::Sender<bool>,
}

impl CancellationSource {
    pub fn new() -> Self {
        let (sender, _receiver) = watch::channel(false);
        Self { sender }
    }

    /// A signal observing this source.
    pub fn signal(&self) -> CancellationSignal {
        CancellationSignal {
            receiver: self.sender.subscribe(),
        }
    }

    /// Request cancellation. Idempotent.
    pub fn cancel(&self) {
        self.sender.send_replace(true);
    }

    pub fn is_cancelled(&self) -> bool {
        *self.sender.borrow()
    }
}

impl Default for CancellationSource {
    fn default() -> Self {
        Self::new()
    }
}

/// Observer side of a cancellation pair, handed to cancelable calculations.
#[derive(Debug, Clone)]
pub struct CancellationSignal {
    receiver: watch::Receiver<bool>,
}

impl CancellationSignal {
    /// A signal that is already cancelled.
    pub fn cancelled_now() -> Self {
        let source = CancellationSource::new();
        let signal = source.signal();
        source.cancel();
        signal
    }
}

#[async_trait]
impl CancellationToken for CancellationSignal {
    async fn cancelled(&self) {
        let mut receiver = self.receiver.clone();
        loop {
            if *receiver.borrow() {
                return;
            }
            // Sender dropped: treat as cancelled.
            if receiver.changed().await.is_err() {
                return;
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        *self.receiver.borrow() || self.receiver.has_changed().is_err()
    }
}

/// Cancellation token that never triggers.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

#[async_trait]
impl CancellationToken for NeverCancel {
    async fn cancelled(&self) {
        futures::future::pending::<()>().await;
    }
}
