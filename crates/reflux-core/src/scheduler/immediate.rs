use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;

use super::Scheduler;
use crate::cancellation::CancellationToken;

/// Runs work to completion on the scheduling thread.
///
/// The delay is ignored: there is no clock to wait on, so a throttled
/// recomputation degenerates to an inline one. Futures are driven with
/// `futures::executor::block_on`, which means work must not wait on a timer
/// owned by a single-threaded runtime the caller is currently driving.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImmediateScheduler;

impl ImmediateScheduler {
    pub fn new() -> Self {
        Self
    }
}

impl Scheduler for ImmediateScheduler {
    fn schedule(
        &self,
        _delay: Duration,
        work: BoxFuture<'static, ()>,
        token: Arc<dyn CancellationToken>,
    ) {
        if token.is_cancelled() {
            return;
        }
        futures::executor::block_on(work);
    }

    fn name(&self) -> &'static str {
        "immediate"
    }
}
