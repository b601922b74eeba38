use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use parking_lot::Mutex;

use super::Scheduler;
use crate::cancellation::CancellationToken;

struct Pending {
    work: BoxFuture<'static, ()>,
    token: Arc<dyn CancellationToken>,
}

#[derive(Default)]
struct Clock {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<(Duration, u64), Pending>,
}

/// Scheduler driven by a manual clock.
///
/// Nothing runs until the owner advances time. Work due at the same instant
/// runs in scheduling order, on the thread calling [`advance_by`](Self::advance_by),
/// driven to completion with `futures::executor::block_on`. Work scheduled
/// while advancing runs in the same call if it falls due within the window.
#[derive(Clone, Default)]
pub struct VirtualScheduler {
    clock: Arc<Mutex<Clock>>,
}

impl VirtualScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Virtual time elapsed since creation.
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of queued units, including cancelled ones not yet discarded.
    pub fn pending(&self) -> usize {
        self.clock.lock().queue.len()
    }

    /// Move the clock forward by `by`, running everything that falls due.
    /// Returns the number of units that actually ran.
    pub fn advance_by(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        self.advance_to(target)
    }

    /// Move the clock to `target` (never backwards), running everything due.
    pub fn advance_to(&self, target: Duration) -> usize {
        let mut ran = 0;
        loop {
            let next = {
                let mut clock = self.clock.lock();
                let due = clock
                    .queue
                    .keys()
                    .next()
                    .copied()
                    .filter(|(at, _)| *at <= target);
                match due {
                    Some(key) => {
                        clock.now = clock.now.max(key.0);
                        clock.queue.remove(&key)
                    }
                    None => {
                        clock.now = clock.now.max(target);
                        None
                    }
                }
            };
            let Some(pending) = next else {
                return ran;
            };
            if pending.token.is_cancelled() {
                continue;
            }
            futures::executor::block_on(pending.work);
            ran += 1;
        }
    }

    /// Run everything already due at the current instant.
    pub fn run_pending(&self) -> usize {
        self.advance_by(Duration::ZERO)
    }
}

impl std::fmt::Debug for VirtualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("VirtualScheduler")
            .field("now", &clock.now)
            .field("pending", &clock.queue.len())
            .finish()
    }
}

impl Scheduler for VirtualScheduler {
    fn schedule(
        &self,
        delay: Duration,
        work: BoxFuture<'static, ()>,
        token: Arc<dyn CancellationToken>,
    ) {
        let mut clock = self.clock.lock();
        let due = clock.now.saturating_add(delay);
        let seq = clock.next_seq;
        clock.next_seq += 1;
        clock.queue.insert((due, seq), Pending { work, token });
    }

    fn name(&self) -> &'static str {
        "virtual"
    }
}
