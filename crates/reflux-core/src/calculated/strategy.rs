//! Recomputation strategies: how a trigger turns into a published result.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Weak};
use std::time::Duration;

use futures::future::BoxFuture;
use futures::FutureExt;

use super::descriptor::StrategyDescriptor;
use super::engine::EngineCore;
use crate::cancellation::CancellationSignal;
use crate::config::MAX_THROTTLE;
use crate::errors::CalculationError;
use crate::property::PropertyValue;
use crate::scheduler::{Scheduler, SchedulerRole};

pub(crate) trait RecomputeStrategy<V, T>: Send + Sync + 'static {
    /// React to a combine-latest firing carrying `values`.
    fn trigger(&self, engine: &Arc<EngineCore<T>>, values: V);

    fn describe(&self) -> StrategyDescriptor;

    fn name(&self) -> &'static str;
}

fn millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Quiescence window actually used for `requested`, capped at [`MAX_THROTTLE`].
fn clamp_throttle(requested: Duration) -> Duration {
    if requested > MAX_THROTTLE {
        tracing::warn!(
            requested_ms = millis(requested),
            max_ms = millis(MAX_THROTTLE),
            "throttle capped"
        );
        MAX_THROTTLE
    } else {
        requested
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Synchronous
// ─────────────────────────────────────────────────────────────────────────────

/// Recompute inline on the thread delivering the upstream change.
pub(crate) struct Synchronous<F> {
    calculate: F,
}

impl<F> Synchronous<F> {
    pub(crate) fn new(calculate: F) -> Self {
        Self { calculate }
    }
}

impl<V, T, F> RecomputeStrategy<V, T> for Synchronous<F>
where
    V: Send + 'static,
    T: PropertyValue + Default,
    F: Fn(V) -> Result<T, CalculationError> + Send + Sync + 'static,
{
    fn trigger(&self, engine: &Arc<EngineCore<T>>, values: V) {
        engine.run_inline(|| (self.calculate)(values));
    }

    fn describe(&self) -> StrategyDescriptor {
        StrategyDescriptor::Synchronous
    }

    fn name(&self) -> &'static str {
        "synchronous"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Throttled
// ─────────────────────────────────────────────────────────────────────────────

/// Recompute on a scheduler after a quiescence window.
///
/// Every trigger supersedes the pending one, so only the last trigger of a
/// burst runs, once `throttle` has passed without further triggers.
pub(crate) struct Throttled<F> {
    calculate: Arc<F>,
    throttle: Duration,
    role: SchedulerRole,
    scheduler: Arc<dyn Scheduler>,
}

impl<F> Throttled<F> {
    pub(crate) fn new(
        calculate: F,
        throttle: Duration,
        role: SchedulerRole,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            calculate: Arc::new(calculate),
            throttle: clamp_throttle(throttle),
            role,
            scheduler,
        }
    }
}

impl<V, T, F> RecomputeStrategy<V, T> for Throttled<F>
where
    V: Send + 'static,
    T: PropertyValue + Default,
    F: Fn(V) -> Result<T, CalculationError> + Send + Sync + 'static,
{
    fn trigger(&self, engine: &Arc<EngineCore<T>>, values: V) {
        let Some(ticket) = engine.begin() else {
            return;
        };
        let weak: Weak<EngineCore<T>> = Arc::downgrade(engine);
        let calculate = Arc::clone(&self.calculate);
        let token = Arc::new(ticket.signal().clone());

        let work: BoxFuture<'static, ()> = Box::pin(async move {
            let Some(engine) = weak.upgrade() else {
                return;
            };
            let outcome = engine.guard(|| calculate(values));
            engine.complete(&ticket, outcome);
        });
        self.scheduler.schedule(self.throttle, work, token);
    }

    fn describe(&self) -> StrategyDescriptor {
        StrategyDescriptor::Throttled {
            throttle_ms: millis(self.throttle),
            role: self.role,
        }
    }

    fn name(&self) -> &'static str {
        "throttled"
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Cancelable
// ─────────────────────────────────────────────────────────────────────────────

/// Like [`Throttled`], but the calculation is asynchronous and receives a
/// [`CancellationSignal`] to check at its own safe points.
pub(crate) struct Cancelable<F> {
    calculate: Arc<F>,
    throttle: Duration,
    role: SchedulerRole,
    scheduler: Arc<dyn Scheduler>,
}

impl<F> Cancelable<F> {
    pub(crate) fn new(
        calculate: F,
        throttle: Duration,
        role: SchedulerRole,
        scheduler: Arc<dyn Scheduler>,
    ) -> Self {
        Self {
            calculate: Arc::new(calculate),
            throttle: clamp_throttle(throttle),
            role,
            scheduler,
        }
    }
}

impl<V, T, F, Fut> RecomputeStrategy<V, T> for Cancelable<F>
where
    V: Send + 'static,
    T: PropertyValue + Default,
    F: Fn(V, CancellationSignal) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, CalculationError>> + Send + 'static,
{
    fn trigger(&self, engine: &Arc<EngineCore<T>>, values: V) {
        let Some(ticket) = engine.begin() else {
            return;
        };
        let weak: Weak<EngineCore<T>> = Arc::downgrade(engine);
        let calculate = Arc::clone(&self.calculate);
        let signal = ticket.signal().clone();
        let token = Arc::new(signal.clone());

        let work: BoxFuture<'static, ()> = Box::pin(async move {
            let running = AssertUnwindSafe(async move { calculate(values, signal).await })
                .catch_unwind()
                .await;
            let Some(engine) = weak.upgrade() else {
                return;
            };
            let outcome = running.unwrap_or_else(|payload| Err(engine.panicked(payload)));
            engine.complete(&ticket, outcome);
        });
        self.scheduler.schedule(self.throttle, work, token);
    }

    fn describe(&self) -> StrategyDescriptor {
        StrategyDescriptor::Cancelable {
            throttle_ms: millis(self.throttle),
            role: self.role,
        }
    }

    fn name(&self) -> &'static str {
        "cancelable"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_throttle_is_capped() {
        assert_eq!(clamp_throttle(Duration::from_millis(250)), Duration::from_millis(250));
        assert_eq!(clamp_throttle(MAX_THROTTLE), MAX_THROTTLE);
        assert_eq!(clamp_throttle(Duration::MAX), MAX_THROTTLE);
    }
}
