//! Injectable schedulers for asynchronous recomputation.
//!
//! The calculated-property engine never creates threads itself. Throttled and
//! cancelable recomputations are handed to a [`Scheduler`] together with a
//! cancellation token; which scheduler is used is selected by a
//! [`SchedulerRole`] and resolved through the [`PropertyConfig`](crate::PropertyConfig).
//!
//! | Scheduler | Runs work | Use |
//! |-----------|-----------|-----|
//! | [`ImmediateScheduler`] | inline, on the scheduling thread | default, deterministic tests |
//! | [`TokioScheduler`] | tokio tasks, blocking pool or a dedicated worker | applications |
//! | [`VirtualScheduler`] | when the test advances its clock | throttle tests |

mod immediate;
mod runtime;
mod virtual_time;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};

use crate::cancellation::CancellationToken;

pub use immediate::ImmediateScheduler;
pub use runtime::TokioScheduler;
pub use virtual_time::VirtualScheduler;

/// Unit-of-work scheduling contract.
pub trait Scheduler: Send + Sync + fmt::Debug {
    /// Run `work` once `delay` has elapsed, unless `token` is cancelled first.
    ///
    /// Work whose token is cancelled before it starts must never run.
    /// Cancellation after the start is cooperative.
    fn schedule(
        &self,
        delay: Duration,
        work: BoxFuture<'static, ()>,
        token: Arc<dyn CancellationToken>,
    );

    /// Short name used in logs and descriptors.
    fn name(&self) -> &'static str;
}

/// Which configured scheduler runs a recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerRole {
    /// Short work that should finish promptly (UI-facing updates).
    #[default]
    Interactive,
    /// Expensive work allowed to occupy a worker for a while.
    LongRunning,
}

impl fmt::Display for SchedulerRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerRole::Interactive => write!(f, "interactive"),
            SchedulerRole::LongRunning => write!(f, "long_running"),
        }
    }
}
