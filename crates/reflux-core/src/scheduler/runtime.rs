use std::sync::Arc;
use std::thread;
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::runtime::{Builder, Handle};
use tokio::sync::oneshot;

use super::Scheduler;
use crate::cancellation::CancellationToken;
use crate::errors::PropertyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    /// Ordinary task on the runtime's workers.
    Task,
    /// Blocking pool thread driving the work with `Handle::block_on`.
    Blocking,
}

/// Keeps a dedicated worker thread alive; the thread exits when this drops.
#[derive(Debug)]
struct WorkerGuard {
    _shutdown: oneshot::Sender<()>,
}

/// Scheduler backed by a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioScheduler {
    handle: Handle,
    mode: Mode,
    worker: Option<Arc<WorkerGuard>>,
}

impl TokioScheduler {
    /// Schedule onto the runtime behind `handle` as ordinary tasks.
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            mode: Mode::Task,
            worker: None,
        }
    }

    /// Schedule onto the runtime the caller is running in.
    pub fn current() -> Result<Self, PropertyError> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|e| PropertyError::invalid_operation(format!("no tokio runtime: {e}")))
    }

    /// Schedule onto the blocking pool of the runtime behind `handle`, for
    /// calculations that hold a thread for a long time.
    pub fn long_running(handle: Handle) -> Self {
        Self {
            handle,
            mode: Mode::Blocking,
            worker: None,
        }
    }

    /// Schedule onto a single-threaded runtime owned by a new OS thread.
    ///
    /// Work runs one unit at a time in scheduling order. The thread shuts
    /// down when the last clone of the scheduler is dropped.
    pub fn dedicated_worker(name: impl Into<String>) -> Result<Self, PropertyError> {
        let runtime = Builder::new_current_thread()
            .enable_time()
            .build()
            .map_err(|e| PropertyError::config(format!("failed to build worker runtime: {e}")))?;
        let handle = runtime.handle().clone();
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

        thread::Builder::new()
            .name(name.into())
            .spawn(move || {
                // Resolves with Err once the guard is dropped.
                let _ = runtime.block_on(shutdown_rx);
            })
            .map_err(|e| PropertyError::config(format!("failed to spawn worker thread: {e}")))?;

        Ok(Self {
            handle,
            mode: Mode::Task,
            worker: Some(Arc::new(WorkerGuard {
                _shutdown: shutdown_tx,
            })),
        })
    }
}

impl Scheduler for TokioScheduler {
    fn schedule(
        &self,
        delay: Duration,
        work: BoxFuture<'static, ()>,
        token: Arc<dyn CancellationToken>,
    ) {
        let run = async move {
            let guarded = {
                let token = Arc::clone(&token);
                async move {
                    if !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                    if !token.is_cancelled() {
                        work.await;
                    }
                }
            };
            tokio::select! {
                biased;
                _ = token.cancelled() => {}
                _ = guarded => {}
            }
        };

        match self.mode {
            Mode::Task => {
                self.handle.spawn(run);
            }
            Mode::Blocking => {
                let handle = self.handle.clone();
                self.handle.spawn_blocking(move || handle.block_on(run));
            }
        }
    }

    fn name(&self) -> &'static str {
        match (self.mode, self.worker.is_some()) {
            (Mode::Task, false) => "tokio",
            (Mode::Task, true) => "dedicated_worker",
            (Mode::Blocking, _) => "tokio_blocking",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::{CancellationSource, NeverCancel};

    fn send_when_run(tx: oneshot::Sender<&'static str>, tag: &'static str) -> BoxFuture<'static, ()> {
        Box::pin(async move {
            let _ = tx.send(tag);
        })
    }

    #[tokio::test]
    async fn test_task_mode_runs_after_delay() {
        let scheduler = TokioScheduler::current().unwrap();
        let (tx, rx) = oneshot::channel();
        scheduler.schedule(
            Duration::from_millis(10),
            send_when_run(tx, "ran"),
            Arc::new(NeverCancel),
        );
        assert_eq!(rx.await.unwrap(), "ran");
        assert_eq!(scheduler.name(), "tokio");
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_long_running_mode() {
        let scheduler = TokioScheduler::long_running(Handle::current());
        let (tx, rx) = oneshot::channel();
        scheduler.schedule(Duration::ZERO, send_when_run(tx, "blocking"), Arc::new(NeverCancel));
        assert_eq!(rx.await.unwrap(), "blocking");
    }

    #[tokio::test]
    async fn test_cancelled_before_delay_never_runs() {
        let scheduler = TokioScheduler::current().unwrap();
        let source = CancellationSource::new();
        let (tx, rx) = oneshot::channel();
        scheduler.schedule(
            Duration::from_millis(50),
            send_when_run(tx, "should not run"),
            Arc::new(source.signal()),
        );
        source.cancel();
        // The sender is dropped without sending.
        assert!(rx.await.is_err());
    }

    #[test]
    fn test_dedicated_worker_runs_outside_any_runtime() {
        let scheduler = TokioScheduler::dedicated_worker("reflux-test-worker").unwrap();
        let (tx, rx) = std::sync::mpsc::channel();
        scheduler.schedule(
            Duration::ZERO,
            Box::pin(async move {
                let _ = tx.send(thread::current().name().map(str::to_string));
            }),
            Arc::new(NeverCancel),
        );
        let name = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(name.as_deref(), Some("reflux-test-worker"));
        assert_eq!(scheduler.name(), "dedicated_worker");
    }

    #[test]
    fn test_current_outside_runtime_is_an_error() {
        assert!(matches!(
            TokioScheduler::current(),
            Err(PropertyError::InvalidOperation { .. })
        ));
    }
}
