//! Polling helpers for asynchronous assertions

use std::time::Duration;

use tokio::time::Instant;

/// Poll interval used by [`eventually`].
pub const POLL_INTERVAL: Duration = Duration::from_millis(5);

#[derive(Debug, thiserror::Error)]
#[error("condition not met within {waited:?}")]
pub struct WaitTimeout {
    pub waited: Duration,
}

/// Poll `condition` until it holds or `timeout` elapses.
///
/// The condition is checked once before the first sleep, so a condition that
/// already holds returns without yielding to the runtime.
pub async fn eventually(
    timeout: Duration,
    mut condition: impl FnMut() -> bool,
) -> Result<(), WaitTimeout> {
    let started = Instant::now();
    loop {
        if condition() {
            return Ok(());
        }
        let waited = started.elapsed();
        if waited >= timeout {
            return Err(WaitTimeout { waited });
        }
        tokio::time::sleep(POLL_INTERVAL.min(timeout - waited)).await;
    }
}

/// Like [`eventually`], returning the value `probe` produced once it is `Some`.
pub async fn eventually_some<T>(
    timeout: Duration,
    mut probe: impl FnMut() -> Option<T>,
) -> Result<T, WaitTimeout> {
    let mut found = None;
    eventually(timeout, || {
        found = probe();
        found.is_some()
    })
    .await?;
    found.ok_or(WaitTimeout { waited: timeout })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_immediate_success() {
        eventually(Duration::ZERO, || true).await.unwrap();
    }

    #[tokio::test]
    async fn test_times_out() {
        let err = eventually(Duration::from_millis(20), || false)
            .await
            .unwrap_err();
        assert!(err.waited >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_sees_background_progress() {
        let counter = Arc::new(AtomicUsize::new(0));
        let writer = Arc::clone(&counter);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(10)).await;
            writer.store(3, Ordering::SeqCst);
        });
        let seen = eventually_some(Duration::from_secs(2), || {
            let value = counter.load(Ordering::SeqCst);
            (value > 0).then_some(value)
        })
        .await
        .unwrap();
        assert_eq!(seen, 3);
    }
}
