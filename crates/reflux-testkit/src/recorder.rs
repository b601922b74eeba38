//! Recording subscribers
//!
//! A [`Recorder`] subscribes to an [`Observable`] and keeps every emission in
//! order, so tests can assert on the exact sequence a stream produced.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use reflux_core::{Observable, Subscription};

use crate::wait::eventually;

/// Records every value an observable delivers while it is alive.
pub struct Recorder<T> {
    values: Arc<Mutex<Vec<T>>>,
    subscription: Subscription,
}

impl<T: Clone + Send + Sync + 'static> Recorder<T> {
    /// Subscribe to `observable`. Replayed values are recorded too.
    pub fn attach(observable: &Observable<T>) -> Self {
        let values = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&values);
        let subscription = observable.subscribe(move |value: &T| sink.lock().push(value.clone()));
        Self {
            values,
            subscription,
        }
    }

    /// Everything recorded so far.
    pub fn values(&self) -> Vec<T> {
        self.values.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.values.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.lock().is_empty()
    }

    pub fn last(&self) -> Option<T> {
        self.values.lock().last().cloned()
    }

    /// Return and forget everything recorded so far.
    pub fn take(&self) -> Vec<T> {
        std::mem::take(&mut *self.values.lock())
    }

    /// Stop recording. Values already recorded stay available.
    pub fn detach(&self) {
        self.subscription.unsubscribe();
    }

    pub fn is_detached(&self) -> bool {
        self.subscription.is_closed()
    }

    /// Wait until at least `count` values have been recorded.
    pub async fn wait_for_len(&self, count: usize, timeout: Duration) -> anyhow::Result<Vec<T>> {
        let values = Arc::clone(&self.values);
        eventually(timeout, move || values.lock().len() >= count)
            .await
            .map_err(|e| anyhow::anyhow!("expected {count} emissions, got {}: {e}", self.len()))?;
        Ok(self.values())
    }
}

impl<T: PartialEq> Recorder<T> {
    /// Whether two consecutive recorded values are equal.
    pub fn has_consecutive_duplicates(&self) -> bool {
        self.values.lock().windows(2).any(|pair| pair[0] == pair[1])
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Recorder<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Recorder")
            .field("values", &*self.values.lock())
            .field("detached", &self.subscription.is_closed())
            .finish()
    }
}
