//! RAII subscription handles.

use parking_lot::Mutex;

type Teardown = Box<dyn FnOnce() + Send + 'static>;

/// Handle to a live subscription.
///
/// Dropping the handle (or calling [`unsubscribe`](Subscription::unsubscribe))
/// detaches the callback. Unsubscribing is idempotent and safe to call from
/// any thread, including from inside the callback itself.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    teardown: Mutex<Option<Teardown>>,
}

impl Subscription {
    /// Create a subscription that runs `teardown` exactly once when disposed.
    pub fn new(teardown: impl FnOnce() + Send + 'static) -> Self {
        Self {
            teardown: Mutex::new(Some(Box::new(teardown))),
        }
    }

    /// A subscription with nothing to tear down.
    pub fn empty() -> Self {
        Self {
            teardown: Mutex::new(None),
        }
    }

    /// Combine several subscriptions into one that disposes all of them.
    pub fn merge(subscriptions: impl IntoIterator<Item = Subscription>) -> Self {
        let subscriptions: Vec<Subscription> = subscriptions.into_iter().collect();
        Self::new(move || {
            for subscription in &subscriptions {
                subscription.unsubscribe();
            }
        })
    }

    /// Detach the callback. Later calls do nothing.
    pub fn unsubscribe(&self) {
        // Take first so the teardown runs without holding our lock.
        let teardown = self.teardown.lock().take();
        if let Some(teardown) = teardown {
            teardown();
        }
    }

    /// Whether the subscription has already been disposed.
    pub fn is_closed(&self) -> bool {
        self.teardown.lock().is_none()
    }

    /// Keep the callback attached for the lifetime of the source.
    pub fn detach(self) {
        drop(self.teardown.lock().take());
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("closed", &self.is_closed())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_unsubscribe_is_idempotent() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let sub = Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        sub.unsubscribe();
        sub.unsubscribe();
        drop(sub);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_merge_disposes_all() {
        let calls = Arc::new(AtomicUsize::new(0));
        let subs = (0..3).map(|_| {
            let counter = calls.clone();
            Subscription::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        });
        let merged = Subscription::merge(subs);
        assert!(!merged.is_closed());
        drop(merged);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_detach_skips_teardown() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        Subscription::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .detach();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
