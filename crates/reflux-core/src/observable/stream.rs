//! Composable notification streams.
//!
//! An [`Observable<T>`] describes how to attach a callback to some source of
//! values. Operators such as [`map`](Observable::map) and
//! [`distinct_until_changed`](Observable::distinct_until_changed) build new
//! descriptions on top of existing ones; nothing runs until
//! [`subscribe`](Observable::subscribe) is called, and per-subscriber state
//! (the last value seen by `distinct_until_changed`, the counter used by
//! `skip`) is created fresh for every subscription.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;

use super::subscription::Subscription;

/// Callback receiving each emitted value.
pub type Observer<T> = Arc<dyn Fn(&T) + Send + Sync + 'static>;

type SubscribeFn<T> = dyn Fn(Observer<T>) -> Subscription + Send + Sync + 'static;

/// A stream of values that callbacks can subscribe to.
pub struct Observable<T> {
    subscribe_fn: Arc<SubscribeFn<T>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            subscribe_fn: Arc::clone(&self.subscribe_fn),
        }
    }
}

impl<T> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Observable").finish_non_exhaustive()
    }
}

impl<T: Send + Sync + 'static> Observable<T> {
    /// Build an observable from a subscribe function.
    pub fn new(subscribe: impl Fn(Observer<T>) -> Subscription + Send + Sync + 'static) -> Self {
        Self {
            subscribe_fn: Arc::new(subscribe),
        }
    }

    /// An observable that never emits.
    pub fn never() -> Self {
        Self::new(|_| Subscription::empty())
    }

    /// Attach a callback. The returned guard detaches it on drop.
    pub fn subscribe(&self, on_next: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        (self.subscribe_fn)(Arc::new(on_next))
    }

    /// Attach an already shared observer.
    pub fn subscribe_observer(&self, observer: Observer<T>) -> Subscription {
        (self.subscribe_fn)(observer)
    }

    /// Transform every value.
    pub fn map<U>(self, f: impl Fn(&T) -> U + Send + Sync + 'static) -> Observable<U>
    where
        U: Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |observer: Observer<U>| {
            let f = Arc::clone(&f);
            self.subscribe(move |value| observer(&f(value)))
        })
    }

    /// Keep only values matching `predicate`.
    pub fn filter(self, predicate: impl Fn(&T) -> bool + Send + Sync + 'static) -> Observable<T> {
        let predicate = Arc::new(predicate);
        Observable::new(move |observer: Observer<T>| {
            let predicate = Arc::clone(&predicate);
            self.subscribe(move |value| {
                if predicate(value) {
                    observer(value);
                }
            })
        })
    }

    /// Filter and transform in one step.
    pub fn filter_map<U>(self, f: impl Fn(&T) -> Option<U> + Send + Sync + 'static) -> Observable<U>
    where
        U: Send + Sync + 'static,
    {
        let f = Arc::new(f);
        Observable::new(move |observer: Observer<U>| {
            let f = Arc::clone(&f);
            self.subscribe(move |value| {
                if let Some(mapped) = f(value) {
                    observer(&mapped);
                }
            })
        })
    }

    /// Drop the first `count` values seen by each subscriber.
    pub fn skip(self, count: usize) -> Observable<T> {
        Observable::new(move |observer: Observer<T>| {
            let remaining = AtomicUsize::new(count);
            self.subscribe(move |value| {
                let skipped = remaining
                    .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1))
                    .is_ok();
                if !skipped {
                    observer(value);
                }
            })
        })
    }

    /// Suppress values equal to the previous value seen by the same subscriber.
    pub fn distinct_until_changed(self) -> Observable<T>
    where
        T: Clone + PartialEq,
    {
        Observable::new(move |observer: Observer<T>| {
            let last: Mutex<Option<T>> = Mutex::new(None);
            self.subscribe(move |value| {
                let fresh = {
                    let mut last = last.lock();
                    if last.as_ref() == Some(value) {
                        false
                    } else {
                        *last = Some(value.clone());
                        true
                    }
                };
                if fresh {
                    observer(value);
                }
            })
        })
    }
}
