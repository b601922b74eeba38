//! Hot subjects backing every property.
//!
//! [`ValueSubject`] holds a current value and replays it to each new
//! subscriber before any later publication reaches that subscriber.
//! [`EventSubject`] is a plain multicast without replay.
//!
//! # Locking
//!
//! Each subject has two locks:
//!
//! - `state` (`Mutex`): value, version and observer list. Never held while a
//!   callback runs.
//! - `gate` (`ReentrantMutex`): held for the whole of a publication or a
//!   subscribe-and-replay. Deliveries from different threads are serialized,
//!   so every observer sees publications in one order. The gate is reentrant,
//!   so a callback may read, publish or subscribe on the same subject from
//!   the delivering thread.

use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};

use super::stream::{Observable, Observer};
use super::subscription::Subscription;

struct Observers<T> {
    next_id: u64,
    entries: Vec<(u64, Observer<T>)>,
}

impl<T> Observers<T> {
    fn new() -> Self {
        Self {
            next_id: 0,
            entries: Vec::new(),
        }
    }

    fn add(&mut self, observer: Observer<T>) -> u64 {
        let id = self.next_id;
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    fn remove(&mut self, id: u64) {
        self.entries.retain(|(entry_id, _)| *entry_id != id);
    }

    fn snapshot(&self) -> Vec<Observer<T>> {
        self.entries.iter().map(|(_, o)| Arc::clone(o)).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ValueSubject
// ─────────────────────────────────────────────────────────────────────────────

struct ValueState<T> {
    value: T,
    version: u64,
    observers: Observers<T>,
    closed: bool,
}

struct ValueSubjectInner<T> {
    gate: ReentrantMutex<()>,
    state: Mutex<ValueState<T>>,
}

/// Replay-last subject: a current value plus change notification.
pub(crate) struct ValueSubject<T> {
    inner: Arc<ValueSubjectInner<T>>,
}

impl<T> Clone for ValueSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T> ValueSubject<T> {
    /// Number of publications so far.
    pub(crate) fn version(&self) -> u64 {
        self.inner.state.lock().version
    }

    /// Release every observer. Later subscriptions receive nothing; the last
    /// value stays readable.
    pub(crate) fn close(&self) {
        let _gate = self.inner.gate.lock();
        let mut state = self.inner.state.lock();
        state.closed = true;
        state.observers = Observers::new();
    }

    pub(crate) fn is_closed(&self) -> bool {
        self.inner.state.lock().closed
    }

    pub(crate) fn observer_count(&self) -> usize {
        self.inner.state.lock().observers.entries.len()
    }
}

impl<T: Clone + Send + Sync + 'static> ValueSubject<T> {
    pub(crate) fn new(value: T) -> Self {
        Self {
            inner: Arc::new(ValueSubjectInner {
                gate: ReentrantMutex::new(()),
                state: Mutex::new(ValueState {
                    value,
                    version: 0,
                    observers: Observers::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Snapshot of the current value.
    pub(crate) fn get(&self) -> T {
        self.inner.state.lock().value.clone()
    }

    pub(crate) fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.state.lock().value)
    }

    /// Swap in a new value, then notify every observer on the calling thread.
    pub(crate) fn publish(&self, value: T) {
        let _gate = self.inner.gate.lock();
        let observers = {
            let mut state = self.inner.state.lock();
            state.value = value.clone();
            state.version += 1;
            if state.closed {
                return;
            }
            state.observers.snapshot()
        };
        for observer in observers {
            observer(&value);
        }
    }

    /// A stream that replays the current value to each subscriber.
    pub(crate) fn observe(&self) -> Observable<T> {
        let inner = Arc::clone(&self.inner);
        Observable::new(move |observer: Observer<T>| {
            let _gate = inner.gate.lock();
            let (id, current) = {
                let mut state = inner.state.lock();
                if state.closed {
                    return Subscription::empty();
                }
                let id = state.observers.add(Arc::clone(&observer));
                (id, state.value.clone())
            };
            observer(&current);

            let weak: Weak<ValueSubjectInner<T>> = Arc::downgrade(&inner);
            Subscription::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().observers.remove(id);
                }
            })
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// EventSubject
// ─────────────────────────────────────────────────────────────────────────────

struct EventState<T> {
    observers: Observers<T>,
    closed: bool,
}

struct EventSubjectInner<T> {
    gate: ReentrantMutex<()>,
    state: Mutex<EventState<T>>,
}

/// Multicast subject without replay.
pub(crate) struct EventSubject<T> {
    inner: Arc<EventSubjectInner<T>>,
}

impl<T> Clone for EventSubject<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Send + Sync + 'static> EventSubject<T> {
    pub(crate) fn new() -> Self {
        Self {
            inner: Arc::new(EventSubjectInner {
                gate: ReentrantMutex::new(()),
                state: Mutex::new(EventState {
                    observers: Observers::new(),
                    closed: false,
                }),
            }),
        }
    }

    /// Hold the delivery gate, serializing a mutation with its emission.
    pub(crate) fn gate(&self) -> parking_lot::ReentrantMutexGuard<'_, ()> {
        self.inner.gate.lock()
    }

    pub(crate) fn emit(&self, event: &T) {
        let _gate = self.inner.gate.lock();
        let observers = {
            let state = self.inner.state.lock();
            if state.closed {
                return;
            }
            state.observers.snapshot()
        };
        for observer in observers {
            observer(event);
        }
    }

    pub(crate) fn observe(&self) -> Observable<T> {
        let inner = Arc::clone(&self.inner);
        Observable::new(move |observer: Observer<T>| {
            let _gate = inner.gate.lock();
            let id = {
                let mut state = inner.state.lock();
                if state.closed {
                    return Subscription::empty();
                }
                state.observers.add(observer)
            };
            let weak: Weak<EventSubjectInner<T>> = Arc::downgrade(&inner);
            Subscription::new(move || {
                if let Some(inner) = weak.upgrade() {
                    inner.state.lock().observers.remove(id);
                }
            })
        })
    }

    pub(crate) fn close(&self) {
        let _gate = self.inner.gate.lock();
        let mut state = self.inner.state.lock();
        state.closed = true;
        state.observers = Observers::new();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;

    fn record<T: Clone + Send + Sync + 'static>(
        observable: &Observable<T>,
    ) -> (Arc<Mutex<Vec<T>>>, Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = observable.subscribe(move |v: &T| sink.lock().push(v.clone()));
        (seen, sub)
    }

    #[test]
    fn test_replays_current_value_on_subscribe() {
        let subject = ValueSubject::new(7);
        let (seen, _sub) = record(&subject.observe());
        assert_eq!(*seen.lock(), vec![7]);

        subject.publish(8);
        assert_eq!(*seen.lock(), vec![7, 8]);
        assert_eq!(subject.version(), 1);
    }

    #[test]
    fn test_dropped_subscription_stops_delivery() {
        let subject = ValueSubject::new(0);
        let (seen, sub) = record(&subject.observe());
        drop(sub);
        subject.publish(1);
        assert_eq!(*seen.lock(), vec![0]);
        assert_eq!(subject.observer_count(), 0);
    }

    #[test]
    fn test_reentrant_publish_from_callback() {
        let subject = ValueSubject::new(0);
        let inner = subject.clone();
        let _sub = subject.observe().subscribe(move |v| {
            if *v == 1 {
                inner.publish(2);
            }
        });
        subject.publish(1);
        assert_eq!(subject.get(), 2);
    }

    #[test]
    fn test_close_releases_observers() {
        let subject = ValueSubject::new("a".to_string());
        let (seen, _sub) = record(&subject.observe());
        subject.close();
        subject.publish("b".to_string());
        assert_eq!(*seen.lock(), vec!["a".to_string()]);
        assert!(subject.is_closed());
        assert_eq!(subject.get(), "b");

        let (late, _late_sub) = record(&subject.observe());
        assert!(late.lock().is_empty());
    }

    #[test]
    fn test_concurrent_publishers_deliver_in_one_order() {
        let subject = ValueSubject::new(0_u32);
        let (first, _s1) = record(&subject.observe());
        let (second, _s2) = record(&subject.observe());

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let subject = subject.clone();
                thread::spawn(move || {
                    for i in 0..50 {
                        subject.publish(t * 1000 + i + 1);
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(first.lock().len(), 201);
        assert_eq!(*first.lock(), *second.lock());
        assert_eq!(first.lock().last().copied(), Some(subject.get()));
    }

    #[test]
    fn test_event_subject_has_no_replay() {
        let subject = EventSubject::new();
        subject.emit(&1);
        let (seen, _sub) = record(&subject.observe());
        subject.emit(&2);
        assert_eq!(*seen.lock(), vec![2]);

        subject.close();
        subject.emit(&3);
        assert_eq!(*seen.lock(), vec![2]);
    }
}
