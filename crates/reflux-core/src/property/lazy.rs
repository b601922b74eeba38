use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};

use super::{PropertyId, PropertyValue, ReadableProperty};
use crate::cancellation::NeverCancel;
use crate::errors::CalculationError;
use crate::observable::subject::ValueSubject;
use crate::observable::Observable;
use crate::outcome::ValueOrError;
use crate::scheduler::Scheduler;

type Calculation<T> = Box<dyn FnOnce() -> Result<T, CalculationError> + Send + 'static>;

struct LazyInner<T> {
    id: PropertyId,
    calculation: Mutex<Option<Calculation<T>>>,
    calculated: AtomicBool,
    load_lock: ReentrantMutex<()>,
    cell: ValueSubject<ValueOrError<T>>,
    calculating: ValueSubject<bool>,
}

impl<T: PropertyValue + Default> LazyInner<T> {
    fn ensure_calculated(&self) {
        if self.calculated.load(Ordering::Acquire) {
            return;
        }
        let _load = self.load_lock.lock();
        if self.calculated.load(Ordering::Acquire) {
            return;
        }
        // None here means we re-entered from inside the calculation itself.
        let Some(calculation) = self.calculation.lock().take() else {
            return;
        };

        self.calculating.publish(true);
        let outcome = match catch_unwind(AssertUnwindSafe(calculation)) {
            Ok(result) => result,
            Err(payload) => {
                let error = CalculationError::panicked(payload);
                tracing::warn!(property = %self.id, error = %error, "lazy calculation panicked");
                Err(error)
            }
        };
        self.cell.publish(ValueOrError::from(outcome));
        self.calculated.store(true, Ordering::Release);
        self.calculating.publish(false);
        tracing::debug!(property = %self.id, "lazy property calculated");
    }
}

/// A property calculated at most once, on first access or an explicit load.
///
/// Until then it holds `Value(T::default())`. Subscribing does not trigger
/// the calculation; reading the value does. Once calculated, the result is
/// permanent.
pub struct LazyProperty<T> {
    inner: Arc<LazyInner<T>>,
}

impl<T> Clone for LazyProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PropertyValue + Default> LazyProperty<T> {
    pub fn new(calculation: impl FnOnce() -> Result<T, CalculationError> + Send + 'static) -> Self {
        Self {
            inner: Arc::new(LazyInner {
                id: PropertyId::new(),
                calculation: Mutex::new(Some(Box::new(calculation))),
                calculated: AtomicBool::new(false),
                load_lock: ReentrantMutex::new(()),
                cell: ValueSubject::new(ValueOrError::default()),
                calculating: ValueSubject::new(false),
            }),
        }
    }

    /// Calculate now, on the calling thread, if not done yet.
    pub fn load(&self) {
        self.inner.ensure_calculated();
    }

    /// Calculate on `scheduler` if not done yet.
    pub fn load_on(&self, scheduler: &dyn Scheduler) {
        let weak: Weak<LazyInner<T>> = Arc::downgrade(&self.inner);
        scheduler.schedule(
            Duration::ZERO,
            Box::pin(async move {
                if let Some(inner) = weak.upgrade() {
                    inner.ensure_calculated();
                }
            }),
            Arc::new(NeverCancel),
        );
    }

    pub fn is_calculated(&self) -> bool {
        self.inner.calculated.load(Ordering::Acquire)
    }

    pub fn is_calculating(&self) -> bool {
        self.inner.calculating.get()
    }

    /// The result cell, calculating first if needed.
    pub fn value_or_error(&self) -> ValueOrError<T> {
        self.inner.ensure_calculated();
        self.inner.cell.get()
    }

    /// The successful value, or the captured failure.
    pub fn successful_value_or_throw(&self) -> Result<T, CalculationError> {
        self.value_or_error().into_result()
    }

    pub fn on_value_or_error_set(&self) -> Observable<ValueOrError<T>> {
        self.inner.cell.observe()
    }

    pub fn on_value_or_error_changed(&self) -> Observable<ValueOrError<T>> {
        self.inner.cell.observe().distinct_until_changed()
    }

    pub fn on_successful_value_changed(&self) -> Observable<T> {
        self.inner
            .cell
            .observe()
            .filter_map(|cell| cell.value().cloned())
            .distinct_until_changed()
    }

    pub fn on_calculation_error(&self) -> Observable<CalculationError> {
        self.inner.cell.observe().filter_map(|cell| cell.error().cloned())
    }

    pub fn on_is_calculating_changed(&self) -> Observable<bool> {
        self.inner.calculating.observe().distinct_until_changed()
    }
}

impl<T: PropertyValue + Default> ReadableProperty for LazyProperty<T> {
    type Value = T;

    fn id(&self) -> PropertyId {
        self.inner.id
    }

    /// Value or default; forces the calculation.
    fn value(&self) -> T {
        self.value_or_error().value_or_default()
    }

    fn on_changed(&self) -> Observable<T> {
        self.on_set().distinct_until_changed()
    }

    fn on_set(&self) -> Observable<T> {
        self.inner
            .cell
            .observe()
            .map(|cell| cell.clone().value_or_default())
    }
}

impl<T> fmt::Debug for LazyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LazyProperty")
            .field("id", &self.inner.id)
            .field("calculated", &self.inner.calculated.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::scheduler::VirtualScheduler;
    use std::sync::atomic::AtomicUsize;
    use std::thread;

    #[test]
    fn test_calculates_once_on_first_access() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let property = LazyProperty::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(7)
        });

        assert!(!property.is_calculated());
        assert_eq!(property.value(), 7);
        assert_eq!(property.value(), 7);
        assert!(property.is_calculated());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_first_access_calculates_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let property = LazyProperty::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(20));
            Ok("ready".to_string())
        });

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let property = property.clone();
                thread::spawn(move || property.value())
            })
            .collect();
        for handle in handles {
            assert_eq!(handle.join().unwrap(), "ready");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_subscribing_does_not_force() {
        let property = LazyProperty::new(|| Ok(3));
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = property.on_changed().subscribe(move |v| sink.lock().push(*v));
        assert!(!property.is_calculated());
        assert_eq!(*seen.lock(), vec![0]);

        property.load();
        assert_eq!(*seen.lock(), vec![0, 3]);
    }

    #[test]
    fn test_failure_is_permanent_and_rethrown() {
        let property: LazyProperty<i32> = LazyProperty::new(|| Err(CalculationError::msg("nope")));
        let first = property.successful_value_or_throw().unwrap_err();
        let second = property.successful_value_or_throw().unwrap_err();
        assert_eq!(first, second);
        assert_eq!(property.value(), 0);
    }

    #[test]
    fn test_panic_becomes_error() {
        let property: LazyProperty<i32> = LazyProperty::new(|| panic!("lazy boom"));
        let error = property.value_or_error().error().cloned().unwrap();
        assert!(error.is_panic());
        assert!(property.is_calculated());
    }

    #[test]
    fn test_load_on_scheduler_and_calculating_flag() {
        let scheduler = VirtualScheduler::new();
        let property = LazyProperty::new(|| Ok(5_u8));
        let flags = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&flags);
        let _sub = property
            .on_is_calculating_changed()
            .subscribe(move |v| sink.lock().push(*v));

        property.load_on(&scheduler);
        assert!(!property.is_calculated());
        scheduler.run_pending();
        assert!(property.is_calculated());
        assert!(!property.is_calculating());
        assert_eq!(*flags.lock(), vec![false, true, false]);
    }

    #[test]
    fn test_reentrant_read_during_calculation_does_not_deadlock() {
        let slot: Arc<Mutex<Option<LazyProperty<i32>>>> = Arc::new(Mutex::new(None));
        let inner_slot = Arc::clone(&slot);
        let property = LazyProperty::new(move || {
            let me = inner_slot.lock().clone();
            // Reads the default while the calculation is in progress.
            let seen = me.map(|p| p.value()).unwrap_or(-1);
            Ok(seen + 1)
        });
        *slot.lock() = Some(property.clone());
        assert_eq!(property.value(), 1);
        slot.lock().take();
    }
}
