//! Calculated properties: values derived from upstream properties.
//!
//! A calculated property combines an ordered set of upstream properties
//! ([`Sources`]), a calculation function and a recomputation strategy:
//!
//! - synchronous: recompute inline on the thread that delivered the change;
//! - throttled: recompute on a scheduler once a quiescence window has passed;
//! - cancelable: like throttled, with an async calculation that receives a
//!   [`CancellationSignal`](crate::CancellationSignal) to check at safe points.
//!
//! Results land in a [`ValueOrError`] cell. Failures (and panics) inside the
//! calculation become the `Error` case and never reach the upstream. Only the
//! newest trigger ever publishes; see the engine's invariants.
//!
//! ```rust
//! use reflux_core::{MutableProperty, PropertyFactory, ReadableProperty};
//!
//! let factory = PropertyFactory::default();
//! let first = factory.mutable("John".to_string());
//! let last = factory.mutable("Smith".to_string());
//! let full = factory.calculated((first.clone(), last.clone()), |(first, last)| {
//!     Ok(format!("{first} {last}"))
//! });
//!
//! assert_eq!(full.value(), "John Smith");
//! last.set_value("Davis".to_string());
//! assert_eq!(full.value(), "John Davis");
//! ```

mod descriptor;
mod engine;
mod sources;
mod strategy;

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;

use crate::cancellation::CancellationSignal;
use crate::config::PropertyConfig;
use crate::errors::{CalculationError, PropertyError};
use crate::observable::Observable;
use crate::outcome::ValueOrError;
use crate::property::{PropertyId, PropertyValue, ReadableProperty};
use crate::scheduler::SchedulerRole;

pub use descriptor::{CalculationDescriptor, StrategyDescriptor};
pub use sources::{Sink, Sources};

use engine::EngineCore;
use strategy::{Cancelable, RecomputeStrategy, Synchronous, Throttled};

struct CalculatedInner<T> {
    engine: Arc<EngineCore<T>>,
    label: Option<String>,
    upstream: Vec<PropertyId>,
    strategy: StrategyDescriptor,
    context: Option<Result<serde_json::Value, PropertyError>>,
    serialization_enabled: bool,
    /// Upstream handles, owned for as long as this property lives.
    _sources: Box<dyn Any + Send + Sync>,
}

impl<T> Drop for CalculatedInner<T> {
    fn drop(&mut self) {
        self.engine.dispose();
    }
}

/// A property derived from upstream properties.
///
/// Clones are handles to the same property. The property is disposed when
/// [`dispose`](Self::dispose) is called or the last handle is dropped.
pub struct CalculatedProperty<T> {
    inner: Arc<CalculatedInner<T>>,
}

impl<T> Clone for CalculatedProperty<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: PropertyValue + Default> CalculatedProperty<T> {
    fn build<S, R>(
        sources: S,
        strategy: R,
        label: Option<String>,
        context: Option<Result<serde_json::Value, PropertyError>>,
        config: &PropertyConfig,
    ) -> Self
    where
        S: Sources,
        R: RecomputeStrategy<S::Values, T>,
    {
        let engine = Arc::new(EngineCore::new(
            PropertyId::new(),
            label.as_deref(),
            strategy.name(),
        ));
        let descriptor = strategy.describe();
        let upstream = sources.ids();

        let weak = Arc::downgrade(&engine);
        let strategy = Arc::new(strategy);
        let subscription = sources.combine_latest(Arc::new(move |values: S::Values| {
            if let Some(engine) = weak.upgrade() {
                strategy.trigger(&engine, values);
            }
        }));
        engine.attach_upstream(subscription);

        tracing::debug!(
            property = engine.name(),
            strategy = ?descriptor,
            upstream = upstream.len(),
            "calculated property created"
        );

        Self {
            inner: Arc::new(CalculatedInner {
                engine,
                label,
                upstream,
                strategy: descriptor,
                context,
                serialization_enabled: config.serialization_enabled(),
                _sources: Box::new(sources),
            }),
        }
    }

    /// The current cell.
    pub fn value_or_error(&self) -> ValueOrError<T> {
        self.inner.engine.cell().get()
    }

    /// The successful value, or the stored failure.
    pub fn successful_value_or_throw(&self) -> Result<T, CalculationError> {
        self.value_or_error().into_result()
    }

    pub fn is_calculating(&self) -> bool {
        self.inner.engine.calculating().get()
    }

    /// Every cell publication, replaying the current cell.
    pub fn on_value_or_error_set(&self) -> Observable<ValueOrError<T>> {
        self.inner.engine.cell().observe()
    }

    /// Distinct cells, replaying the current cell.
    pub fn on_value_or_error_changed(&self) -> Observable<ValueOrError<T>> {
        self.on_value_or_error_set().distinct_until_changed()
    }

    /// Distinct successful values. Errors are skipped.
    pub fn on_successful_value_changed(&self) -> Observable<T> {
        self.on_successful_value_set().distinct_until_changed()
    }

    /// Every successful value, repeats included.
    pub fn on_successful_value_set(&self) -> Observable<T> {
        self.on_value_or_error_set()
            .filter_map(|cell| cell.value().cloned())
    }

    /// Every captured failure, as the exact instance the calculation produced.
    pub fn on_calculation_error(&self) -> Observable<CalculationError> {
        self.on_value_or_error_set()
            .filter_map(|cell| cell.error().cloned())
    }

    pub fn on_is_calculating_changed(&self) -> Observable<bool> {
        self.inner
            .engine
            .calculating()
            .observe()
            .distinct_until_changed()
    }

    /// Stop recomputing and release subscribers. Idempotent.
    ///
    /// The last cell stays readable. Subscribing afterwards yields nothing.
    pub fn dispose(&self) {
        self.inner.engine.dispose();
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.engine.is_disposed()
    }

    pub fn label(&self) -> Option<&str> {
        self.inner.label.as_deref()
    }

    /// Describe the reconstructable state of this property.
    ///
    /// Fails unless the configuration enabled serialization, once the
    /// property is disposed, or if the calculation context could not be
    /// serialized.
    pub fn descriptor(&self) -> Result<CalculationDescriptor, PropertyError> {
        if self.is_disposed() {
            return Err(PropertyError::disposed(self.inner.engine.name()));
        }
        if !self.inner.serialization_enabled {
            return Err(PropertyError::invalid_operation(format!(
                "serialization is disabled for {}",
                self.inner.engine.name()
            )));
        }
        let context = match &self.inner.context {
            None => None,
            Some(Ok(context)) => Some(context.clone()),
            Some(Err(error)) => return Err(error.clone()),
        };
        Ok(CalculationDescriptor {
            property: self.inner.engine.id(),
            label: self.inner.label.clone(),
            upstream: self.inner.upstream.clone(),
            strategy: self.inner.strategy,
            context,
        })
    }
}

impl<T: PropertyValue + Default> ReadableProperty for CalculatedProperty<T> {
    type Value = T;

    fn id(&self) -> PropertyId {
        self.inner.engine.id()
    }

    /// Value or default.
    fn value(&self) -> T {
        self.value_or_error().value_or_default()
    }

    fn on_changed(&self) -> Observable<T> {
        self.on_set().distinct_until_changed()
    }

    fn on_set(&self) -> Observable<T> {
        self.on_value_or_error_set()
            .map(|cell| cell.clone().value_or_default())
    }
}

impl<T> fmt::Debug for CalculatedProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculatedProperty")
            .field("engine", &self.inner.engine)
            .field("strategy", &self.inner.strategy)
            .finish_non_exhaustive()
    }
}

/// Builder selecting how a calculated property recomputes.
///
/// Obtained from [`PropertyFactory::calculate`](crate::PropertyFactory::calculate).
pub struct CalculationBuilder<S> {
    sources: S,
    config: PropertyConfig,
    label: Option<String>,
}

impl<S: Sources> CalculationBuilder<S> {
    pub fn new(sources: S, config: PropertyConfig) -> Self {
        Self {
            sources,
            config,
            label: None,
        }
    }

    /// Name used in logs and descriptors.
    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Recompute inline whenever an upstream changes.
    pub fn synchronous<T, F>(self, calculate: F) -> CalculatedProperty<T>
    where
        T: PropertyValue + Default,
        F: Fn(S::Values) -> Result<T, CalculationError> + Send + Sync + 'static,
    {
        CalculatedProperty::build(
            self.sources,
            Synchronous::new(calculate),
            self.label,
            None,
            &self.config,
        )
    }

    /// Recompute inline with an explicit context instead of a closure.
    ///
    /// The context is serialized into the property's descriptor.
    pub fn with_context<C, T>(
        self,
        context: C,
        calculate: fn(&C, S::Values) -> Result<T, CalculationError>,
    ) -> CalculatedProperty<T>
    where
        C: Serialize + Send + Sync + 'static,
        T: PropertyValue + Default,
    {
        let serialized = serde_json::to_value(&context).map_err(PropertyError::from);
        CalculatedProperty::build(
            self.sources,
            Synchronous::new(move |values| calculate(&context, values)),
            self.label,
            Some(serialized),
            &self.config,
        )
    }

    /// Recompute on the `role` scheduler after `throttle` of quiet.
    pub fn throttled<T, F>(
        self,
        throttle: Duration,
        role: SchedulerRole,
        calculate: F,
    ) -> CalculatedProperty<T>
    where
        T: PropertyValue + Default,
        F: Fn(S::Values) -> Result<T, CalculationError> + Send + Sync + 'static,
    {
        let scheduler = self.config.scheduler(role);
        CalculatedProperty::build(
            self.sources,
            Throttled::new(calculate, throttle, role, scheduler),
            self.label,
            None,
            &self.config,
        )
    }

    /// Recompute asynchronously on the `role` scheduler after `throttle` of
    /// quiet, cancelling the previous run on every new trigger.
    pub fn cancelable<T, F, Fut>(
        self,
        throttle: Duration,
        role: SchedulerRole,
        calculate: F,
    ) -> CalculatedProperty<T>
    where
        T: PropertyValue + Default,
        F: Fn(S::Values, CancellationSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CalculationError>> + Send + 'static,
    {
        let scheduler = self.config.scheduler(role);
        CalculatedProperty::build(
            self.sources,
            Cancelable::new(calculate, throttle, role, scheduler),
            self.label,
            None,
            &self.config,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::property::MutableProperty;
    use crate::scheduler::VirtualScheduler;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn record<V: Clone + Send + Sync + 'static>(
        observable: Observable<V>,
    ) -> (Arc<Mutex<Vec<V>>>, crate::Subscription) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let sub = observable.subscribe(move |v: &V| sink.lock().push(v.clone()));
        (seen, sub)
    }

    fn full_name(
        first: &MutableProperty<String>,
        last: &MutableProperty<String>,
    ) -> CalculatedProperty<String> {
        CalculationBuilder::new((first.clone(), last.clone()), PropertyConfig::default())
            .label("full_name")
            .synchronous(|(first, last)| Ok(format!("{first} {last}")))
    }

    #[test]
    fn test_synchronous_recomputes_on_change() {
        let first = MutableProperty::new("John".to_string());
        let last = MutableProperty::new("Smith".to_string());
        let full = full_name(&first, &last);
        assert_eq!(full.value(), "John Smith");
        assert!(!full.is_calculating());

        let (changes, _sub) = record(full.on_successful_value_changed());
        changes.lock().clear();

        last.set_value("Davis".to_string());
        assert_eq!(full.value(), "John Davis");
        assert_eq!(*changes.lock(), vec!["John Davis".to_string()]);
    }

    #[test]
    fn test_calculated_feeds_calculated() {
        let base = MutableProperty::new(2);
        let doubled = CalculationBuilder::new((base.clone(),), PropertyConfig::default())
            .synchronous(|(v,)| Ok(v * 2));
        let plus_one = CalculationBuilder::new((doubled.clone(),), PropertyConfig::default())
            .synchronous(|(v,)| Ok(v + 1));

        assert_eq!(plus_one.value(), 5);
        base.set_value(10);
        assert_eq!(plus_one.value(), 21);
    }

    #[test]
    fn test_owned_upstream_lives_as_long_as_downstream() {
        let base = MutableProperty::new(2);
        let doubled = CalculationBuilder::new((base.clone(),), PropertyConfig::default())
            .synchronous(|(v,)| Ok(v * 2));
        let plus_one = CalculationBuilder::new((doubled,), PropertyConfig::default())
            .synchronous(|(v,)| Ok(v + 1));

        base.set_value(10);
        assert_eq!(plus_one.value(), 21);
        assert!(!plus_one.is_disposed());
    }

    #[test]
    fn test_failure_is_captured_and_upstream_survives() {
        let input = MutableProperty::new(1);
        let checked = CalculationBuilder::new((input.clone(),), PropertyConfig::default())
            .synchronous(|(v,): (i32,)| {
                if v < 0 {
                    Err(CalculationError::msg("negative"))
                } else {
                    Ok(v)
                }
            });
        let (errors, _sub) = record(checked.on_calculation_error());

        input.set_value(-1);
        assert!(checked.value_or_error().is_error());
        assert_eq!(checked.value(), 0);
        let thrown = checked.successful_value_or_throw().unwrap_err();
        assert_eq!(errors.lock().as_slice(), &[thrown]);

        input.set_value(3);
        assert_eq!(checked.successful_value_or_throw().ok(), Some(3));
    }

    #[test]
    fn test_panic_is_captured() {
        let input = MutableProperty::new(0);
        let fragile = CalculationBuilder::new((input.clone(),), PropertyConfig::default())
            .synchronous(|(v,): (i32,)| {
                if v == 1 {
                    panic!("fragile");
                }
                Ok(v)
            });
        input.set_value(1);
        assert!(fragile.successful_value_or_throw().unwrap_err().is_panic());
        input.set_value(2);
        assert_eq!(fragile.value(), 2);
    }

    #[test]
    fn test_dispose_stops_recomputation() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let input = MutableProperty::new(1);
        let derived = CalculationBuilder::new((input.clone(),), PropertyConfig::default())
            .synchronous(move |(v,): (i32,)| {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(v)
            });
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        derived.dispose();
        derived.dispose();
        input.set_value(2);
        assert!(derived.is_disposed());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(derived.value(), 1);
    }

    #[test]
    fn test_dropping_last_handle_unsubscribes_upstream() {
        let input = MutableProperty::new(1);
        let derived = CalculationBuilder::new((input.clone(),), PropertyConfig::default())
            .synchronous(|(v,): (i32,)| Ok(v));
        let (sets, _sub) = record(input.on_set());
        drop(derived);
        input.set_value(2);
        assert_eq!(*sets.lock(), vec![1, 2]);
    }

    #[test]
    fn test_throttled_runs_only_the_last_trigger_of_a_burst() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let config = PropertyConfig::new().with_scheduler(scheduler.clone());
        let input = MutableProperty::new(0);
        let seen_inputs = Arc::new(Mutex::new(Vec::new()));
        let log = Arc::clone(&seen_inputs);
        let derived = CalculationBuilder::new((input.clone(),), config).throttled(
            Duration::from_millis(100),
            SchedulerRole::Interactive,
            move |(v,): (i32,)| {
                log.lock().push(v);
                Ok(v * 10)
            },
        );
        assert!(derived.is_calculating());

        scheduler.advance_by(Duration::from_millis(50));
        input.set_value(1);
        scheduler.advance_by(Duration::from_millis(70));
        input.set_value(2);
        scheduler.advance_by(Duration::from_millis(99));
        assert!(seen_inputs.lock().is_empty());

        scheduler.advance_by(Duration::from_millis(1));
        assert_eq!(*seen_inputs.lock(), vec![2]);
        assert_eq!(derived.value(), 20);
        assert!(!derived.is_calculating());
    }

    #[test]
    fn test_descriptor_requires_serialization() {
        let input = MutableProperty::new(1);
        let derived = CalculationBuilder::new((input.clone(),), PropertyConfig::default())
            .synchronous(|(v,): (i32,)| Ok(v));
        assert!(matches!(
            derived.descriptor(),
            Err(PropertyError::InvalidOperation { .. })
        ));
    }

    #[test]
    fn test_with_context_descriptor() {
        #[derive(Serialize)]
        struct Join {
            separator: String,
        }

        let first = MutableProperty::new("a".to_string());
        let second = MutableProperty::new("b".to_string());
        let config = PropertyConfig::new().with_serialization(true);
        let joined = CalculationBuilder::new((first.clone(), second.clone()), config)
            .label("joined")
            .with_context(
                Join {
                    separator: "-".to_string(),
                },
                |ctx, (a, b)| Ok(format!("{a}{}{b}", ctx.separator)),
            );
        assert_eq!(joined.value(), "a-b");

        let descriptor = joined.descriptor().unwrap();
        assert_eq!(descriptor.label.as_deref(), Some("joined"));
        assert_eq!(descriptor.upstream, vec![first.id(), second.id()]);
        assert_eq!(descriptor.strategy, StrategyDescriptor::Synchronous);
        assert_eq!(descriptor.context, Some(serde_json::json!({ "separator": "-" })));
    }

    #[test]
    fn test_descriptor_after_dispose_is_refused() {
        let input = MutableProperty::new(1);
        let config = PropertyConfig::new().with_serialization(true);
        let derived = CalculationBuilder::new((input.clone(),), config)
            .label("gone")
            .synchronous(|(v,): (i32,)| Ok(v));
        assert!(derived.descriptor().is_ok());

        derived.dispose();
        assert_eq!(
            derived.descriptor(),
            Err(PropertyError::disposed("gone"))
        );
    }
}
