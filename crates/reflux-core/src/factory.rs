//! Entry point for creating properties under one configuration.

use std::future::Future;
use std::sync::Arc;

use crate::calculated::{CalculatedProperty, CalculationBuilder, Sources};
use crate::cancellation::CancellationSignal;
use crate::collection::ObservableList;
use crate::config::PropertyConfig;
use crate::errors::CalculationError;
use crate::property::{LazyProperty, MutableProperty, PropertyValue, ReadOnlyProperty};
use crate::scheduler::{Scheduler, SchedulerRole};

/// Creates properties bound to a [`PropertyConfig`].
///
/// Factories are cheap to clone. Two factories with different configurations
/// share nothing.
#[derive(Debug, Clone, Default)]
pub struct PropertyFactory {
    config: PropertyConfig,
}

impl PropertyFactory {
    pub fn new(config: PropertyConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PropertyConfig {
        &self.config
    }

    pub fn scheduler(&self, role: SchedulerRole) -> Arc<dyn Scheduler> {
        self.config.scheduler(role)
    }

    pub fn mutable<T: PropertyValue>(&self, value: T) -> MutableProperty<T> {
        MutableProperty::new(value)
    }

    pub fn read_only<T: PropertyValue>(&self, value: T) -> ReadOnlyProperty<T> {
        ReadOnlyProperty::constant(value)
    }

    pub fn read_only_lazy<T: PropertyValue>(
        &self,
        thunk: impl FnOnce() -> T + Send + 'static,
    ) -> ReadOnlyProperty<T> {
        ReadOnlyProperty::lazy(thunk)
    }

    pub fn lazy<T: PropertyValue + Default>(
        &self,
        calculation: impl FnOnce() -> Result<T, CalculationError> + Send + 'static,
    ) -> LazyProperty<T> {
        LazyProperty::new(calculation)
    }

    pub fn list<T: Clone + PartialEq + Send + Sync + 'static>(&self) -> ObservableList<T> {
        ObservableList::new()
    }

    /// Start building a calculated property over `sources`.
    pub fn calculate<S: Sources>(&self, sources: S) -> CalculationBuilder<S> {
        CalculationBuilder::new(sources, self.config.clone())
    }

    /// Synchronous calculated property.
    pub fn calculated<S, T, F>(&self, sources: S, calculate: F) -> CalculatedProperty<T>
    where
        S: Sources,
        T: PropertyValue + Default,
        F: Fn(S::Values) -> Result<T, CalculationError> + Send + Sync + 'static,
    {
        self.calculate(sources).synchronous(calculate)
    }

    /// Throttled calculated property using the configured default throttle.
    pub fn throttled<S, T, F>(
        &self,
        sources: S,
        role: SchedulerRole,
        calculate: F,
    ) -> CalculatedProperty<T>
    where
        S: Sources,
        T: PropertyValue + Default,
        F: Fn(S::Values) -> Result<T, CalculationError> + Send + Sync + 'static,
    {
        self.calculate(sources)
            .throttled(self.config.default_throttle(), role, calculate)
    }

    /// Cancelable calculated property using the configured default throttle.
    pub fn cancelable<S, T, F, Fut>(
        &self,
        sources: S,
        role: SchedulerRole,
        calculate: F,
    ) -> CalculatedProperty<T>
    where
        S: Sources,
        T: PropertyValue + Default,
        F: Fn(S::Values, CancellationSignal) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<T, CalculationError>> + Send + 'static,
    {
        self.calculate(sources)
            .cancelable(self.config.default_throttle(), role, calculate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cancellation::CancellationToken;
    use crate::property::ReadableProperty;
    use crate::scheduler::VirtualScheduler;
    use std::time::Duration;

    #[test]
    fn test_factory_builds_every_kind() {
        let factory = PropertyFactory::default();
        let base = factory.mutable(3);
        let constant = factory.read_only(4);
        let lazy_constant = factory.read_only_lazy(|| 5);
        let lazy = factory.lazy(|| Ok(6));
        let sum = factory.calculated(
            (base.clone(), constant, lazy_constant, lazy),
            |(a, b, c, d)| Ok(a + b + c + d),
        );
        // Subscribing does not force the lazy upstream, so it contributes 0.
        assert_eq!(sum.value(), 3 + 4 + 5);

        base.set_value(10);
        assert_eq!(sum.value(), 10 + 4 + 5);
        assert!(factory.list::<u8>().is_empty());
    }

    #[test]
    fn test_default_throttle_comes_from_config() {
        let scheduler = Arc::new(VirtualScheduler::new());
        let factory = PropertyFactory::new(
            PropertyConfig::new()
                .with_scheduler(scheduler.clone())
                .with_default_throttle(Duration::from_millis(30)),
        );
        let input = factory.mutable(1);
        let derived = factory.throttled((input.clone(),), SchedulerRole::LongRunning, |(v,)| Ok(v + 1));

        assert_eq!(derived.value(), 0);
        scheduler.advance_by(Duration::from_millis(29));
        assert_eq!(derived.value(), 0);
        scheduler.advance_by(Duration::from_millis(1));
        assert_eq!(derived.value(), 2);
        assert_eq!(factory.scheduler(SchedulerRole::Interactive).name(), "virtual");
    }

    #[test]
    fn test_cancelable_on_immediate_scheduler() {
        let factory = PropertyFactory::default();
        let input = factory.mutable(2);
        let squared = factory.cancelable((input.clone(),), SchedulerRole::Interactive, |(v,), signal| async move {
            signal.check()?;
            Ok::<_, CalculationError>(v * v)
        });
        assert_eq!(squared.value(), 4);
        input.set_value(3);
        assert_eq!(squared.value(), 9);
    }
}
