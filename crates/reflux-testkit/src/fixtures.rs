//! Shared fixtures for reflux tests
//!
//! Factories under test control, the person/full-name scenario used across
//! the suites, and error types with recognizable messages.

use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;
use reflux_core::{
    CalculatedProperty, CalculationError, MutableProperty, PropertyConfig, PropertyFactory,
    VirtualScheduler,
};
use tracing_subscriber::EnvFilter;

static TRACING: OnceCell<()> = OnceCell::new();

/// Install a test-writer tracing subscriber once per process.
///
/// Honors `RUST_LOG`; silent by default.
pub fn init_tracing() {
    TRACING.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("off"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_test_writer()
            .try_init();
    });
}

/// The error a failing calculation raises in tests.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid operation: {0}")]
pub struct InvalidOperation(pub String);

/// A fresh captured failure with `message`.
pub fn failure(message: &str) -> CalculationError {
    CalculationError::new(InvalidOperation(message.to_string()))
}

/// A factory whose schedulers both run on one virtual clock.
pub fn virtual_factory(default_throttle: Duration) -> (PropertyFactory, Arc<VirtualScheduler>) {
    let scheduler = Arc::new(VirtualScheduler::new());
    let config = PropertyConfig::new()
        .with_scheduler(scheduler.clone())
        .with_default_throttle(default_throttle)
        .with_serialization(true);
    (PropertyFactory::new(config), scheduler)
}

/// First name, last name and their synchronous combination.
#[derive(Debug, Clone)]
pub struct Person {
    pub first_name: MutableProperty<String>,
    pub last_name: MutableProperty<String>,
    pub full_name: CalculatedProperty<String>,
}

impl Person {
    pub fn new(factory: &PropertyFactory, first: &str, last: &str) -> Self {
        let first_name = factory.mutable(first.to_string());
        let last_name = factory.mutable(last.to_string());
        let full_name = factory
            .calculate((first_name.clone(), last_name.clone()))
            .label("full_name")
            .synchronous(|(first, last)| Ok(format!("{first} {last}")));
        Self {
            first_name,
            last_name,
            full_name,
        }
    }

    /// John Smith, on the default factory.
    pub fn john_smith() -> Self {
        Self::new(&PropertyFactory::default(), "John", "Smith")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reflux_core::ReadableProperty;

    #[test]
    fn test_person_fixture() {
        init_tracing();
        let person = Person::john_smith();
        assert_eq!(person.full_name.value(), "John Smith");
        assert_eq!(person.full_name.label(), Some("full_name"));
    }

    #[test]
    fn test_failures_are_distinct_instances() {
        let a = failure("boom");
        let b = failure("boom");
        assert_ne!(a, b);
        assert_eq!(a.to_string(), b.to_string());
        assert_eq!(
            a.downcast_ref::<InvalidOperation>(),
            Some(&InvalidOperation("boom".into()))
        );
    }
}
