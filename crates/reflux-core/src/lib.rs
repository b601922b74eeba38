//! Reflux Core - reactive properties with derived, throttled and cancelable
//! calculations
//!
//! # Building blocks
//!
//! ## Observation
//! - [`Observable`]: push-based stream with `map`, `filter`, `skip` and
//!   `distinct_until_changed`
//! - [`Subscription`]: RAII handle; dropping it stops delivery
//! - [`ObservableStream`]: bridge into `futures::Stream`
//!
//! ## Properties
//! - [`MutableProperty`]: settable value
//! - [`ReadOnlyProperty`]: constant or lazily evaluated once
//! - [`LazyProperty`]: fallible calculation run on first use
//! - [`CalculatedProperty`]: derived from upstream properties, recomputed
//!   synchronously, throttled on a [`Scheduler`], or cancelably
//!
//! ## Outcomes
//! - [`ValueOrError`]: the result cell of every calculation
//! - [`CalculationError`]: captured failure, compared by identity
//!
//! ## Runtime
//! - [`PropertyFactory`] and [`PropertyConfig`]: explicit configuration, no
//!   global state
//! - [`ImmediateScheduler`], [`TokioScheduler`], [`VirtualScheduler`]

#![allow(missing_docs)]
#![forbid(unsafe_code)]

/// Error types for contract violations and calculation failures
pub mod errors;

/// Value-or-error result cell
pub mod outcome;

/// Observable streams, subjects and subscriptions
pub mod observable;

/// Cooperative cancellation
pub mod cancellation;

/// Where throttled and cancelable work runs
pub mod scheduler;

/// Readable, mutable, read-only and lazy properties
pub mod property;

/// Calculated properties and their recomputation strategies
pub mod calculated;

/// Observable ordered collections
pub mod collection;

/// Property-changed-by-name notifications
pub mod notify;

/// Factory configuration and settings
pub mod config;

/// Property factory
pub mod factory;

pub use calculated::{
    CalculatedProperty, CalculationBuilder, CalculationDescriptor, Sink, Sources,
    StrategyDescriptor,
};
pub use cancellation::{CancellationSignal, CancellationSource, CancellationToken, NeverCancel};
pub use collection::{CollectionAction, CollectionChange, ObservableList};
pub use config::{PropertyConfig, PropertySettings, SettingsOverride, MAX_THROTTLE};
pub use errors::{CalculationError, PropertyError};
pub use factory::PropertyFactory;
pub use notify::{PropertyChangedEvent, PropertyChangedNotifier};
pub use observable::{Observable, ObservableStream, Observer, Subscription};
pub use outcome::ValueOrError;
pub use property::{
    LazyProperty, MutableProperty, PropertyId, PropertyValue, ReadOnlyProperty, ReadableProperty,
};
pub use scheduler::{
    ImmediateScheduler, Scheduler, SchedulerRole, TokioScheduler, VirtualScheduler,
};
