//! The readable-property contract and the simple property kinds.
//!
//! Every property exposes two replaying streams over one underlying value:
//!
//! - `on_set`: every assignment or recomputation, repeats included.
//! - `on_changed`: the distinct-until-changed view of `on_set`.
//!
//! Both deliver the current value synchronously on subscribe. Generic
//! subscription ([`ReadableProperty::subscribe`]) is `on_changed`.

mod lazy;
mod mutable;
mod read_only;

use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::observable::{Observable, Subscription};

pub use lazy::LazyProperty;
pub use mutable::MutableProperty;
pub use read_only::ReadOnlyProperty;

/// Values a property can hold.
pub trait PropertyValue: Clone + PartialEq + Send + Sync + 'static {}

impl<T: Clone + PartialEq + Send + Sync + 'static> PropertyValue for T {}

/// Stable identity of a property, used in descriptors and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PropertyId(Uuid);

impl PropertyId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for PropertyId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A time-varying value with change notification.
pub trait ReadableProperty: Send + Sync {
    type Value: PropertyValue;

    fn id(&self) -> PropertyId;

    /// Synchronous snapshot of the latest resolved value.
    fn value(&self) -> Self::Value;

    /// Distinct values, replaying the current one on subscribe.
    fn on_changed(&self) -> Observable<Self::Value>;

    /// Every assignment, replaying the current value on subscribe.
    fn on_set(&self) -> Observable<Self::Value>;

    /// Subscribe to changes. Equivalent to `on_changed().subscribe(..)`.
    fn subscribe(&self, callback: impl Fn(&Self::Value) + Send + Sync + 'static) -> Subscription
    where
        Self: Sized,
    {
        self.on_changed().subscribe(callback)
    }
}

impl<P: ReadableProperty + ?Sized> ReadableProperty for Arc<P> {
    type Value = P::Value;

    fn id(&self) -> PropertyId {
        (**self).id()
    }

    fn value(&self) -> Self::Value {
        (**self).value()
    }

    fn on_changed(&self) -> Observable<Self::Value> {
        (**self).on_changed()
    }

    fn on_set(&self) -> Observable<Self::Value> {
        (**self).on_set()
    }
}
