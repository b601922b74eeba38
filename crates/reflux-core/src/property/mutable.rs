use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::{PropertyId, PropertyValue, ReadableProperty};
use crate::observable::subject::ValueSubject;
use crate::observable::Observable;

/// A property holding a single value, writable by its owner.
///
/// Clones share state: every clone reads and writes the same value. Writes
/// publish synchronously on the calling thread.
///
/// ```rust
/// use reflux_core::{MutableProperty, ReadableProperty};
///
/// let name = MutableProperty::new("John".to_string());
/// name.set_value("Jane".to_string());
/// assert_eq!(name.value(), "Jane");
/// ```
#[derive(Clone)]
pub struct MutableProperty<T> {
    id: PropertyId,
    subject: ValueSubject<T>,
}

impl<T: PropertyValue> MutableProperty<T> {
    pub fn new(value: T) -> Self {
        Self {
            id: PropertyId::new(),
            subject: ValueSubject::new(value),
        }
    }

    /// Publish `value` to every subscriber before returning.
    ///
    /// `on_set` subscribers see every call; `on_changed` subscribers only see
    /// values that differ from the previous one.
    pub fn set_value(&self, value: T) {
        tracing::trace!(property = %self.id, "set");
        self.subject.publish(value);
    }

    /// Derive the next value from the current one and publish it.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        let next = self.subject.with(f);
        self.set_value(next);
    }

    /// Number of assignments since creation.
    pub fn version(&self) -> u64 {
        self.subject.version()
    }
}

impl<T: PropertyValue> ReadableProperty for MutableProperty<T> {
    type Value = T;

    fn id(&self) -> PropertyId {
        self.id
    }

    fn value(&self) -> T {
        self.subject.get()
    }

    fn on_changed(&self) -> Observable<T> {
        self.subject.observe().distinct_until_changed()
    }

    fn on_set(&self) -> Observable<T> {
        self.subject.observe()
    }
}

impl<T: PropertyValue + Default> Default for MutableProperty<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: PropertyValue + fmt::Debug> fmt::Debug for MutableProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MutableProperty")
            .field("id", &self.id)
            .field("value", &self.subject.get())
            .finish()
    }
}

impl<T: PropertyValue + Serialize> Serialize for MutableProperty<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.subject.with(|value| value.serialize(serializer))
    }
}

impl<'de, T: PropertyValue + Deserialize<'de>> Deserialize<'de> for MutableProperty<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(MutableProperty::new)
    }
}
