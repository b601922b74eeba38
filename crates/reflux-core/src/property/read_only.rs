use std::fmt;
use std::sync::Arc;

use once_cell::sync::Lazy;

use super::{PropertyId, PropertyValue, ReadableProperty};
use crate::observable::{Observable, Subscription};

type Thunk<T> = Box<dyn FnOnce() -> T + Send + 'static>;

/// A property whose value never changes.
///
/// Either a constant or produced by a thunk evaluated at most once, on first
/// access. Streams deliver the value on subscribe and never emit again.
pub struct ReadOnlyProperty<T> {
    id: PropertyId,
    cell: Arc<Lazy<T, Thunk<T>>>,
}

impl<T> Clone for ReadOnlyProperty<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T: PropertyValue> ReadOnlyProperty<T> {
    pub fn constant(value: T) -> Self {
        Self::lazy(move || value)
    }

    pub fn lazy(thunk: impl FnOnce() -> T + Send + 'static) -> Self {
        let thunk: Thunk<T> = Box::new(thunk);
        Self {
            id: PropertyId::new(),
            cell: Arc::new(Lazy::new(thunk)),
        }
    }

    /// Whether the value has been produced yet.
    pub fn is_evaluated(&self) -> bool {
        Lazy::get(&self.cell).is_some()
    }

    fn replay(&self) -> Observable<T> {
        let cell = Arc::clone(&self.cell);
        Observable::new(move |observer| {
            observer(Lazy::force(&cell));
            Subscription::empty()
        })
    }
}

impl<T: PropertyValue> ReadableProperty for ReadOnlyProperty<T> {
    type Value = T;

    fn id(&self) -> PropertyId {
        self.id
    }

    fn value(&self) -> T {
        Lazy::force(&self.cell).clone()
    }

    fn on_changed(&self) -> Observable<T> {
        self.replay()
    }

    fn on_set(&self) -> Observable<T> {
        self.replay()
    }
}

impl<T: PropertyValue + fmt::Debug> fmt::Debug for ReadOnlyProperty<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ReadOnlyProperty")
            .field("id", &self.id)
            .field("value", &Lazy::get(&self.cell))
            .finish()
    }
}
