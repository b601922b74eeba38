//! Property-changed-by-name notifications for data binding.
//!
//! A view model owns one [`PropertyChangedNotifier`] and tracks each of its
//! properties under a name. Binding layers listen to
//! [`on_property_changed`](PropertyChangedNotifier::on_property_changed) and
//! re-read whichever property the event names.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::observable::subject::EventSubject;
use crate::observable::{Observable, Subscription};
use crate::property::ReadableProperty;

/// A named property changed value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PropertyChangedEvent {
    pub property_name: Arc<str>,
}

#[derive(Clone)]
pub struct PropertyChangedNotifier {
    events: EventSubject<PropertyChangedEvent>,
    tracked: Arc<Mutex<Vec<(Arc<str>, Subscription)>>>,
}

impl PropertyChangedNotifier {
    pub fn new() -> Self {
        Self {
            events: EventSubject::new(),
            tracked: Arc::new(Mutex::new(Vec::new())),
        }
    }

    /// Raise an event named `name` whenever `property` changes value.
    ///
    /// The value current at the time of the call does not raise an event.
    pub fn track<P: ReadableProperty>(&self, name: impl Into<Arc<str>>, property: &P) {
        let name: Arc<str> = name.into();
        let events = self.events.clone();
        let event = PropertyChangedEvent {
            property_name: Arc::clone(&name),
        };
        let subscription = property
            .on_changed()
            .skip(1)
            .subscribe(move |_| events.emit(&event));
        self.tracked.lock().push((name, subscription));
    }

    /// Raise an event by hand, for values not backed by a property.
    pub fn raise(&self, name: impl Into<Arc<str>>) {
        let event = PropertyChangedEvent {
            property_name: name.into(),
        };
        tracing::trace!(property = %event.property_name, "property changed");
        self.events.emit(&event);
    }

    pub fn on_property_changed(&self) -> Observable<PropertyChangedEvent> {
        self.events.observe()
    }

    /// Names currently tracked, in tracking order.
    pub fn tracked_names(&self) -> Vec<Arc<str>> {
        self.tracked.lock().iter().map(|(name, _)| Arc::clone(name)).collect()
    }

    /// Stop tracking every property.
    pub fn untrack_all(&self) {
        let tracked = std::mem::take(&mut *self.tracked.lock());
        drop(tracked);
    }
}

impl Default for PropertyChangedNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for PropertyChangedNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PropertyChangedNotifier")
            .field("tracked", &self.tracked_names())
            .finish()
    }
}
