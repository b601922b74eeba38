//! Ordered upstream sets and their combine-latest join.
//!
//! [`Sources`] is implemented for tuples of one to four readable properties,
//! which may hold different value types, and for `Vec<P>` of any length.
//!
//! The join subscribes to every upstream's `on_changed` stream. It fires once
//! every upstream has delivered at least one value and again on every later
//! delivery from any of them. Because upstream properties replay on
//! subscribe, the first firing happens while
//! [`combine_latest`](Sources::combine_latest) is still running.
//!
//! Deliveries are serialized by a reentrant gate: the sink never runs
//! concurrently with itself, and a sink may set an upstream property from
//! inside its own callback.

use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::observable::Subscription;
use crate::property::{PropertyId, ReadableProperty};

/// Callback receiving each combined set of latest values.
pub type Sink<V> = Arc<dyn Fn(V) + Send + Sync + 'static>;

/// An ordered set of upstream properties.
pub trait Sources: Send + Sync + 'static {
    /// The latest value of every upstream, in order.
    type Values: Clone + Send + Sync + 'static;

    /// Call `sink` with the latest values whenever any upstream changes.
    fn combine_latest(&self, sink: Sink<Self::Values>) -> Subscription;

    /// Current values of every upstream.
    fn snapshot(&self) -> Self::Values;

    /// Identities of the upstreams, in order.
    fn ids(&self) -> Vec<PropertyId>;
}

/// Latest-value slots of a join.
trait Slots: Send + 'static {
    type Values;

    /// All values, once every slot has been filled.
    fn complete(&self) -> Option<Self::Values>;
}

struct Join<S: Slots> {
    gate: ReentrantMutex<()>,
    slots: Mutex<S>,
    sink: Sink<S::Values>,
}

impl<S: Slots> Join<S> {
    fn new(slots: S, sink: Sink<S::Values>) -> Arc<Self> {
        Arc::new(Self {
            gate: ReentrantMutex::new(()),
            slots: Mutex::new(slots),
            sink,
        })
    }

    fn update(&self, fill: impl FnOnce(&mut S)) {
        let _gate = self.gate.lock();
        let ready = {
            let mut slots = self.slots.lock();
            fill(&mut slots);
            slots.complete()
        };
        if let Some(values) = ready {
            (self.sink)(values);
        }
    }
}

macro_rules! impl_sources_for_tuple {
    ($($P:ident $latest:ident => $idx:tt),+) => {
        impl<$($P),+> Slots for ($(Option<$P>,)+)
        where
            $($P: Clone + Send + 'static),+
        {
            type Values = ($($P,)+);

            fn complete(&self) -> Option<Self::Values> {
                match self {
                    ($(Some($latest),)+) => Some(($($latest.clone(),)+)),
                    _ => None,
                }
            }
        }

        impl<$($P),+> Sources for ($($P,)+)
        where
            $($P: ReadableProperty + 'static),+
        {
            type Values = ($(<$P as ReadableProperty>::Value,)+);

            fn combine_latest(&self, sink: Sink<Self::Values>) -> Subscription {
                let slots: ($(Option<<$P as ReadableProperty>::Value>,)+) = Default::default();
                let join = Join::new(slots, sink);
                let mut subscriptions = Vec::new();
                $(
                    let member = Arc::clone(&join);
                    subscriptions.push(self.$idx.on_changed().subscribe(
                        move |value: &<$P as ReadableProperty>::Value| {
                            member.update(|slots| slots.$idx = Some(value.clone()));
                        },
                    ));
                )+
                Subscription::merge(subscriptions)
            }

            fn snapshot(&self) -> Self::Values {
                ($(self.$idx.value(),)+)
            }

            fn ids(&self) -> Vec<PropertyId> {
                vec![$(self.$idx.id()),+]
            }
        }
    };
}

impl_sources_for_tuple!(A a => 0);
impl_sources_for_tuple!(A a => 0, B b => 1);
impl_sources_for_tuple!(A a => 0, B b => 1, C c => 2);
impl_sources_for_tuple!(A a => 0, B b => 1, C c => 2, D d => 3);

impl<V: Clone + Send + 'static> Slots for Vec<Option<V>> {
    type Values = Vec<V>;

    fn complete(&self) -> Option<Vec<V>> {
        self.iter().cloned().collect()
    }
}

impl<P> Sources for Vec<P>
where
    P: ReadableProperty + 'static,
{
    type Values = Vec<P::Value>;

    fn combine_latest(&self, sink: Sink<Self::Values>) -> Subscription {
        if self.is_empty() {
            sink(Vec::new());
            return Subscription::empty();
        }
        let join = Join::new(vec![None; self.len()], sink);
        let subscriptions: Vec<Subscription> = self
            .iter()
            .enumerate()
            .map(|(index, property)| {
                let member = Arc::clone(&join);
                property.on_changed().subscribe(move |value: &P::Value| {
                    member.update(|slots| slots[index] = Some(value.clone()));
                })
            })
            .collect();
        Subscription::merge(subscriptions)
    }

    fn snapshot(&self) -> Self::Values {
        self.iter().map(ReadableProperty::value).collect()
    }

    fn ids(&self) -> Vec<PropertyId> {
        self.iter().map(ReadableProperty::id).collect()
    }
}
