//! The recomputation state machine shared by every strategy.
//!
//! # State
//!
//! - `cell`: the latest `ValueOrError<T>`, initially `Value(T::default())`.
//! - `calculating`: true while a triggered recomputation has not finished.
//! - `control.generation`: bumped on every trigger. A recomputation carries
//!   the generation it was started with in its [`Ticket`].
//! - `control.in_flight`: cancellation source of the newest recomputation.
//!
//! # Invariants
//!
//! 1. Every write to `cell` and `calculating` happens under `gate`, so flag
//!    and cell publications form one total order per engine.
//! 2. A trigger cancels the previous in-flight recomputation, then publishes
//!    `calculating = true`.
//! 3. Only a ticket whose generation is still current may publish. It
//!    publishes the cell and then `calculating = false`, exactly once.
//! 4. A superseded or cancelled recomputation publishes nothing.
//! 5. After `dispose`, nothing publishes and no new recomputation starts.

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use parking_lot::{Mutex, ReentrantMutex};

use crate::cancellation::{CancellationSignal, CancellationSource};
use crate::errors::CalculationError;
use crate::observable::subject::ValueSubject;
use crate::observable::Subscription;
use crate::outcome::ValueOrError;
use crate::property::{PropertyId, PropertyValue};

#[derive(Default)]
struct Control {
    generation: u64,
    in_flight: Option<CancellationSource>,
    disposed: bool,
}

/// Permission to publish the result of one recomputation.
#[derive(Debug, Clone)]
pub(crate) struct Ticket {
    generation: u64,
    signal: CancellationSignal,
}

impl Ticket {
    pub(crate) fn generation(&self) -> u64 {
        self.generation
    }

    pub(crate) fn signal(&self) -> &CancellationSignal {
        &self.signal
    }
}

/// What happened to a completed recomputation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Completion {
    Published,
    Superseded,
    Abandoned,
}

pub(crate) struct EngineCore<T> {
    id: PropertyId,
    name: Arc<str>,
    strategy: &'static str,
    cell: ValueSubject<ValueOrError<T>>,
    calculating: ValueSubject<bool>,
    gate: ReentrantMutex<()>,
    control: Mutex<Control>,
    upstream: Mutex<Option<Subscription>>,
}

impl<T: PropertyValue + Default> EngineCore<T> {
    pub(crate) fn new(id: PropertyId, label: Option<&str>, strategy: &'static str) -> Self {
        let name: Arc<str> = match label {
            Some(label) => Arc::from(label),
            None => Arc::from(id.to_string()),
        };
        Self {
            id,
            name,
            strategy,
            cell: ValueSubject::new(ValueOrError::default()),
            calculating: ValueSubject::new(false),
            gate: ReentrantMutex::new(()),
            control: Mutex::new(Control::default()),
            upstream: Mutex::new(None),
        }
    }

    pub(crate) fn id(&self) -> PropertyId {
        self.id
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn cell(&self) -> &ValueSubject<ValueOrError<T>> {
        &self.cell
    }

    pub(crate) fn calculating(&self) -> &ValueSubject<bool> {
        &self.calculating
    }

    /// Keep the upstream combine-latest subscription alive until disposal.
    pub(crate) fn attach_upstream(&self, subscription: Subscription) {
        if self.control.lock().disposed {
            subscription.unsubscribe();
            return;
        }
        *self.upstream.lock() = Some(subscription);
    }

    /// Start a recomputation, superseding any in-flight one.
    ///
    /// Returns `None` once disposed.
    pub(crate) fn begin(&self) -> Option<Ticket> {
        let _gate = self.gate.lock();
        let (ticket, previous) = {
            let mut control = self.control.lock();
            if control.disposed {
                return None;
            }
            control.generation += 1;
            let source = CancellationSource::new();
            let ticket = Ticket {
                generation: control.generation,
                signal: source.signal(),
            };
            (ticket, control.in_flight.replace(source))
        };

        if let Some(previous) = previous {
            previous.cancel();
            tracing::debug!(
                property = %self.name,
                generation = ticket.generation - 1,
                strategy = self.strategy,
                "recomputation superseded"
            );
        }
        if !self.calculating.get() {
            self.calculating.publish(true);
        }
        Some(ticket)
    }

    /// Publish the outcome of the recomputation `ticket` was issued for.
    pub(crate) fn complete(&self, ticket: &Ticket, outcome: Result<T, CalculationError>) -> Completion {
        let _gate = self.gate.lock();
        {
            let mut control = self.control.lock();
            if control.disposed || control.generation != ticket.generation {
                tracing::debug!(
                    property = %self.name,
                    generation = ticket.generation,
                    strategy = self.strategy,
                    "discarding result of superseded recomputation"
                );
                return Completion::Superseded;
            }
            control.in_flight = None;
        }

        match outcome {
            Err(error) if error.is_cancellation() => {
                tracing::debug!(
                    property = %self.name,
                    generation = ticket.generation,
                    strategy = self.strategy,
                    "recomputation abandoned"
                );
                self.calculating.publish(false);
                Completion::Abandoned
            }
            outcome => {
                if let Err(error) = &outcome {
                    tracing::debug!(property = %self.name, error = %error, "calculation failed");
                }
                self.cell.publish(ValueOrError::from(outcome));
                self.calculating.publish(false);
                tracing::trace!(
                    property = %self.name,
                    generation = ticket.generation,
                    strategy = self.strategy,
                    "published"
                );
                Completion::Published
            }
        }
    }

    /// Run `calculation` inline and publish its outcome.
    pub(crate) fn run_inline(&self, calculation: impl FnOnce() -> Result<T, CalculationError>) {
        let Some(ticket) = self.begin() else {
            return;
        };
        let outcome = self.guard(calculation);
        self.complete(&ticket, outcome);
    }

    /// Call `calculation`, turning a panic into a captured error.
    pub(crate) fn guard(
        &self,
        calculation: impl FnOnce() -> Result<T, CalculationError>,
    ) -> Result<T, CalculationError> {
        match catch_unwind(AssertUnwindSafe(calculation)) {
            Ok(outcome) => outcome,
            Err(payload) => Err(self.panicked(payload)),
        }
    }

    pub(crate) fn panicked(&self, payload: Box<dyn std::any::Any + Send>) -> CalculationError {
        let error = CalculationError::panicked(payload);
        tracing::warn!(
            property = %self.name,
            strategy = self.strategy,
            error = %error,
            "calculation panicked"
        );
        error
    }
}

impl<T> EngineCore<T> {
    pub(crate) fn is_disposed(&self) -> bool {
        self.control.lock().disposed
    }

    /// Tear down the upstream subscription and in-flight work, then release
    /// the subjects. Idempotent.
    pub(crate) fn dispose(&self) {
        let _gate = self.gate.lock();
        let in_flight = {
            let mut control = self.control.lock();
            if control.disposed {
                return;
            }
            control.disposed = true;
            control.in_flight.take()
        };
        let upstream = self.upstream.lock().take();
        drop(upstream);
        if let Some(source) = in_flight {
            source.cancel();
        }
        if self.calculating.get() {
            self.calculating.publish(false);
        }
        self.cell.close();
        self.calculating.close();
        tracing::debug!(property = %self.name, strategy = self.strategy, "disposed");
    }
}

impl<T> fmt::Debug for EngineCore<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let control = self.control.lock();
        f.debug_struct("EngineCore")
            .field("property", &self.name)
            .field("strategy", &self.strategy)
            .field("generation", &control.generation)
            .field("disposed", &control.disposed)
            .finish_non_exhaustive()
    }
}
