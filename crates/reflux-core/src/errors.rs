//! Error types for reflux
//!
//! Two kinds of failure flow through the library and they are kept apart on
//! purpose:
//!
//! - [`PropertyError`]: contract violations and infrastructure failures. These
//!   surface immediately at the call site as `Err` values.
//! - [`CalculationError`]: a failure captured at a calculation boundary. These
//!   never unwind through subscriptions; they become data (the `Error` case of
//!   [`ValueOrError`](crate::ValueOrError)) and travel through the error streams.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// Errors raised directly to the caller of a reflux operation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PropertyError {
    /// The operation is not valid in the current state (contract violation)
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// What was misused
        message: String,
    },

    /// Structured serialization of reconstructable state failed
    #[error("Serialization error: {message}")]
    Serialization {
        /// Error message describing the serialization failure
        message: String,
    },

    /// Configuration could not be loaded or failed validation
    #[error("Configuration error: {message}")]
    Config {
        /// Error message describing the configuration problem
        message: String,
    },

    /// The property has already been disposed
    #[error("Property disposed: {property}")]
    Disposed {
        /// Label or id of the disposed property
        property: String,
    },
}

impl PropertyError {
    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Create a serialization error
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a disposed error
    pub fn disposed(property: impl Into<String>) -> Self {
        Self::Disposed {
            property: property.into(),
        }
    }
}

impl From<serde_json::Error> for PropertyError {
    fn from(err: serde_json::Error) -> Self {
        PropertyError::serialization(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum CalculationErrorKind {
    Failed,
    Panicked,
    Cancelled,
}

/// Marker error stored inside cancellation [`CalculationError`]s.
#[derive(Debug, thiserror::Error)]
#[error("calculation cancelled")]
pub struct Cancelled;

/// Message carried by a panic captured at a calculation boundary.
#[derive(Debug, thiserror::Error)]
#[error("calculation panicked: {0}")]
pub struct CalculationPanic(pub String);

/// A failure captured from a calculation function.
///
/// Cloning is cheap and preserves identity: every clone refers to the same
/// captured error instance, and equality is instance identity. A calculated
/// property that republishes the same failure is therefore deduplicated by its
/// `changed` streams, while two separate failures are not, even if their
/// messages match.
///
/// Any `std::error::Error + Send + Sync + 'static` converts into a
/// `CalculationError` with `?`.
#[derive(Clone)]
pub struct CalculationError {
    inner: Arc<dyn std::error::Error + Send + Sync + 'static>,
    kind: CalculationErrorKind,
}

impl CalculationError {
    /// Capture an error value.
    pub fn new<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(error),
            kind: CalculationErrorKind::Failed,
        }
    }

    /// Capture an already boxed error.
    pub fn from_boxed(error: Box<dyn std::error::Error + Send + Sync + 'static>) -> Self {
        Self {
            inner: Arc::from(error),
            kind: CalculationErrorKind::Failed,
        }
    }

    /// Capture a plain message.
    pub fn msg(message: impl Into<String>) -> Self {
        let message: String = message.into();
        Self::from_boxed(message.into())
    }

    /// The error produced by a cooperative cancellation checkpoint.
    pub fn cancelled() -> Self {
        Self {
            inner: Arc::new(Cancelled),
            kind: CalculationErrorKind::Cancelled,
        }
    }

    /// Convert a panic payload caught at a calculation boundary.
    pub fn panicked(payload: Box<dyn Any + Send>) -> Self {
        let message = if let Some(s) = payload.downcast_ref::<&'static str>() {
            (*s).to_string()
        } else if let Some(s) = payload.downcast_ref::<String>() {
            s.clone()
        } else {
            "non-string panic payload".to_string()
        };
        Self {
            inner: Arc::new(CalculationPanic(message)),
            kind: CalculationErrorKind::Panicked,
        }
    }

    /// Whether this error came from a cooperative cancellation checkpoint.
    pub fn is_cancellation(&self) -> bool {
        self.kind == CalculationErrorKind::Cancelled
    }

    /// Whether this error was a panic caught at the calculation boundary.
    pub fn is_panic(&self) -> bool {
        self.kind == CalculationErrorKind::Panicked
    }

    /// Borrow the captured error.
    pub fn get_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }

    /// Attempt to view the captured error as a concrete type.
    pub fn downcast_ref<E>(&self) -> Option<&E>
    where
        E: std::error::Error + 'static,
    {
        self.inner.downcast_ref::<E>()
    }

    /// Whether two handles refer to the same captured instance.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<E> From<E> for CalculationError
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn from(error: E) -> Self {
        Self::new(error)
    }
}

impl PartialEq for CalculationError {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl fmt::Display for CalculationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.inner, f)
    }
}

impl fmt::Debug for CalculationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CalculationError")
            .field("kind", &self.kind)
            .field("error", &self.inner)
            .finish()
    }
}

impl AsRef<dyn std::error::Error + Send + Sync + 'static> for CalculationError {
    fn as_ref(&self) -> &(dyn std::error::Error + Send + Sync + 'static) {
        self.inner.as_ref()
    }
}
