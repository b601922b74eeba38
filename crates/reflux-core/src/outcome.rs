//! ValueOrError<T> - the result cell of a calculation
//!
//! Exactly one case is populated. Consumers must handle both, either through
//! [`ValueOrError::switch`] or a `match`.

use crate::errors::CalculationError;

/// Either a successful calculation result or the captured failure.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueOrError<T> {
    /// The calculation succeeded
    Value(T),
    /// The calculation failed
    Error(CalculationError),
}

impl<T> ValueOrError<T> {
    /// Eliminate the cell, handling both cases.
    pub fn switch<R>(
        self,
        on_value: impl FnOnce(T) -> R,
        on_error: impl FnOnce(CalculationError) -> R,
    ) -> R {
        match self {
            ValueOrError::Value(value) => on_value(value),
            ValueOrError::Error(error) => on_error(error),
        }
    }

    /// Borrow the contents.
    pub fn as_ref(&self) -> ValueOrError<&T> {
        match self {
            ValueOrError::Value(value) => ValueOrError::Value(value),
            ValueOrError::Error(error) => ValueOrError::Error(error.clone()),
        }
    }

    /// The successful value, if any.
    pub fn value(&self) -> Option<&T> {
        match self {
            ValueOrError::Value(value) => Some(value),
            ValueOrError::Error(_) => None,
        }
    }

    /// The captured failure, if any.
    pub fn error(&self) -> Option<&CalculationError> {
        match self {
            ValueOrError::Value(_) => None,
            ValueOrError::Error(error) => Some(error),
        }
    }

    pub fn is_value(&self) -> bool {
        matches!(self, ValueOrError::Value(_))
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ValueOrError::Error(_))
    }

    /// Convert into a `Result`, the Rust spelling of "value or throw".
    pub fn into_result(self) -> Result<T, CalculationError> {
        match self {
            ValueOrError::Value(value) => Ok(value),
            ValueOrError::Error(error) => Err(error),
        }
    }

    /// Map the `Error` case to `T::default()`.
    pub fn value_or_default(self) -> T
    where
        T: Default,
    {
        match self {
            ValueOrError::Value(value) => value,
            ValueOrError::Error(_) => T::default(),
        }
    }

    /// Transform the successful value, keeping errors untouched.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> ValueOrError<U> {
        match self {
            ValueOrError::Value(value) => ValueOrError::Value(f(value)),
            ValueOrError::Error(error) => ValueOrError::Error(error),
        }
    }
}

impl<T: Default> Default for ValueOrError<T> {
    fn default() -> Self {
        ValueOrError::Value(T::default())
    }
}

impl<T> From<Result<T, CalculationError>> for ValueOrError<T> {
    fn from(result: Result<T, CalculationError>) -> Self {
        match result {
            Ok(value) => ValueOrError::Value(value),
            Err(error) => ValueOrError::Error(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_switch_handles_both_cases() {
        let ok: ValueOrError<i32> = ValueOrError::Value(3);
        assert_eq!(ok.switch(|v| v * 2, |_| -1), 6);

        let failed: ValueOrError<i32> = ValueOrError::Error(CalculationError::msg("nope"));
        assert_eq!(failed.switch(|v| v * 2, |_| -1), -1);
    }

    #[test]
    fn test_value_or_default() {
        let failed: ValueOrError<String> = ValueOrError::Error(CalculationError::msg("x"));
        assert_eq!(failed.value_or_default(), "");
        assert_eq!(ValueOrError::Value("a".to_string()).value_or_default(), "a");
    }

    #[test]
    fn test_default_is_default_value() {
        let cell: ValueOrError<u64> = ValueOrError::default();
        assert_eq!(cell, ValueOrError::Value(0));
    }

    #[test]
    fn test_error_equality_is_identity() {
        let error = CalculationError::msg("boom");
        let a: ValueOrError<i32> = ValueOrError::Error(error.clone());
        let b: ValueOrError<i32> = ValueOrError::Error(error);
        let c: ValueOrError<i32> = ValueOrError::Error(CalculationError::msg("boom"));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_result_conversions() {
        let cell = ValueOrError::from(Ok::<i32, CalculationError>(5));
        assert_eq!(cell.clone().into_result().ok(), Some(5));
        assert_eq!(cell.map(|v| v + 1).value(), Some(&6));
    }
}
