//! The error type used throughout the crate.
//!
//! `CalcError` is deliberately small: a kind plus an optional message.
//! Errors are first-class in the language — the evaluator wraps them in
//! [`Value::Error`](crate::eval::Value) and propagates them through
//! operators instead of unwinding a document.

use core::fmt;
use std::borrow::Cow;

/// The error kinds a line can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorKind {
    /// No candidate was admitted by the grammar, or all were pruned.
    Parse,
    /// An operation between incompatible dimensions.
    Dimension,
    /// Unknown target unit, or dimension mismatch at a conversion site.
    Conversion,
    DivisionByZero,
    ModuloByZero,
    /// Factorial of a non-integer, logarithm of a non-positive, etc.
    Domain,
    /// An identifier the pruner did not catch.
    UnknownIdentifier,
    UnknownFunction,
    /// Malformed date or invalid timezone.
    Calendar,
    /// An internal invariant was violated.
    Internal,
}

impl ErrorKind {
    fn as_str(self) -> &'static str {
        match self {
            Self::Parse => "ParseError",
            Self::Dimension => "DimensionError",
            Self::Conversion => "ConversionError",
            Self::DivisionByZero => "DivisionByZero",
            Self::ModuloByZero => "ModuloByZero",
            Self::Domain => "DomainError",
            Self::UnknownIdentifier => "UnknownIdentifier",
            Self::UnknownFunction => "UnknownFunction",
            Self::Calendar => "CalendarError",
            Self::Internal => "InternalError",
        }
    }
}

/// The crate's error type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalcError {
    kind: ErrorKind,
    message: Cow<'static, str>,
}

impl CalcError {
    /// Creates an error with the provided kind and an empty message.
    #[must_use]
    pub const fn new(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: Cow::Borrowed(""),
        }
    }

    /// Creates a `ParseError`.
    #[must_use]
    pub const fn parse() -> Self {
        Self::new(ErrorKind::Parse)
    }

    /// Creates a `DimensionError`.
    #[must_use]
    pub const fn dimension() -> Self {
        Self::new(ErrorKind::Dimension)
    }

    /// Creates a `ConversionError`.
    #[must_use]
    pub const fn conversion() -> Self {
        Self::new(ErrorKind::Conversion)
    }

    #[must_use]
    pub const fn division_by_zero() -> Self {
        Self::new(ErrorKind::DivisionByZero)
    }

    #[must_use]
    pub const fn modulo_by_zero() -> Self {
        Self::new(ErrorKind::ModuloByZero)
    }

    /// Creates a `DomainError`.
    #[must_use]
    pub const fn domain() -> Self {
        Self::new(ErrorKind::Domain)
    }

    /// Creates an `UnknownIdentifier` error.
    #[must_use]
    pub const fn unknown_identifier() -> Self {
        Self::new(ErrorKind::UnknownIdentifier)
    }

    /// Creates an `UnknownFunction` error.
    #[must_use]
    pub const fn unknown_function() -> Self {
        Self::new(ErrorKind::UnknownFunction)
    }

    /// Creates a `CalendarError`.
    #[must_use]
    pub const fn calendar() -> Self {
        Self::new(ErrorKind::Calendar)
    }

    /// Creates an `InternalError`. Reaching one of these is a bug.
    #[must_use]
    pub const fn internal() -> Self {
        Self::new(ErrorKind::Internal)
    }

    /// Attaches a message to this error.
    #[must_use]
    pub fn with_message(mut self, message: impl Into<Cow<'static, str>>) -> Self {
        self.message = message.into();
        self
    }

    /// Returns this error's kind.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// Returns this error's message.
    #[must_use]
    pub fn message(&self) -> &str {
        &self.message
    }
}

impl fmt::Display for CalcError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.kind.as_str())?;
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        Ok(())
    }
}

impl std::error::Error for CalcError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_kind_and_message() {
        let err = CalcError::dimension().with_message("cannot add m and kg");
        assert_eq!(err.to_string(), "DimensionError: cannot add m and kg");
        assert_eq!(err.kind(), ErrorKind::Dimension);

        let bare = CalcError::division_by_zero();
        assert_eq!(bare.to_string(), "DivisionByZero");
    }
}
