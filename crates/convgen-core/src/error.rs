//! Error types for the Convgen core library
//!
//! Every failure in the engine is a static defect in the input declaration.
//! Generation never retries and never warns-and-continues: the first error
//! aborts the whole run, carrying enough context (method, field, shapes) for
//! the user to fix the declaration.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Main error type for Convgen operations
#[derive(Error, Debug)]
pub enum Error {
    /// A destination field has no resolvable source member
    #[error("No mapping found for field '{field}' in {method}: {message}")]
    NoMappingFound {
        method: String,
        field: String,
        message: String,
    },

    /// Source and destination disagree and nothing bridges them
    #[error("No conversion path for '{field}' in {method}: cannot convert {from} to {to}")]
    NoConversionPath {
        method: String,
        field: String,
        from: String,
        to: String,
        reason: Option<String>,
    },

    /// An optional value would flow into a required slot without a guard
    #[error("Unsafe narrowing for '{field}' in {method}: {from} may be absent but {to} is required")]
    UnsafeNarrowing {
        method: String,
        field: String,
        from: String,
        to: String,
    },

    /// Scalar/collection disagreement without an aggregating or expanding operation
    #[error("Multiplicity mismatch for '{field}' in {method}: cannot convert {from} to {to}")]
    MultiplicityMismatch {
        method: String,
        field: String,
        from: String,
        to: String,
    },

    /// A method cannot surface a failure that one of its fields requires
    #[error("Method {method} must declare an error result: field '{field}' can fail")]
    FallibleWithoutErrorSignature { method: String, field: String },

    /// Malformed field annotation
    #[error("Invalid directive {tag:?}: {reason}")]
    InvalidDirective { tag: String, reason: String },

    /// A name in the input does not exist in the catalog
    #[error("Unresolved reference '{reference}'{}: {reason}", location(.method, .field))]
    UnresolvedReference {
        reference: String,
        reason: String,
        /// Interface method whose resolution needed the name; empty when
        /// raised outside generation
        method: String,
        field: String,
    },

    /// Malformed declaration document
    #[error("Declaration error: {message}")]
    Declaration {
        message: String,
        #[source]
        source: Option<anyhow::Error>,
    },

    /// JSON parsing and serialization errors
    #[error("JSON error: {message}")]
    Json {
        message: String,
        #[source]
        source: serde_json::Error,
    },

    /// IO errors
    #[error("IO error: {message}")]
    Io {
        message: String,
        #[source]
        source: std::io::Error,
    },

    /// Generic internal error with context
    #[error("Internal error: {message}")]
    Internal {
        message: String,
        #[source]
        source: anyhow::Error,
    },
}

/// Convenience type alias for Results using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Closed classification of [`Error`] variants
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    NoMappingFound,
    NoConversionPath,
    UnsafeNarrowing,
    MultiplicityMismatch,
    FallibleWithoutErrorSignature,
    InvalidDirective,
    UnresolvedReference,
    Declaration,
    Json,
    Io,
    Internal,
}

impl ErrorKind {
    /// Whether this kind is one of the generation-time validation failures
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            ErrorKind::NoMappingFound
                | ErrorKind::NoConversionPath
                | ErrorKind::UnsafeNarrowing
                | ErrorKind::MultiplicityMismatch
                | ErrorKind::FallibleWithoutErrorSignature
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NoMappingFound => "NoMappingFound",
            ErrorKind::NoConversionPath => "NoConversionPath",
            ErrorKind::UnsafeNarrowing => "UnsafeNarrowing",
            ErrorKind::MultiplicityMismatch => "MultiplicityMismatch",
            ErrorKind::FallibleWithoutErrorSignature => "FallibleWithoutErrorSignature",
            ErrorKind::InvalidDirective => "InvalidDirective",
            ErrorKind::UnresolvedReference => "UnresolvedReference",
            ErrorKind::Declaration => "Declaration",
            ErrorKind::Json => "Json",
            ErrorKind::Io => "Io",
            ErrorKind::Internal => "Internal",
        };
        f.write_str(name)
    }
}

impl Error {
    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::NoMappingFound { .. } => ErrorKind::NoMappingFound,
            Error::NoConversionPath { .. } => ErrorKind::NoConversionPath,
            Error::UnsafeNarrowing { .. } => ErrorKind::UnsafeNarrowing,
            Error::MultiplicityMismatch { .. } => ErrorKind::MultiplicityMismatch,
            Error::FallibleWithoutErrorSignature { .. } => ErrorKind::FallibleWithoutErrorSignature,
            Error::InvalidDirective { .. } => ErrorKind::InvalidDirective,
            Error::UnresolvedReference { .. } => ErrorKind::UnresolvedReference,
            Error::Declaration { .. } => ErrorKind::Declaration,
            Error::Json { .. } => ErrorKind::Json,
            Error::Io { .. } => ErrorKind::Io,
            Error::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Create a declaration error without an underlying cause
    pub fn declaration(message: impl Into<String>) -> Self {
        Error::Declaration {
            message: message.into(),
            source: None,
        }
    }

    /// Create an unresolved-reference error; generation fills in the
    /// method and field while the error bubbles up
    pub fn unresolved(reference: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::UnresolvedReference {
            reference: reference.into(),
            reason: reason.into(),
            method: String::new(),
            field: String::new(),
        }
    }

    /// Attach the owning method name to a validation error.
    ///
    /// Errors raised below the assembly layer do not know which interface
    /// method they belong to; the name is filled in while bubbling up. An
    /// already-set method name is kept.
    pub fn in_method(mut self, name: &str) -> Self {
        if let Some(slot) = self.method_slot() {
            if slot.is_empty() {
                *slot = name.to_string();
            }
        }
        self
    }

    /// Prefix the field path of a validation error, e.g. `Address` + `Street`
    /// becomes `Address.Street`.
    pub fn in_field(mut self, name: &str) -> Self {
        if let Some(slot) = self.field_slot() {
            *slot = if slot.is_empty() {
                name.to_string()
            } else {
                format!("{}.{}", name, slot)
            };
        }
        self
    }

    /// The method this error is attributed to, when known
    pub fn method(&self) -> Option<&str> {
        match self {
            Error::NoMappingFound { method, .. }
            | Error::NoConversionPath { method, .. }
            | Error::UnsafeNarrowing { method, .. }
            | Error::MultiplicityMismatch { method, .. }
            | Error::FallibleWithoutErrorSignature { method, .. }
            | Error::UnresolvedReference { method, .. } => {
                Some(method.as_str()).filter(|m| !m.is_empty())
            }
            _ => None,
        }
    }

    /// The field path this error is attributed to, when known
    pub fn field(&self) -> Option<&str> {
        match self {
            Error::NoMappingFound { field, .. }
            | Error::NoConversionPath { field, .. }
            | Error::UnsafeNarrowing { field, .. }
            | Error::MultiplicityMismatch { field, .. }
            | Error::FallibleWithoutErrorSignature { field, .. }
            | Error::UnresolvedReference { field, .. } => {
                Some(field.as_str()).filter(|f| !f.is_empty())
            }
            _ => None,
        }
    }

    fn method_slot(&mut self) -> Option<&mut String> {
        match self {
            Error::NoMappingFound { method, .. }
            | Error::NoConversionPath { method, .. }
            | Error::UnsafeNarrowing { method, .. }
            | Error::MultiplicityMismatch { method, .. }
            | Error::FallibleWithoutErrorSignature { method, .. }
            | Error::UnresolvedReference { method, .. } => Some(method),
            _ => None,
        }
    }

    fn field_slot(&mut self) -> Option<&mut String> {
        match self {
            Error::NoMappingFound { field, .. }
            | Error::NoConversionPath { field, .. }
            | Error::UnsafeNarrowing { field, .. }
            | Error::MultiplicityMismatch { field, .. }
            | Error::FallibleWithoutErrorSignature { field, .. }
            | Error::UnresolvedReference { field, .. } => Some(field),
            _ => None,
        }
    }
}

/// ` for 'Field' in Method`, or whichever part is known
fn location(method: &str, field: &str) -> String {
    match (method.is_empty(), field.is_empty()) {
        (true, true) => String::new(),
        (true, false) => format!(" for '{}'", field),
        (false, true) => format!(" in {}", method),
        (false, false) => format!(" for '{}' in {}", field, method),
    }
}

// Conversion implementations
impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::Json {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Io {
            message: err.to_string(),
            source: err,
        }
    }
}

impl From<anyhow::Error> for Error {
    fn from(err: anyhow::Error) -> Self {
        Error::Internal {
            message: err.to_string(),
            source: err,
        }
    }
}
