//! Error taxonomy shared by every Lorekeep crate.
//!
//! Pure components (state machine, rules adapter) return only
//! [`ValidationError`] and [`InvalidStateError`]. Storage-facing components
//! wrap backend failures in [`StorageError`] without discarding the cause.
//! [`CorruptEventError`] is raised when a stored payload cannot be decoded
//! during apply or replay, and [`ConfigurationError`] when tooling flags are
//! combined illegally. Each crate exposes its own `thiserror` enum over these
//! and maps it to an [`ErrorKind`] for the request layer.

use std::error::Error as StdError;

/// Boxed, thread-safe error cause.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Coarse error classification used to pick a protocol error code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Bad input. Never retried.
    Validation,
    /// The operation is illegal for the current status.
    InvalidState,
    /// A stored event payload failed structural validation.
    CorruptEvent,
    /// Persistence failed; durability of the write is unknown.
    Storage,
    /// Illegal tooling configuration.
    Configuration,
    /// A requested record does not exist.
    NotFound,
}

/// Bad input, optionally tagged with the offending field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{}{message}", field_prefix(.field.as_deref()))]
pub struct ValidationError {
    /// Name of the offending field, when one can be identified.
    pub field: Option<String>,
    /// Human-readable description.
    pub message: String,
}

fn field_prefix(field: Option<&str>) -> String {
    field.map(|f| format!("{f}: ")).unwrap_or_default()
}

impl ValidationError {
    /// Create an error tagged with a field name.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: Some(field.into()),
            message: message.into(),
        }
    }

    /// Create an error not tied to a single field.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            field: None,
            message: message.into(),
        }
    }

    /// Shorthand for "`field` is required".
    pub fn required(field: &str) -> Self {
        Self::field(field, format!("{field} is required"))
    }
}

/// The operation is not legal for the current state of its target.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct InvalidStateError {
    /// Human-readable description.
    pub message: String,
}

impl InvalidStateError {
    /// Create an invalid-state error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// A stored event payload could not be decoded for its type.
///
/// Fatal for the event being applied: it must surface, never be skipped,
/// because skipping would desynchronize projections from the log.
#[derive(Debug, thiserror::Error)]
#[error("corrupt event seq {seq} ({event_type}): {message}")]
pub struct CorruptEventError {
    /// Sequence number of the event.
    pub seq: u64,
    /// Type tag of the event.
    pub event_type: String,
    /// What failed.
    pub message: String,
}

/// A persistence operation failed. The write may or may not be durable.
#[derive(Debug, thiserror::Error)]
#[error("storage error during {operation}: {source}")]
pub struct StorageError {
    /// The operation that failed (e.g. `"append event"`).
    pub operation: &'static str,
    /// The underlying backend error.
    #[source]
    pub source: BoxError,
}

impl StorageError {
    /// Wrap a backend error.
    pub fn new(operation: &'static str, source: impl Into<BoxError>) -> Self {
        Self {
            operation,
            source: source.into(),
        }
    }
}

/// Illegal combination of tooling flags or configuration values.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message}")]
pub struct ConfigurationError {
    /// Human-readable description.
    pub message: String,
}

impl ConfigurationError {
    /// Create a configuration error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// Error returned by pure domain code: validation or state legality.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DomainError {
    /// Bad input.
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// Operation illegal for the current state.
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),
}

impl DomainError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidState(_) => ErrorKind::InvalidState,
        }
    }
}
