//! Errors returned by [`Game`](crate::Game) commands.

use lorekeep_ledger::LedgerError;
use lorekeep_projection::{ApplyError, EventCheckError};
use lorekeep_types::{
    CorruptEventError, DomainError, ErrorKind, InvalidStateError, StorageError, ValidationError,
};

/// Everything a command can fail with.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// Bad input; nothing was appended.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// The command is illegal in the current state; nothing was appended.
    #[error(transparent)]
    InvalidState(#[from] InvalidStateError),

    /// A referenced row does not exist.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Kind of row (`campaign`, `character`, ...).
        entity: &'static str,
        /// The id that was looked up.
        id: String,
    },

    /// The event log rejected the event or failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// An appended event could not be applied. The event is durable; the
    /// projection is behind until a replay catches it up.
    #[error(transparent)]
    Apply(#[from] ApplyError),

    /// Reading projections failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// A system event built by a command does not decode.
    #[error(transparent)]
    Corrupt(#[from] CorruptEventError),

    /// A payload could not be encoded.
    #[error("failed to encode payload: {0}")]
    Encode(#[from] serde_json::Error),

    /// The writer task stopped before reporting. The log may or may not
    /// contain the command's events.
    #[error("writer task aborted: {0}")]
    Aborted(String),
}

impl GameError {
    /// A not-found error for `entity` with `id`.
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Classify this error for the request layer.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::InvalidState(_) => ErrorKind::InvalidState,
            Self::NotFound { .. } => ErrorKind::NotFound,
            Self::Ledger(e) => e.kind(),
            Self::Apply(e) => e.kind(),
            Self::Storage(_) | Self::Aborted(_) => ErrorKind::Storage,
            Self::Corrupt(_) | Self::Encode(_) => ErrorKind::CorruptEvent,
        }
    }
}

impl From<DomainError> for GameError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::Validation(e) => Self::Validation(e),
            DomainError::InvalidState(e) => Self::InvalidState(e),
        }
    }
}

impl From<EventCheckError> for GameError {
    fn from(err: EventCheckError) -> Self {
        match err {
            EventCheckError::Invalid(e) => Self::Validation(e),
            EventCheckError::Corrupt(e) => Self::Corrupt(e),
        }
    }
}
