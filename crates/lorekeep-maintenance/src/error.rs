//! Error types for the maintenance tool.

use lorekeep_ledger::LedgerError;
use lorekeep_projection::ApplyError;
use lorekeep_types::{ConfigurationError, ErrorKind, StorageError};

/// Errors that can stop a maintenance run for one campaign, or for the
/// whole invocation when flags are combined illegally.
#[derive(Debug, thiserror::Error)]
pub enum MaintenanceError {
    /// Flags or configuration values are combined illegally.
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigurationError),

    /// Reading the event log failed.
    #[error(transparent)]
    Ledger(#[from] LedgerError),

    /// Replaying an event failed.
    #[error("replay failed: {0}")]
    Apply(#[from] ApplyError),

    /// Reading or clearing projections failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Validation found more invalid events than `--max-invalid` allows.
    #[error("{invalid} invalid events exceed the limit of {max}")]
    TooManyInvalid {
        /// Invalid events found.
        invalid: u64,
        /// Configured limit.
        max: u64,
    },
}

impl MaintenanceError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::Ledger(err) => err.kind(),
            Self::Apply(err) => err.kind(),
            Self::Storage(_) => ErrorKind::Storage,
            Self::TooManyInvalid { .. } => ErrorKind::Validation,
        }
    }
}
