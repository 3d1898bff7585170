//! The seam between the generic engine and game system rules.
//!
//! Events whose envelope carries a non-blank `system_id` are owned by a
//! game system module. The [`Applier`](crate::Applier) routes them to the
//! [`SystemAdapter`] registered under that id.

use async_trait::async_trait;

use lorekeep_types::{CorruptEventError, ErrorKind, Event, ValidationError};

use crate::ApplyError;
use crate::store::ProjectionStore;

/// Why a system event failed validation.
#[derive(Debug, thiserror::Error)]
pub enum EventCheckError {
    /// The payload does not decode for its type.
    #[error(transparent)]
    Corrupt(#[from] CorruptEventError),

    /// The payload decodes but breaks a rule of the system.
    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

impl EventCheckError {
    /// Classify this error.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Corrupt(_) => ErrorKind::CorruptEvent,
            Self::Invalid(_) => ErrorKind::Validation,
        }
    }
}

/// A game system module plugged into the projection engine.
#[async_trait]
pub trait SystemAdapter: Send + Sync {
    /// The `system_id` this adapter owns.
    fn system_id(&self) -> &'static str;

    /// The version stamped on events this adapter emits.
    fn system_version(&self) -> &'static str;

    /// Check a stored system event against the system's rules without
    /// applying it. Event types the adapter does not know are accepted.
    ///
    /// # Errors
    ///
    /// Returns [`EventCheckError`] describing the first rule broken.
    fn validate(&self, event: &Event) -> Result<(), EventCheckError>;

    /// Fold one system event into the system's projection rows.
    ///
    /// Must be deterministic: the same event applied to the same rows
    /// always produces the same writes. Unknown event types are a no-op.
    ///
    /// # Errors
    ///
    /// [`ApplyError::Corrupt`] for undecodable payloads,
    /// [`ApplyError::Storage`] for store failures.
    async fn apply(&self, store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError>;
}
