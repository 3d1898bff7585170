//! Projection engine for Lorekeep.
//!
//! Folds the event log, one event at a time and in sequence order, into
//! queryable current-state views: campaigns, participants, characters,
//! sessions, gates, spotlight, and the per-system rows game system modules
//! maintain.
//!
//! # Architecture
//!
//! - [`store`] -- [`ProjectionStore`] trait and the atomic [`ProjectionBatch`]
//! - [`memory`] -- [`MemoryProjectionStore`]
//! - [`applier`] -- [`Applier`], the handler table and system routing
//! - [`handlers`] -- Handlers for generic event types
//! - [`system`] -- [`SystemAdapter`], the game system seam
//!
//! # Determinism
//!
//! Handlers read only the event and the current rows. Timestamps come from
//! the event envelope, never a clock, and counters are recomputed from rows
//! instead of incremented, so replaying the whole log into empty storage
//! yields the same views as applying it incrementally.

pub mod applier;
pub mod handlers;
pub mod memory;
pub mod store;
pub mod system;

pub use applier::Applier;
pub use memory::MemoryProjectionStore;
pub use store::{ProjectionBatch, ProjectionStore, ProjectionWrite, SystemRow};
pub use system::{EventCheckError, SystemAdapter};

use lorekeep_types::{CorruptEventError, ErrorKind, Event, StorageError};

/// Errors returned while applying an event.
#[derive(Debug, thiserror::Error)]
pub enum ApplyError {
    /// The stored payload is undecodable or references rows that the log
    /// never created. Fatal for this event; it must not be skipped.
    #[error(transparent)]
    Corrupt(#[from] CorruptEventError),

    /// The projection store failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl ApplyError {
    /// Classify this error for the request layer.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Corrupt(_) => ErrorKind::CorruptEvent,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }

    /// A corrupt-event error for `event` with the given message.
    pub fn corrupt(event: &Event, message: impl Into<String>) -> Self {
        Self::Corrupt(CorruptEventError {
            seq: event.seq,
            event_type: event.event_type.clone(),
            message: message.into(),
        })
    }
}
