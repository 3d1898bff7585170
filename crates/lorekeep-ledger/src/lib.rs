//! Append-only event log for Lorekeep campaigns.
//!
//! Every fact about a campaign is recorded here as an immutable
//! [`Event`](lorekeep_types::Event). Events are partitioned by campaign and
//! numbered with a gap-free, 1-based sequence assigned at append time. The
//! log is the write path and the single source of truth; every projection
//! is derived from it.
//!
//! # Architecture
//!
//! - [`store`] -- The [`EventStore`] trait and append-time validation.
//! - [`memory`] -- [`MemoryEventStore`], the in-process implementation.
//! - [`cursor`] -- [`EventCursor`], a restartable pager over a campaign.
//!
//! The `PostgreSQL` implementation lives in `lorekeep-db`.
//!
//! # Invariants
//!
//! - Sequence numbers per campaign are `1, 2, 3, ...` with no gaps.
//! - Appends to one campaign are linearized; the store never hands out the
//!   same sequence twice.
//! - There is no update or delete operation.

pub mod cursor;
pub mod memory;
pub mod store;

pub use cursor::EventCursor;
pub use memory::MemoryEventStore;
pub use store::{EventStore, validate_new_event};

use lorekeep_types::{ErrorKind, StorageError, ValidationError};

/// Errors returned by [`EventStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    /// The event was rejected before anything was written.
    #[error("invalid event: {0}")]
    Validation(#[from] ValidationError),

    /// The backend failed. The write may or may not be durable.
    #[error(transparent)]
    Storage(#[from] StorageError),
}

impl LedgerError {
    /// Classify this error for the request layer.
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Validation(_) => ErrorKind::Validation,
            Self::Storage(_) => ErrorKind::Storage,
        }
    }
}
