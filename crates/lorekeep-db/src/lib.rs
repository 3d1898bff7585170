//! `PostgreSQL` persistence for Lorekeep.
//!
//! Provides the durable implementations of the two storage seams: the
//! append-only event log and the projection store.
//!
//! # Architecture
//!
//! ```text
//! Game::record
//!     |
//!     +-- append ----> events                (PgEventStore)
//!     |
//!     +-- apply -----> campaigns, participants, characters,
//!                      sessions, session_gates, session_spotlights,
//!                      campaign_gm_fear, system_character_*
//!                                            (PgProjectionStore)
//! ```
//!
//! # Modules
//!
//! - [`postgres`] -- Connection pool, configuration, embedded migrations
//! - [`event_store`] -- [`PgEventStore`]
//! - [`projection_store`] -- [`PgProjectionStore`]
//! - [`error`] -- Shared error types

pub mod error;
pub mod event_store;
pub mod postgres;
pub mod projection_store;

pub use error::DbError;
pub use event_store::{EventRow, PgEventStore};
pub use postgres::{PostgresConfig, PostgresPool};
pub use projection_store::PgProjectionStore;
