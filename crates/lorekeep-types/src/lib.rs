//! Shared type definitions for Lorekeep.
//!
//! This crate is the single source of truth for the campaign event
//! envelope and every type that crosses a crate boundary in the workspace.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for campaign entities
//! - [`enums`] -- Wire-stable enumerations (statuses, roles, actor types)
//! - [`event`] -- The immutable event envelope and its pre-append form
//! - [`codec`] -- Typed encode/decode of opaque payload bytes
//! - [`payload`] -- Payload schemas for generic campaign events
//! - [`error`] -- The shared error taxonomy

pub mod codec;
pub mod enums;
pub mod error;
pub mod event;
pub mod ids;
pub mod payload;

// Re-export the commonly used types at crate root.
pub use codec::Payload;
pub use enums::{
    ActorType, CampaignStatus, CharacterKind, Controller, GateStatus, GmMode, ParticipantRole,
    SessionStatus, SpotlightType, UnknownVariant,
};
pub use error::{
    BoxError, ConfigurationError, CorruptEventError, DomainError, ErrorKind, InvalidStateError,
    StorageError, ValidationError,
};
pub use event::{Event, NewEvent, entity};
pub use ids::{CampaignId, CharacterId, GateId, ParticipantId, SessionId};
pub use payload::{GenericEvent, event_types};
