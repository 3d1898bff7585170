//! Campaign and session state machine for Lorekeep.
//!
//! Pure domain logic with no I/O: lifecycle legality, validated
//! constructors, GM Fear arithmetic, and the read models the projection
//! engine maintains. Every function here answers from its arguments alone,
//! so callers can validate a command before anything touches the log.
//!
//! # Modules
//!
//! - [`status`] -- Status transitions and per-status operation gating
//! - [`campaign`] -- Campaign read model, creation input, GM Fear
//! - [`participant`] -- Participant seats
//! - [`character`] -- Characters
//! - [`session`] -- Sessions, gates, spotlight

pub mod campaign;
pub mod character;
pub mod participant;
pub mod session;
pub mod status;

pub use campaign::{
    Campaign, CreateCampaignInput, GM_FEAR_CAP, NormalizedCampaign, gain_gm_fear,
    normalize_create_campaign, spend_gm_fear,
};
pub use character::{Character, CreateCharacterInput, NormalizedCharacter, normalize_create_character};
pub use participant::{
    CreateParticipantInput, NormalizedParticipant, Participant, normalize_create_participant,
};
pub use session::{
    Gate, Session, Spotlight, normalize_gate_reason, normalize_gate_type, normalize_session_name,
    normalize_spotlight_type, validate_spotlight_target,
};
pub use status::{
    CampaignOperation, is_legal_transition, is_operation_allowed, validate_campaign_operation,
    validate_transition,
};
