//! Payload schemas for generic (system-agnostic) campaign events.
//!
//! Every payload struct is bound to one event type tag through
//! [`Payload`]. [`GenericEvent`] is the closed set of generic payloads the
//! projection engine understands; anything else decodes to `None` and is
//! left to a game system module or ignored.
//!
//! Optional fields on update payloads mean "unchanged" when absent.

use serde::{Deserialize, Serialize};

use crate::codec::{self, Payload};
use crate::enums::{CampaignStatus, CharacterKind, Controller, GmMode, ParticipantRole, SpotlightType};
use crate::error::CorruptEventError;
use crate::event::Event;
use crate::ids::{CharacterId, GateId, ParticipantId, SessionId};

/// Event type tags for generic events.
pub mod event_types {
    /// A campaign was created in draft status.
    pub const CAMPAIGN_CREATED: &str = "campaign.created";
    /// Campaign metadata or status changed.
    pub const CAMPAIGN_UPDATED: &str = "campaign.updated";
    /// A participant joined the campaign.
    pub const PARTICIPANT_JOINED: &str = "participant.joined";
    /// A participant's seat metadata changed.
    pub const PARTICIPANT_UPDATED: &str = "participant.updated";
    /// A participant left the campaign.
    pub const PARTICIPANT_LEFT: &str = "participant.left";
    /// A character was created.
    pub const CHARACTER_CREATED: &str = "character.created";
    /// A character's generic profile changed.
    pub const CHARACTER_UPDATED: &str = "character.updated";
    /// A character was removed from play.
    pub const CHARACTER_DELETED: &str = "character.deleted";
    /// A play session started.
    pub const SESSION_STARTED: &str = "session.started";
    /// A play session ended.
    pub const SESSION_ENDED: &str = "session.ended";
    /// A session gate was opened.
    pub const SESSION_GATE_OPENED: &str = "session.gate_opened";
    /// A session gate was resolved.
    pub const SESSION_GATE_RESOLVED: &str = "session.gate_resolved";
    /// A session gate was abandoned.
    pub const SESSION_GATE_ABANDONED: &str = "session.gate_abandoned";
    /// The session spotlight moved.
    pub const SESSION_SPOTLIGHT_SET: &str = "session.spotlight_set";
    /// The session spotlight was cleared.
    pub const SESSION_SPOTLIGHT_CLEARED: &str = "session.spotlight_cleared";
}

/// Binds a payload struct to its event type tag.
macro_rules! bind_payload {
    ($ty:ty => $tag:expr) => {
        impl Payload for $ty {
            const EVENT_TYPE: &'static str = $tag;
        }
    };
}

/// Payload of `campaign.created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCreated {
    /// Campaign display name.
    pub name: String,
    /// Game system the campaign is played with (e.g. `daggerheart`).
    pub game_system: String,
    /// How the GM seat is filled.
    pub gm_mode: GmMode,
    /// Free-form theme prompt.
    #[serde(default)]
    pub theme_prompt: String,
}

/// Payload of `campaign.updated`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignUpdated {
    /// New name, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New theme prompt, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub theme_prompt: Option<String>,
    /// New status, if changed. Legality is checked before append.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<CampaignStatus>,
}

/// Payload of `participant.joined`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantJoined {
    /// The new participant.
    pub participant_id: ParticipantId,
    /// Display name.
    pub display_name: String,
    /// GM or player.
    pub role: ParticipantRole,
    /// Human or AI seat.
    pub controller: Controller,
}

/// Payload of `participant.updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantUpdated {
    /// The participant being changed.
    pub participant_id: ParticipantId,
    /// New display name, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// New role, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<ParticipantRole>,
    /// New controller, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub controller: Option<Controller>,
}

/// Payload of `participant.left`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParticipantLeft {
    /// The departing participant.
    pub participant_id: ParticipantId,
    /// Optional free-form reason.
    #[serde(default)]
    pub reason: String,
}

/// Payload of `character.created`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterCreated {
    /// The new character.
    pub character_id: CharacterId,
    /// Character name.
    pub name: String,
    /// PC or NPC.
    pub kind: CharacterKind,
    /// Free-form notes.
    #[serde(default)]
    pub notes: String,
    /// Participant controlling the character, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participant_id: Option<ParticipantId>,
}

/// Payload of `character.updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterUpdated {
    /// The character being changed.
    pub character_id: CharacterId,
    /// New name, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// New kind, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<CharacterKind>,
    /// New notes, if changed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Payload of `character.deleted`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterDeleted {
    /// The character being removed.
    pub character_id: CharacterId,
    /// Optional free-form reason.
    #[serde(default)]
    pub reason: String,
}

/// Payload of `session.started`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStarted {
    /// The new session.
    pub session_id: SessionId,
    /// Session name.
    #[serde(default)]
    pub name: String,
}

/// Payload of `session.ended`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionEnded {
    /// The session being ended.
    pub session_id: SessionId,
}

/// Payload of `session.gate_opened`. The session comes from the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateOpened {
    /// The new gate.
    pub gate_id: GateId,
    /// Normalized (lower-case) gate type.
    pub gate_type: String,
    /// Trimmed reason.
    #[serde(default)]
    pub reason: String,
}

/// Payload of `session.gate_resolved`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateResolved {
    /// The gate being resolved.
    pub gate_id: GateId,
    /// Free-form resolution summary.
    #[serde(default)]
    pub resolution: String,
}

/// Payload of `session.gate_abandoned`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GateAbandoned {
    /// The gate being abandoned.
    pub gate_id: GateId,
    /// Trimmed reason.
    #[serde(default)]
    pub reason: String,
}

/// Payload of `session.spotlight_set`. The session comes from the envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotlightSet {
    /// Who holds the spotlight.
    pub spotlight_type: SpotlightType,
    /// The character, for character spotlights.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_id: Option<CharacterId>,
}

/// Payload of `session.spotlight_cleared`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SpotlightCleared {
    /// Optional free-form reason.
    #[serde(default)]
    pub reason: String,
}

bind_payload!(CampaignCreated => event_types::CAMPAIGN_CREATED);
bind_payload!(CampaignUpdated => event_types::CAMPAIGN_UPDATED);
bind_payload!(ParticipantJoined => event_types::PARTICIPANT_JOINED);
bind_payload!(ParticipantUpdated => event_types::PARTICIPANT_UPDATED);
bind_payload!(ParticipantLeft => event_types::PARTICIPANT_LEFT);
bind_payload!(CharacterCreated => event_types::CHARACTER_CREATED);
bind_payload!(CharacterUpdated => event_types::CHARACTER_UPDATED);
bind_payload!(CharacterDeleted => event_types::CHARACTER_DELETED);
bind_payload!(SessionStarted => event_types::SESSION_STARTED);
bind_payload!(SessionEnded => event_types::SESSION_ENDED);
bind_payload!(GateOpened => event_types::SESSION_GATE_OPENED);
bind_payload!(GateResolved => event_types::SESSION_GATE_RESOLVED);
bind_payload!(GateAbandoned => event_types::SESSION_GATE_ABANDONED);
bind_payload!(SpotlightSet => event_types::SESSION_SPOTLIGHT_SET);
bind_payload!(SpotlightCleared => event_types::SESSION_SPOTLIGHT_CLEARED);

/// The closed set of generic event payloads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GenericEvent {
    /// `campaign.created`
    CampaignCreated(CampaignCreated),
    /// `campaign.updated`
    CampaignUpdated(CampaignUpdated),
    /// `participant.joined`
    ParticipantJoined(ParticipantJoined),
    /// `participant.updated`
    ParticipantUpdated(ParticipantUpdated),
    /// `participant.left`
    ParticipantLeft(ParticipantLeft),
    /// `character.created`
    CharacterCreated(CharacterCreated),
    /// `character.updated`
    CharacterUpdated(CharacterUpdated),
    /// `character.deleted`
    CharacterDeleted(CharacterDeleted),
    /// `session.started`
    SessionStarted(SessionStarted),
    /// `session.ended`
    SessionEnded(SessionEnded),
    /// `session.gate_opened`
    GateOpened(GateOpened),
    /// `session.gate_resolved`
    GateResolved(GateResolved),
    /// `session.gate_abandoned`
    GateAbandoned(GateAbandoned),
    /// `session.spotlight_set`
    SpotlightSet(SpotlightSet),
    /// `session.spotlight_cleared`
    SpotlightCleared(SpotlightCleared),
}

impl GenericEvent {
    /// Decode a stored event into a generic payload.
    ///
    /// Returns `Ok(None)` for event types this enum does not cover.
    ///
    /// # Errors
    ///
    /// Returns [`CorruptEventError`] if the type is known but the bytes do
    /// not decode.
    pub fn decode(event: &Event) -> Result<Option<Self>, CorruptEventError> {
        use event_types as t;

        let decoded = match event.event_type.as_str() {
            t::CAMPAIGN_CREATED => Self::CampaignCreated(codec::decode(event)?),
            t::CAMPAIGN_UPDATED => Self::CampaignUpdated(codec::decode(event)?),
            t::PARTICIPANT_JOINED => Self::ParticipantJoined(codec::decode(event)?),
            t::PARTICIPANT_UPDATED => Self::ParticipantUpdated(codec::decode(event)?),
            t::PARTICIPANT_LEFT => Self::ParticipantLeft(codec::decode(event)?),
            t::CHARACTER_CREATED => Self::CharacterCreated(codec::decode(event)?),
            t::CHARACTER_UPDATED => Self::CharacterUpdated(codec::decode(event)?),
            t::CHARACTER_DELETED => Self::CharacterDeleted(codec::decode(event)?),
            t::SESSION_STARTED => Self::SessionStarted(codec::decode(event)?),
            t::SESSION_ENDED => Self::SessionEnded(codec::decode(event)?),
            t::SESSION_GATE_OPENED => Self::GateOpened(codec::decode(event)?),
            t::SESSION_GATE_RESOLVED => Self::GateResolved(codec::decode(event)?),
            t::SESSION_GATE_ABANDONED => Self::GateAbandoned(codec::decode(event)?),
            t::SESSION_SPOTLIGHT_SET => Self::SpotlightSet(codec::decode(event)?),
            t::SESSION_SPOTLIGHT_CLEARED => Self::SpotlightCleared(codec::decode(event)?),
            _ => return Ok(None),
        };
        Ok(Some(decoded))
    }
}
