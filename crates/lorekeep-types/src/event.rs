//! The event envelope: the immutable record format of the campaign log.
//!
//! A [`NewEvent`] is what a caller hands to the log; the log assigns the
//! next per-campaign sequence number and returns the stored [`Event`].
//! Stored events are never updated or deleted.
//!
//! The timestamp is supplied by the caller rather than read from a clock at
//! append time, so that applying an event never consults anything outside
//! the event itself.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::codec::{self, Payload};
use crate::enums::ActorType;
use crate::ids::{CampaignId, SessionId};

/// Entity type tags used in the envelope's `entity_type` field.
pub mod entity {
    /// The campaign itself.
    pub const CAMPAIGN: &str = "campaign";
    /// A participant seat.
    pub const PARTICIPANT: &str = "participant";
    /// A character.
    pub const CHARACTER: &str = "character";
    /// A play session.
    pub const SESSION: &str = "session";
    /// A session gate.
    pub const GATE: &str = "gate";
}

/// An event that has not yet been appended to the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewEvent {
    /// Partition key.
    pub campaign_id: CampaignId,
    /// When the fact happened (UTC), supplied by the caller.
    pub timestamp: DateTime<Utc>,
    /// Payload schema tag.
    pub event_type: String,
    /// Session the event belongs to, if any.
    pub session_id: Option<SessionId>,
    /// Caller-supplied request correlation id.
    pub request_id: String,
    /// Caller-supplied tool/agent invocation id.
    pub invocation_id: String,
    /// Who caused the event.
    pub actor_type: ActorType,
    /// Identity of the actor, if any.
    pub actor_id: Option<String>,
    /// Kind of entity the event is about.
    pub entity_type: String,
    /// Id of the entity the event is about.
    pub entity_id: String,
    /// Game system that owns the payload schema (empty for generic events).
    pub system_id: String,
    /// Version of the owning game system module.
    pub system_version: String,
    /// Opaque payload bytes, schema keyed by `event_type`.
    pub payload: Vec<u8>,
}

impl NewEvent {
    /// Start a new system-actor event with an empty payload.
    pub fn new(campaign_id: CampaignId, event_type: impl Into<String>, timestamp: DateTime<Utc>) -> Self {
        Self {
            campaign_id,
            timestamp,
            event_type: event_type.into(),
            session_id: None,
            request_id: String::new(),
            invocation_id: String::new(),
            actor_type: ActorType::System,
            actor_id: None,
            entity_type: String::new(),
            entity_id: String::new(),
            system_id: String::new(),
            system_version: String::new(),
            payload: Vec::new(),
        }
    }

    /// Start a new event from a typed payload, setting type and bytes.
    ///
    /// # Errors
    ///
    /// Returns the serializer error if the payload cannot be encoded.
    pub fn from_payload<P: Payload>(
        campaign_id: CampaignId,
        payload: &P,
        timestamp: DateTime<Utc>,
    ) -> Result<Self, serde_json::Error> {
        let bytes = codec::encode(payload)?;
        let mut event = Self::new(campaign_id, P::EVENT_TYPE, timestamp);
        event.payload = bytes;
        Ok(event)
    }

    /// Attach the session this event belongs to.
    #[must_use]
    pub fn with_session(mut self, session_id: Option<SessionId>) -> Self {
        self.session_id = session_id;
        self
    }

    /// Attach the actor that caused this event.
    #[must_use]
    pub fn with_actor(mut self, actor_type: ActorType, actor_id: Option<String>) -> Self {
        self.actor_type = actor_type;
        self.actor_id = actor_id;
        self
    }

    /// Attach the entity this event is about.
    #[must_use]
    pub fn with_entity(mut self, entity_type: &str, entity_id: impl ToString) -> Self {
        entity_type.clone_into(&mut self.entity_type);
        self.entity_id = entity_id.to_string();
        self
    }

    /// Mark this event as owned by a game system module.
    #[must_use]
    pub fn with_system(mut self, system_id: &str, system_version: &str) -> Self {
        system_id.clone_into(&mut self.system_id);
        system_version.clone_into(&mut self.system_version);
        self
    }

    /// Attach caller correlation ids.
    #[must_use]
    pub fn with_correlation(mut self, request_id: impl Into<String>, invocation_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self.invocation_id = invocation_id.into();
        self
    }

    /// Turn this into a stored event with the given sequence number.
    pub fn into_stored(self, seq: u64) -> Event {
        Event {
            campaign_id: self.campaign_id,
            seq,
            timestamp: self.timestamp,
            event_type: self.event_type,
            session_id: self.session_id,
            request_id: self.request_id,
            invocation_id: self.invocation_id,
            actor_type: self.actor_type,
            actor_id: self.actor_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            system_id: self.system_id,
            system_version: self.system_version,
            payload: self.payload,
        }
    }
}

/// An event as stored in the log. Immutable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Partition key.
    pub campaign_id: CampaignId,
    /// Monotonic, gap-free, 1-based position within the campaign.
    pub seq: u64,
    /// When the fact happened (UTC).
    pub timestamp: DateTime<Utc>,
    /// Payload schema tag.
    pub event_type: String,
    /// Session the event belongs to, if any.
    pub session_id: Option<SessionId>,
    /// Caller-supplied request correlation id.
    pub request_id: String,
    /// Caller-supplied tool/agent invocation id.
    pub invocation_id: String,
    /// Who caused the event.
    pub actor_type: ActorType,
    /// Identity of the actor, if any.
    pub actor_id: Option<String>,
    /// Kind of entity the event is about.
    pub entity_type: String,
    /// Id of the entity the event is about.
    pub entity_id: String,
    /// Game system that owns the payload schema (empty for generic events).
    pub system_id: String,
    /// Version of the owning game system module.
    pub system_version: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

impl Event {
    /// Whether this event belongs to a game system module.
    ///
    /// These are the "snapshot-relevant" events the integrity tooling
    /// replays: everything needed to rebuild system character state.
    pub fn is_system_event(&self) -> bool {
        !self.system_id.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_envelope_fields() {
        let campaign = CampaignId::new();
        let session = SessionId::new();
        let event = NewEvent::new(campaign, "test.event", Utc::now())
            .with_session(Some(session))
            .with_actor(ActorType::Gm, Some("gm-1".to_owned()))
            .with_entity(entity::CHARACTER, "ch-1")
            .with_system("daggerheart", "1.0.0")
            .with_correlation("req-1", "inv-1")
            .into_stored(7);

        assert_eq!(event.seq, 7);
        assert_eq!(event.session_id, Some(session));
        assert_eq!(event.actor_type, ActorType::Gm);
        assert_eq!(event.entity_type, "character");
        assert_eq!(event.request_id, "req-1");
        assert!(event.is_system_event());
    }

    #[test]
    fn whitespace_system_id_is_generic() {
        let event = NewEvent::new(CampaignId::new(), "x", Utc::now())
            .with_system("   ", "")
            .into_stored(1);
        assert!(!event.is_system_event());
    }
}
