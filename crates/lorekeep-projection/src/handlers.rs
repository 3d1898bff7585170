//! Handlers for generic (system-agnostic) event types.
//!
//! Each handler decodes its payload, reads the rows it needs, and commits a
//! single [`ProjectionBatch`]. References to rows the log never created are
//! reported as corrupt events.

use std::collections::HashMap;

use futures::future::BoxFuture;

use lorekeep_campaign::{Campaign, Character, Gate, Participant, Session, Spotlight};
use lorekeep_types::codec::{self, Payload};
use lorekeep_types::payload::{
    CampaignCreated, CampaignUpdated, CharacterCreated, CharacterDeleted, CharacterUpdated,
    GateAbandoned, GateOpened, GateResolved, ParticipantJoined, ParticipantLeft,
    ParticipantUpdated, SessionEnded, SessionStarted, SpotlightCleared, SpotlightSet,
};
use lorekeep_types::{
    CampaignStatus, CharacterId, Event, GateId, GateStatus, ParticipantId, SessionId,
    SessionStatus, StorageError, event_types,
};

use crate::ApplyError;
use crate::store::{ProjectionBatch, ProjectionStore, ProjectionWrite};

/// A generic event handler.
pub type Handler =
    for<'a> fn(&'a dyn ProjectionStore, &'a Event) -> BoxFuture<'a, Result<(), ApplyError>>;

/// Builds the handler table from `event type => async fn` pairs.
macro_rules! handler_table {
    ($($event_type:path => $handler:ident),+ $(,)?) => {
        /// The handler for every generic event type, keyed by type tag.
        pub fn table() -> HashMap<&'static str, Handler> {
            let mut table: HashMap<&'static str, Handler> = HashMap::new();
            $(
                table.insert($event_type, {
                    fn boxed<'a>(
                        store: &'a dyn ProjectionStore,
                        event: &'a Event,
                    ) -> BoxFuture<'a, Result<(), ApplyError>> {
                        Box::pin($handler(store, event))
                    }
                    boxed
                });
            )+
            table
        }
    };
}

handler_table! {
    event_types::CAMPAIGN_CREATED => campaign_created,
    event_types::CAMPAIGN_UPDATED => campaign_updated,
    event_types::PARTICIPANT_JOINED => participant_joined,
    event_types::PARTICIPANT_UPDATED => participant_updated,
    event_types::PARTICIPANT_LEFT => participant_left,
    event_types::CHARACTER_CREATED => character_created,
    event_types::CHARACTER_UPDATED => character_updated,
    event_types::CHARACTER_DELETED => character_deleted,
    event_types::SESSION_STARTED => session_started,
    event_types::SESSION_ENDED => session_ended,
    event_types::SESSION_GATE_OPENED => gate_opened,
    event_types::SESSION_GATE_RESOLVED => gate_resolved,
    event_types::SESSION_GATE_ABANDONED => gate_abandoned,
    event_types::SESSION_SPOTLIGHT_SET => spotlight_set,
    event_types::SESSION_SPOTLIGHT_CLEARED => spotlight_cleared,
}

// ---------------------------------------------------------------------------
// Shared helpers
// ---------------------------------------------------------------------------

fn decode<P: Payload>(event: &Event) -> Result<P, ApplyError> {
    Ok(codec::decode(event)?)
}

fn require_session(event: &Event) -> Result<SessionId, ApplyError> {
    event
        .session_id
        .filter(|id| !id.is_nil())
        .ok_or_else(|| ApplyError::corrupt(event, "session_id is required on the envelope"))
}

async fn load_campaign(store: &dyn ProjectionStore, event: &Event) -> Result<Campaign, ApplyError> {
    store
        .get_campaign(event.campaign_id)
        .await?
        .ok_or_else(|| ApplyError::corrupt(event, format!("unknown campaign {}", event.campaign_id)))
}

async fn load_participant(
    store: &dyn ProjectionStore,
    event: &Event,
    participant_id: ParticipantId,
) -> Result<Participant, ApplyError> {
    store
        .get_participant(event.campaign_id, participant_id)
        .await?
        .ok_or_else(|| ApplyError::corrupt(event, format!("unknown participant {participant_id}")))
}

async fn load_character(
    store: &dyn ProjectionStore,
    event: &Event,
    character_id: CharacterId,
) -> Result<Character, ApplyError> {
    store
        .get_character(event.campaign_id, character_id)
        .await?
        .ok_or_else(|| ApplyError::corrupt(event, format!("unknown character {character_id}")))
}

async fn load_gate(
    store: &dyn ProjectionStore,
    event: &Event,
    gate_id: GateId,
) -> Result<Gate, ApplyError> {
    store
        .get_gate(event.campaign_id, gate_id)
        .await?
        .ok_or_else(|| ApplyError::corrupt(event, format!("unknown gate {gate_id}")))
}

fn to_count(total: usize, operation: &'static str) -> Result<u32, StorageError> {
    u32::try_from(total).map_err(|e| StorageError::new(operation, e))
}

/// Active participants once `changed` replaces its stored row.
async fn count_participants(
    store: &dyn ProjectionStore,
    changed: &Participant,
) -> Result<u32, StorageError> {
    let rows = store.list_participants(changed.campaign_id).await?;
    let others = rows
        .iter()
        .filter(|p| p.id != changed.id && p.is_active())
        .count();
    to_count(others.saturating_add(usize::from(changed.is_active())), "count participants")
}

/// Active characters once `changed` replaces its stored row.
async fn count_characters(
    store: &dyn ProjectionStore,
    changed: &Character,
) -> Result<u32, StorageError> {
    let rows = store.list_characters(changed.campaign_id).await?;
    let others = rows
        .iter()
        .filter(|c| c.id != changed.id && c.is_active())
        .count();
    to_count(others.saturating_add(usize::from(changed.is_active())), "count characters")
}

// ---------------------------------------------------------------------------
// Campaign
// ---------------------------------------------------------------------------

async fn campaign_created(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: CampaignCreated = decode(event)?;
    let participants = store.list_participants(event.campaign_id).await?;
    let characters = store.list_characters(event.campaign_id).await?;

    let campaign = Campaign {
        id: event.campaign_id,
        name: payload.name,
        game_system: payload.game_system,
        gm_mode: payload.gm_mode,
        theme_prompt: payload.theme_prompt,
        status: CampaignStatus::Draft,
        gm_fear: 0,
        participant_count: to_count(
            participants.iter().filter(|p| p.is_active()).count(),
            "count participants",
        )?,
        character_count: to_count(
            characters.iter().filter(|c| c.is_active()).count(),
            "count characters",
        )?,
        created_at: event.timestamp,
        updated_at: event.timestamp,
        completed_at: None,
        archived_at: None,
    };
    store
        .commit(ProjectionWrite::Campaign(Box::new(campaign)).into())
        .await?;
    Ok(())
}

async fn campaign_updated(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: CampaignUpdated = decode(event)?;
    let mut campaign = load_campaign(store, event).await?;

    if let Some(name) = payload.name {
        campaign.name = name;
    }
    if let Some(theme_prompt) = payload.theme_prompt {
        campaign.theme_prompt = theme_prompt;
    }
    if let Some(status) = payload.status {
        campaign.set_status(status, event.timestamp);
    }
    campaign.updated_at = event.timestamp;

    store
        .commit(ProjectionWrite::Campaign(Box::new(campaign)).into())
        .await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Participants
// ---------------------------------------------------------------------------

async fn participant_joined(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: ParticipantJoined = decode(event)?;
    let mut campaign = load_campaign(store, event).await?;

    let participant = Participant {
        id: payload.participant_id,
        campaign_id: event.campaign_id,
        display_name: payload.display_name,
        role: payload.role,
        controller: payload.controller,
        created_at: event.timestamp,
        updated_at: event.timestamp,
        left_at: None,
    };
    campaign.participant_count = count_participants(store, &participant).await?;
    campaign.updated_at = event.timestamp;

    let mut batch = ProjectionBatch::new();
    batch
        .push(ProjectionWrite::Participant(Box::new(participant)))
        .push(ProjectionWrite::Campaign(Box::new(campaign)));
    store.commit(batch).await?;
    Ok(())
}

async fn participant_updated(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: ParticipantUpdated = decode(event)?;
    let mut participant = load_participant(store, event, payload.participant_id).await?;

    if let Some(display_name) = payload.display_name {
        participant.display_name = display_name;
    }
    if let Some(role) = payload.role {
        participant.role = role;
    }
    if let Some(controller) = payload.controller {
        participant.controller = controller;
    }
    participant.updated_at = event.timestamp;

    store
        .commit(ProjectionWrite::Participant(Box::new(participant)).into())
        .await?;
    Ok(())
}

async fn participant_left(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: ParticipantLeft = decode(event)?;
    let mut campaign = load_campaign(store, event).await?;
    let mut participant = load_participant(store, event, payload.participant_id).await?;

    participant.left_at = Some(event.timestamp);
    participant.updated_at = event.timestamp;
    campaign.participant_count = count_participants(store, &participant).await?;
    campaign.updated_at = event.timestamp;

    let mut batch = ProjectionBatch::new();
    batch
        .push(ProjectionWrite::Participant(Box::new(participant)))
        .push(ProjectionWrite::Campaign(Box::new(campaign)));
    store.commit(batch).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Characters
// ---------------------------------------------------------------------------

async fn character_created(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: CharacterCreated = decode(event)?;
    let mut campaign = load_campaign(store, event).await?;

    let character = Character {
        id: payload.character_id,
        campaign_id: event.campaign_id,
        name: payload.name,
        kind: payload.kind,
        notes: payload.notes,
        participant_id: payload.participant_id.filter(|id| !id.is_nil()),
        created_at: event.timestamp,
        updated_at: event.timestamp,
        deleted_at: None,
    };
    campaign.character_count = count_characters(store, &character).await?;
    campaign.updated_at = event.timestamp;

    let mut batch = ProjectionBatch::new();
    batch
        .push(ProjectionWrite::Character(Box::new(character)))
        .push(ProjectionWrite::Campaign(Box::new(campaign)));
    store.commit(batch).await?;
    Ok(())
}

async fn character_updated(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: CharacterUpdated = decode(event)?;
    let mut character = load_character(store, event, payload.character_id).await?;

    if let Some(name) = payload.name {
        character.name = name;
    }
    if let Some(kind) = payload.kind {
        character.kind = kind;
    }
    if let Some(notes) = payload.notes {
        character.notes = notes;
    }
    character.updated_at = event.timestamp;

    store
        .commit(ProjectionWrite::Character(Box::new(character)).into())
        .await?;
    Ok(())
}

async fn character_deleted(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: CharacterDeleted = decode(event)?;
    let mut campaign = load_campaign(store, event).await?;
    let mut character = load_character(store, event, payload.character_id).await?;

    character.deleted_at = Some(event.timestamp);
    character.updated_at = event.timestamp;
    campaign.character_count = count_characters(store, &character).await?;
    campaign.updated_at = event.timestamp;

    let mut batch = ProjectionBatch::new();
    batch
        .push(ProjectionWrite::Character(Box::new(character)))
        .push(ProjectionWrite::Campaign(Box::new(campaign)));
    store.commit(batch).await?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Sessions
// ---------------------------------------------------------------------------

async fn session_started(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: SessionStarted = decode(event)?;
    let session = Session {
        id: payload.session_id,
        campaign_id: event.campaign_id,
        name: payload.name,
        status: SessionStatus::Active,
        started_at: event.timestamp,
        updated_at: event.timestamp,
        ended_at: None,
    };
    store
        .commit(ProjectionWrite::Session(Box::new(session)).into())
        .await?;
    Ok(())
}

async fn session_ended(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: SessionEnded = decode(event)?;
    let mut session = store
        .get_session(event.campaign_id, payload.session_id)
        .await?
        .ok_or_else(|| ApplyError::corrupt(event, format!("unknown session {}", payload.session_id)))?;

    session.status = SessionStatus::Ended;
    session.ended_at = Some(event.timestamp);
    session.updated_at = event.timestamp;

    store
        .commit(ProjectionWrite::Session(Box::new(session)).into())
        .await?;
    Ok(())
}

async fn gate_opened(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: GateOpened = decode(event)?;
    let session_id = require_session(event)?;
    let gate = Gate {
        id: payload.gate_id,
        campaign_id: event.campaign_id,
        session_id,
        gate_type: payload.gate_type,
        status: GateStatus::Open,
        reason: payload.reason,
        resolution: String::new(),
        created_at: event.timestamp,
        updated_at: event.timestamp,
        closed_at: None,
    };
    store
        .commit(ProjectionWrite::Gate(Box::new(gate)).into())
        .await?;
    Ok(())
}

async fn gate_resolved(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: GateResolved = decode(event)?;
    let mut gate = load_gate(store, event, payload.gate_id).await?;

    gate.status = GateStatus::Resolved;
    gate.resolution = payload.resolution;
    gate.updated_at = event.timestamp;
    gate.closed_at = Some(event.timestamp);

    store
        .commit(ProjectionWrite::Gate(Box::new(gate)).into())
        .await?;
    Ok(())
}

async fn gate_abandoned(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: GateAbandoned = decode(event)?;
    let mut gate = load_gate(store, event, payload.gate_id).await?;

    gate.status = GateStatus::Abandoned;
    if !payload.reason.is_empty() {
        gate.reason = payload.reason;
    }
    gate.updated_at = event.timestamp;
    gate.closed_at = Some(event.timestamp);

    store
        .commit(ProjectionWrite::Gate(Box::new(gate)).into())
        .await?;
    Ok(())
}

async fn spotlight_set(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let payload: SpotlightSet = decode(event)?;
    let session_id = require_session(event)?;
    let spotlight = Spotlight {
        campaign_id: event.campaign_id,
        session_id,
        spotlight_type: payload.spotlight_type,
        character_id: payload.character_id.filter(|id| !id.is_nil()),
        updated_at: event.timestamp,
        updated_by_actor_type: event.actor_type,
        updated_by_actor_id: event.actor_id.clone(),
    };
    store
        .commit(ProjectionWrite::Spotlight(Box::new(spotlight)).into())
        .await?;
    Ok(())
}

async fn spotlight_cleared(store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
    let _: SpotlightCleared = decode(event)?;
    let session_id = require_session(event)?;
    store
        .commit(
            ProjectionWrite::ClearSpotlight {
                campaign_id: event.campaign_id,
                session_id,
            }
            .into(),
        )
        .await?;
    Ok(())
}
