//! The [`Game`] facade: the only write path into a campaign.
//!
//! A command takes the campaign's lock, reads projections to decide what
//! to append, builds its events, and hands them to `Game::commit`, which
//! appends and applies them one at a time. The append-and-apply loop runs
//! in a spawned task that owns the lock guard, so a caller that drops the
//! command future cannot leave an appended event unapplied while another
//! writer gets in.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use lorekeep_campaign::{
    Campaign, CampaignOperation, Character, Participant, Session, validate_campaign_operation,
};
use lorekeep_daggerheart::DaggerheartAdapter;
use lorekeep_ledger::EventStore;
use lorekeep_projection::{Applier, ProjectionStore};
use lorekeep_types::{
    ActorType, CampaignId, CharacterId, Event, InvalidStateError, NewEvent, ParticipantId, Payload,
    ValidationError,
};

use crate::clock::{Clock, SystemClock};
use crate::error::GameError;
use crate::locks::{CampaignGuard, CampaignLocks};

/// Who is issuing a command, and the caller's correlation ids.
///
/// Copied onto every event the command appends.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandContext {
    /// Kind of actor.
    pub actor_type: ActorType,
    /// Actor identity, if any.
    pub actor_id: Option<String>,
    /// Request correlation id.
    pub request_id: String,
    /// Tool or agent invocation id.
    pub invocation_id: String,
}

impl CommandContext {
    /// A command issued by the system itself.
    pub const fn system() -> Self {
        Self {
            actor_type: ActorType::System,
            actor_id: None,
            request_id: String::new(),
            invocation_id: String::new(),
        }
    }

    /// A command issued by the GM.
    pub fn gm(actor_id: impl Into<String>) -> Self {
        Self {
            actor_type: ActorType::Gm,
            actor_id: Some(actor_id.into()),
            ..Self::system()
        }
    }

    /// A command issued by a seated participant.
    pub fn participant(participant_id: ParticipantId) -> Self {
        Self {
            actor_type: ActorType::Participant,
            actor_id: Some(participant_id.to_string()),
            ..Self::system()
        }
    }

    /// Attach correlation ids.
    #[must_use]
    pub fn with_correlation(
        mut self,
        request_id: impl Into<String>,
        invocation_id: impl Into<String>,
    ) -> Self {
        self.request_id = request_id.into();
        self.invocation_id = invocation_id.into();
        self
    }
}

impl Default for CommandContext {
    fn default() -> Self {
        Self::system()
    }
}

/// Envelope fields shared by every event of one command.
#[derive(Debug, Clone)]
pub(crate) struct Stamp {
    campaign_id: CampaignId,
    at: DateTime<Utc>,
    ctx: CommandContext,
}

impl Stamp {
    /// A new event carrying `payload` and the command's envelope fields.
    pub(crate) fn event<P: Payload>(&self, payload: &P) -> Result<NewEvent, GameError> {
        Ok(NewEvent::from_payload(self.campaign_id, payload, self.at)?
            .with_actor(self.ctx.actor_type, self.ctx.actor_id.clone())
            .with_correlation(self.ctx.request_id.clone(), self.ctx.invocation_id.clone()))
    }
}

/// Campaign command facade over an event store and a projection applier.
#[derive(Clone)]
pub struct Game {
    events: Arc<dyn EventStore>,
    applier: Arc<Applier>,
    locks: Arc<CampaignLocks>,
    clock: Arc<dyn Clock>,
}

impl core::fmt::Debug for Game {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Game")
            .field("applier", &self.applier)
            .field("clock", &self.clock)
            .finish_non_exhaustive()
    }
}

impl Game {
    /// A game over `events` and `projections` with the Daggerheart system
    /// registered and the wall clock.
    pub fn new(events: Arc<dyn EventStore>, projections: Arc<dyn ProjectionStore>) -> Self {
        let applier = Applier::new(projections).with_system(Arc::new(DaggerheartAdapter::new()));
        Self::with_applier(events, applier)
    }

    /// A game over `events` and a preconfigured applier.
    pub fn with_applier(events: Arc<dyn EventStore>, applier: Applier) -> Self {
        Self {
            events,
            applier: Arc::new(applier),
            locks: Arc::new(CampaignLocks::new()),
            clock: Arc::new(SystemClock),
        }
    }

    /// Replace the clock used to stamp new events.
    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// The event log.
    pub const fn events(&self) -> &Arc<dyn EventStore> {
        &self.events
    }

    /// The projection store.
    pub fn projections(&self) -> &Arc<dyn ProjectionStore> {
        self.applier.store()
    }

    /// The applier events are folded through.
    pub const fn applier(&self) -> &Arc<Applier> {
        &self.applier
    }

    /// Append one caller-built event and apply it, holding the campaign's
    /// lock throughout.
    ///
    /// System events are checked against their adapter's rules first.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] if the event breaks a rule (nothing is
    /// appended); [`GameError::Ledger`] if the append fails;
    /// [`GameError::Apply`] if the event was appended but could not be
    /// applied.
    pub async fn record(&self, event: NewEvent) -> Result<Event, GameError> {
        let guard = self.locks.acquire(event.campaign_id).await;
        let mut stored = self.commit(guard, vec![event]).await?;
        stored
            .pop()
            .ok_or_else(|| GameError::Aborted("writer returned no event".to_owned()))
    }

    pub(crate) async fn lock(&self, campaign_id: CampaignId) -> CampaignGuard {
        self.locks.acquire(campaign_id).await
    }

    pub(crate) fn stamp(&self, ctx: &CommandContext, campaign_id: CampaignId) -> Stamp {
        Stamp {
            campaign_id,
            at: self.clock.now(),
            ctx: ctx.clone(),
        }
    }

    /// Append and apply `events` in order under `guard`.
    ///
    /// Every event is checked before the first append, so a batch with a
    /// bad system event appends nothing.
    pub(crate) async fn commit(
        &self,
        guard: CampaignGuard,
        events: Vec<NewEvent>,
    ) -> Result<Vec<Event>, GameError> {
        for event in &events {
            if event.campaign_id != guard.campaign_id() {
                return Err(ValidationError::field(
                    "campaign_id",
                    "event campaign does not match the locked campaign",
                )
                .into());
            }
            self.check_system_event(event)?;
        }

        let store = Arc::clone(&self.events);
        let applier = Arc::clone(&self.applier);
        let writer = tokio::spawn(async move {
            let _guard = guard;
            let mut stored = Vec::with_capacity(events.len());
            for event in events {
                let event = store.append(event).await?;
                if let Err(e) = applier.apply(&event).await {
                    error!(
                        campaign_id = %event.campaign_id,
                        seq = event.seq,
                        event_type = %event.event_type,
                        error = %e,
                        "appended event could not be applied; projection needs replay"
                    );
                    return Err(GameError::Apply(e));
                }
                debug!(
                    campaign_id = %event.campaign_id,
                    seq = event.seq,
                    event_type = %event.event_type,
                    "event recorded"
                );
                stored.push(event);
            }
            Ok(stored)
        });
        writer
            .await
            .map_err(|e| GameError::Aborted(e.to_string()))?
    }

    fn check_system_event(&self, event: &NewEvent) -> Result<(), GameError> {
        let system_id = event.system_id.trim();
        if system_id.is_empty() {
            return Ok(());
        }
        let Some(adapter) = self.applier.system(system_id) else {
            return Err(ValidationError::field(
                "system_id",
                format!("game system {system_id:?} is not registered"),
            )
            .into());
        };
        adapter.validate(&event.clone().into_stored(0))?;
        Ok(())
    }

    /// The campaign row.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] if the campaign does not exist.
    pub async fn campaign(&self, campaign_id: CampaignId) -> Result<Campaign, GameError> {
        self.projections()
            .get_campaign(campaign_id)
            .await?
            .ok_or_else(|| GameError::not_found("campaign", campaign_id))
    }

    /// The campaign row, checked against `op`.
    pub(crate) async fn campaign_for(
        &self,
        campaign_id: CampaignId,
        op: CampaignOperation,
    ) -> Result<Campaign, GameError> {
        let campaign = self.campaign(campaign_id).await?;
        validate_campaign_operation(campaign.status, op)?;
        Ok(campaign)
    }

    /// The campaign's active session, if any.
    ///
    /// # Errors
    ///
    /// [`GameError::Storage`] if the projection store fails.
    pub async fn active_session(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Option<Session>, GameError> {
        Ok(self.projections().active_session(campaign_id).await?)
    }

    /// The campaign's active session.
    pub(crate) async fn require_active_session(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Session, GameError> {
        self.active_session(campaign_id).await?.ok_or_else(|| {
            InvalidStateError::new("campaign has no active session").into()
        })
    }

    /// One participant.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] if the participant does not exist.
    pub async fn participant(
        &self,
        campaign_id: CampaignId,
        participant_id: ParticipantId,
    ) -> Result<Participant, GameError> {
        self.projections()
            .get_participant(campaign_id, participant_id)
            .await?
            .ok_or_else(|| GameError::not_found("participant", participant_id))
    }

    /// One character.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] if the character does not exist.
    pub async fn character(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<Character, GameError> {
        self.projections()
            .get_character(campaign_id, character_id)
            .await?
            .ok_or_else(|| GameError::not_found("character", character_id))
    }

    /// A character that has not been deleted.
    pub(crate) async fn active_character(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<Character, GameError> {
        if character_id.is_nil() {
            return Err(ValidationError::required("character_id").into());
        }
        let character = self.character(campaign_id, character_id).await?;
        if !character.is_active() {
            return Err(InvalidStateError::new(format!(
                "character {character_id} has been deleted"
            ))
            .into());
        }
        Ok(character)
    }
}
