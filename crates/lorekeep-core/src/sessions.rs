//! Play sessions, gates, and the spotlight.

use tracing::info;

use lorekeep_campaign::{
    CampaignOperation, Gate, Session, Spotlight, normalize_gate_reason, normalize_gate_type,
    normalize_session_name, normalize_spotlight_type, validate_spotlight_target,
    validate_transition,
};
use lorekeep_types::payload::{
    CampaignUpdated, GateAbandoned, GateOpened, GateResolved, SessionEnded, SessionStarted,
    SpotlightCleared, SpotlightSet,
};
use lorekeep_types::{
    CampaignId, CampaignStatus, CharacterId, GateId, GateStatus, InvalidStateError, SessionId,
    entity,
};

use crate::error::GameError;
use crate::game::{CommandContext, Game};

impl Game {
    /// Start a play session.
    ///
    /// Starting the first session of a draft campaign activates the
    /// campaign in the same locked write.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] when a session is already active or the
    /// campaign is completed or archived.
    pub async fn start_session(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        name: &str,
    ) -> Result<Session, GameError> {
        let guard = self.lock(campaign_id).await;
        let campaign = self.campaign_for(campaign_id, CampaignOperation::SessionStart).await?;
        if let Some(active) = self.active_session(campaign_id).await? {
            return Err(InvalidStateError::new(format!(
                "session {} is already active",
                active.id
            ))
            .into());
        }

        let stamp = self.stamp(ctx, campaign_id);
        let session_id = SessionId::new();
        let mut events = Vec::with_capacity(2);
        if campaign.status == CampaignStatus::Draft {
            validate_transition(campaign.status, CampaignStatus::Active, false)?;
            events.push(
                stamp
                    .event(&CampaignUpdated {
                        status: Some(CampaignStatus::Active),
                        ..CampaignUpdated::default()
                    })?
                    .with_entity(entity::CAMPAIGN, campaign_id),
            );
        }
        events.push(
            stamp
                .event(&SessionStarted {
                    session_id,
                    name: normalize_session_name(name),
                })?
                .with_session(Some(session_id))
                .with_entity(entity::SESSION, session_id),
        );
        self.commit(guard, events).await?;

        info!(campaign_id = %campaign_id, session_id = %session_id, "session started");
        self.session(campaign_id, session_id).await
    }

    /// End the active session.
    ///
    /// Gates still open are abandoned and the spotlight is cleared before
    /// the session ends, all in one locked write.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] when no session is active.
    pub async fn end_session(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
    ) -> Result<Session, GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::SessionAction).await?;
        let session = self.require_active_session(campaign_id).await?;

        let stamp = self.stamp(ctx, campaign_id);
        let mut events = Vec::new();
        for gate in self.projections().open_gates(campaign_id, session.id).await? {
            events.push(
                stamp
                    .event(&GateAbandoned {
                        gate_id: gate.id,
                        reason: "session ended".to_owned(),
                    })?
                    .with_session(Some(session.id))
                    .with_entity(entity::GATE, gate.id),
            );
        }
        if self
            .projections()
            .get_spotlight(campaign_id, session.id)
            .await?
            .is_some()
        {
            events.push(
                stamp
                    .event(&SpotlightCleared {
                        reason: "session ended".to_owned(),
                    })?
                    .with_session(Some(session.id))
                    .with_entity(entity::SESSION, session.id),
            );
        }
        events.push(
            stamp
                .event(&SessionEnded {
                    session_id: session.id,
                })?
                .with_session(Some(session.id))
                .with_entity(entity::SESSION, session.id),
        );
        self.commit(guard, events).await?;

        info!(campaign_id = %campaign_id, session_id = %session.id, "session ended");
        self.session(campaign_id, session.id).await
    }

    /// One session.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] if the session does not exist.
    pub async fn session(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Session, GameError> {
        self.projections()
            .get_session(campaign_id, session_id)
            .await?
            .ok_or_else(|| GameError::not_found("session", session_id))
    }

    /// Open a gate in the active session.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for a blank gate type;
    /// [`GameError::InvalidState`] when no session is active.
    pub async fn open_gate(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        gate_type: &str,
        reason: &str,
    ) -> Result<Gate, GameError> {
        let gate_type = normalize_gate_type(gate_type)?;
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::SessionAction).await?;
        let session = self.require_active_session(campaign_id).await?;

        let gate_id = GateId::new();
        let event = self
            .stamp(ctx, campaign_id)
            .event(&GateOpened {
                gate_id,
                gate_type,
                reason: normalize_gate_reason(reason),
            })?
            .with_session(Some(session.id))
            .with_entity(entity::GATE, gate_id);
        self.commit(guard, vec![event]).await?;
        self.gate(campaign_id, gate_id).await
    }

    /// Resolve an open gate.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] when the gate
    /// is no longer open.
    pub async fn resolve_gate(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        gate_id: GateId,
        resolution: &str,
    ) -> Result<Gate, GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::SessionAction).await?;
        let gate = self.open_gate_row(campaign_id, gate_id).await?;

        let event = self
            .stamp(ctx, campaign_id)
            .event(&GateResolved {
                gate_id,
                resolution: resolution.trim().to_owned(),
            })?
            .with_session(Some(gate.session_id))
            .with_entity(entity::GATE, gate_id);
        self.commit(guard, vec![event]).await?;
        self.gate(campaign_id, gate_id).await
    }

    /// Abandon an open gate.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] when the gate
    /// is no longer open.
    pub async fn abandon_gate(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        gate_id: GateId,
        reason: &str,
    ) -> Result<Gate, GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::SessionAction).await?;
        let gate = self.open_gate_row(campaign_id, gate_id).await?;

        let event = self
            .stamp(ctx, campaign_id)
            .event(&GateAbandoned {
                gate_id,
                reason: normalize_gate_reason(reason),
            })?
            .with_session(Some(gate.session_id))
            .with_entity(entity::GATE, gate_id);
        self.commit(guard, vec![event]).await?;
        self.gate(campaign_id, gate_id).await
    }

    /// One gate.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] if the gate does not exist.
    pub async fn gate(&self, campaign_id: CampaignId, gate_id: GateId) -> Result<Gate, GameError> {
        self.projections()
            .get_gate(campaign_id, gate_id)
            .await?
            .ok_or_else(|| GameError::not_found("gate", gate_id))
    }

    async fn open_gate_row(&self, campaign_id: CampaignId, gate_id: GateId) -> Result<Gate, GameError> {
        let gate = self.gate(campaign_id, gate_id).await?;
        if gate.status != GateStatus::Open {
            return Err(InvalidStateError::new(format!("gate {gate_id} is {}", gate.status)).into());
        }
        Ok(gate)
    }

    /// Point the active session's spotlight at the GM or a character.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for an unknown spotlight type or a target
    /// that does not match it; [`GameError::InvalidState`] when no session
    /// is active or the character was deleted.
    pub async fn set_spotlight(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        spotlight_type: &str,
        character_id: Option<CharacterId>,
    ) -> Result<Spotlight, GameError> {
        let spotlight_type = normalize_spotlight_type(spotlight_type)?;
        validate_spotlight_target(spotlight_type, character_id)?;
        let character_id = character_id.filter(|id| !id.is_nil());

        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::SessionAction).await?;
        let session = self.require_active_session(campaign_id).await?;
        if let Some(character_id) = character_id {
            self.active_character(campaign_id, character_id).await?;
        }

        let event = self
            .stamp(ctx, campaign_id)
            .event(&SpotlightSet {
                spotlight_type,
                character_id,
            })?
            .with_session(Some(session.id))
            .with_entity(entity::SESSION, session.id);
        self.commit(guard, vec![event]).await?;

        self.projections()
            .get_spotlight(campaign_id, session.id)
            .await?
            .ok_or_else(|| GameError::not_found("spotlight", session.id))
    }

    /// Clear the active session's spotlight. Clearing an unset spotlight
    /// appends nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] when no session is active.
    pub async fn clear_spotlight(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        reason: &str,
    ) -> Result<(), GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::SessionAction).await?;
        let session = self.require_active_session(campaign_id).await?;
        if self
            .projections()
            .get_spotlight(campaign_id, session.id)
            .await?
            .is_none()
        {
            return Ok(());
        }

        let event = self
            .stamp(ctx, campaign_id)
            .event(&SpotlightCleared {
                reason: reason.trim().to_owned(),
            })?
            .with_session(Some(session.id))
            .with_entity(entity::SESSION, session.id);
        self.commit(guard, vec![event]).await?;
        Ok(())
    }
}
