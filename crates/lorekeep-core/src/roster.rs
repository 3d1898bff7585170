//! Participant seats and characters.

use tracing::info;

use lorekeep_campaign::{
    CampaignOperation, Character, CreateCharacterInput, CreateParticipantInput, Participant,
    normalize_create_character, normalize_create_participant,
};
use lorekeep_daggerheart::events::{CharacterStatePatched, ProfileUpdated};
use lorekeep_daggerheart::{CharacterState, SYSTEM_ID, SYSTEM_VERSION, profile_defaults};
use lorekeep_types::payload::{
    CharacterCreated, CharacterDeleted, CharacterUpdated, ParticipantJoined, ParticipantLeft,
    ParticipantUpdated, SpotlightCleared,
};
use lorekeep_types::{
    CampaignId, CharacterId, CharacterKind, Controller, InvalidStateError, NewEvent,
    ParticipantId, ParticipantRole, SpotlightType, ValidationError, entity,
};

use crate::error::GameError;
use crate::game::{CommandContext, Game, Stamp};

/// Changes to a participant seat. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParticipantPatch {
    /// New display name. Trimmed; must not be blank.
    pub display_name: Option<String>,
    /// New role.
    pub role: Option<ParticipantRole>,
    /// New controller.
    pub controller: Option<Controller>,
}

/// Changes to a character. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CharacterPatch {
    /// New name. Trimmed; must not be blank.
    pub name: Option<String>,
    /// New kind.
    pub kind: Option<CharacterKind>,
    /// New notes. Trimmed.
    pub notes: Option<String>,
}

fn changed_text(field: &str, value: Option<&str>, current: &str) -> Result<Option<String>, ValidationError> {
    match value.map(str::trim) {
        Some("") => Err(ValidationError::required(field)),
        Some(v) if v != current => Ok(Some(v.to_owned())),
        _ => Ok(None),
    }
}

fn changed<T: PartialEq + Copy>(value: Option<T>, current: T) -> Option<T> {
    value.filter(|v| *v != current)
}

/// The system events that give a new character its starting profile and
/// vitals.
fn daggerheart_cascade(
    stamp: &Stamp,
    character_id: CharacterId,
    kind: CharacterKind,
) -> Result<[NewEvent; 2], GameError> {
    let profile = profile_defaults(kind);
    let state = CharacterState::initial(&profile);
    let patch = CharacterStatePatched {
        character_id,
        hp_after: Some(state.hp),
        hp_max_after: Some(state.hp_max),
        hope_after: Some(state.hope),
        hope_max_after: Some(state.hope_max),
        stress_after: Some(state.stress),
        stress_max_after: Some(state.stress_max),
        armor_after: Some(state.armor),
        armor_max_after: Some(state.armor_max),
        life_state_after: Some(state.life_state),
    };
    let system_event = |event: NewEvent| {
        event
            .with_entity(entity::CHARACTER, character_id)
            .with_system(SYSTEM_ID, SYSTEM_VERSION)
    };
    Ok([
        system_event(stamp.event(&ProfileUpdated {
            character_id,
            profile,
        })?),
        system_event(stamp.event(&patch)?),
    ])
}

impl Game {
    /// Seat a participant.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for a blank display name or missing role;
    /// [`GameError::InvalidState`] when the campaign does not accept edits.
    pub async fn join_campaign(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        input: CreateParticipantInput,
    ) -> Result<Participant, GameError> {
        let normalized = normalize_create_participant(input)?;
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;

        let participant_id = ParticipantId::new();
        let event = self
            .stamp(ctx, campaign_id)
            .event(&ParticipantJoined {
                participant_id,
                display_name: normalized.display_name,
                role: normalized.role,
                controller: normalized.controller,
            })?
            .with_entity(entity::PARTICIPANT, participant_id);
        self.commit(guard, vec![event]).await?;

        info!(campaign_id = %campaign_id, participant_id = %participant_id, role = %normalized.role, "participant joined");
        self.participant(campaign_id, participant_id).await
    }

    /// Change a participant seat. A patch that changes nothing appends
    /// nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] when the
    /// participant has left or the campaign does not accept edits.
    pub async fn update_participant(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        participant_id: ParticipantId,
        patch: ParticipantPatch,
    ) -> Result<Participant, GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;
        let participant = self.seated_participant(campaign_id, participant_id).await?;

        let payload = ParticipantUpdated {
            participant_id,
            display_name: changed_text(
                "display_name",
                patch.display_name.as_deref(),
                &participant.display_name,
            )?,
            role: changed(patch.role, participant.role),
            controller: changed(patch.controller, participant.controller),
        };
        if payload.display_name.is_none() && payload.role.is_none() && payload.controller.is_none() {
            return Ok(participant);
        }

        let event = self
            .stamp(ctx, campaign_id)
            .event(&payload)?
            .with_entity(entity::PARTICIPANT, participant_id);
        self.commit(guard, vec![event]).await?;
        self.participant(campaign_id, participant_id).await
    }

    /// Remove a participant from the campaign. The row stays, marked as
    /// left.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] when the
    /// participant already left or the campaign does not accept edits.
    pub async fn leave_campaign(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        participant_id: ParticipantId,
        reason: &str,
    ) -> Result<Participant, GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;
        self.seated_participant(campaign_id, participant_id).await?;

        let event = self
            .stamp(ctx, campaign_id)
            .event(&ParticipantLeft {
                participant_id,
                reason: reason.trim().to_owned(),
            })?
            .with_entity(entity::PARTICIPANT, participant_id);
        self.commit(guard, vec![event]).await?;

        info!(campaign_id = %campaign_id, participant_id = %participant_id, "participant left");
        self.participant(campaign_id, participant_id).await
    }

    async fn seated_participant(
        &self,
        campaign_id: CampaignId,
        participant_id: ParticipantId,
    ) -> Result<Participant, GameError> {
        let participant = self.participant(campaign_id, participant_id).await?;
        if !participant.is_active() {
            return Err(InvalidStateError::new(format!(
                "participant {participant_id} has left the campaign"
            ))
            .into());
        }
        Ok(participant)
    }

    /// Create a character.
    ///
    /// For a Daggerheart campaign the character also receives the default
    /// profile for its kind and full starting vitals, appended in the same
    /// locked write as the creation event.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for a blank name or missing kind;
    /// [`GameError::InvalidState`] when the controlling participant has
    /// left or the campaign does not accept edits.
    pub async fn create_character(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        input: CreateCharacterInput,
    ) -> Result<Character, GameError> {
        let normalized = normalize_create_character(input)?;
        let guard = self.lock(campaign_id).await;
        let campaign = self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;
        if let Some(participant_id) = normalized.participant_id {
            self.seated_participant(campaign_id, participant_id).await?;
        }

        let character_id = CharacterId::new();
        let stamp = self.stamp(ctx, campaign_id);
        let mut events = vec![
            stamp
                .event(&CharacterCreated {
                    character_id,
                    name: normalized.name,
                    kind: normalized.kind,
                    notes: normalized.notes,
                    participant_id: normalized.participant_id,
                })?
                .with_entity(entity::CHARACTER, character_id),
        ];
        if campaign.game_system == SYSTEM_ID {
            events.extend(daggerheart_cascade(&stamp, character_id, normalized.kind)?);
        }
        self.commit(guard, events).await?;

        info!(campaign_id = %campaign_id, character_id = %character_id, kind = %normalized.kind, "character created");
        self.character(campaign_id, character_id).await
    }

    /// Change a character. A patch that changes nothing appends nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] when the
    /// character was deleted or the campaign does not accept edits.
    pub async fn update_character(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        patch: CharacterPatch,
    ) -> Result<Character, GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;
        let character = self.active_character(campaign_id, character_id).await?;

        let notes = patch
            .notes
            .as_deref()
            .map(str::trim)
            .filter(|notes| *notes != character.notes)
            .map(str::to_owned);
        let payload = CharacterUpdated {
            character_id,
            name: changed_text("name", patch.name.as_deref(), &character.name)?,
            kind: changed(patch.kind, character.kind),
            notes,
        };
        if payload.name.is_none() && payload.kind.is_none() && payload.notes.is_none() {
            return Ok(character);
        }

        let event = self
            .stamp(ctx, campaign_id)
            .event(&payload)?
            .with_entity(entity::CHARACTER, character_id);
        self.commit(guard, vec![event]).await?;
        self.character(campaign_id, character_id).await
    }

    /// Delete a character. The row stays, marked as deleted. If the active
    /// session's spotlight is on the character, it is cleared first.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] when the
    /// character was already deleted or the campaign does not accept edits.
    pub async fn delete_character(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        reason: &str,
    ) -> Result<Character, GameError> {
        let guard = self.lock(campaign_id).await;
        self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;
        self.active_character(campaign_id, character_id).await?;

        let stamp = self.stamp(ctx, campaign_id);
        let mut events = Vec::with_capacity(2);
        if let Some(session) = self.active_session(campaign_id).await? {
            let spotlight = self.projections().get_spotlight(campaign_id, session.id).await?;
            if spotlight.is_some_and(|s| {
                s.spotlight_type == SpotlightType::Character && s.character_id == Some(character_id)
            }) {
                events.push(
                    stamp
                        .event(&SpotlightCleared {
                            reason: "character deleted".to_owned(),
                        })?
                        .with_session(Some(session.id))
                        .with_entity(entity::SESSION, session.id),
                );
            }
        }
        events.push(
            stamp
                .event(&CharacterDeleted {
                    character_id,
                    reason: reason.trim().to_owned(),
                })?
                .with_entity(entity::CHARACTER, character_id),
        );
        self.commit(guard, events).await?;

        info!(campaign_id = %campaign_id, character_id = %character_id, "character deleted");
        self.character(campaign_id, character_id).await
    }

    /// Every participant of a campaign, including those who left.
    ///
    /// # Errors
    ///
    /// [`GameError::Storage`] if the projection store fails.
    pub async fn list_participants(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<Participant>, GameError> {
        Ok(self.projections().list_participants(campaign_id).await?)
    }

    /// Every character of a campaign, including deleted ones.
    ///
    /// # Errors
    ///
    /// [`GameError::Storage`] if the projection store fails.
    pub async fn list_characters(&self, campaign_id: CampaignId) -> Result<Vec<Character>, GameError> {
        Ok(self.projections().list_characters(campaign_id).await?)
    }
}
