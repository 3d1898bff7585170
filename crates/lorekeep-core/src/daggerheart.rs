//! Daggerheart commands: vitals, conditions, damage, death moves, roll
//! outcomes, and the GM Fear pool.
//!
//! Each command resolves the change against the current projection with
//! the pure rules in `lorekeep-daggerheart`, appends the resulting system
//! events, and returns the state the adapter folded them into. A command
//! whose resolution changes nothing appends nothing.

use tracing::{debug, info};

use lorekeep_campaign::{Campaign, CampaignOperation, gain_gm_fear, spend_gm_fear};
use lorekeep_daggerheart::events::{
    AttackResolved, BlazeOfGloryResolved, ConditionChanged, DamageApplied, DamageRollResolved,
    GmFearChanged, ProfileUpdated, ReactionResolved,
};
use lorekeep_daggerheart::state::normalize_conditions;
use lorekeep_daggerheart::{
    CharacterState, DeathMove, LifeState, PatchRequest, Profile, SYSTEM_ID, SYSTEM_VERSION,
    character_profile, character_state, profile_defaults, resolve_damage, resolve_death_move,
    resolve_patch, vulnerable_transition,
};
use lorekeep_types::{
    CampaignId, CharacterId, Event, InvalidStateError, NewEvent, Payload, SessionId,
    ValidationError, entity,
};

use crate::error::GameError;
use crate::game::{CommandContext, Game, Stamp};

/// Condition change source used when stress reaches (or leaves) its maximum.
pub const SOURCE_STRESS_AT_MAX: &str = "stress_at_max";

/// Condition change source used when a caller sets conditions directly.
pub const SOURCE_MANUAL: &str = "manual";

/// A damage roll outcome to apply to a character.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DamageRequest {
    /// Raw damage, before thresholds. Must not be negative.
    pub amount: i32,
    /// Spend an armor slot, if one is available, to lower the severity.
    pub use_armor: bool,
}

fn system_event<P: Payload>(
    stamp: &Stamp,
    payload: &P,
    entity_type: &str,
    entity_id: impl ToString,
    session_id: Option<SessionId>,
) -> Result<NewEvent, GameError> {
    Ok(stamp
        .event(payload)?
        .with_system(SYSTEM_ID, SYSTEM_VERSION)
        .with_entity(entity_type, entity_id)
        .with_session(session_id))
}

fn require_daggerheart(campaign: &Campaign) -> Result<(), InvalidStateError> {
    if campaign.game_system != SYSTEM_ID {
        return Err(InvalidStateError::new(format!(
            "campaign plays {}, not {SYSTEM_ID}",
            campaign.game_system
        )));
    }
    Ok(())
}

fn require_alive(character_id: CharacterId, state: &CharacterState) -> Result<(), InvalidStateError> {
    if state.life_state != LifeState::Alive {
        return Err(InvalidStateError::new(format!(
            "character {character_id} is {}",
            state.life_state
        )));
    }
    Ok(())
}

/// One character's vitals, loaded under the campaign lock.
struct Target {
    character_id: CharacterId,
    session_id: Option<SessionId>,
    state: CharacterState,
}

impl Game {
    /// Checks shared by the character commands: the campaign allows `op`
    /// and plays Daggerheart, and the character is in play.
    async fn target(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
        op: CampaignOperation,
    ) -> Result<Target, GameError> {
        let campaign = self.campaign_for(campaign_id, op).await?;
        require_daggerheart(&campaign)?;
        self.active_character(campaign_id, character_id).await?;
        let state = self.character_state(campaign_id, character_id).await?;
        let session_id = self.active_session(campaign_id).await?.map(|s| s.id);
        Ok(Target {
            character_id,
            session_id,
            state,
        })
    }

    /// The condition change implied by a stress change, if any.
    fn stress_bracket(
        stamp: &Stamp,
        target: &Target,
        next: &CharacterState,
    ) -> Result<Option<NewEvent>, GameError> {
        let Some(conditions) = vulnerable_transition(
            &target.state.conditions,
            target.state.stress,
            next.stress,
            next.stress_max,
        ) else {
            return Ok(None);
        };
        let change = ConditionChanged::between(
            target.character_id,
            target.state.conditions.clone(),
            conditions,
            SOURCE_STRESS_AT_MAX,
        );
        system_event(
            stamp,
            &change,
            entity::CHARACTER,
            target.character_id,
            target.session_id,
        )
        .map(Some)
    }

    /// A character's Daggerheart vitals.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] if the character has no state row.
    pub async fn character_state(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<CharacterState, GameError> {
        character_state(self.projections().as_ref(), campaign_id, character_id)
            .await?
            .ok_or_else(|| GameError::not_found("character state", character_id))
    }

    /// A character's Daggerheart profile, falling back to the defaults for
    /// its kind when none was stored.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`] if the character does not exist.
    pub async fn character_profile(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<Profile, GameError> {
        let store = self.projections().as_ref();
        if let Some(profile) = character_profile(store, campaign_id, character_id).await? {
            return Ok(profile);
        }
        let character = self.character(campaign_id, character_id).await?;
        Ok(profile_defaults(character.kind))
    }

    /// Replace a character's profile. Existing vitals follow the new caps.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for an inconsistent profile.
    pub async fn set_character_profile(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        profile: Profile,
    ) -> Result<Profile, GameError> {
        profile.validate()?;
        let guard = self.lock(campaign_id).await;
        let campaign = self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;
        require_daggerheart(&campaign)?;
        self.active_character(campaign_id, character_id).await?;

        let stored = character_profile(self.projections().as_ref(), campaign_id, character_id).await?;
        if stored.as_ref() == Some(&profile) {
            return Ok(profile);
        }
        let session_id = self.active_session(campaign_id).await?.map(|s| s.id);
        let stamp = self.stamp(ctx, campaign_id);
        let event = system_event(
            &stamp,
            &ProfileUpdated {
                character_id,
                profile,
            },
            entity::CHARACTER,
            character_id,
            session_id,
        )?;
        self.commit(guard, vec![event]).await?;
        self.character_profile(campaign_id, character_id).await
    }

    /// Change a character's vitals by absolute targets or deltas.
    ///
    /// Every value is clamped into its bounds. If stress reaches its
    /// maximum the character becomes vulnerable; if it drops below, the
    /// condition is lifted. A request that changes nothing appends nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] for a deleted
    /// character or a campaign that does not accept edits.
    pub async fn patch_character_state(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        request: &PatchRequest,
    ) -> Result<CharacterState, GameError> {
        let guard = self.lock(campaign_id).await;
        let target = self
            .target(campaign_id, character_id, CampaignOperation::Mutate)
            .await?;

        let patch = resolve_patch(character_id, &target.state, request);
        if patch.is_empty() {
            debug!(campaign_id = %campaign_id, character_id = %character_id, "state patch changes nothing");
            return Ok(target.state);
        }
        let next = lorekeep_daggerheart::apply_patch(&target.state, &patch);

        let stamp = self.stamp(ctx, campaign_id);
        let mut events = vec![system_event(
            &stamp,
            &patch,
            entity::CHARACTER,
            character_id,
            target.session_id,
        )?];
        events.extend(Self::stress_bracket(&stamp, &target, &next)?);
        self.commit(guard, events).await?;
        self.character_state(campaign_id, character_id).await
    }

    /// Replace a character's conditions. Names are trimmed, lower-cased,
    /// and de-duplicated; an identical set appends nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`]; [`GameError::InvalidState`] for a deleted
    /// character or a campaign that does not accept edits.
    pub async fn set_conditions<I, S>(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        conditions: I,
    ) -> Result<CharacterState, GameError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let conditions = normalize_conditions(conditions);
        let guard = self.lock(campaign_id).await;
        let target = self
            .target(campaign_id, character_id, CampaignOperation::Mutate)
            .await?;
        if conditions == target.state.conditions {
            return Ok(target.state);
        }

        let change = ConditionChanged::between(
            character_id,
            target.state.conditions.clone(),
            conditions,
            SOURCE_MANUAL,
        );
        let stamp = self.stamp(ctx, campaign_id);
        let event = system_event(
            &stamp,
            &change,
            entity::CHARACTER,
            character_id,
            target.session_id,
        )?;
        self.commit(guard, vec![event]).await?;
        self.character_state(campaign_id, character_id).await
    }

    /// Apply damage to a character using its profile's thresholds.
    ///
    /// Damage below 1 marks nothing and appends nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for negative damage;
    /// [`GameError::InvalidState`] when the character is not alive.
    pub async fn apply_damage(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        damage: DamageRequest,
    ) -> Result<CharacterState, GameError> {
        if damage.amount < 0 {
            return Err(ValidationError::field("amount", "damage must not be negative").into());
        }
        let guard = self.lock(campaign_id).await;
        let target = self
            .target(campaign_id, character_id, CampaignOperation::SessionAction)
            .await?;
        require_alive(character_id, &target.state)?;

        let profile = self.character_profile(campaign_id, character_id).await?;
        let applied = resolve_damage(
            character_id,
            &target.state,
            profile.thresholds(),
            damage.amount,
            damage.use_armor,
        );
        if applied.hp_after == target.state.hp && !applied.armor_spent {
            return Ok(target.state);
        }

        let stamp = self.stamp(ctx, campaign_id);
        let event = system_event(
            &stamp,
            &applied,
            entity::CHARACTER,
            character_id,
            target.session_id,
        )?;
        self.commit(guard, vec![event]).await?;

        log_damage(campaign_id, &applied);
        self.character_state(campaign_id, character_id).await
    }

    /// Resolve a death move for a character at zero hit points.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] unless the character is alive at zero
    /// hit points; [`GameError::Validation`] for a missing or out-of-range
    /// die.
    pub async fn resolve_death_move(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        death_move: DeathMove,
        hope_die: Option<i32>,
        fear_die: Option<i32>,
    ) -> Result<CharacterState, GameError> {
        let guard = self.lock(campaign_id).await;
        let target = self
            .target(campaign_id, character_id, CampaignOperation::SessionAction)
            .await?;
        require_alive(character_id, &target.state)?;
        if target.state.hp > 0 {
            return Err(InvalidStateError::new(format!(
                "character {character_id} still has {} hit points",
                target.state.hp
            ))
            .into());
        }

        let level = self.character_profile(campaign_id, character_id).await?.level;
        let resolved = resolve_death_move(
            character_id,
            &target.state,
            level,
            death_move,
            hope_die,
            fear_die,
        )?;
        let mut next = target.state.clone();
        if let Some(stress) = resolved.stress_after {
            next.stress = stress;
        }

        let stamp = self.stamp(ctx, campaign_id);
        let mut events = vec![system_event(
            &stamp,
            &resolved,
            entity::CHARACTER,
            character_id,
            target.session_id,
        )?];
        events.extend(Self::stress_bracket(&stamp, &target, &next)?);
        self.commit(guard, events).await?;

        info!(
            campaign_id = %campaign_id,
            character_id = %character_id,
            life_state = ?resolved.life_state_after,
            "death move resolved"
        );
        self.character_state(campaign_id, character_id).await
    }

    /// Finish a blaze of glory: the character dies.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] unless the character is in a blaze of
    /// glory.
    pub async fn resolve_blaze_of_glory(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<CharacterState, GameError> {
        let guard = self.lock(campaign_id).await;
        let target = self
            .target(campaign_id, character_id, CampaignOperation::SessionAction)
            .await?;
        if target.state.life_state != LifeState::BlazeOfGlory {
            return Err(InvalidStateError::new(format!(
                "character {character_id} is {}, not in a blaze of glory",
                target.state.life_state
            ))
            .into());
        }

        let stamp = self.stamp(ctx, campaign_id);
        let event = system_event(
            &stamp,
            &BlazeOfGloryResolved {
                character_id,
                life_state_after: Some(LifeState::Dead),
            },
            entity::CHARACTER,
            character_id,
            target.session_id,
        )?;
        self.commit(guard, vec![event]).await?;
        self.character_state(campaign_id, character_id).await
    }

    /// Record the outcome of an attack roll.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for missing targets or outcome, or a
    /// `roll_seq` that is not in the log; [`GameError::InvalidState`] when
    /// no session is active.
    pub async fn record_attack(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        attack: AttackResolved,
    ) -> Result<Event, GameError> {
        let (character_id, roll_seq) = (attack.character_id, attack.roll_seq);
        self.record_roll(ctx, campaign_id, character_id, roll_seq, &attack)
            .await
    }

    /// Record the outcome of a reaction roll.
    ///
    /// # Errors
    ///
    /// As [`Game::record_attack`].
    pub async fn record_reaction(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        reaction: ReactionResolved,
    ) -> Result<Event, GameError> {
        let (character_id, roll_seq) = (reaction.character_id, reaction.roll_seq);
        self.record_roll(ctx, campaign_id, character_id, roll_seq, &reaction)
            .await
    }

    /// Record a damage roll.
    ///
    /// # Errors
    ///
    /// As [`Game::record_attack`].
    pub async fn record_damage_roll(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        roll: DamageRollResolved,
    ) -> Result<Event, GameError> {
        let (character_id, roll_seq) = (roll.character_id, roll.roll_seq);
        self.record_roll(ctx, campaign_id, character_id, roll_seq, &roll)
            .await
    }

    async fn record_roll<P: Payload>(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        character_id: CharacterId,
        roll_seq: u64,
        payload: &P,
    ) -> Result<Event, GameError> {
        let guard = self.lock(campaign_id).await;
        let campaign = self
            .campaign_for(campaign_id, CampaignOperation::SessionAction)
            .await?;
        require_daggerheart(&campaign)?;
        let session = self.require_active_session(campaign_id).await?;
        self.active_character(campaign_id, character_id).await?;
        if roll_seq > self.events().last_seq(campaign_id).await? {
            return Err(ValidationError::field(
                "roll_seq",
                format!("roll_seq {roll_seq} is past the end of the log"),
            )
            .into());
        }

        let stamp = self.stamp(ctx, campaign_id);
        let event = system_event(
            &stamp,
            payload,
            entity::CHARACTER,
            character_id,
            Some(session.id),
        )?;
        let mut stored = self.commit(guard, vec![event]).await?;
        stored
            .pop()
            .ok_or_else(|| GameError::Aborted("writer returned no event".to_owned()))
    }

    /// Add to the campaign's GM Fear pool. Returns the new value.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for a non-positive amount;
    /// [`GameError::InvalidState`] when the pool would pass its cap.
    pub async fn gain_gm_fear(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        amount: i32,
        reason: &str,
    ) -> Result<i32, GameError> {
        self.change_gm_fear(ctx, campaign_id, reason, |current| {
            gain_gm_fear(current, amount)
        })
        .await
    }

    /// Spend from the campaign's GM Fear pool. Returns the new value.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for a non-positive amount;
    /// [`GameError::InvalidState`] when the pool holds too little.
    pub async fn spend_gm_fear(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        amount: i32,
        reason: &str,
    ) -> Result<i32, GameError> {
        self.change_gm_fear(ctx, campaign_id, reason, |current| {
            spend_gm_fear(current, amount)
        })
        .await
    }

    async fn change_gm_fear(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        reason: &str,
        change: impl FnOnce(i32) -> Result<(i32, i32), lorekeep_types::DomainError>,
    ) -> Result<i32, GameError> {
        let guard = self.lock(campaign_id).await;
        let campaign = self
            .campaign_for(campaign_id, CampaignOperation::Mutate)
            .await?;
        require_daggerheart(&campaign)?;
        let (before, after) = change(campaign.gm_fear)?;
        let session_id = self.active_session(campaign_id).await?.map(|s| s.id);

        let stamp = self.stamp(ctx, campaign_id);
        let event = system_event(
            &stamp,
            &GmFearChanged {
                before,
                after,
                reason: reason.trim().to_owned(),
            },
            entity::CAMPAIGN,
            campaign_id,
            session_id,
        )?;
        self.commit(guard, vec![event]).await?;

        info!(campaign_id = %campaign_id, before, after, "gm fear changed");
        Ok(self.campaign(campaign_id).await?.gm_fear)
    }
}

fn log_damage(campaign_id: CampaignId, applied: &DamageApplied) {
    info!(
        campaign_id = %campaign_id,
        character_id = %applied.character_id,
        amount = applied.amount,
        severity = ?applied.severity,
        armor_spent = applied.armor_spent,
        hp_after = applied.hp_after,
        "damage applied"
    );
}
