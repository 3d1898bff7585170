//! The Daggerheart [`SystemAdapter`]: folds system events into per-character
//! state and profile rows and the campaign GM Fear pool.

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use lorekeep_campaign::GM_FEAR_CAP;
use lorekeep_projection::{
    ApplyError, EventCheckError, ProjectionBatch, ProjectionStore, ProjectionWrite, SystemAdapter,
    SystemRow,
};
use lorekeep_types::codec::decode;
use lorekeep_types::{CampaignId, CharacterId, CharacterKind, Event, StorageError};

use crate::events::{
    AttackResolved, BlazeOfGloryResolved, CharacterStatePatched, ConditionChanged,
    DamageApplied, DamageRollResolved, DeathMoveResolved, GmFearChanged, ProfileUpdated,
    ReactionResolved, event_types,
};
use crate::profile::{Profile, profile_defaults};
use crate::rules::apply_patch;
use crate::state::{CharacterState, LifeState, normalize_conditions};
use crate::validate::validate_event;
use crate::{SYSTEM_ID, SYSTEM_VERSION};

/// Rules adapter for the Daggerheart system.
#[derive(Debug, Clone, Copy, Default)]
pub struct DaggerheartAdapter;

impl DaggerheartAdapter {
    /// Create the adapter.
    pub const fn new() -> Self {
        Self
    }
}

#[async_trait]
impl SystemAdapter for DaggerheartAdapter {
    fn system_id(&self) -> &'static str {
        SYSTEM_ID
    }

    fn system_version(&self) -> &'static str {
        SYSTEM_VERSION
    }

    fn validate(&self, event: &Event) -> Result<(), EventCheckError> {
        validate_event(event)
    }

    async fn apply(&self, store: &dyn ProjectionStore, event: &Event) -> Result<(), ApplyError> {
        let batch = match event.event_type.as_str() {
            event_types::PROFILE_UPDATED => profile_updated(store, event).await?,
            event_types::CHARACTER_STATE_PATCHED => state_patched(store, event).await?,
            event_types::CONDITION_CHANGED => condition_changed(store, event).await?,
            event_types::GM_FEAR_CHANGED => gm_fear_changed(event)?,
            event_types::DEATH_MOVE_RESOLVED => death_move_resolved(store, event).await?,
            event_types::BLAZE_OF_GLORY_RESOLVED => blaze_of_glory_resolved(store, event).await?,
            event_types::DAMAGE_APPLIED => damage_applied(store, event).await?,
            // Roll outcomes carry no derived state; decoding still rejects
            // corrupt payloads.
            event_types::ATTACK_RESOLVED => {
                let p: AttackResolved = decode(event)?;
                require_character(event, p.character_id)?;
                return Ok(());
            }
            event_types::REACTION_RESOLVED => {
                let p: ReactionResolved = decode(event)?;
                require_character(event, p.character_id)?;
                return Ok(());
            }
            event_types::DAMAGE_ROLL_RESOLVED => {
                let p: DamageRollResolved = decode(event)?;
                require_character(event, p.character_id)?;
                return Ok(());
            }
            other => {
                debug!(event_type = other, seq = event.seq, "unhandled daggerheart event type");
                return Ok(());
            }
        };
        store.commit(batch).await?;
        Ok(())
    }
}

fn require_character(event: &Event, character_id: CharacterId) -> Result<(), ApplyError> {
    if character_id.is_nil() {
        return Err(ApplyError::corrupt(event, "character_id is required"));
    }
    Ok(())
}

fn to_row<T: Serialize>(
    campaign_id: CampaignId,
    character_id: CharacterId,
    value: &T,
) -> Result<SystemRow, StorageError> {
    let data = serde_json::to_value(value).map_err(|e| StorageError::new("encode system row", e))?;
    Ok(SystemRow {
        campaign_id,
        system_id: SYSTEM_ID.to_owned(),
        character_id,
        data,
    })
}

fn from_row<T: DeserializeOwned>(data: serde_json::Value) -> Result<T, StorageError> {
    serde_json::from_value(data).map_err(|e| StorageError::new("decode system row", e))
}

/// The stored Daggerheart state of a character, if any.
///
/// # Errors
///
/// Returns [`StorageError`] when the store fails or the row does not decode.
pub async fn character_state(
    store: &dyn ProjectionStore,
    campaign_id: CampaignId,
    character_id: CharacterId,
) -> Result<Option<CharacterState>, StorageError> {
    store
        .get_system_state(campaign_id, SYSTEM_ID, character_id)
        .await?
        .map(from_row)
        .transpose()
}

/// The stored Daggerheart profile of a character, if any.
///
/// # Errors
///
/// Returns [`StorageError`] when the store fails or the row does not decode.
pub async fn character_profile(
    store: &dyn ProjectionStore,
    campaign_id: CampaignId,
    character_id: CharacterId,
) -> Result<Option<Profile>, StorageError> {
    store
        .get_system_profile(campaign_id, SYSTEM_ID, character_id)
        .await?
        .map(from_row)
        .transpose()
}

/// The stored state, or initial vitals from the stored profile when the
/// character has no state row yet.
async fn state_or_initial(
    store: &dyn ProjectionStore,
    campaign_id: CampaignId,
    character_id: CharacterId,
) -> Result<CharacterState, StorageError> {
    if let Some(state) = character_state(store, campaign_id, character_id).await? {
        return Ok(state);
    }
    let profile = match character_profile(store, campaign_id, character_id).await? {
        Some(profile) => profile,
        None => {
            warn!(
                campaign_id = %campaign_id,
                character_id = %character_id,
                "no daggerheart profile; initializing state from pc defaults"
            );
            profile_defaults(CharacterKind::Pc)
        }
    };
    Ok(CharacterState::initial(&profile))
}

fn state_batch(
    campaign_id: CampaignId,
    character_id: CharacterId,
    state: &CharacterState,
) -> Result<ProjectionBatch, StorageError> {
    Ok(ProjectionWrite::SystemState(to_row(campaign_id, character_id, state)?).into())
}

async fn profile_updated(
    store: &dyn ProjectionStore,
    event: &Event,
) -> Result<ProjectionBatch, ApplyError> {
    let p: ProfileUpdated = decode(event)?;
    require_character(event, p.character_id)?;
    let mut batch = ProjectionBatch::new();
    batch.push(ProjectionWrite::SystemProfile(to_row(
        event.campaign_id,
        p.character_id,
        &p.profile,
    )?));

    // Existing vitals follow the new caps.
    if let Some(mut state) = character_state(store, event.campaign_id, p.character_id).await? {
        state.hp_max = p.profile.hp_max;
        state.stress_max = p.profile.stress_max;
        state.armor_max = p.profile.armor_max;
        state.clamp();
        batch.push(ProjectionWrite::SystemState(to_row(
            event.campaign_id,
            p.character_id,
            &state,
        )?));
    }
    Ok(batch)
}

async fn state_patched(
    store: &dyn ProjectionStore,
    event: &Event,
) -> Result<ProjectionBatch, ApplyError> {
    let p: CharacterStatePatched = decode(event)?;
    require_character(event, p.character_id)?;
    let state = state_or_initial(store, event.campaign_id, p.character_id).await?;
    let next = apply_patch(&state, &p);
    Ok(state_batch(event.campaign_id, p.character_id, &next)?)
}

async fn condition_changed(
    store: &dyn ProjectionStore,
    event: &Event,
) -> Result<ProjectionBatch, ApplyError> {
    let p: ConditionChanged = decode(event)?;
    require_character(event, p.character_id)?;
    let mut state = state_or_initial(store, event.campaign_id, p.character_id).await?;
    state.conditions = normalize_conditions(&p.conditions_after);
    Ok(state_batch(event.campaign_id, p.character_id, &state)?)
}

fn gm_fear_changed(event: &Event) -> Result<ProjectionBatch, ApplyError> {
    let p: GmFearChanged = decode(event)?;
    Ok(ProjectionWrite::GmFear {
        campaign_id: event.campaign_id,
        value: p.after.clamp(0, GM_FEAR_CAP),
    }
    .into())
}

async fn death_move_resolved(
    store: &dyn ProjectionStore,
    event: &Event,
) -> Result<ProjectionBatch, ApplyError> {
    let p: DeathMoveResolved = decode(event)?;
    require_character(event, p.character_id)?;
    let mut state = state_or_initial(store, event.campaign_id, p.character_id).await?;
    if let Some(life_state) = p.life_state_after {
        state.life_state = life_state;
    }
    if let Some(v) = p.hope_max_after {
        state.hope_max = v;
    }
    if let Some(v) = p.hp_after {
        state.hp = v;
    }
    if let Some(v) = p.hope_after {
        state.hope = v;
    }
    if let Some(v) = p.stress_after {
        state.stress = v;
    }
    state.clamp();
    Ok(state_batch(event.campaign_id, p.character_id, &state)?)
}

async fn blaze_of_glory_resolved(
    store: &dyn ProjectionStore,
    event: &Event,
) -> Result<ProjectionBatch, ApplyError> {
    let p: BlazeOfGloryResolved = decode(event)?;
    require_character(event, p.character_id)?;
    let mut state = state_or_initial(store, event.campaign_id, p.character_id).await?;
    state.life_state = p.life_state_after.unwrap_or(LifeState::Dead);
    Ok(state_batch(event.campaign_id, p.character_id, &state)?)
}

async fn damage_applied(
    store: &dyn ProjectionStore,
    event: &Event,
) -> Result<ProjectionBatch, ApplyError> {
    let p: DamageApplied = decode(event)?;
    require_character(event, p.character_id)?;
    let mut state = state_or_initial(store, event.campaign_id, p.character_id).await?;
    state.hp = p.hp_after;
    if let Some(armor) = p.armor_after {
        state.armor = armor;
    }
    state.clamp();
    Ok(state_batch(event.campaign_id, p.character_id, &state)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeSet;

    use chrono::{TimeZone, Utc};
    use lorekeep_projection::MemoryProjectionStore;
    use lorekeep_types::{ErrorKind, NewEvent, Payload};

    use super::*;
    use crate::events::{DeathMove, Severity};

    struct Harness {
        store: MemoryProjectionStore,
        adapter: DaggerheartAdapter,
        campaign_id: CampaignId,
        seq: u64,
    }

    impl Harness {
        fn new() -> Self {
            Self {
                store: MemoryProjectionStore::new(),
                adapter: DaggerheartAdapter::new(),
                campaign_id: CampaignId::new(),
                seq: 0,
            }
        }

        fn event<P: Payload>(&mut self, payload: &P) -> Event {
            self.seq += 1;
            let at = Utc.with_ymd_and_hms(2026, 2, 1, 19, 0, 0).unwrap();
            NewEvent::from_payload(self.campaign_id, payload, at)
                .unwrap()
                .with_system(SYSTEM_ID, SYSTEM_VERSION)
                .into_stored(self.seq)
        }

        async fn apply<P: Payload>(&mut self, payload: &P) -> Result<(), ApplyError> {
            let event = self.event(payload);
            self.adapter.apply(&self.store, &event).await
        }

        async fn state(&self, character_id: CharacterId) -> Option<CharacterState> {
            character_state(&self.store, self.campaign_id, character_id)
                .await
                .unwrap()
        }

        /// The creation cascade's system half: defaults, then initial vitals.
        async fn create(&mut self, kind: CharacterKind) -> CharacterId {
            let character_id = CharacterId::new();
            let profile = profile_defaults(kind);
            let initial = CharacterState::initial(&profile);
            self.apply(&ProfileUpdated {
                character_id,
                profile,
            })
            .await
            .unwrap();
            self.apply(&CharacterStatePatched {
                character_id,
                hp_after: Some(initial.hp),
                hp_max_after: Some(initial.hp_max),
                hope_after: Some(initial.hope),
                hope_max_after: Some(initial.hope_max),
                stress_after: Some(initial.stress),
                stress_max_after: Some(initial.stress_max),
                armor_after: Some(initial.armor),
                armor_max_after: Some(initial.armor_max),
                life_state_after: Some(initial.life_state),
            })
            .await
            .unwrap();
            character_id
        }
    }

    #[tokio::test]
    async fn creation_cascade_yields_initial_vitals() {
        let mut h = Harness::new();
        let npc = h.create(CharacterKind::Npc).await;
        let state = h.state(npc).await.unwrap();
        assert_eq!((state.hp, state.hp_max), (4, 4));
        assert_eq!((state.hope, state.hope_max), (2, 6));
        assert_eq!((state.stress, state.stress_max), (0, 3));
        assert_eq!(state.life_state, LifeState::Alive);
        assert!(
            character_profile(&h.store, h.campaign_id, npc)
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn patch_without_state_initializes_from_profile() {
        let mut h = Harness::new();
        let character_id = CharacterId::new();
        let mut profile = profile_defaults(CharacterKind::Pc);
        profile.hp_max = 9;
        h.apply(&ProfileUpdated {
            character_id,
            profile,
        })
        .await
        .unwrap();
        assert!(h.state(character_id).await.is_none());

        h.apply(&CharacterStatePatched {
            character_id,
            stress_after: Some(2),
            ..CharacterStatePatched::default()
        })
        .await
        .unwrap();
        let state = h.state(character_id).await.unwrap();
        assert_eq!((state.hp, state.hp_max, state.stress), (9, 9, 2));
    }

    #[tokio::test]
    async fn out_of_range_patch_is_clamped() {
        let mut h = Harness::new();
        let pc = h.create(CharacterKind::Pc).await;
        h.apply(&CharacterStatePatched {
            character_id: pc,
            hope_after: Some(40),
            stress_after: Some(-5),
            ..CharacterStatePatched::default()
        })
        .await
        .unwrap();
        let state = h.state(pc).await.unwrap();
        assert_eq!(state.hope, 6);
        assert_eq!(state.stress, 0);
    }

    #[tokio::test]
    async fn profile_update_lowers_caps_on_existing_state() {
        let mut h = Harness::new();
        let pc = h.create(CharacterKind::Pc).await;
        let mut profile = profile_defaults(CharacterKind::Pc);
        profile.hp_max = 3;
        h.apply(&ProfileUpdated {
            character_id: pc,
            profile,
        })
        .await
        .unwrap();
        let state = h.state(pc).await.unwrap();
        assert_eq!((state.hp, state.hp_max), (3, 3));
    }

    #[tokio::test]
    async fn condition_change_replaces_the_set() {
        let mut h = Harness::new();
        let pc = h.create(CharacterKind::Pc).await;
        let after: BTreeSet<String> = ["hidden".to_owned(), "vulnerable".to_owned()].into();
        h.apply(&ConditionChanged::between(pc, BTreeSet::new(), after.clone(), "test"))
            .await
            .unwrap();
        assert_eq!(h.state(pc).await.unwrap().conditions, after);
    }

    #[tokio::test]
    async fn gm_fear_is_stored_per_campaign() {
        let mut h = Harness::new();
        h.apply(&GmFearChanged {
            before: 0,
            after: 4,
            reason: "fear roll".to_owned(),
        })
        .await
        .unwrap();
        assert_eq!(h.store.get_gm_fear(h.campaign_id).await.unwrap(), Some(4));
    }

    #[tokio::test]
    async fn death_moves_set_life_state() {
        let mut h = Harness::new();
        let pc = h.create(CharacterKind::Pc).await;
        h.apply(&DeathMoveResolved {
            character_id: pc,
            death_move: Some(DeathMove::AvoidDeath),
            life_state_after: Some(LifeState::Unconscious),
            hope_max_after: Some(5),
            ..DeathMoveResolved::default()
        })
        .await
        .unwrap();
        let state = h.state(pc).await.unwrap();
        assert_eq!(state.life_state, LifeState::Unconscious);
        assert_eq!(state.hope_max, 5);

        h.apply(&BlazeOfGloryResolved {
            character_id: pc,
            life_state_after: Some(LifeState::Dead),
        })
        .await
        .unwrap();
        assert_eq!(h.state(pc).await.unwrap().life_state, LifeState::Dead);
    }

    #[tokio::test]
    async fn damage_sets_hp_and_armor() {
        let mut h = Harness::new();
        let pc = h.create(CharacterKind::Pc).await;
        h.apply(&DamageApplied {
            character_id: pc,
            amount: 4,
            severity: Severity::Major,
            armor_spent: false,
            hp_after: 4,
            armor_after: None,
        })
        .await
        .unwrap();
        assert_eq!(h.state(pc).await.unwrap().hp, 4);
    }

    #[tokio::test]
    async fn nil_character_is_corrupt() {
        let mut h = Harness::new();
        let err = h
            .apply(&CharacterStatePatched {
                hp_after: Some(1),
                ..CharacterStatePatched::default()
            })
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::CorruptEvent);
    }

    #[tokio::test]
    async fn roll_events_write_nothing() {
        let mut h = Harness::new();
        let pc = CharacterId::new();
        h.apply(&AttackResolved {
            character_id: pc,
            roll_seq: 3,
            targets: vec!["goblin".to_owned()],
            outcome: "roll_with_fear".to_owned(),
            ..AttackResolved::default()
        })
        .await
        .unwrap();
        assert!(h.state(pc).await.is_none());
    }
}
