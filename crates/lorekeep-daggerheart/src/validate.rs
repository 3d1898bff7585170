//! Rule checks for stored Daggerheart events.
//!
//! Used by the maintenance tool's validate mode and by `lorekeep-core`
//! before appending. A check never touches projections: it judges a single
//! event on its own.

use std::collections::BTreeSet;

use lorekeep_campaign::GM_FEAR_CAP;
use lorekeep_projection::EventCheckError;
use lorekeep_types::codec::decode;
use lorekeep_types::{CharacterId, Event, ValidationError};

use crate::events::{
    AttackResolved, BlazeOfGloryResolved, CharacterStatePatched, ConditionChanged,
    DamageApplied, DamageRollResolved, DeathMoveResolved, GmFearChanged, ProfileUpdated,
    ReactionResolved, event_types,
};
use crate::profile::check_range;
use crate::state::{
    ARMOR_MAX_CAP, HOPE_MAX_CAP, HP_MAX_CAP, LifeState, STRESS_MAX_CAP, normalize_conditions,
};

/// Check one event against the Daggerheart rules.
///
/// Event types outside this system's set are accepted unchanged.
///
/// # Errors
///
/// [`EventCheckError::Corrupt`] when the payload does not decode,
/// [`EventCheckError::Invalid`] for the first rule broken.
pub fn validate_event(event: &Event) -> Result<(), EventCheckError> {
    match event.event_type.as_str() {
        event_types::PROFILE_UPDATED => {
            let p: ProfileUpdated = decode(event)?;
            require_character(p.character_id)?;
            p.profile.validate()?;
        }
        event_types::CHARACTER_STATE_PATCHED => {
            validate_state_patch(&decode(event)?)?;
        }
        event_types::CONDITION_CHANGED => {
            validate_condition_change(&decode(event)?)?;
        }
        event_types::GM_FEAR_CHANGED => {
            let p: GmFearChanged = decode(event)?;
            check_range("before", p.before, 0, GM_FEAR_CAP)?;
            check_range("after", p.after, 0, GM_FEAR_CAP)?;
        }
        event_types::DEATH_MOVE_RESOLVED => {
            validate_death_move(&decode(event)?)?;
        }
        event_types::BLAZE_OF_GLORY_RESOLVED => {
            let p: BlazeOfGloryResolved = decode(event)?;
            require_character(p.character_id)?;
            if p.life_state_after != Some(LifeState::Dead) {
                return Err(ValidationError::field(
                    "life_state_after",
                    "blaze of glory must end with life_state_after dead",
                )
                .into());
            }
        }
        event_types::ATTACK_RESOLVED => {
            let p: AttackResolved = decode(event)?;
            require_character(p.character_id)?;
            require_roll_seq(p.roll_seq)?;
            if p.targets.is_empty() {
                return Err(ValidationError::required("targets").into());
            }
            if p.targets.iter().any(|t| t.trim().is_empty()) {
                return Err(ValidationError::field("targets", "target ids must not be blank").into());
            }
            require_text("outcome", &p.outcome)?;
        }
        event_types::REACTION_RESOLVED => {
            let p: ReactionResolved = decode(event)?;
            require_character(p.character_id)?;
            require_roll_seq(p.roll_seq)?;
            require_text("outcome", &p.outcome)?;
        }
        event_types::DAMAGE_ROLL_RESOLVED => {
            let p: DamageRollResolved = decode(event)?;
            require_character(p.character_id)?;
            require_roll_seq(p.roll_seq)?;
            if p.rolls.is_empty() {
                return Err(ValidationError::required("rolls").into());
            }
            if p.rolls.iter().any(|r| r.sides < 1) {
                return Err(ValidationError::field("rolls", "die sides must be positive").into());
            }
        }
        event_types::DAMAGE_APPLIED => {
            let p: DamageApplied = decode(event)?;
            require_character(p.character_id)?;
            check_range("amount", p.amount, 0, i32::MAX)?;
            check_range("hp_after", p.hp_after, 0, HP_MAX_CAP)?;
            if let Some(armor) = p.armor_after {
                check_range("armor_after", armor, 0, ARMOR_MAX_CAP)?;
            }
        }
        _ => {}
    }
    Ok(())
}

fn require_character(id: CharacterId) -> Result<(), ValidationError> {
    if id.is_nil() {
        return Err(ValidationError::required("character_id"));
    }
    Ok(())
}

fn require_roll_seq(roll_seq: u64) -> Result<(), ValidationError> {
    if roll_seq == 0 {
        return Err(ValidationError::required("roll_seq"));
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::required(field));
    }
    Ok(())
}

fn check_optional(field: &str, value: Option<i32>, max: i32) -> Result<(), ValidationError> {
    value.map_or(Ok(()), |v| check_range(field, v, 0, max))
}

fn check_within(field: &str, value: Option<i32>, cap: Option<i32>) -> Result<(), ValidationError> {
    match (value, cap) {
        (Some(value), Some(cap)) if value > cap => Err(ValidationError::field(
            field,
            format!("{field} {value} exceeds its maximum {cap}"),
        )),
        _ => Ok(()),
    }
}

/// Check a state patch: known character, at least one field, every field
/// within its cap.
///
/// # Errors
///
/// Returns a field-tagged [`ValidationError`].
pub fn validate_state_patch(patch: &CharacterStatePatched) -> Result<(), ValidationError> {
    require_character(patch.character_id)?;
    if patch.is_empty() {
        return Err(ValidationError::new("state patch changes nothing"));
    }
    check_optional("hp_after", patch.hp_after, HP_MAX_CAP)?;
    check_optional("hp_max_after", patch.hp_max_after, HP_MAX_CAP)?;
    check_optional("hope_after", patch.hope_after, HOPE_MAX_CAP)?;
    check_optional("hope_max_after", patch.hope_max_after, HOPE_MAX_CAP)?;
    check_optional("stress_after", patch.stress_after, STRESS_MAX_CAP)?;
    check_optional("stress_max_after", patch.stress_max_after, STRESS_MAX_CAP)?;
    check_optional("armor_after", patch.armor_after, ARMOR_MAX_CAP)?;
    check_optional("armor_max_after", patch.armor_max_after, ARMOR_MAX_CAP)?;
    check_within("hp_after", patch.hp_after, patch.hp_max_after)?;
    check_within("hope_after", patch.hope_after, patch.hope_max_after)?;
    check_within("stress_after", patch.stress_after, patch.stress_max_after)?;
    check_within("armor_after", patch.armor_after, patch.armor_max_after)?;
    Ok(())
}

fn validate_condition_change(change: &ConditionChanged) -> Result<(), ValidationError> {
    require_character(change.character_id)?;
    if normalize_conditions(&change.conditions_after) != change.conditions_after {
        return Err(ValidationError::field(
            "conditions_after",
            "conditions must be trimmed, lower-case and non-blank",
        ));
    }
    if change.conditions_before == change.conditions_after {
        return Err(ValidationError::new("condition change changes nothing"));
    }
    let added: BTreeSet<String> = change
        .conditions_after
        .difference(&change.conditions_before)
        .cloned()
        .collect();
    if change.added != added {
        return Err(ValidationError::field("added", "added does not match the condition diff"));
    }
    let removed: BTreeSet<String> = change
        .conditions_before
        .difference(&change.conditions_after)
        .cloned()
        .collect();
    if change.removed != removed {
        return Err(ValidationError::field("removed", "removed does not match the condition diff"));
    }
    Ok(())
}

fn validate_death_move(resolved: &DeathMoveResolved) -> Result<(), ValidationError> {
    require_character(resolved.character_id)?;
    if resolved.death_move.is_none() {
        return Err(ValidationError::required("move"));
    }
    if resolved.life_state_after.is_none() {
        return Err(ValidationError::required("life_state_after"));
    }
    check_optional("hp_after", resolved.hp_after, HP_MAX_CAP)?;
    check_optional("hope_after", resolved.hope_after, HOPE_MAX_CAP)?;
    check_optional("hope_max_after", resolved.hope_max_after, HOPE_MAX_CAP)?;
    check_optional("stress_after", resolved.stress_after, STRESS_MAX_CAP)?;
    check_within("hope_after", resolved.hope_after, resolved.hope_max_after)?;
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::Utc;
    use lorekeep_types::{CampaignId, NewEvent, Payload};

    use super::*;
    use crate::events::{DeathMove, DieRoll};
    use crate::{SYSTEM_ID, SYSTEM_VERSION};

    fn event<P: Payload>(payload: &P) -> Event {
        NewEvent::from_payload(CampaignId::new(), payload, Utc::now())
            .unwrap()
            .with_system(SYSTEM_ID, SYSTEM_VERSION)
            .into_stored(1)
    }

    fn invalid_field(result: Result<(), EventCheckError>) -> Option<String> {
        match result {
            Err(EventCheckError::Invalid(err)) => err.field,
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn state_patch_rejects_negative_values() {
        let patch = CharacterStatePatched {
            character_id: CharacterId::new(),
            hp_after: Some(-1),
            ..CharacterStatePatched::default()
        };
        assert_eq!(invalid_field(validate_event(&event(&patch))).as_deref(), Some("hp_after"));
    }

    #[test]
    fn state_patch_rejects_hope_over_cap() {
        let patch = CharacterStatePatched {
            character_id: CharacterId::new(),
            hope_after: Some(7),
            ..CharacterStatePatched::default()
        };
        assert_eq!(invalid_field(validate_event(&event(&patch))).as_deref(), Some("hope_after"));
    }

    #[test]
    fn state_patch_requires_character() {
        let patch = CharacterStatePatched {
            stress_after: Some(1),
            ..CharacterStatePatched::default()
        };
        assert_eq!(
            invalid_field(validate_event(&event(&patch))).as_deref(),
            Some("character_id")
        );
    }

    #[test]
    fn valid_state_patch_passes() {
        let patch = CharacterStatePatched {
            character_id: CharacterId::new(),
            hp_after: Some(3),
            hp_max_after: Some(6),
            ..CharacterStatePatched::default()
        };
        assert!(validate_event(&event(&patch)).is_ok());
    }

    #[test]
    fn gm_fear_after_is_bounded() {
        let change = GmFearChanged {
            before: 10,
            after: 11,
            reason: "gain".to_owned(),
        };
        assert_eq!(invalid_field(validate_event(&event(&change))).as_deref(), Some("after"));
    }

    #[test]
    fn death_move_needs_move_and_outcome() {
        let mut resolved = DeathMoveResolved {
            character_id: CharacterId::new(),
            life_state_after: Some(LifeState::Dead),
            ..DeathMoveResolved::default()
        };
        assert_eq!(invalid_field(validate_event(&event(&resolved))).as_deref(), Some("move"));

        resolved.death_move = Some(DeathMove::AvoidDeath);
        assert!(validate_event(&event(&resolved)).is_ok());

        resolved.life_state_after = None;
        assert_eq!(
            invalid_field(validate_event(&event(&resolved))).as_deref(),
            Some("life_state_after")
        );
    }

    #[test]
    fn blaze_of_glory_must_end_dead() {
        let resolved = BlazeOfGloryResolved {
            character_id: CharacterId::new(),
            life_state_after: Some(LifeState::Unconscious),
        };
        assert_eq!(
            invalid_field(validate_event(&event(&resolved))).as_deref(),
            Some("life_state_after")
        );
    }

    #[test]
    fn attack_needs_targets_and_outcome() {
        let mut attack = AttackResolved {
            character_id: CharacterId::new(),
            roll_seq: 4,
            targets: vec![" ".to_owned()],
            outcome: "roll_with_hope".to_owned(),
            ..AttackResolved::default()
        };
        assert_eq!(invalid_field(validate_event(&event(&attack))).as_deref(), Some("targets"));

        attack.targets = vec!["goblin-1".to_owned()];
        attack.roll_seq = 0;
        assert_eq!(invalid_field(validate_event(&event(&attack))).as_deref(), Some("roll_seq"));

        attack.roll_seq = 4;
        assert!(validate_event(&event(&attack)).is_ok());
    }

    #[test]
    fn damage_roll_needs_rolls() {
        let mut roll = DamageRollResolved {
            character_id: CharacterId::new(),
            roll_seq: 2,
            ..DamageRollResolved::default()
        };
        assert_eq!(invalid_field(validate_event(&event(&roll))).as_deref(), Some("rolls"));

        roll.rolls.push(DieRoll {
            sides: 8,
            results: vec![5],
            total: 5,
        });
        assert!(validate_event(&event(&roll)).is_ok());
    }

    #[test]
    fn corrupt_payload_is_reported_as_corrupt() {
        let mut bad = event(&GmFearChanged::default());
        bad.payload = b"{not json".to_vec();
        assert!(matches!(validate_event(&bad), Err(EventCheckError::Corrupt(_))));
    }

    #[test]
    fn unknown_types_are_accepted() {
        let mut other = event(&GmFearChanged::default());
        other.event_type = "daggerheart.something_new".to_owned();
        other.payload = b"{not json".to_vec();
        assert!(validate_event(&other).is_ok());
    }
}
