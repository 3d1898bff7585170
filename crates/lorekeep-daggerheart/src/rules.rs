//! Pure rule helpers: state patches, the vulnerable bracket, damage.
//!
//! Nothing here touches storage. Callers resolve a change against the
//! current projection, append the resulting payload, and let the adapter
//! fold it back in.

use std::collections::BTreeSet;

use lorekeep_types::{CharacterId, ValidationError};

use crate::events::{CharacterStatePatched, DamageApplied, DeathMove, DeathMoveResolved, Severity};
use crate::profile::check_range;
use crate::state::{
    ARMOR_MAX_CAP, CONDITION_VULNERABLE, CharacterState, HOPE_MAX_CAP, HP_MAX_CAP, LifeState,
    STRESS_MAX_CAP,
};

/// A requested change to one vital: an absolute target or a delta.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Adjust {
    /// Set the value outright.
    Set(i32),
    /// Add to (or subtract from) the current value.
    Delta(i32),
}

impl Adjust {
    /// The unclamped value this adjustment produces from `current`.
    pub const fn resolve(self, current: i32) -> i32 {
        match self {
            Self::Set(value) => value,
            Self::Delta(delta) => current.saturating_add(delta),
        }
    }
}

/// A caller's requested vitals change. `None` leaves a field alone.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchRequest {
    /// Hit points.
    pub hp: Option<Adjust>,
    /// Hit-point maximum.
    pub hp_max: Option<Adjust>,
    /// Hope.
    pub hope: Option<Adjust>,
    /// Hope maximum.
    pub hope_max: Option<Adjust>,
    /// Stress.
    pub stress: Option<Adjust>,
    /// Stress maximum.
    pub stress_max: Option<Adjust>,
    /// Armor slots.
    pub armor: Option<Adjust>,
    /// Armor maximum.
    pub armor_max: Option<Adjust>,
    /// Life state.
    pub life_state: Option<LifeState>,
}

fn changed(current: i32, next: i32) -> Option<i32> {
    (current != next).then_some(next)
}

/// Resolve `request` against `current` into a patch payload.
///
/// Caps are resolved first and clamped to `[0, CAP]`; values are then
/// clamped to `[0, cap]` using the new caps. Only fields whose resolved
/// value differs from `current` are set, so a request that changes nothing
/// yields an empty patch.
pub fn resolve_patch(
    character_id: CharacterId,
    current: &CharacterState,
    request: &PatchRequest,
) -> CharacterStatePatched {
    let resolve = |adjust: Option<Adjust>, value: i32, cap: i32| {
        adjust.map_or(value, |a| a.resolve(value)).clamp(0, cap)
    };
    let hp_max = resolve(request.hp_max, current.hp_max, HP_MAX_CAP);
    let hope_max = resolve(request.hope_max, current.hope_max, HOPE_MAX_CAP);
    let stress_max = resolve(request.stress_max, current.stress_max, STRESS_MAX_CAP);
    let armor_max = resolve(request.armor_max, current.armor_max, ARMOR_MAX_CAP);

    CharacterStatePatched {
        character_id,
        hp_after: changed(current.hp, resolve(request.hp, current.hp, hp_max)),
        hp_max_after: changed(current.hp_max, hp_max),
        hope_after: changed(current.hope, resolve(request.hope, current.hope, hope_max)),
        hope_max_after: changed(current.hope_max, hope_max),
        stress_after: changed(
            current.stress,
            resolve(request.stress, current.stress, stress_max),
        ),
        stress_max_after: changed(current.stress_max, stress_max),
        armor_after: changed(current.armor, resolve(request.armor, current.armor, armor_max)),
        armor_max_after: changed(current.armor_max, armor_max),
        life_state_after: request.life_state.filter(|state| *state != current.life_state),
    }
}

/// `state` with `patch` applied and every field clamped.
pub fn apply_patch(state: &CharacterState, patch: &CharacterStatePatched) -> CharacterState {
    let mut next = state.clone();
    if let Some(v) = patch.hp_max_after {
        next.hp_max = v;
    }
    if let Some(v) = patch.hope_max_after {
        next.hope_max = v;
    }
    if let Some(v) = patch.stress_max_after {
        next.stress_max = v;
    }
    if let Some(v) = patch.armor_max_after {
        next.armor_max = v;
    }
    if let Some(v) = patch.hp_after {
        next.hp = v;
    }
    if let Some(v) = patch.hope_after {
        next.hope = v;
    }
    if let Some(v) = patch.stress_after {
        next.stress = v;
    }
    if let Some(v) = patch.armor_after {
        next.armor = v;
    }
    if let Some(v) = patch.life_state_after {
        next.life_state = v;
    }
    next.clamp();
    next
}

/// The condition set after a stress change, if the vulnerable bracket
/// moves.
///
/// A character is vulnerable exactly while `stress_after == stress_max`
/// with a positive `stress_max`. Returns `None` when stress did not change
/// or when the set would be identical.
pub fn vulnerable_transition(
    conditions: &BTreeSet<String>,
    stress_before: i32,
    stress_after: i32,
    stress_max: i32,
) -> Option<BTreeSet<String>> {
    if stress_before == stress_after {
        return None;
    }
    let should_be = stress_max > 0 && stress_after == stress_max;
    let is = conditions.contains(CONDITION_VULNERABLE);
    if should_be == is {
        return None;
    }
    let mut next = conditions.clone();
    if should_be {
        next.insert(CONDITION_VULNERABLE.to_owned());
    } else {
        next.remove(CONDITION_VULNERABLE);
    }
    Some(next)
}

/// Severity of `amount` damage against `(major, severe)` thresholds.
pub const fn damage_severity(amount: i32, thresholds: (i32, i32)) -> Severity {
    let (major, severe) = thresholds;
    if amount < 1 {
        Severity::None
    } else if amount < major {
        Severity::Minor
    } else if amount < severe {
        Severity::Major
    } else {
        Severity::Severe
    }
}

/// Resolve `amount` damage against a character.
///
/// When `use_armor` is set and an armor slot is available, one slot is
/// spent to lower the severity by one row. Hit points never drop below 0.
pub fn resolve_damage(
    character_id: CharacterId,
    state: &CharacterState,
    thresholds: (i32, i32),
    amount: i32,
    use_armor: bool,
) -> DamageApplied {
    let mut severity = damage_severity(amount, thresholds);
    let armor_spent = use_armor && state.armor > 0 && severity != Severity::None;
    let mut armor_after = None;
    if armor_spent {
        severity = severity.reduced();
        armor_after = Some(state.armor.saturating_sub(1));
    }
    DamageApplied {
        character_id,
        amount,
        severity,
        armor_spent,
        hp_after: state.hp.saturating_sub(severity.hp_marked()).max(0),
        armor_after,
    }
}

/// Faces on each duality die.
pub const DUALITY_DIE_SIDES: i32 = 12;

fn require_die(field: &str, value: Option<i32>) -> Result<i32, ValidationError> {
    let value = value.ok_or_else(|| ValidationError::required(field))?;
    check_range(field, value, 1, DUALITY_DIE_SIDES)?;
    Ok(value)
}

/// Resolve a death move for a character at zero hit points.
///
/// - Avoid death: the character drops unconscious; a hope die at or below
///   `level` leaves a scar, costing one hope slot.
/// - Blaze of glory: the character takes one last action, then dies.
/// - Risk it all: on a higher hope die the character stays up and clears
///   that many hit points, spilling the rest into stress; on a higher fear
///   die they die; on matching dice they clear every hit point and all
///   stress.
///
/// # Errors
///
/// Returns a field-tagged [`ValidationError`] when a die the move needs is
/// missing or outside `1..=12`.
pub fn resolve_death_move(
    character_id: CharacterId,
    state: &CharacterState,
    level: i32,
    death_move: DeathMove,
    hope_die: Option<i32>,
    fear_die: Option<i32>,
) -> Result<DeathMoveResolved, ValidationError> {
    let mut resolved = DeathMoveResolved {
        character_id,
        death_move: Some(death_move),
        ..DeathMoveResolved::default()
    };
    match death_move {
        DeathMove::AvoidDeath => {
            let hope = require_die("hope_die", hope_die)?;
            resolved.hope_die = Some(hope);
            resolved.life_state_after = Some(LifeState::Unconscious);
            if hope <= level {
                let hope_max = state.hope_max.saturating_sub(1).max(0);
                resolved.hope_max_after = Some(hope_max);
                resolved.hope_after = Some(state.hope.min(hope_max));
            }
        }
        DeathMove::BlazeOfGlory => {
            resolved.life_state_after = Some(LifeState::BlazeOfGlory);
        }
        DeathMove::RiskItAll => {
            let hope = require_die("hope_die", hope_die)?;
            let fear = require_die("fear_die", fear_die)?;
            resolved.hope_die = Some(hope);
            resolved.fear_die = Some(fear);
            if hope == fear {
                resolved.life_state_after = Some(LifeState::Alive);
                resolved.hp_after = Some(state.hp_max);
                resolved.stress_after = Some(0);
            } else if hope > fear {
                let healed = hope.min(state.hp_max.saturating_sub(state.hp).max(0));
                let relief = hope.saturating_sub(healed);
                resolved.life_state_after = Some(LifeState::Alive);
                resolved.hp_after = Some(state.hp.saturating_add(healed));
                resolved.stress_after = Some(state.stress.saturating_sub(relief).max(0));
            } else {
                resolved.life_state_after = Some(LifeState::Dead);
            }
        }
    }
    Ok(resolved)
}
