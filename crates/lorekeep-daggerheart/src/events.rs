//! Daggerheart event types and payload schemas.
//!
//! All payloads are JSON with snake_case field names. `_after` fields are
//! optional: an absent field means "unchanged", which is distinct from an
//! explicit zero. Character ids default to nil when absent so that the
//! validator, not the decoder, reports them as missing.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use lorekeep_types::{CharacterId, Payload};

use crate::profile::Profile;
use crate::state::LifeState;

/// Event type tags owned by the Daggerheart system.
pub mod event_types {
    /// A character's profile was set or replaced.
    pub const PROFILE_UPDATED: &str = "daggerheart.profile_updated";
    /// One or more vitals of a character changed.
    pub const CHARACTER_STATE_PATCHED: &str = "daggerheart.character_state_patched";
    /// A character's condition set changed.
    pub const CONDITION_CHANGED: &str = "daggerheart.condition_changed";
    /// The campaign GM Fear pool changed.
    pub const GM_FEAR_CHANGED: &str = "daggerheart.gm_fear_changed";
    /// A character at zero hit points chose a death move.
    pub const DEATH_MOVE_RESOLVED: &str = "daggerheart.death_move_resolved";
    /// A character's blaze of glory ended.
    pub const BLAZE_OF_GLORY_RESOLVED: &str = "daggerheart.blaze_of_glory_resolved";
    /// An attack roll was resolved.
    pub const ATTACK_RESOLVED: &str = "daggerheart.attack_resolved";
    /// A reaction roll was resolved.
    pub const REACTION_RESOLVED: &str = "daggerheart.reaction_resolved";
    /// A damage roll was resolved.
    pub const DAMAGE_ROLL_RESOLVED: &str = "daggerheart.damage_roll_resolved";
    /// Damage was applied to a character.
    pub const DAMAGE_APPLIED: &str = "daggerheart.damage_applied";
}

/// The three death moves open to a character at zero hit points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeathMove {
    /// Drop unconscious and wake with a scar.
    AvoidDeath,
    /// Take one last critical action, then die.
    BlazeOfGlory,
    /// Roll duality dice: hope heals, fear kills.
    RiskItAll,
}

/// How much hit-point loss one instance of damage causes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// Below 1: no hit points marked.
    None,
    /// Below the major threshold: one hit point.
    Minor,
    /// Below the severe threshold: two hit points.
    Major,
    /// At or above the severe threshold: three hit points.
    Severe,
}

impl Severity {
    /// Hit points marked at this severity.
    pub const fn hp_marked(self) -> i32 {
        match self {
            Self::None => 0,
            Self::Minor => 1,
            Self::Major => 2,
            Self::Severe => 3,
        }
    }

    /// One row lower, as when an armor slot absorbs a hit.
    pub const fn reduced(self) -> Self {
        match self {
            Self::None | Self::Minor => Self::None,
            Self::Major => Self::Minor,
            Self::Severe => Self::Major,
        }
    }
}

/// Payload of `daggerheart.profile_updated`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileUpdated {
    /// The character.
    #[serde(default)]
    pub character_id: CharacterId,
    /// The full replacement profile.
    pub profile: Profile,
}

/// Payload of `daggerheart.character_state_patched`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterStatePatched {
    /// The character.
    #[serde(default)]
    pub character_id: CharacterId,
    /// New hit points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_after: Option<i32>,
    /// New hit-point maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_max_after: Option<i32>,
    /// New hope.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hope_after: Option<i32>,
    /// New hope maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hope_max_after: Option<i32>,
    /// New stress.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_after: Option<i32>,
    /// New stress maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_max_after: Option<i32>,
    /// New armor slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_after: Option<i32>,
    /// New armor maximum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_max_after: Option<i32>,
    /// New life state.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_state_after: Option<LifeState>,
}

impl CharacterStatePatched {
    /// Whether the patch changes nothing.
    pub const fn is_empty(&self) -> bool {
        self.hp_after.is_none()
            && self.hp_max_after.is_none()
            && self.hope_after.is_none()
            && self.hope_max_after.is_none()
            && self.stress_after.is_none()
            && self.stress_max_after.is_none()
            && self.armor_after.is_none()
            && self.armor_max_after.is_none()
            && self.life_state_after.is_none()
    }
}

/// Payload of `daggerheart.condition_changed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConditionChanged {
    /// The character.
    #[serde(default)]
    pub character_id: CharacterId,
    /// Conditions before the change.
    #[serde(default)]
    pub conditions_before: BTreeSet<String>,
    /// Conditions after the change.
    #[serde(default)]
    pub conditions_after: BTreeSet<String>,
    /// Conditions added.
    #[serde(default)]
    pub added: BTreeSet<String>,
    /// Conditions removed.
    #[serde(default)]
    pub removed: BTreeSet<String>,
    /// What caused the change (e.g. `stress_at_max`).
    #[serde(default)]
    pub source: String,
}

impl ConditionChanged {
    /// Build a change from two condition sets, computing the diff.
    pub fn between(
        character_id: CharacterId,
        before: BTreeSet<String>,
        after: BTreeSet<String>,
        source: impl Into<String>,
    ) -> Self {
        let added = after.difference(&before).cloned().collect();
        let removed = before.difference(&after).cloned().collect();
        Self {
            character_id,
            conditions_before: before,
            conditions_after: after,
            added,
            removed,
            source: source.into(),
        }
    }
}

/// Payload of `daggerheart.gm_fear_changed`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GmFearChanged {
    /// Pool before the change.
    #[serde(default)]
    pub before: i32,
    /// Pool after the change.
    pub after: i32,
    /// Why the pool changed.
    #[serde(default)]
    pub reason: String,
}

/// Payload of `daggerheart.death_move_resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeathMoveResolved {
    /// The character.
    #[serde(default)]
    pub character_id: CharacterId,
    /// The move chosen.
    #[serde(default, rename = "move", skip_serializing_if = "Option::is_none")]
    pub death_move: Option<DeathMove>,
    /// Life state after the move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_state_after: Option<LifeState>,
    /// Hit points after the move (risk it all with hope clears some).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hp_after: Option<i32>,
    /// Hope after the move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hope_after: Option<i32>,
    /// Hope maximum after the move (avoid death can leave a scar).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hope_max_after: Option<i32>,
    /// Stress after the move.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stress_after: Option<i32>,
    /// Hope die rolled, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hope_die: Option<i32>,
    /// Fear die rolled, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fear_die: Option<i32>,
}

/// Payload of `daggerheart.blaze_of_glory_resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlazeOfGloryResolved {
    /// The character.
    #[serde(default)]
    pub character_id: CharacterId,
    /// Life state after the blaze; always `dead`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub life_state_after: Option<LifeState>,
}

/// Payload of `daggerheart.attack_resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttackResolved {
    /// The attacker.
    #[serde(default)]
    pub character_id: CharacterId,
    /// Sequence of the roll being resolved.
    #[serde(default)]
    pub roll_seq: u64,
    /// Targets hit or missed.
    #[serde(default)]
    pub targets: Vec<String>,
    /// Roll outcome (e.g. `roll_with_hope`).
    #[serde(default)]
    pub outcome: String,
    /// Whether the attack hit.
    #[serde(default)]
    pub success: bool,
    /// Whether the roll was a critical.
    #[serde(default)]
    pub crit: bool,
}

/// Payload of `daggerheart.reaction_resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReactionResolved {
    /// The reacting character.
    #[serde(default)]
    pub character_id: CharacterId,
    /// Sequence of the roll being resolved.
    #[serde(default)]
    pub roll_seq: u64,
    /// Roll outcome.
    #[serde(default)]
    pub outcome: String,
    /// Whether the reaction succeeded.
    #[serde(default)]
    pub success: bool,
}

/// One die-group rolled for damage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DieRoll {
    /// Faces per die.
    pub sides: i32,
    /// Face shown by each die.
    #[serde(default)]
    pub results: Vec<i32>,
    /// Sum of `results`.
    #[serde(default)]
    pub total: i32,
}

/// Payload of `daggerheart.damage_roll_resolved`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageRollResolved {
    /// The character dealing damage.
    #[serde(default)]
    pub character_id: CharacterId,
    /// Sequence of the roll being resolved.
    #[serde(default)]
    pub roll_seq: u64,
    /// Dice rolled.
    #[serde(default)]
    pub rolls: Vec<DieRoll>,
    /// Flat modifier added.
    #[serde(default)]
    pub modifier: i32,
    /// Final damage total.
    #[serde(default)]
    pub total: i32,
    /// Whether the damage was a critical.
    #[serde(default)]
    pub critical: bool,
}

/// Payload of `daggerheart.damage_applied`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DamageApplied {
    /// The damaged character.
    #[serde(default)]
    pub character_id: CharacterId,
    /// Raw damage before thresholds.
    pub amount: i32,
    /// Severity after any armor reduction.
    pub severity: Severity,
    /// Whether an armor slot was spent.
    #[serde(default)]
    pub armor_spent: bool,
    /// Hit points after the damage.
    pub hp_after: i32,
    /// Armor slots after the damage.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub armor_after: Option<i32>,
}

macro_rules! bind_payload {
    ($($ty:ty => $tag:expr),+ $(,)?) => {
        $(
            impl Payload for $ty {
                const EVENT_TYPE: &'static str = $tag;
            }
        )+
    };
}

bind_payload! {
    ProfileUpdated => event_types::PROFILE_UPDATED,
    CharacterStatePatched => event_types::CHARACTER_STATE_PATCHED,
    ConditionChanged => event_types::CONDITION_CHANGED,
    GmFearChanged => event_types::GM_FEAR_CHANGED,
    DeathMoveResolved => event_types::DEATH_MOVE_RESOLVED,
    BlazeOfGloryResolved => event_types::BLAZE_OF_GLORY_RESOLVED,
    AttackResolved => event_types::ATTACK_RESOLVED,
    ReactionResolved => event_types::REACTION_RESOLVED,
    DamageRollResolved => event_types::DAMAGE_ROLL_RESOLVED,
    DamageApplied => event_types::DAMAGE_APPLIED,
}
