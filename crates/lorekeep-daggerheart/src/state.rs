//! Character vitals as the Daggerheart system tracks them.
//!
//! Every bounded value is clamped by its sibling cap after every change, so
//! a stored [`CharacterState`] is always in range no matter what deltas the
//! log contains.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::profile::Profile;

/// Highest hope maximum a character can have.
pub const HOPE_MAX_CAP: i32 = 6;
/// Highest hit-point maximum a character can have.
pub const HP_MAX_CAP: i32 = 12;
/// Highest stress maximum a character can have.
pub const STRESS_MAX_CAP: i32 = 12;
/// Highest armor maximum a character can have.
pub const ARMOR_MAX_CAP: i32 = 12;
/// Hope a newly created character starts with.
pub const STARTING_HOPE: i32 = 2;

/// Condition applied while stress sits at its maximum.
pub const CONDITION_VULNERABLE: &str = "vulnerable";
/// Condition applied while a character is out of sight.
pub const CONDITION_HIDDEN: &str = "hidden";
/// Condition applied while a character cannot move.
pub const CONDITION_RESTRAINED: &str = "restrained";

/// Whether a character is still in play.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LifeState {
    /// Up and fighting.
    #[default]
    Alive,
    /// Down after avoiding death; out of the scene.
    Unconscious,
    /// Taking a final action before dying.
    BlazeOfGlory,
    /// Dead.
    Dead,
}

impl LifeState {
    /// Stable wire name.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alive => "alive",
            Self::Unconscious => "unconscious",
            Self::BlazeOfGlory => "blaze_of_glory",
            Self::Dead => "dead",
        }
    }
}

impl core::fmt::Display for LifeState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Derived vitals of one character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CharacterState {
    /// Hit points remaining.
    pub hp: i32,
    /// Hit-point maximum.
    pub hp_max: i32,
    /// Current hope.
    pub hope: i32,
    /// Hope maximum.
    pub hope_max: i32,
    /// Marked stress.
    pub stress: i32,
    /// Stress maximum.
    pub stress_max: i32,
    /// Armor slots remaining.
    pub armor: i32,
    /// Armor slot maximum.
    pub armor_max: i32,
    /// Active conditions, sorted and de-duplicated.
    #[serde(default)]
    pub conditions: BTreeSet<String>,
    /// Whether the character is still in play.
    #[serde(default)]
    pub life_state: LifeState,
}

impl CharacterState {
    /// Initial vitals for a character with `profile`: full hit points,
    /// starting hope, no stress, no armor, alive.
    pub fn initial(profile: &Profile) -> Self {
        let mut state = Self {
            hp: profile.hp_max,
            hp_max: profile.hp_max,
            hope: STARTING_HOPE,
            hope_max: HOPE_MAX_CAP,
            stress: 0,
            stress_max: profile.stress_max,
            armor: 0,
            armor_max: profile.armor_max,
            conditions: BTreeSet::new(),
            life_state: LifeState::Alive,
        };
        state.clamp();
        state
    }

    /// Force every field into range: caps into `[0, CAP]`, values into
    /// `[0, cap]`.
    pub fn clamp(&mut self) {
        self.hp_max = self.hp_max.clamp(0, HP_MAX_CAP);
        self.hope_max = self.hope_max.clamp(0, HOPE_MAX_CAP);
        self.stress_max = self.stress_max.clamp(0, STRESS_MAX_CAP);
        self.armor_max = self.armor_max.clamp(0, ARMOR_MAX_CAP);
        self.hp = self.hp.clamp(0, self.hp_max);
        self.hope = self.hope.clamp(0, self.hope_max);
        self.stress = self.stress.clamp(0, self.stress_max);
        self.armor = self.armor.clamp(0, self.armor_max);
    }

    /// Whether the condition set contains `condition`.
    pub fn has_condition(&self, condition: &str) -> bool {
        self.conditions.contains(condition)
    }
}

/// Trim, lower-case, and de-duplicate condition names, dropping blanks.
pub fn normalize_conditions<I, S>(conditions: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    conditions
        .into_iter()
        .map(|c| c.as_ref().trim().to_lowercase())
        .filter(|c| !c.is_empty())
        .collect()
}
