//! Character profiles: the mostly static numbers a character is built from.

use serde::{Deserialize, Serialize};

use lorekeep_types::{CharacterKind, ValidationError};

use crate::state::{ARMOR_MAX_CAP, HP_MAX_CAP, STRESS_MAX_CAP};

/// Highest character level.
pub const MAX_LEVEL: i32 = 10;

/// The six Daggerheart traits.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Traits {
    /// Sprint, leap, maneuver.
    pub agility: i32,
    /// Lift, smash, grapple.
    pub strength: i32,
    /// Control, hide, tinker.
    pub finesse: i32,
    /// Perceive, sense, navigate.
    pub instinct: i32,
    /// Charm, perform, deceive.
    pub presence: i32,
    /// Recall, analyze, comprehend.
    pub knowledge: i32,
}

/// A named experience with its roll modifier.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Experience {
    /// Experience name.
    pub name: String,
    /// Modifier added when the experience applies.
    pub modifier: i32,
}

/// A character's profile.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    /// Character level, `1..=MAX_LEVEL`.
    pub level: i32,
    /// Hit-point maximum.
    pub hp_max: i32,
    /// Stress maximum.
    pub stress_max: i32,
    /// Difficulty to hit the character.
    pub evasion: i32,
    /// Damage at or above this marks two hit points.
    pub major_threshold: i32,
    /// Damage at or above this marks three hit points.
    pub severe_threshold: i32,
    /// Number of damage dice rolled on a hit.
    pub proficiency: i32,
    /// Armor score of equipped armor.
    pub armor_score: i32,
    /// Armor slot maximum.
    pub armor_max: i32,
    /// Trait modifiers.
    pub traits: Traits,
    /// Experiences.
    #[serde(default)]
    pub experiences: Vec<Experience>,
}

impl Profile {
    /// Damage thresholds as `(major, severe)`.
    pub const fn thresholds(&self) -> (i32, i32) {
        (self.major_threshold, self.severe_threshold)
    }

    /// Check the profile is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns a field-tagged [`ValidationError`] for the first bad value.
    pub fn validate(&self) -> Result<(), ValidationError> {
        check_range("level", self.level, 1, MAX_LEVEL)?;
        check_range("hp_max", self.hp_max, 1, HP_MAX_CAP)?;
        check_range("stress_max", self.stress_max, 0, STRESS_MAX_CAP)?;
        check_range("armor_max", self.armor_max, 0, ARMOR_MAX_CAP)?;
        check_range("evasion", self.evasion, 0, i32::MAX)?;
        check_range("proficiency", self.proficiency, 0, i32::MAX)?;
        check_range("armor_score", self.armor_score, 0, i32::MAX)?;
        check_range("major_threshold", self.major_threshold, 1, i32::MAX)?;
        if self.severe_threshold < self.major_threshold {
            return Err(ValidationError::field(
                "severe_threshold",
                "severe_threshold must not be below major_threshold",
            ));
        }
        if self.experiences.iter().any(|e| e.name.trim().is_empty()) {
            return Err(ValidationError::field("experiences", "experience name is required"));
        }
        Ok(())
    }
}

/// Check `value` lies in `min..=max`.
pub(crate) fn check_range(field: &str, value: i32, min: i32, max: i32) -> Result<(), ValidationError> {
    if value < min || value > max {
        let message = if max == i32::MAX {
            format!("{field} must be at least {min}, got {value}")
        } else {
            format!("{field} must be between {min} and {max}, got {value}")
        };
        return Err(ValidationError::field(field, message));
    }
    Ok(())
}

/// The profile a new character of `kind` starts with.
pub fn profile_defaults(kind: CharacterKind) -> Profile {
    match kind {
        CharacterKind::Pc => Profile {
            level: 1,
            hp_max: 6,
            stress_max: 6,
            evasion: 10,
            major_threshold: 3,
            severe_threshold: 6,
            proficiency: 1,
            armor_score: 0,
            armor_max: 0,
            traits: Traits {
                agility: 2,
                strength: 1,
                finesse: 1,
                instinct: 0,
                presence: 0,
                knowledge: -1,
            },
            experiences: Vec::new(),
        },
        CharacterKind::Npc => Profile {
            level: 1,
            hp_max: 4,
            stress_max: 3,
            evasion: 8,
            major_threshold: 4,
            severe_threshold: 8,
            proficiency: 1,
            armor_score: 0,
            armor_max: 0,
            traits: Traits::default(),
            experiences: Vec::new(),
        },
    }
}
