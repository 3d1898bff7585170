//! Characters: read model and creation input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lorekeep_types::{CampaignId, CharacterId, CharacterKind, ParticipantId, ValidationError};

/// A player or non-player character.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Character identity.
    pub id: CharacterId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Character name.
    pub name: String,
    /// PC or NPC.
    pub kind: CharacterKind,
    /// Free-form notes.
    pub notes: String,
    /// Controlling participant, if assigned.
    pub participant_id: Option<ParticipantId>,
    /// When the character was created.
    pub created_at: DateTime<Utc>,
    /// When the character last changed.
    pub updated_at: DateTime<Utc>,
    /// Set once the character has been deleted. Rows are never removed.
    pub deleted_at: Option<DateTime<Utc>>,
}

impl Character {
    /// Whether the character is still in play.
    pub const fn is_active(&self) -> bool {
        self.deleted_at.is_none()
    }
}

/// Input for creating a character.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCharacterInput {
    /// Name. Trimmed; required.
    pub name: String,
    /// PC or NPC; required.
    pub kind: Option<CharacterKind>,
    /// Notes. Trimmed.
    pub notes: String,
    /// Controlling participant.
    pub participant_id: Option<ParticipantId>,
}

/// A character input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCharacter {
    /// Trimmed name.
    pub name: String,
    /// PC or NPC.
    pub kind: CharacterKind,
    /// Trimmed notes.
    pub notes: String,
    /// Controlling participant (never nil).
    pub participant_id: Option<ParticipantId>,
}

/// Trim and validate character input.
///
/// A nil participant id is treated as "unassigned".
///
/// # Errors
///
/// Returns a field-tagged [`ValidationError`] for a blank name or a missing
/// kind.
pub fn normalize_create_character(
    input: CreateCharacterInput,
) -> Result<NormalizedCharacter, ValidationError> {
    let name = input.name.trim().to_owned();
    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }
    let kind = input.kind.ok_or_else(|| ValidationError::required("kind"))?;
    Ok(NormalizedCharacter {
        name,
        kind,
        notes: input.notes.trim().to_owned(),
        participant_id: input.participant_id.filter(|id| !id.is_nil()),
    })
}
