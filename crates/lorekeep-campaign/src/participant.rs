//! Participant seats: read model and creation input.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lorekeep_types::{CampaignId, Controller, ParticipantId, ParticipantRole, ValidationError};

/// A GM or player seat in a campaign.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Participant {
    /// Participant identity.
    pub id: ParticipantId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Display name.
    pub display_name: String,
    /// GM or player.
    pub role: ParticipantRole,
    /// Human or AI seat.
    pub controller: Controller,
    /// When the participant joined.
    pub created_at: DateTime<Utc>,
    /// When the participant last changed.
    pub updated_at: DateTime<Utc>,
    /// Set once the participant has left. Rows are never removed.
    pub left_at: Option<DateTime<Utc>>,
}

impl Participant {
    /// Whether the participant is still seated.
    pub const fn is_active(&self) -> bool {
        self.left_at.is_none()
    }
}

/// Input for seating a participant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateParticipantInput {
    /// Display name. Trimmed; required.
    pub display_name: String,
    /// Role; required.
    pub role: Option<ParticipantRole>,
    /// Controller; defaults to human.
    pub controller: Option<Controller>,
}

/// A participant input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedParticipant {
    /// Trimmed display name.
    pub display_name: String,
    /// Role.
    pub role: ParticipantRole,
    /// Controller.
    pub controller: Controller,
}

/// Trim and validate participant input.
///
/// # Errors
///
/// Returns a field-tagged [`ValidationError`] for a blank display name or
/// a missing role.
pub fn normalize_create_participant(
    input: CreateParticipantInput,
) -> Result<NormalizedParticipant, ValidationError> {
    let display_name = input.display_name.trim().to_owned();
    if display_name.is_empty() {
        return Err(ValidationError::required("display_name"));
    }
    let role = input.role.ok_or_else(|| ValidationError::required("role"))?;
    Ok(NormalizedParticipant {
        display_name,
        role,
        controller: input.controller.unwrap_or(Controller::Human),
    })
}
