//! Play sessions, session gates, and the session spotlight.
//!
//! A campaign has at most one active session. Inside it, a gate blocks play
//! until it is resolved or abandoned, and the spotlight records whether the
//! GM or a particular character currently has focus.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lorekeep_types::{
    ActorType, CampaignId, CharacterId, GateId, GateStatus, SessionId, SessionStatus,
    SpotlightType, ValidationError,
};

/// A play session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    /// Session identity.
    pub id: SessionId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Session name.
    pub name: String,
    /// Active or ended.
    pub status: SessionStatus,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// When the session last changed.
    pub updated_at: DateTime<Utc>,
    /// When the session ended.
    pub ended_at: Option<DateTime<Utc>>,
}

/// A gate opened within a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Gate {
    /// Gate identity.
    pub id: GateId,
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Session the gate was opened in.
    pub session_id: SessionId,
    /// Normalized gate type.
    pub gate_type: String,
    /// Lifecycle status.
    pub status: GateStatus,
    /// Why the gate was opened (or abandoned).
    pub reason: String,
    /// How the gate was resolved.
    pub resolution: String,
    /// When the gate was opened.
    pub created_at: DateTime<Utc>,
    /// When the gate last changed.
    pub updated_at: DateTime<Utc>,
    /// When the gate reached a terminal status.
    pub closed_at: Option<DateTime<Utc>>,
}

/// Who currently has focus in a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Spotlight {
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Session the spotlight belongs to.
    pub session_id: SessionId,
    /// GM or character.
    pub spotlight_type: SpotlightType,
    /// The character, for character spotlights.
    pub character_id: Option<CharacterId>,
    /// When the spotlight was last set.
    pub updated_at: DateTime<Utc>,
    /// Actor type that set it.
    pub updated_by_actor_type: ActorType,
    /// Actor that set it.
    pub updated_by_actor_id: Option<String>,
}

/// Trim a session name.
pub fn normalize_session_name(name: &str) -> String {
    name.trim().to_owned()
}

/// Validate and normalize a gate type: trimmed, required, lower-cased.
///
/// # Errors
///
/// Returns [`ValidationError`] (field `gate_type`) when blank.
pub fn normalize_gate_type(value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ValidationError::required("gate_type"));
    }
    Ok(trimmed.to_lowercase())
}

/// Trim a gate reason.
pub fn normalize_gate_reason(value: &str) -> String {
    value.trim().to_owned()
}

/// Validate and normalize a spotlight type string.
///
/// # Errors
///
/// Returns [`ValidationError`] (field `spotlight_type`) when blank or not
/// one of `gm` / `character`.
pub fn normalize_spotlight_type(value: &str) -> Result<SpotlightType, ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::required("spotlight_type"));
    }
    value.parse().map_err(|_unknown| {
        ValidationError::field("spotlight_type", format!("spotlight type {value:?} is invalid"))
    })
}

/// Check the spotlight target against its type. A nil id counts as empty.
///
/// # Errors
///
/// Returns [`ValidationError`] (field `character_id`) when a character
/// spotlight has no target or a GM spotlight has one.
pub fn validate_spotlight_target(
    spotlight_type: SpotlightType,
    character_id: Option<CharacterId>,
) -> Result<(), ValidationError> {
    let has_target = character_id.is_some_and(|id| !id.is_nil());
    match (spotlight_type, has_target) {
        (SpotlightType::Character, false) => Err(ValidationError::field(
            "character_id",
            "character id is required for character spotlight",
        )),
        (SpotlightType::Gm, true) => Err(ValidationError::field(
            "character_id",
            "character id must be empty for gm spotlight",
        )),
        _ => Ok(()),
    }
}
