//! The campaign read model, creation input, and GM Fear arithmetic.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use lorekeep_types::{
    CampaignId, CampaignStatus, DomainError, GmMode, InvalidStateError, ValidationError,
};

/// Upper bound of the campaign-wide GM Fear pool.
pub const GM_FEAR_CAP: i32 = 10;

/// Current state of a campaign, as maintained by the projection engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Campaign {
    /// Campaign identity.
    pub id: CampaignId,
    /// Display name.
    pub name: String,
    /// Game system the campaign is played with.
    pub game_system: String,
    /// How the GM seat is filled.
    pub gm_mode: GmMode,
    /// Free-form theme prompt.
    pub theme_prompt: String,
    /// Lifecycle status.
    pub status: CampaignStatus,
    /// GM Fear pool, `0..=GM_FEAR_CAP`.
    pub gm_fear: i32,
    /// Participants that have not left.
    pub participant_count: u32,
    /// Characters that have not been deleted.
    pub character_count: u32,
    /// When the campaign was created.
    pub created_at: DateTime<Utc>,
    /// When the campaign last changed.
    pub updated_at: DateTime<Utc>,
    /// When the campaign was completed, if it was.
    pub completed_at: Option<DateTime<Utc>>,
    /// When the campaign was last archived, if it is archived.
    pub archived_at: Option<DateTime<Utc>>,
}

impl Campaign {
    /// Move to `status` at `at`, maintaining the lifecycle timestamps.
    ///
    /// Legality is the caller's concern; see
    /// [`validate_transition`](crate::validate_transition).
    pub fn set_status(&mut self, status: CampaignStatus, at: DateTime<Utc>) {
        self.status = status;
        self.updated_at = at;
        match status {
            CampaignStatus::Completed => self.completed_at = Some(at),
            CampaignStatus::Archived => self.archived_at = Some(at),
            CampaignStatus::Draft => self.archived_at = None,
            CampaignStatus::Active => {}
        }
    }
}

/// Input for creating a campaign.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CreateCampaignInput {
    /// Display name. Trimmed; required.
    pub name: String,
    /// Game system id. Trimmed and lower-cased; required.
    pub game_system: String,
    /// GM mode; required.
    pub gm_mode: Option<GmMode>,
    /// Theme prompt. Trimmed.
    pub theme_prompt: String,
}

/// A creation input that passed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCampaign {
    /// Trimmed name.
    pub name: String,
    /// Normalized game system id.
    pub game_system: String,
    /// GM mode.
    pub gm_mode: GmMode,
    /// Trimmed theme prompt.
    pub theme_prompt: String,
}

/// Trim and validate campaign creation input.
///
/// # Errors
///
/// Returns a field-tagged [`ValidationError`] for a blank name, blank game
/// system, or missing GM mode.
pub fn normalize_create_campaign(
    input: CreateCampaignInput,
) -> Result<NormalizedCampaign, ValidationError> {
    let name = input.name.trim().to_owned();
    if name.is_empty() {
        return Err(ValidationError::required("name"));
    }
    let game_system = input.game_system.trim().to_ascii_lowercase();
    if game_system.is_empty() {
        return Err(ValidationError::required("game_system"));
    }
    let gm_mode = input.gm_mode.ok_or_else(|| ValidationError::required("gm_mode"))?;
    Ok(NormalizedCampaign {
        name,
        game_system,
        gm_mode,
        theme_prompt: input.theme_prompt.trim().to_owned(),
    })
}

/// Add `amount` to the GM Fear pool.
///
/// Returns `(before, after)`.
///
/// # Errors
///
/// [`ValidationError`] (field `amount`) if `amount <= 0`;
/// [`InvalidStateError`] if the result would exceed [`GM_FEAR_CAP`].
pub fn gain_gm_fear(current: i32, amount: i32) -> Result<(i32, i32), DomainError> {
    check_amount(amount)?;
    match current.checked_add(amount) {
        Some(after) if after <= GM_FEAR_CAP => Ok((current, after)),
        _ => Err(InvalidStateError::new(format!(
            "gm fear would exceed cap of {GM_FEAR_CAP} ({current} + {amount})"
        ))
        .into()),
    }
}

/// Remove `amount` from the GM Fear pool.
///
/// Returns `(before, after)`.
///
/// # Errors
///
/// [`ValidationError`] (field `amount`) if `amount <= 0`;
/// [`InvalidStateError`] if the pool holds less than `amount`.
pub fn spend_gm_fear(current: i32, amount: i32) -> Result<(i32, i32), DomainError> {
    check_amount(amount)?;
    match current.checked_sub(amount) {
        Some(after) if after >= 0 => Ok((current, after)),
        _ => Err(InvalidStateError::new(format!(
            "insufficient gm fear: have {current}, need {amount}"
        ))
        .into()),
    }
}

fn check_amount(amount: i32) -> Result<(), ValidationError> {
    if amount <= 0 {
        return Err(ValidationError::field("amount", "amount must be greater than zero"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use lorekeep_types::ErrorKind;

    use super::*;

    #[test]
    fn normalize_trims_and_lowercases() {
        let input = CreateCampaignInput {
            name: "  The Glade  ".to_owned(),
            game_system: " Daggerheart ".to_owned(),
            gm_mode: Some(GmMode::Human),
            theme_prompt: "moss and mist ".to_owned(),
        };
        let normalized = normalize_create_campaign(input).ok();
        assert_eq!(
            normalized,
            Some(NormalizedCampaign {
                name: "The Glade".to_owned(),
                game_system: "daggerheart".to_owned(),
                gm_mode: GmMode::Human,
                theme_prompt: "moss and mist".to_owned(),
            })
        );
    }

    #[test]
    fn normalize_rejects_blank_name_and_missing_mode() {
        let blank = CreateCampaignInput {
            name: "   ".to_owned(),
            game_system: "daggerheart".to_owned(),
            gm_mode: Some(GmMode::Ai),
            ..CreateCampaignInput::default()
        };
        assert_eq!(
            normalize_create_campaign(blank).err().and_then(|e| e.field),
            Some("name".to_owned())
        );

        let no_mode = CreateCampaignInput {
            name: "Campaign".to_owned(),
            game_system: "daggerheart".to_owned(),
            ..CreateCampaignInput::default()
        };
        assert_eq!(
            normalize_create_campaign(no_mode).err().and_then(|e| e.field),
            Some("gm_mode".to_owned())
        );
    }

    #[test]
    fn gm_fear_gain() {
        assert_eq!(gain_gm_fear(2, 3).ok(), Some((2, 5)));
        assert_eq!(gain_gm_fear(7, 3).ok(), Some((7, 10)));
    }

    #[test]
    fn gm_fear_rejects_non_positive_amounts() {
        for amount in [0, -2] {
            let gain = gain_gm_fear(1, amount).err().map(|e| e.kind());
            let spend = spend_gm_fear(1, amount).err().map(|e| e.kind());
            assert_eq!(gain, Some(ErrorKind::Validation));
            assert_eq!(spend, Some(ErrorKind::Validation));
        }
    }

    #[test]
    fn gm_fear_gain_past_cap_is_invalid_state() {
        let err = gain_gm_fear(10, 3).err();
        assert_eq!(err.map(|e| e.kind()), Some(ErrorKind::InvalidState));
    }

    #[test]
    fn gm_fear_spend() {
        assert_eq!(spend_gm_fear(5, 3).ok(), Some((5, 2)));
        let err = spend_gm_fear(1, 3).err();
        assert!(err.is_some_and(|e| e.to_string().contains("insufficient")));
    }

    #[test]
    fn set_status_maintains_timestamps() {
        let created = Utc::now();
        let mut campaign = Campaign {
            id: CampaignId::new(),
            name: "Glade".to_owned(),
            game_system: "daggerheart".to_owned(),
            gm_mode: GmMode::Human,
            theme_prompt: String::new(),
            status: CampaignStatus::Active,
            gm_fear: 0,
            participant_count: 0,
            character_count: 0,
            created_at: created,
            updated_at: created,
            completed_at: None,
            archived_at: None,
        };
        let later = created + chrono::Duration::minutes(5);
        campaign.set_status(CampaignStatus::Archived, later);
        assert_eq!(campaign.archived_at, Some(later));
        campaign.set_status(CampaignStatus::Draft, later);
        assert_eq!(campaign.archived_at, None);
        assert_eq!(campaign.updated_at, later);
    }
}
