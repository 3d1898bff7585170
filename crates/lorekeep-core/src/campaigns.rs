//! Campaign lifecycle commands.

use tracing::info;

use lorekeep_campaign::{
    Campaign, CampaignOperation, CreateCampaignInput, normalize_create_campaign,
    validate_campaign_operation, validate_transition,
};
use lorekeep_types::payload::{CampaignCreated, CampaignUpdated};
use lorekeep_types::{CampaignId, CampaignStatus, ValidationError, entity};

use crate::error::GameError;
use crate::game::{CommandContext, Game};

/// Changes to a campaign's metadata. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CampaignPatch {
    /// New name. Trimmed; must not be blank.
    pub name: Option<String>,
    /// New theme prompt. Trimmed.
    pub theme_prompt: Option<String>,
}

impl Game {
    /// Create a campaign in draft status.
    ///
    /// # Errors
    ///
    /// [`GameError::Validation`] for a blank name, a missing GM mode, or a
    /// game system with no registered adapter.
    pub async fn create_campaign(
        &self,
        ctx: &CommandContext,
        input: CreateCampaignInput,
    ) -> Result<Campaign, GameError> {
        let normalized = normalize_create_campaign(input)?;
        if self.applier().system(&normalized.game_system).is_none() {
            return Err(ValidationError::field(
                "game_system",
                format!("game system {:?} is not supported", normalized.game_system),
            )
            .into());
        }

        let campaign_id = CampaignId::new();
        let guard = self.lock(campaign_id).await;
        let stamp = self.stamp(ctx, campaign_id);
        let event = stamp
            .event(&CampaignCreated {
                name: normalized.name,
                game_system: normalized.game_system,
                gm_mode: normalized.gm_mode,
                theme_prompt: normalized.theme_prompt,
            })?
            .with_entity(entity::CAMPAIGN, campaign_id);
        self.commit(guard, vec![event]).await?;

        info!(campaign_id = %campaign_id, "campaign created");
        self.campaign(campaign_id).await
    }

    /// Change a campaign's name or theme prompt.
    ///
    /// A patch that changes nothing appends nothing.
    ///
    /// # Errors
    ///
    /// [`GameError::NotFound`], [`GameError::InvalidState`] when the
    /// campaign is completed or archived, [`GameError::Validation`] for a
    /// blank name.
    pub async fn update_campaign(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        patch: CampaignPatch,
    ) -> Result<Campaign, GameError> {
        let guard = self.lock(campaign_id).await;
        let campaign = self.campaign_for(campaign_id, CampaignOperation::Mutate).await?;

        let name = match patch.name.as_deref().map(str::trim) {
            Some("") => return Err(ValidationError::required("name").into()),
            Some(name) if name != campaign.name => Some(name.to_owned()),
            _ => None,
        };
        let theme_prompt = patch
            .theme_prompt
            .as_deref()
            .map(str::trim)
            .filter(|theme| *theme != campaign.theme_prompt)
            .map(str::to_owned);
        if name.is_none() && theme_prompt.is_none() {
            return Ok(campaign);
        }

        let event = self
            .stamp(ctx, campaign_id)
            .event(&CampaignUpdated {
                name,
                theme_prompt,
                status: None,
            })?
            .with_entity(entity::CAMPAIGN, campaign_id);
        self.commit(guard, vec![event]).await?;
        self.campaign(campaign_id).await
    }

    /// Move a campaign along its lifecycle.
    ///
    /// # Errors
    ///
    /// [`GameError::InvalidState`] for an edge outside the lifecycle graph,
    /// a self-transition, or any transition while a session is active.
    pub async fn transition_campaign(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
        to: CampaignStatus,
    ) -> Result<Campaign, GameError> {
        let guard = self.lock(campaign_id).await;
        let campaign = self.campaign(campaign_id).await?;
        let op = match to {
            CampaignStatus::Active => CampaignOperation::Mutate,
            CampaignStatus::Completed => CampaignOperation::End,
            CampaignStatus::Archived => CampaignOperation::Archive,
            CampaignStatus::Draft => CampaignOperation::Restore,
        };
        validate_campaign_operation(campaign.status, op)?;
        let has_active_session = self.active_session(campaign_id).await?.is_some();
        validate_transition(campaign.status, to, has_active_session)?;

        let event = self
            .stamp(ctx, campaign_id)
            .event(&CampaignUpdated {
                status: Some(to),
                ..CampaignUpdated::default()
            })?
            .with_entity(entity::CAMPAIGN, campaign_id);
        self.commit(guard, vec![event]).await?;

        info!(campaign_id = %campaign_id, from = %campaign.status, to = %to, "campaign status changed");
        self.campaign(campaign_id).await
    }

    /// End an active campaign.
    ///
    /// # Errors
    ///
    /// See [`Game::transition_campaign`].
    pub async fn end_campaign(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
    ) -> Result<Campaign, GameError> {
        self.transition_campaign(ctx, campaign_id, CampaignStatus::Completed)
            .await
    }

    /// Archive an active campaign.
    ///
    /// # Errors
    ///
    /// See [`Game::transition_campaign`].
    pub async fn archive_campaign(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
    ) -> Result<Campaign, GameError> {
        self.transition_campaign(ctx, campaign_id, CampaignStatus::Archived)
            .await
    }

    /// Return an archived campaign to draft.
    ///
    /// # Errors
    ///
    /// See [`Game::transition_campaign`].
    pub async fn restore_campaign(
        &self,
        ctx: &CommandContext,
        campaign_id: CampaignId,
    ) -> Result<Campaign, GameError> {
        self.transition_campaign(ctx, campaign_id, CampaignStatus::Draft)
            .await
    }

    /// Every campaign.
    ///
    /// # Errors
    ///
    /// [`GameError::Storage`] if the projection store fails.
    pub async fn list_campaigns(&self) -> Result<Vec<Campaign>, GameError> {
        Ok(self.projections().list_campaigns().await?)
    }
}
