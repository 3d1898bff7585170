//! The event store abstraction.

use async_trait::async_trait;

use lorekeep_types::{CampaignId, Event, NewEvent, ValidationError};

use crate::LedgerError;

/// An append-only, per-campaign event log.
///
/// Implementations must linearize appends within a campaign: two
/// concurrent appends to the same campaign receive distinct, consecutive
/// sequence numbers. Appends to different campaigns are independent.
#[async_trait]
pub trait EventStore: Send + Sync {
    /// Validate and append one event, returning it with its assigned `seq`.
    ///
    /// # Errors
    ///
    /// [`LedgerError::Validation`] if the envelope is malformed (nothing is
    /// written); [`LedgerError::Storage`] if persistence failed, in which
    /// case durability is unknown.
    async fn append(&self, event: NewEvent) -> Result<Event, LedgerError>;

    /// Events of one campaign with `seq > after_seq`, ascending, at most
    /// `limit` of them. A `limit` of zero returns nothing.
    async fn list(&self, campaign_id: CampaignId, after_seq: u64, limit: usize)
    -> Result<Vec<Event>, LedgerError>;

    /// Highest sequence number in the campaign, or 0 if it has no events.
    async fn last_seq(&self, campaign_id: CampaignId) -> Result<u64, LedgerError>;

    /// Every campaign that has at least one event, in ascending id order.
    async fn campaign_ids(&self) -> Result<Vec<CampaignId>, LedgerError>;
}

/// Check the envelope fields every stored event must carry.
///
/// # Errors
///
/// Returns a field-tagged [`ValidationError`] for a nil campaign id or a
/// blank event type.
pub fn validate_new_event(event: &NewEvent) -> Result<(), ValidationError> {
    if event.campaign_id.is_nil() {
        return Err(ValidationError::required("campaign_id"));
    }
    if event.event_type.trim().is_empty() {
        return Err(ValidationError::required("event_type"));
    }
    if event.event_type.trim() != event.event_type {
        return Err(ValidationError::field(
            "event_type",
            "event_type must not have surrounding whitespace",
        ));
    }
    if event.system_id.trim().is_empty() != event.system_version.trim().is_empty() {
        return Err(ValidationError::field(
            "system_version",
            "system_id and system_version must be set together",
        ));
    }
    Ok(())
}
