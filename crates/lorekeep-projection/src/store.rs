//! The projection store abstraction and its atomic write batch.
//!
//! Handlers never write row by row. They read what they need, compute every
//! resulting row, and hand the store one [`ProjectionBatch`]. The store
//! applies a batch all-or-nothing, so a failed apply never leaves a half
//! updated view behind.

use async_trait::async_trait;
use serde_json::Value;

use lorekeep_campaign::{Campaign, Character, Gate, Participant, Session, Spotlight};
use lorekeep_types::{CampaignId, CharacterId, GateId, ParticipantId, SessionId, StorageError};

/// One row-level write inside a [`ProjectionBatch`].
#[derive(Debug, Clone, PartialEq)]
pub enum ProjectionWrite {
    /// Upsert a campaign row. The `gm_fear` field is not stored here; see
    /// [`ProjectionWrite::GmFear`].
    Campaign(Box<Campaign>),
    /// Upsert a participant row.
    Participant(Box<Participant>),
    /// Upsert a character row.
    Character(Box<Character>),
    /// Upsert a session row.
    Session(Box<Session>),
    /// Upsert a gate row.
    Gate(Box<Gate>),
    /// Upsert the spotlight of a session.
    Spotlight(Box<Spotlight>),
    /// Remove the spotlight of a session.
    ClearSpotlight {
        /// Owning campaign.
        campaign_id: CampaignId,
        /// The session.
        session_id: SessionId,
    },
    /// Upsert the GM Fear value of a campaign.
    GmFear {
        /// Owning campaign.
        campaign_id: CampaignId,
        /// New value.
        value: i32,
    },
    /// Upsert a game system's state row for one character.
    SystemState(SystemRow),
    /// Upsert a game system's profile row for one character.
    SystemProfile(SystemRow),
}

/// A system-owned JSON row keyed by campaign, system and character.
#[derive(Debug, Clone, PartialEq)]
pub struct SystemRow {
    /// Owning campaign.
    pub campaign_id: CampaignId,
    /// Owning game system.
    pub system_id: String,
    /// The character the row describes.
    pub character_id: CharacterId,
    /// System-defined JSON document.
    pub data: Value,
}

/// Writes produced by applying a single event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectionBatch {
    writes: Vec<ProjectionWrite>,
}

impl ProjectionBatch {
    /// Create an empty batch.
    pub const fn new() -> Self {
        Self { writes: Vec::new() }
    }

    /// Append a write.
    pub fn push(&mut self, write: ProjectionWrite) -> &mut Self {
        self.writes.push(write);
        self
    }

    /// Whether the batch has no writes.
    pub const fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    /// The writes in submission order.
    pub fn writes(&self) -> &[ProjectionWrite] {
        &self.writes
    }

    /// Consume the batch.
    pub fn into_writes(self) -> Vec<ProjectionWrite> {
        self.writes
    }
}

impl From<ProjectionWrite> for ProjectionBatch {
    fn from(write: ProjectionWrite) -> Self {
        Self {
            writes: vec![write],
        }
    }
}

/// Queryable current-state views derived from the event log.
///
/// Only the [`Applier`](crate::Applier) and game system adapters write to a
/// projection store; everything else reads.
#[async_trait]
pub trait ProjectionStore: Send + Sync {
    /// The campaign row, with its GM Fear joined in (0 when unset).
    async fn get_campaign(&self, campaign_id: CampaignId) -> Result<Option<Campaign>, StorageError>;

    /// Every campaign row, in id order.
    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StorageError>;

    /// One participant.
    async fn get_participant(
        &self,
        campaign_id: CampaignId,
        participant_id: ParticipantId,
    ) -> Result<Option<Participant>, StorageError>;

    /// Every participant of a campaign, including those who left.
    async fn list_participants(&self, campaign_id: CampaignId)
    -> Result<Vec<Participant>, StorageError>;

    /// One character.
    async fn get_character(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<Option<Character>, StorageError>;

    /// Every character of a campaign, including deleted ones.
    async fn list_characters(&self, campaign_id: CampaignId) -> Result<Vec<Character>, StorageError>;

    /// One session.
    async fn get_session(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Option<Session>, StorageError>;

    /// The campaign's non-terminal session, if any.
    async fn active_session(&self, campaign_id: CampaignId) -> Result<Option<Session>, StorageError>;

    /// One gate.
    async fn get_gate(&self, campaign_id: CampaignId, gate_id: GateId)
    -> Result<Option<Gate>, StorageError>;

    /// Open gates of a session.
    async fn open_gates(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Vec<Gate>, StorageError>;

    /// The spotlight of a session.
    async fn get_spotlight(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Option<Spotlight>, StorageError>;

    /// The campaign's stored GM Fear value, if one has been written.
    async fn get_gm_fear(&self, campaign_id: CampaignId) -> Result<Option<i32>, StorageError>;

    /// A system state row.
    async fn get_system_state(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
        character_id: CharacterId,
    ) -> Result<Option<Value>, StorageError>;

    /// Every system state row of a campaign for one system, in character
    /// id order.
    async fn list_system_states(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
    ) -> Result<Vec<SystemRow>, StorageError>;

    /// A system profile row.
    async fn get_system_profile(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
        character_id: CharacterId,
    ) -> Result<Option<Value>, StorageError>;

    /// Delete every system-owned row (state, profile, GM Fear) of a
    /// campaign ahead of a forced replay.
    async fn clear_system_state(&self, campaign_id: CampaignId, system_id: &str)
    -> Result<(), StorageError>;

    /// Apply every write of `batch` atomically.
    async fn commit(&self, batch: ProjectionBatch) -> Result<(), StorageError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn batch_preserves_order() {
        let campaign_id = CampaignId::new();
        let mut batch = ProjectionBatch::new();
        batch
            .push(ProjectionWrite::GmFear { campaign_id, value: 1 })
            .push(ProjectionWrite::GmFear { campaign_id, value: 2 });
        let values: Vec<i32> = batch
            .writes()
            .iter()
            .filter_map(|w| match w {
                ProjectionWrite::GmFear { value, .. } => Some(*value),
                _ => None,
            })
            .collect();
        assert_eq!(values, vec![1, 2]);
        assert!(ProjectionBatch::new().is_empty());
    }
}
