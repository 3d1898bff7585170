//! In-process projection store.
//!
//! Backs the unit tests and the integrity tool's scratch replica. A batch
//! is applied under one write lock, so readers never observe a partial
//! batch.

use std::collections::BTreeMap;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use lorekeep_campaign::{Campaign, Character, Gate, Participant, Session, Spotlight};
use lorekeep_types::{
    CampaignId, CharacterId, GateId, GateStatus, ParticipantId, SessionId, StorageError,
};

use crate::store::{ProjectionBatch, ProjectionStore, ProjectionWrite, SystemRow};

type SystemKey = (CampaignId, String, CharacterId);

#[derive(Debug, Default)]
struct Tables {
    campaigns: BTreeMap<CampaignId, Campaign>,
    participants: BTreeMap<(CampaignId, ParticipantId), Participant>,
    characters: BTreeMap<(CampaignId, CharacterId), Character>,
    sessions: BTreeMap<(CampaignId, SessionId), Session>,
    gates: BTreeMap<(CampaignId, GateId), Gate>,
    spotlights: BTreeMap<(CampaignId, SessionId), Spotlight>,
    gm_fear: BTreeMap<CampaignId, i32>,
    system_states: BTreeMap<SystemKey, Value>,
    system_profiles: BTreeMap<SystemKey, Value>,
}

impl Tables {
    fn apply(&mut self, write: ProjectionWrite) {
        match write {
            ProjectionWrite::Campaign(campaign) => {
                self.campaigns.insert(campaign.id, *campaign);
            }
            ProjectionWrite::Participant(participant) => {
                self.participants
                    .insert((participant.campaign_id, participant.id), *participant);
            }
            ProjectionWrite::Character(character) => {
                self.characters
                    .insert((character.campaign_id, character.id), *character);
            }
            ProjectionWrite::Session(session) => {
                self.sessions.insert((session.campaign_id, session.id), *session);
            }
            ProjectionWrite::Gate(gate) => {
                self.gates.insert((gate.campaign_id, gate.id), *gate);
            }
            ProjectionWrite::Spotlight(spotlight) => {
                self.spotlights
                    .insert((spotlight.campaign_id, spotlight.session_id), *spotlight);
            }
            ProjectionWrite::ClearSpotlight {
                campaign_id,
                session_id,
            } => {
                self.spotlights.remove(&(campaign_id, session_id));
            }
            ProjectionWrite::GmFear { campaign_id, value } => {
                self.gm_fear.insert(campaign_id, value);
            }
            ProjectionWrite::SystemState(row) => {
                self.system_states
                    .insert((row.campaign_id, row.system_id, row.character_id), row.data);
            }
            ProjectionWrite::SystemProfile(row) => {
                self.system_profiles
                    .insert((row.campaign_id, row.system_id, row.character_id), row.data);
            }
        }
    }

    fn with_gm_fear(&self, mut campaign: Campaign) -> Campaign {
        campaign.gm_fear = self.gm_fear.get(&campaign.id).copied().unwrap_or(0);
        campaign
    }
}

/// Projection store held entirely in memory.
#[derive(Debug, Default)]
pub struct MemoryProjectionStore {
    tables: RwLock<Tables>,
}

impl MemoryProjectionStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ProjectionStore for MemoryProjectionStore {
    async fn get_campaign(&self, campaign_id: CampaignId) -> Result<Option<Campaign>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .campaigns
            .get(&campaign_id)
            .cloned()
            .map(|c| tables.with_gm_fear(c)))
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .campaigns
            .values()
            .cloned()
            .map(|c| tables.with_gm_fear(c))
            .collect())
    }

    async fn get_participant(
        &self,
        campaign_id: CampaignId,
        participant_id: ParticipantId,
    ) -> Result<Option<Participant>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.participants.get(&(campaign_id, participant_id)).cloned())
    }

    async fn list_participants(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<Participant>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .participants
            .values()
            .filter(|p| p.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn get_character(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<Option<Character>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.characters.get(&(campaign_id, character_id)).cloned())
    }

    async fn list_characters(&self, campaign_id: CampaignId) -> Result<Vec<Character>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .characters
            .values()
            .filter(|c| c.campaign_id == campaign_id)
            .cloned()
            .collect())
    }

    async fn get_session(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Option<Session>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.sessions.get(&(campaign_id, session_id)).cloned())
    }

    async fn active_session(&self, campaign_id: CampaignId) -> Result<Option<Session>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .sessions
            .values()
            .find(|s| s.campaign_id == campaign_id && !s.status.is_terminal())
            .cloned())
    }

    async fn get_gate(
        &self,
        campaign_id: CampaignId,
        gate_id: GateId,
    ) -> Result<Option<Gate>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.gates.get(&(campaign_id, gate_id)).cloned())
    }

    async fn open_gates(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Vec<Gate>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .gates
            .values()
            .filter(|g| {
                g.campaign_id == campaign_id
                    && g.session_id == session_id
                    && g.status == GateStatus::Open
            })
            .cloned()
            .collect())
    }

    async fn get_spotlight(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Option<Spotlight>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.spotlights.get(&(campaign_id, session_id)).cloned())
    }

    async fn get_gm_fear(&self, campaign_id: CampaignId) -> Result<Option<i32>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables.gm_fear.get(&campaign_id).copied())
    }

    async fn get_system_state(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
        character_id: CharacterId,
    ) -> Result<Option<Value>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .system_states
            .get(&(campaign_id, system_id.to_owned(), character_id))
            .cloned())
    }

    async fn list_system_states(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
    ) -> Result<Vec<SystemRow>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .system_states
            .iter()
            .filter(|((campaign, system, _), _)| *campaign == campaign_id && system == system_id)
            .map(|((campaign, system, character), data)| SystemRow {
                campaign_id: *campaign,
                system_id: system.clone(),
                character_id: *character,
                data: data.clone(),
            })
            .collect())
    }

    async fn get_system_profile(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
        character_id: CharacterId,
    ) -> Result<Option<Value>, StorageError> {
        let tables = self.tables.read().await;
        Ok(tables
            .system_profiles
            .get(&(campaign_id, system_id.to_owned(), character_id))
            .cloned())
    }

    async fn clear_system_state(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
    ) -> Result<(), StorageError> {
        let mut tables = self.tables.write().await;
        tables
            .system_states
            .retain(|(campaign, system, _), _| !(*campaign == campaign_id && system == system_id));
        tables
            .system_profiles
            .retain(|(campaign, system, _), _| !(*campaign == campaign_id && system == system_id));
        tables.gm_fear.remove(&campaign_id);
        Ok(())
    }

    async fn commit(&self, batch: ProjectionBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut tables = self.tables.write().await;
        for write in batch.into_writes() {
            tables.apply(write);
        }
        Ok(())
    }
}
