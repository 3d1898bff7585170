//! In-process event store.
//!
//! Holds every campaign's log in memory behind one async mutex. Used by
//! tests, by the integrity tooling's scratch replays, and by embedders that
//! do not need durability.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::debug;

use lorekeep_types::{CampaignId, Event, NewEvent, StorageError};

use crate::LedgerError;
use crate::store::{EventStore, validate_new_event};

/// Event store backed by per-campaign vectors.
///
/// The vector for a campaign is always exactly `[seq 1, seq 2, ...]`, so
/// `seq` doubles as a 1-based index.
#[derive(Debug, Default)]
pub struct MemoryEventStore {
    campaigns: Mutex<BTreeMap<CampaignId, Vec<Event>>>,
}

impl MemoryEventStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl EventStore for MemoryEventStore {
    async fn append(&self, event: NewEvent) -> Result<Event, LedgerError> {
        validate_new_event(&event)?;

        let mut campaigns = self.campaigns.lock().await;
        let log = campaigns.entry(event.campaign_id).or_default();
        let len = u64::try_from(log.len())
            .map_err(|e| StorageError::new("append event", e))?;
        let seq = len
            .checked_add(1)
            .ok_or_else(|| StorageError::new("append event", "sequence overflow"))?;

        let stored = event.into_stored(seq);
        log.push(stored.clone());
        debug!(
            campaign_id = %stored.campaign_id,
            seq,
            event_type = %stored.event_type,
            "event appended"
        );
        Ok(stored)
    }

    async fn list(
        &self,
        campaign_id: CampaignId,
        after_seq: u64,
        limit: usize,
    ) -> Result<Vec<Event>, LedgerError> {
        let campaigns = self.campaigns.lock().await;
        let Some(log) = campaigns.get(&campaign_id) else {
            return Ok(Vec::new());
        };
        let skip = usize::try_from(after_seq).unwrap_or(usize::MAX);
        Ok(log.iter().skip(skip).take(limit).cloned().collect())
    }

    async fn last_seq(&self, campaign_id: CampaignId) -> Result<u64, LedgerError> {
        let campaigns = self.campaigns.lock().await;
        let len = campaigns.get(&campaign_id).map_or(0, Vec::len);
        u64::try_from(len).map_err(|e| StorageError::new("read last seq", e).into())
    }

    async fn campaign_ids(&self) -> Result<Vec<CampaignId>, LedgerError> {
        let campaigns = self.campaigns.lock().await;
        Ok(campaigns
            .iter()
            .filter(|(_, log)| !log.is_empty())
            .map(|(id, _)| *id)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::Utc;

    use super::*;

    fn event(campaign_id: CampaignId, event_type: &str) -> NewEvent {
        NewEvent::new(campaign_id, event_type, Utc::now())
    }

    #[tokio::test]
    async fn sequences_start_at_one_and_have_no_gaps() {
        let store = MemoryEventStore::new();
        let campaign = CampaignId::new();
        for expected in 1..=5_u64 {
            let stored = store.append(event(campaign, "test.tick")).await;
            assert_eq!(stored.ok().map(|e| e.seq), Some(expected));
        }
        assert_eq!(store.last_seq(campaign).await.ok(), Some(5));
    }

    #[tokio::test]
    async fn campaigns_are_sequenced_independently() {
        let store = MemoryEventStore::new();
        let a = CampaignId::new();
        let b = CampaignId::new();
        let _ = store.append(event(a, "test.tick")).await;
        let _ = store.append(event(a, "test.tick")).await;
        let first_b = store.append(event(b, "test.tick")).await;
        assert_eq!(first_b.ok().map(|e| e.seq), Some(1));
        assert_eq!(store.last_seq(CampaignId::new()).await.ok(), Some(0));
    }

    #[tokio::test]
    async fn concurrent_appends_never_collide() {
        let store = Arc::new(MemoryEventStore::new());
        let campaign = CampaignId::new();
        let mut handles = Vec::new();
        for _ in 0..32 {
            let store = Arc::clone(&store);
            handles.push(tokio::spawn(async move {
                store.append(event(campaign, "test.race")).await.map(|e| e.seq)
            }));
        }
        let mut seqs = Vec::new();
        for handle in handles {
            if let Ok(Ok(seq)) = handle.await {
                seqs.push(seq);
            }
        }
        seqs.sort_unstable();
        assert_eq!(seqs, (1..=32).collect::<Vec<u64>>());
    }

    #[tokio::test]
    async fn list_honours_after_seq_and_limit() {
        let store = MemoryEventStore::new();
        let campaign = CampaignId::new();
        for _ in 0..6 {
            let _ = store.append(event(campaign, "test.tick")).await;
        }
        let page = store.list(campaign, 2, 3).await.unwrap_or_default();
        let seqs: Vec<u64> = page.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);

        assert!(store.list(campaign, 0, 0).await.unwrap_or_default().is_empty());
        assert!(store.list(campaign, 6, 10).await.unwrap_or_default().is_empty());
    }

    #[tokio::test]
    async fn rejected_event_consumes_no_seq() {
        let store = MemoryEventStore::new();
        let campaign = CampaignId::new();
        let bad = store.append(event(campaign, "")).await;
        assert!(matches!(bad, Err(LedgerError::Validation(_))));
        let good = store.append(event(campaign, "test.tick")).await;
        assert_eq!(good.ok().map(|e| e.seq), Some(1));
    }

    #[tokio::test]
    async fn payload_bytes_are_stored_verbatim() {
        let store = MemoryEventStore::new();
        let campaign = CampaignId::new();
        let mut new_event = event(campaign, "test.blob");
        new_event.payload = vec![0, 159, 146, 150];
        let _ = store.append(new_event).await;
        let listed = store.list(campaign, 0, 1).await.unwrap_or_default();
        assert_eq!(listed.first().map(|e| e.payload.clone()), Some(vec![0, 159, 146, 150]));
    }

    #[tokio::test]
    async fn campaign_ids_lists_only_campaigns_with_events() {
        let store = MemoryEventStore::new();
        let campaign = CampaignId::new();
        let _ = store.append(event(CampaignId::nil(), "test.tick")).await;
        let _ = store.append(event(campaign, "test.tick")).await;
        assert_eq!(store.campaign_ids().await.unwrap_or_default(), vec![campaign]);
    }
}
