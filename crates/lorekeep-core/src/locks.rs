//! Per-campaign single-writer locks.
//!
//! Every command that appends to a campaign holds that campaign's lock from
//! the moment it reads projections to decide what to append until the last
//! appended event has been applied. Commands against different campaigns
//! never contend.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::trace;

use lorekeep_types::CampaignId;

/// Proof that the holder is the only writer of one campaign.
#[derive(Debug)]
pub struct CampaignGuard {
    campaign_id: CampaignId,
    _guard: OwnedMutexGuard<()>,
}

impl CampaignGuard {
    /// The campaign this guard locks.
    pub const fn campaign_id(&self) -> CampaignId {
        self.campaign_id
    }
}

/// Hands out one async mutex per campaign id.
#[derive(Debug, Default)]
pub struct CampaignLocks {
    locks: Mutex<HashMap<CampaignId, Arc<Mutex<()>>>>,
}

impl CampaignLocks {
    /// An empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive write access to `campaign_id`.
    ///
    /// Entries nobody holds or waits on are dropped here, so the table only
    /// tracks campaigns with writers in flight.
    pub async fn acquire(&self, campaign_id: CampaignId) -> CampaignGuard {
        let lock = {
            let mut locks = self.locks.lock().await;
            locks.retain(|id, lock| *id == campaign_id || Arc::strong_count(lock) > 1);
            Arc::clone(locks.entry(campaign_id).or_default())
        };
        let guard = lock.lock_owned().await;
        trace!(campaign_id = %campaign_id, "campaign lock acquired");
        CampaignGuard {
            campaign_id,
            _guard: guard,
        }
    }

    /// Number of campaigns tracked: those with a writer in flight, plus any
    /// released since the last [`acquire`](Self::acquire).
    pub async fn len(&self) -> usize {
        self.locks.lock().await.len()
    }

    /// Whether no campaign is tracked.
    pub async fn is_empty(&self) -> bool {
        self.locks.lock().await.is_empty()
    }
}
