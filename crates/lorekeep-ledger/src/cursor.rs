//! Restartable, finite iteration over one campaign's log.
//!
//! The cursor remembers the last sequence number it delivered, so a caller
//! that stops (or fails) part-way can resume by building a new cursor with
//! [`EventCursor::resume`] without skipping or repeating events. Iteration
//! ends at the log's last event as of the final page read.

use lorekeep_types::{CampaignId, Event};

use crate::LedgerError;
use crate::store::EventStore;

/// Default number of events fetched per page.
pub const DEFAULT_PAGE_SIZE: usize = 200;

/// Pages through a campaign's events in ascending sequence order.
#[derive(Debug, Clone)]
pub struct EventCursor {
    campaign_id: CampaignId,
    position: u64,
    page_size: usize,
    exhausted: bool,
}

impl EventCursor {
    /// Start at the beginning of the campaign's log.
    pub const fn new(campaign_id: CampaignId) -> Self {
        Self::resume(campaign_id, 0)
    }

    /// Start after `after_seq`.
    pub const fn resume(campaign_id: CampaignId, after_seq: u64) -> Self {
        Self {
            campaign_id,
            position: after_seq,
            page_size: DEFAULT_PAGE_SIZE,
            exhausted: false,
        }
    }

    /// Override the page size. Zero is treated as one.
    #[must_use]
    pub const fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = if page_size == 0 { 1 } else { page_size };
        self
    }

    /// Sequence number of the last event delivered (or the resume point).
    pub const fn position(&self) -> u64 {
        self.position
    }

    /// Fetch the next page. Returns an empty vector once the log is done.
    ///
    /// # Errors
    ///
    /// Propagates store failures. The cursor position is unchanged on
    /// error, so the same call can simply be retried.
    pub async fn next_page<S>(&mut self, store: &S) -> Result<Vec<Event>, LedgerError>
    where
        S: EventStore + ?Sized,
    {
        if self.exhausted {
            return Ok(Vec::new());
        }
        let page = store
            .list(self.campaign_id, self.position, self.page_size)
            .await?;
        if let Some(last) = page.last() {
            self.position = last.seq;
        }
        if page.len() < self.page_size {
            self.exhausted = true;
        }
        Ok(page)
    }

    /// Drain the rest of the log into memory.
    ///
    /// # Errors
    ///
    /// Propagates store failures.
    pub async fn collect_all<S>(&mut self, store: &S) -> Result<Vec<Event>, LedgerError>
    where
        S: EventStore + ?Sized,
    {
        let mut events = Vec::new();
        loop {
            let page = self.next_page(store).await?;
            if page.is_empty() {
                return Ok(events);
            }
            events.extend(page);
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use lorekeep_types::NewEvent;

    use super::*;
    use crate::MemoryEventStore;

    async fn seeded(count: usize) -> (MemoryEventStore, CampaignId) {
        let store = MemoryEventStore::new();
        let campaign = CampaignId::new();
        for _ in 0..count {
            let _ = store
                .append(NewEvent::new(campaign, "test.tick", Utc::now()))
                .await;
        }
        (store, campaign)
    }

    #[tokio::test]
    async fn pages_cover_the_log_exactly_once() {
        let (store, campaign) = seeded(7).await;
        let mut cursor = EventCursor::new(campaign).with_page_size(3);
        let mut seen = Vec::new();
        loop {
            let page = cursor.next_page(&store).await.unwrap_or_default();
            if page.is_empty() {
                break;
            }
            seen.extend(page.iter().map(|e| e.seq));
        }
        assert_eq!(seen, (1..=7).collect::<Vec<u64>>());
        assert_eq!(cursor.position(), 7);
    }

    #[tokio::test]
    async fn resume_continues_after_position() {
        let (store, campaign) = seeded(5).await;
        let mut first = EventCursor::new(campaign).with_page_size(2);
        let page = first.next_page(&store).await.unwrap_or_default();
        assert_eq!(page.len(), 2);

        let mut resumed = EventCursor::resume(campaign, first.position());
        let rest = resumed.collect_all(&store).await.unwrap_or_default();
        let seqs: Vec<u64> = rest.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![3, 4, 5]);
    }

    #[tokio::test]
    async fn empty_campaign_yields_nothing() {
        let store = MemoryEventStore::new();
        let mut cursor = EventCursor::new(CampaignId::new());
        assert!(cursor.collect_all(&store).await.unwrap_or_default().is_empty());
    }
}
