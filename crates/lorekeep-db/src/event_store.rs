//! The `events` table as an [`EventStore`].
//!
//! Sequence numbers are allocated inside the insert transaction while
//! holding a per-campaign advisory transaction lock, so concurrent writers
//! to one campaign (even from different processes) serialize on the lock
//! and the primary key `(campaign_id, seq)` never sees a duplicate.

use async_trait::async_trait;
use chrono::{DateTime, SubsecRound, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use lorekeep_ledger::{EventStore, LedgerError, validate_new_event};
use lorekeep_types::{CampaignId, Event, NewEvent, SessionId};

use crate::error::DbError;

const EVENT_COLUMNS: &str = "campaign_id, seq, occurred_at, event_type, session_id, request_id, \
     invocation_id, actor_type, actor_id, entity_type, entity_id, system_id, system_version, payload";

/// `PostgreSQL` implementation of [`EventStore`].
#[derive(Debug, Clone)]
pub struct PgEventStore {
    pool: PgPool,
}

impl PgEventStore {
    /// Create an event store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn insert(&self, mut event: NewEvent) -> Result<Event, DbError> {
        // TIMESTAMPTZ keeps microseconds; the returned event must equal what
        // `list` reads back.
        event.timestamp = event.timestamp.trunc_subsecs(6);
        let mut tx = self.pool.begin().await?;
        let campaign = event.campaign_id.into_inner();

        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1::TEXT, 0))")
            .bind(campaign.to_string())
            .execute(&mut *tx)
            .await?;

        let last: i64 =
            sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM events WHERE campaign_id = $1")
                .bind(campaign)
                .fetch_one(&mut *tx)
                .await?;
        let seq = last
            .checked_add(1)
            .ok_or_else(|| DbError::Decode("event sequence overflow".to_owned()))?;

        sqlx::query(
            r"INSERT INTO events (campaign_id, seq, occurred_at, event_type, session_id, request_id,
                invocation_id, actor_type, actor_id, entity_type, entity_id, system_id, system_version, payload)
              VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)",
        )
        .bind(campaign)
        .bind(seq)
        .bind(event.timestamp)
        .bind(&event.event_type)
        .bind(event.session_id.map(SessionId::into_inner))
        .bind(&event.request_id)
        .bind(&event.invocation_id)
        .bind(event.actor_type.as_str())
        .bind(event.actor_id.as_deref())
        .bind(&event.entity_type)
        .bind(&event.entity_id)
        .bind(&event.system_id)
        .bind(&event.system_version)
        .bind(&event.payload)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        let seq = u64::try_from(seq).map_err(|e| DbError::decode("seq", e))?;
        tracing::debug!(campaign_id = %event.campaign_id, seq, event_type = %event.event_type, "Appended event");
        Ok(event.into_stored(seq))
    }

    async fn select(&self, campaign_id: CampaignId, after_seq: u64, limit: usize) -> Result<Vec<Event>, DbError> {
        let after = i64::try_from(after_seq).unwrap_or(i64::MAX);
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query_as::<_, EventRow>(&format!(
            "SELECT {EVENT_COLUMNS} FROM events WHERE campaign_id = $1 AND seq > $2 ORDER BY seq LIMIT $3"
        ))
        .bind(campaign_id.into_inner())
        .bind(after)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(EventRow::into_event).collect()
    }
}

#[async_trait]
impl EventStore for PgEventStore {
    async fn append(&self, event: NewEvent) -> Result<Event, LedgerError> {
        validate_new_event(&event)?;
        self.insert(event)
            .await
            .map_err(|e| LedgerError::Storage(e.into_storage("append event")))
    }

    async fn list(
        &self,
        campaign_id: CampaignId,
        after_seq: u64,
        limit: usize,
    ) -> Result<Vec<Event>, LedgerError> {
        if limit == 0 {
            return Ok(Vec::new());
        }
        self.select(campaign_id, after_seq, limit)
            .await
            .map_err(|e| LedgerError::Storage(e.into_storage("list events")))
    }

    async fn last_seq(&self, campaign_id: CampaignId) -> Result<u64, LedgerError> {
        let last: Result<i64, DbError> =
            sqlx::query_scalar("SELECT COALESCE(MAX(seq), 0) FROM events WHERE campaign_id = $1")
                .bind(campaign_id.into_inner())
                .fetch_one(&self.pool)
                .await
                .map_err(DbError::from);
        last.and_then(|seq| u64::try_from(seq).map_err(|e| DbError::decode("seq", e)))
            .map_err(|e| LedgerError::Storage(e.into_storage("read last seq")))
    }

    async fn campaign_ids(&self) -> Result<Vec<CampaignId>, LedgerError> {
        let ids: Vec<Uuid> =
            sqlx::query_scalar("SELECT DISTINCT campaign_id FROM events ORDER BY campaign_id")
                .fetch_all(&self.pool)
                .await
                .map_err(|e| LedgerError::Storage(DbError::from(e).into_storage("list campaign ids")))?;
        Ok(ids.into_iter().map(CampaignId::from).collect())
    }
}

/// A row from the `events` table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct EventRow {
    /// Partition key.
    pub campaign_id: Uuid,
    /// Position within the campaign.
    pub seq: i64,
    /// Caller-supplied event time.
    pub occurred_at: DateTime<Utc>,
    /// Payload schema tag.
    pub event_type: String,
    /// Owning session, if any.
    pub session_id: Option<Uuid>,
    /// Request correlation id.
    pub request_id: String,
    /// Invocation correlation id.
    pub invocation_id: String,
    /// Actor type wire name.
    pub actor_type: String,
    /// Actor identity.
    pub actor_id: Option<String>,
    /// Entity type tag.
    pub entity_type: String,
    /// Entity id.
    pub entity_id: String,
    /// Owning game system.
    pub system_id: String,
    /// Game system version.
    pub system_version: String,
    /// Opaque payload bytes.
    pub payload: Vec<u8>,
}

impl EventRow {
    /// Convert to the domain envelope.
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Decode`] for a negative seq or an unknown actor
    /// type.
    pub fn into_event(self) -> Result<Event, DbError> {
        Ok(Event {
            campaign_id: CampaignId::from(self.campaign_id),
            seq: u64::try_from(self.seq).map_err(|e| DbError::decode("seq", e))?,
            timestamp: self.occurred_at,
            event_type: self.event_type,
            session_id: self.session_id.map(SessionId::from),
            request_id: self.request_id,
            invocation_id: self.invocation_id,
            actor_type: self
                .actor_type
                .parse()
                .map_err(|e| DbError::decode("actor_type", e))?,
            actor_id: self.actor_id,
            entity_type: self.entity_type,
            entity_id: self.entity_id,
            system_id: self.system_id,
            system_version: self.system_version,
            payload: self.payload,
        })
    }
}
