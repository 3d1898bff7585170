//! Projection tables as a [`ProjectionStore`].
//!
//! A [`ProjectionBatch`] is written inside one transaction, so a failed
//! apply rolls back every row it touched. Enumerations are stored by their
//! wire names and parsed on the way out.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

use lorekeep_campaign::{Campaign, Character, Gate, Participant, Session, Spotlight};
use lorekeep_projection::{ProjectionBatch, ProjectionStore, ProjectionWrite, SystemRow};
use lorekeep_types::{
    CampaignId, CharacterId, GateId, ParticipantId, SessionId, StorageError,
};

use crate::error::DbError;

const CAMPAIGN_SELECT: &str = "SELECT c.id, c.name, c.game_system, c.gm_mode, c.theme_prompt, c.status, \
     COALESCE(f.value, 0) AS gm_fear, c.participant_count, c.character_count, \
     c.created_at, c.updated_at, c.completed_at, c.archived_at \
     FROM campaigns c LEFT JOIN campaign_gm_fear f ON f.campaign_id = c.id";

const PARTICIPANT_SELECT: &str = "SELECT id, campaign_id, display_name, role, controller, \
     created_at, updated_at, left_at FROM participants";

const CHARACTER_SELECT: &str = "SELECT id, campaign_id, name, kind, notes, participant_id, \
     created_at, updated_at, deleted_at FROM characters";

const SESSION_SELECT: &str =
    "SELECT id, campaign_id, name, status, started_at, updated_at, ended_at FROM sessions";

const GATE_SELECT: &str = "SELECT id, campaign_id, session_id, gate_type, status, reason, \
     resolution, created_at, updated_at, closed_at FROM session_gates";

const SPOTLIGHT_SELECT: &str = "SELECT campaign_id, session_id, spotlight_type, character_id, \
     updated_at, updated_by_actor_type, updated_by_actor_id FROM session_spotlights";

fn parse<T: core::str::FromStr>(column: &str, value: &str) -> Result<T, DbError>
where
    T::Err: core::fmt::Display,
{
    value.parse().map_err(|e| DbError::decode(column, e))
}

fn count_from_db(column: &str, value: i32) -> Result<u32, DbError> {
    u32::try_from(value).map_err(|e| DbError::decode(column, e))
}

fn count_to_db(column: &str, value: u32) -> Result<i32, DbError> {
    i32::try_from(value).map_err(|e| DbError::decode(column, e))
}

#[derive(Debug, sqlx::FromRow)]
struct CampaignRow {
    id: Uuid,
    name: String,
    game_system: String,
    gm_mode: String,
    theme_prompt: String,
    status: String,
    gm_fear: i32,
    participant_count: i32,
    character_count: i32,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    archived_at: Option<DateTime<Utc>>,
}

impl TryFrom<CampaignRow> for Campaign {
    type Error = DbError;

    fn try_from(row: CampaignRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CampaignId::from(row.id),
            name: row.name,
            game_system: row.game_system,
            gm_mode: parse("gm_mode", &row.gm_mode)?,
            theme_prompt: row.theme_prompt,
            status: parse("status", &row.status)?,
            gm_fear: row.gm_fear,
            participant_count: count_from_db("participant_count", row.participant_count)?,
            character_count: count_from_db("character_count", row.character_count)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            completed_at: row.completed_at,
            archived_at: row.archived_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ParticipantRow {
    id: Uuid,
    campaign_id: Uuid,
    display_name: String,
    role: String,
    controller: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    left_at: Option<DateTime<Utc>>,
}

impl TryFrom<ParticipantRow> for Participant {
    type Error = DbError;

    fn try_from(row: ParticipantRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: ParticipantId::from(row.id),
            campaign_id: CampaignId::from(row.campaign_id),
            display_name: row.display_name,
            role: parse("role", &row.role)?,
            controller: parse("controller", &row.controller)?,
            created_at: row.created_at,
            updated_at: row.updated_at,
            left_at: row.left_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CharacterRow {
    id: Uuid,
    campaign_id: Uuid,
    name: String,
    kind: String,
    notes: String,
    participant_id: Option<Uuid>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    deleted_at: Option<DateTime<Utc>>,
}

impl TryFrom<CharacterRow> for Character {
    type Error = DbError;

    fn try_from(row: CharacterRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: CharacterId::from(row.id),
            campaign_id: CampaignId::from(row.campaign_id),
            name: row.name,
            kind: parse("kind", &row.kind)?,
            notes: row.notes,
            participant_id: row.participant_id.map(ParticipantId::from),
            created_at: row.created_at,
            updated_at: row.updated_at,
            deleted_at: row.deleted_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionRow {
    id: Uuid,
    campaign_id: Uuid,
    name: String,
    status: String,
    started_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ended_at: Option<DateTime<Utc>>,
}

impl TryFrom<SessionRow> for Session {
    type Error = DbError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: SessionId::from(row.id),
            campaign_id: CampaignId::from(row.campaign_id),
            name: row.name,
            status: parse("status", &row.status)?,
            started_at: row.started_at,
            updated_at: row.updated_at,
            ended_at: row.ended_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct GateRow {
    id: Uuid,
    campaign_id: Uuid,
    session_id: Uuid,
    gate_type: String,
    status: String,
    reason: String,
    resolution: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    closed_at: Option<DateTime<Utc>>,
}

impl TryFrom<GateRow> for Gate {
    type Error = DbError;

    fn try_from(row: GateRow) -> Result<Self, Self::Error> {
        Ok(Self {
            id: GateId::from(row.id),
            campaign_id: CampaignId::from(row.campaign_id),
            session_id: SessionId::from(row.session_id),
            gate_type: row.gate_type,
            status: parse("status", &row.status)?,
            reason: row.reason,
            resolution: row.resolution,
            created_at: row.created_at,
            updated_at: row.updated_at,
            closed_at: row.closed_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SpotlightRow {
    campaign_id: Uuid,
    session_id: Uuid,
    spotlight_type: String,
    character_id: Option<Uuid>,
    updated_at: DateTime<Utc>,
    updated_by_actor_type: String,
    updated_by_actor_id: Option<String>,
}

impl TryFrom<SpotlightRow> for Spotlight {
    type Error = DbError;

    fn try_from(row: SpotlightRow) -> Result<Self, Self::Error> {
        Ok(Self {
            campaign_id: CampaignId::from(row.campaign_id),
            session_id: SessionId::from(row.session_id),
            spotlight_type: parse("spotlight_type", &row.spotlight_type)?,
            character_id: row.character_id.map(CharacterId::from),
            updated_at: row.updated_at,
            updated_by_actor_type: parse("updated_by_actor_type", &row.updated_by_actor_type)?,
            updated_by_actor_id: row.updated_by_actor_id,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SystemRowRecord {
    campaign_id: Uuid,
    system_id: String,
    character_id: Uuid,
    data: Value,
}

impl From<SystemRowRecord> for SystemRow {
    fn from(row: SystemRowRecord) -> Self {
        Self {
            campaign_id: CampaignId::from(row.campaign_id),
            system_id: row.system_id,
            character_id: CharacterId::from(row.character_id),
            data: row.data,
        }
    }
}

/// `PostgreSQL` implementation of [`ProjectionStore`].
#[derive(Debug, Clone)]
pub struct PgProjectionStore {
    pool: PgPool,
}

impl PgProjectionStore {
    /// Create a projection store bound to a connection pool.
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn fetch_optional<R, T>(&self, sql: &str, ids: &[Uuid]) -> Result<Option<T>, DbError>
    where
        R: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
        T: TryFrom<R, Error = DbError>,
    {
        let mut query = sqlx::query_as::<_, R>(sql);
        for id in ids {
            query = query.bind(*id);
        }
        query.fetch_optional(&self.pool).await?.map(T::try_from).transpose()
    }

    async fn fetch_all<R, T>(&self, sql: &str, ids: &[Uuid]) -> Result<Vec<T>, DbError>
    where
        R: for<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> + Send + Unpin,
        T: TryFrom<R, Error = DbError>,
    {
        let mut query = sqlx::query_as::<_, R>(sql);
        for id in ids {
            query = query.bind(*id);
        }
        query
            .fetch_all(&self.pool)
            .await?
            .into_iter()
            .map(T::try_from)
            .collect()
    }

    async fn system_data(
        &self,
        table: &str,
        campaign_id: CampaignId,
        system_id: &str,
        character_id: CharacterId,
    ) -> Result<Option<Value>, DbError> {
        let sql = format!(
            "SELECT data FROM {table} WHERE campaign_id = $1 AND system_id = $2 AND character_id = $3"
        );
        let data: Option<Value> = sqlx::query_scalar(&sql)
            .bind(campaign_id.into_inner())
            .bind(system_id)
            .bind(character_id.into_inner())
            .fetch_optional(&self.pool)
            .await?;
        Ok(data)
    }

    async fn clear(&self, campaign_id: CampaignId, system_id: &str) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for table in ["system_character_states", "system_character_profiles"] {
            sqlx::query(&format!(
                "DELETE FROM {table} WHERE campaign_id = $1 AND system_id = $2"
            ))
            .bind(campaign_id.into_inner())
            .bind(system_id)
            .execute(&mut *tx)
            .await?;
        }
        sqlx::query("DELETE FROM campaign_gm_fear WHERE campaign_id = $1")
            .bind(campaign_id.into_inner())
            .execute(&mut *tx)
            .await?;
        tx.commit().await?;
        tracing::info!(campaign_id = %campaign_id, system_id, "Cleared system projections");
        Ok(())
    }

    async fn write_batch(&self, batch: ProjectionBatch) -> Result<(), DbError> {
        let mut tx = self.pool.begin().await?;
        for write in batch.into_writes() {
            write_one(&mut tx, write).await?;
        }
        tx.commit().await?;
        Ok(())
    }
}

#[allow(clippy::too_many_lines)]
async fn write_one(tx: &mut Transaction<'_, Postgres>, write: ProjectionWrite) -> Result<(), DbError> {
    match write {
        ProjectionWrite::Campaign(c) => {
            sqlx::query(
                r"INSERT INTO campaigns (id, name, game_system, gm_mode, theme_prompt, status,
                    participant_count, character_count, created_at, updated_at, completed_at, archived_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
                  ON CONFLICT (id) DO UPDATE SET
                    name = EXCLUDED.name, game_system = EXCLUDED.game_system,
                    gm_mode = EXCLUDED.gm_mode, theme_prompt = EXCLUDED.theme_prompt,
                    status = EXCLUDED.status, participant_count = EXCLUDED.participant_count,
                    character_count = EXCLUDED.character_count, updated_at = EXCLUDED.updated_at,
                    completed_at = EXCLUDED.completed_at, archived_at = EXCLUDED.archived_at",
            )
            .bind(c.id.into_inner())
            .bind(&c.name)
            .bind(&c.game_system)
            .bind(c.gm_mode.as_str())
            .bind(&c.theme_prompt)
            .bind(c.status.as_str())
            .bind(count_to_db("participant_count", c.participant_count)?)
            .bind(count_to_db("character_count", c.character_count)?)
            .bind(c.created_at)
            .bind(c.updated_at)
            .bind(c.completed_at)
            .bind(c.archived_at)
            .execute(&mut **tx)
            .await?;
        }
        ProjectionWrite::Participant(p) => {
            sqlx::query(
                r"INSERT INTO participants (campaign_id, id, display_name, role, controller,
                    created_at, updated_at, left_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                  ON CONFLICT (campaign_id, id) DO UPDATE SET
                    display_name = EXCLUDED.display_name, role = EXCLUDED.role,
                    controller = EXCLUDED.controller, updated_at = EXCLUDED.updated_at,
                    left_at = EXCLUDED.left_at",
            )
            .bind(p.campaign_id.into_inner())
            .bind(p.id.into_inner())
            .bind(&p.display_name)
            .bind(p.role.as_str())
            .bind(p.controller.as_str())
            .bind(p.created_at)
            .bind(p.updated_at)
            .bind(p.left_at)
            .execute(&mut **tx)
            .await?;
        }
        ProjectionWrite::Character(c) => {
            sqlx::query(
                r"INSERT INTO characters (campaign_id, id, name, kind, notes, participant_id,
                    created_at, updated_at, deleted_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                  ON CONFLICT (campaign_id, id) DO UPDATE SET
                    name = EXCLUDED.name, kind = EXCLUDED.kind, notes = EXCLUDED.notes,
                    participant_id = EXCLUDED.participant_id, updated_at = EXCLUDED.updated_at,
                    deleted_at = EXCLUDED.deleted_at",
            )
            .bind(c.campaign_id.into_inner())
            .bind(c.id.into_inner())
            .bind(&c.name)
            .bind(c.kind.as_str())
            .bind(&c.notes)
            .bind(c.participant_id.map(ParticipantId::into_inner))
            .bind(c.created_at)
            .bind(c.updated_at)
            .bind(c.deleted_at)
            .execute(&mut **tx)
            .await?;
        }
        ProjectionWrite::Session(s) => {
            sqlx::query(
                r"INSERT INTO sessions (campaign_id, id, name, status, started_at, updated_at, ended_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7)
                  ON CONFLICT (campaign_id, id) DO UPDATE SET
                    name = EXCLUDED.name, status = EXCLUDED.status,
                    updated_at = EXCLUDED.updated_at, ended_at = EXCLUDED.ended_at",
            )
            .bind(s.campaign_id.into_inner())
            .bind(s.id.into_inner())
            .bind(&s.name)
            .bind(s.status.as_str())
            .bind(s.started_at)
            .bind(s.updated_at)
            .bind(s.ended_at)
            .execute(&mut **tx)
            .await?;
        }
        ProjectionWrite::Gate(g) => {
            sqlx::query(
                r"INSERT INTO session_gates (campaign_id, id, session_id, gate_type, status, reason,
                    resolution, created_at, updated_at, closed_at)
                  VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
                  ON CONFLICT (campaign_id, id) DO UPDATE SET
                    status = EXCLUDED.status, reason = EXCLUDED.reason,
                    resolution = EXCLUDED.resolution, updated_at = EXCLUDED.updated_at,
                    closed_at = EXCLUDED.closed_at",
            )
            .bind(g.campaign_id.into_inner())
            .bind(g.id.into_inner())
            .bind(g.session_id.into_inner())
            .bind(&g.gate_type)
            .bind(g.status.as_str())
            .bind(&g.reason)
            .bind(&g.resolution)
            .bind(g.created_at)
            .bind(g.updated_at)
            .bind(g.closed_at)
            .execute(&mut **tx)
            .await?;
        }
        ProjectionWrite::Spotlight(s) => {
            sqlx::query(
                r"INSERT INTO session_spotlights (campaign_id, session_id, spotlight_type, character_id,
                    updated_at, updated_by_actor_type, updated_by_actor_id)
                  VALUES ($1, $2, $3, $4, $5, $6, $7)
                  ON CONFLICT (campaign_id, session_id) DO UPDATE SET
                    spotlight_type = EXCLUDED.spotlight_type, character_id = EXCLUDED.character_id,
                    updated_at = EXCLUDED.updated_at,
                    updated_by_actor_type = EXCLUDED.updated_by_actor_type,
                    updated_by_actor_id = EXCLUDED.updated_by_actor_id",
            )
            .bind(s.campaign_id.into_inner())
            .bind(s.session_id.into_inner())
            .bind(s.spotlight_type.as_str())
            .bind(s.character_id.map(CharacterId::into_inner))
            .bind(s.updated_at)
            .bind(s.updated_by_actor_type.as_str())
            .bind(s.updated_by_actor_id.as_deref())
            .execute(&mut **tx)
            .await?;
        }
        ProjectionWrite::ClearSpotlight {
            campaign_id,
            session_id,
        } => {
            sqlx::query("DELETE FROM session_spotlights WHERE campaign_id = $1 AND session_id = $2")
                .bind(campaign_id.into_inner())
                .bind(session_id.into_inner())
                .execute(&mut **tx)
                .await?;
        }
        ProjectionWrite::GmFear { campaign_id, value } => {
            sqlx::query(
                r"INSERT INTO campaign_gm_fear (campaign_id, value) VALUES ($1, $2)
                  ON CONFLICT (campaign_id) DO UPDATE SET value = EXCLUDED.value",
            )
            .bind(campaign_id.into_inner())
            .bind(value)
            .execute(&mut **tx)
            .await?;
        }
        ProjectionWrite::SystemState(row) => {
            upsert_system_row(tx, "system_character_states", row).await?;
        }
        ProjectionWrite::SystemProfile(row) => {
            upsert_system_row(tx, "system_character_profiles", row).await?;
        }
    }
    Ok(())
}

async fn upsert_system_row(
    tx: &mut Transaction<'_, Postgres>,
    table: &str,
    row: SystemRow,
) -> Result<(), DbError> {
    sqlx::query(&format!(
        "INSERT INTO {table} (campaign_id, system_id, character_id, data) VALUES ($1, $2, $3, $4)
         ON CONFLICT (campaign_id, system_id, character_id) DO UPDATE SET data = EXCLUDED.data"
    ))
    .bind(row.campaign_id.into_inner())
    .bind(&row.system_id)
    .bind(row.character_id.into_inner())
    .bind(&row.data)
    .execute(&mut **tx)
    .await?;
    Ok(())
}

#[async_trait]
impl ProjectionStore for PgProjectionStore {
    async fn get_campaign(&self, campaign_id: CampaignId) -> Result<Option<Campaign>, StorageError> {
        self.fetch_optional::<CampaignRow, _>(
            &format!("{CAMPAIGN_SELECT} WHERE c.id = $1"),
            &[campaign_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("get campaign"))
    }

    async fn list_campaigns(&self) -> Result<Vec<Campaign>, StorageError> {
        self.fetch_all::<CampaignRow, _>(&format!("{CAMPAIGN_SELECT} ORDER BY c.id"), &[])
            .await
            .map_err(|e| e.into_storage("list campaigns"))
    }

    async fn get_participant(
        &self,
        campaign_id: CampaignId,
        participant_id: ParticipantId,
    ) -> Result<Option<Participant>, StorageError> {
        self.fetch_optional::<ParticipantRow, _>(
            &format!("{PARTICIPANT_SELECT} WHERE campaign_id = $1 AND id = $2"),
            &[campaign_id.into_inner(), participant_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("get participant"))
    }

    async fn list_participants(
        &self,
        campaign_id: CampaignId,
    ) -> Result<Vec<Participant>, StorageError> {
        self.fetch_all::<ParticipantRow, _>(
            &format!("{PARTICIPANT_SELECT} WHERE campaign_id = $1 ORDER BY id"),
            &[campaign_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("list participants"))
    }

    async fn get_character(
        &self,
        campaign_id: CampaignId,
        character_id: CharacterId,
    ) -> Result<Option<Character>, StorageError> {
        self.fetch_optional::<CharacterRow, _>(
            &format!("{CHARACTER_SELECT} WHERE campaign_id = $1 AND id = $2"),
            &[campaign_id.into_inner(), character_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("get character"))
    }

    async fn list_characters(&self, campaign_id: CampaignId) -> Result<Vec<Character>, StorageError> {
        self.fetch_all::<CharacterRow, _>(
            &format!("{CHARACTER_SELECT} WHERE campaign_id = $1 ORDER BY id"),
            &[campaign_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("list characters"))
    }

    async fn get_session(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Option<Session>, StorageError> {
        self.fetch_optional::<SessionRow, _>(
            &format!("{SESSION_SELECT} WHERE campaign_id = $1 AND id = $2"),
            &[campaign_id.into_inner(), session_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("get session"))
    }

    async fn active_session(&self, campaign_id: CampaignId) -> Result<Option<Session>, StorageError> {
        self.fetch_optional::<SessionRow, _>(
            &format!("{SESSION_SELECT} WHERE campaign_id = $1 AND status = 'active'"),
            &[campaign_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("get active session"))
    }

    async fn get_gate(
        &self,
        campaign_id: CampaignId,
        gate_id: GateId,
    ) -> Result<Option<Gate>, StorageError> {
        self.fetch_optional::<GateRow, _>(
            &format!("{GATE_SELECT} WHERE campaign_id = $1 AND id = $2"),
            &[campaign_id.into_inner(), gate_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("get gate"))
    }

    async fn open_gates(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Vec<Gate>, StorageError> {
        self.fetch_all::<GateRow, _>(
            &format!(
                "{GATE_SELECT} WHERE campaign_id = $1 AND session_id = $2 AND status = 'open' ORDER BY id"
            ),
            &[campaign_id.into_inner(), session_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("list open gates"))
    }

    async fn get_spotlight(
        &self,
        campaign_id: CampaignId,
        session_id: SessionId,
    ) -> Result<Option<Spotlight>, StorageError> {
        self.fetch_optional::<SpotlightRow, _>(
            &format!("{SPOTLIGHT_SELECT} WHERE campaign_id = $1 AND session_id = $2"),
            &[campaign_id.into_inner(), session_id.into_inner()],
        )
        .await
        .map_err(|e| e.into_storage("get spotlight"))
    }

    async fn get_gm_fear(&self, campaign_id: CampaignId) -> Result<Option<i32>, StorageError> {
        sqlx::query_scalar("SELECT value FROM campaign_gm_fear WHERE campaign_id = $1")
            .bind(campaign_id.into_inner())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DbError::from(e).into_storage("get gm fear"))
    }

    async fn get_system_state(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
        character_id: CharacterId,
    ) -> Result<Option<Value>, StorageError> {
        self.system_data("system_character_states", campaign_id, system_id, character_id)
            .await
            .map_err(|e| e.into_storage("get system state"))
    }

    async fn list_system_states(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
    ) -> Result<Vec<SystemRow>, StorageError> {
        let rows: Vec<SystemRowRecord> = sqlx::query_as(
            r"SELECT campaign_id, system_id, character_id, data FROM system_character_states
              WHERE campaign_id = $1 AND system_id = $2 ORDER BY character_id",
        )
        .bind(campaign_id.into_inner())
        .bind(system_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DbError::from(e).into_storage("list system states"))?;
        Ok(rows.into_iter().map(SystemRow::from).collect())
    }

    async fn get_system_profile(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
        character_id: CharacterId,
    ) -> Result<Option<Value>, StorageError> {
        self.system_data("system_character_profiles", campaign_id, system_id, character_id)
            .await
            .map_err(|e| e.into_storage("get system profile"))
    }

    async fn clear_system_state(
        &self,
        campaign_id: CampaignId,
        system_id: &str,
    ) -> Result<(), StorageError> {
        self.clear(campaign_id, system_id)
            .await
            .map_err(|e| e.into_storage("clear system state"))
    }

    async fn commit(&self, batch: ProjectionBatch) -> Result<(), StorageError> {
        if batch.is_empty() {
            return Ok(());
        }
        self.write_batch(batch)
            .await
            .map_err(|e| e.into_storage("commit projection batch"))
    }
}
