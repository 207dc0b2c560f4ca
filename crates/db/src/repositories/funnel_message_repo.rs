//! Repository for the `funnel_messages` and `funnel_message_stages` tables.

use chrono::NaiveDate;
use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{
    DispatchCandidate, FunnelMessage, FunnelMessageWithStages, MessageStage, NewStage,
};

const COLUMNS: &str =
    "id, owner_profile_id, group_id, title, channel, is_active, created_at, updated_at";

const STAGE_COLUMNS: &str = "id, funnel_message_id AS message_id, stage_number, day_offset, \
                              send_time, subject, body, created_at, updated_at";

/// Fields shared by create and update, already validated by the caller.
#[derive(Debug, Clone)]
pub struct FunnelMessageFields {
    pub group_id: Option<DbId>,
    pub title: String,
    pub channel: String,
    pub is_active: bool,
}

/// Provides CRUD operations for funnel messages and their stages.
pub struct FunnelMessageRepo;

impl FunnelMessageRepo {
    /// Insert a message and its stages in one transaction.
    pub async fn create(
        pool: &PgPool,
        owner_profile_id: Option<DbId>,
        fields: &FunnelMessageFields,
        stages: &[NewStage],
    ) -> Result<FunnelMessageWithStages, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO funnel_messages (owner_profile_id, group_id, title, channel, is_active)
             VALUES ($1, $2, $3, $4, $5)
             RETURNING {COLUMNS}"
        );
        let message = sqlx::query_as::<_, FunnelMessage>(&query)
            .bind(owner_profile_id)
            .bind(fields.group_id)
            .bind(&fields.title)
            .bind(&fields.channel)
            .bind(fields.is_active)
            .fetch_one(&mut *tx)
            .await?;

        let stages = Self::replace_stages_inner(&mut tx, message.id, stages).await?;

        tx.commit().await?;
        Ok(FunnelMessageWithStages { message, stages })
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<FunnelMessage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM funnel_messages WHERE id = $1");
        sqlx::query_as::<_, FunnelMessage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a message with its stages ordered by stage number.
    pub async fn find_with_stages(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<FunnelMessageWithStages>, sqlx::Error> {
        let Some(message) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let stages = Self::stages(pool, id).await?;
        Ok(Some(FunnelMessageWithStages { message, stages }))
    }

    pub async fn stages(pool: &PgPool, message_id: DbId) -> Result<Vec<MessageStage>, sqlx::Error> {
        let query = format!(
            "SELECT {STAGE_COLUMNS} FROM funnel_message_stages
             WHERE funnel_message_id = $1 ORDER BY stage_number"
        );
        sqlx::query_as::<_, MessageStage>(&query)
            .bind(message_id)
            .fetch_all(pool)
            .await
    }

    /// Messages owned by `owner_profile_id` (`None` = headquarters).
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_profile_id: Option<DbId>,
    ) -> Result<Vec<FunnelMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM funnel_messages
             WHERE owner_profile_id IS NOT DISTINCT FROM $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, FunnelMessage>(&query)
            .bind(owner_profile_id)
            .fetch_all(pool)
            .await
    }

    /// Update a message. When `stages` is `Some`, every existing stage is
    /// replaced in the same transaction.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        fields: &FunnelMessageFields,
        stages: Option<&[NewStage]>,
    ) -> Result<Option<FunnelMessageWithStages>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE funnel_messages SET group_id = $2, title = $3, channel = $4, is_active = $5
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let message = sqlx::query_as::<_, FunnelMessage>(&query)
            .bind(id)
            .bind(fields.group_id)
            .bind(&fields.title)
            .bind(&fields.channel)
            .bind(fields.is_active)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(message) = message else {
            tx.rollback().await?;
            return Ok(None);
        };

        if let Some(stages) = stages {
            Self::replace_stages_inner(&mut tx, id, stages).await?;
        }

        tx.commit().await?;

        let stages = Self::stages(pool, id).await?;
        Ok(Some(FunnelMessageWithStages { message, stages }))
    }

    /// Delete a message; stages cascade. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM funnel_messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unsent (stage, lead) pairs of active funnel messages whose scheduled
    /// KST day lies in `[from_kst, to_kst]`. Exact timing is decided by the
    /// caller.
    pub async fn dispatch_candidates(
        pool: &PgPool,
        from_kst: NaiveDate,
        to_kst: NaiveDate,
    ) -> Result<Vec<DispatchCandidate>, sqlx::Error> {
        sqlx::query_as::<_, DispatchCandidate>(
            "SELECT m.id AS message_id, m.channel, s.id AS stage_id, s.day_offset, s.send_time,
                    s.subject, s.body, l.id AS lead_id, l.customer_name, l.phone, l.email,
                    l.group_assigned_at, NULL::DATE AS start_date,
                    p.display_name AS agent_name
             FROM funnel_messages m
             JOIN funnel_message_stages s ON s.funnel_message_id = m.id
             JOIN affiliate_leads l ON l.group_id = m.group_id
             LEFT JOIN affiliate_profiles p ON p.id = COALESCE(l.agent_id, l.manager_id)
             WHERE m.is_active = true
               AND l.group_assigned_at IS NOT NULL
               AND ((l.group_assigned_at AT TIME ZONE 'UTC') + INTERVAL '9 hours')::DATE
                   + s.day_offset BETWEEN $1::DATE AND $2::DATE
               AND NOT EXISTS (
                   SELECT 1 FROM message_logs ml
                   WHERE ml.source = 'FUNNEL' AND ml.stage_id = s.id AND ml.lead_id = l.id
               )
             ORDER BY m.id, s.stage_number, l.id",
        )
        .bind(from_kst)
        .bind(to_kst)
        .fetch_all(pool)
        .await
    }

    async fn replace_stages_inner(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        message_id: DbId,
        stages: &[NewStage],
    ) -> Result<Vec<MessageStage>, sqlx::Error> {
        sqlx::query("DELETE FROM funnel_message_stages WHERE funnel_message_id = $1")
            .bind(message_id)
            .execute(&mut **tx)
            .await?;

        let query = format!(
            "INSERT INTO funnel_message_stages
                (funnel_message_id, stage_number, day_offset, send_time, subject, body)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {STAGE_COLUMNS}"
        );
        let mut inserted = Vec::with_capacity(stages.len());
        for stage in stages {
            let row = sqlx::query_as::<_, MessageStage>(&query)
                .bind(message_id)
                .bind(stage.stage_number)
                .bind(stage.day_offset)
                .bind(stage.send_time)
                .bind(&stage.subject)
                .bind(&stage.body)
                .fetch_one(&mut **tx)
                .await?;
            inserted.push(row);
        }
        inserted.sort_by_key(|s| s.stage_number);
        Ok(inserted)
    }
}
