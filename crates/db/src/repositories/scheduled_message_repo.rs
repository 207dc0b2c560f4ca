//! Repository for the `scheduled_messages` and `scheduled_message_stages` tables.

use chrono::NaiveDate;
use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{
    DispatchCandidate, MessageStage, NewStage, ScheduledMessage, ScheduledMessageWithStages,
};

const COLUMNS: &str = "id, owner_profile_id, target_group_id, title, channel, start_date, \
                        is_active, created_at, updated_at";

const STAGE_COLUMNS: &str = "id, scheduled_message_id AS message_id, stage_number, day_offset, \
                              send_time, subject, body, created_at, updated_at";

/// Fields shared by create and update, already validated by the caller.
#[derive(Debug, Clone)]
pub struct ScheduledMessageFields {
    pub target_group_id: Option<DbId>,
    pub title: String,
    pub channel: String,
    pub start_date: NaiveDate,
    pub is_active: bool,
}

/// Provides CRUD operations for scheduled messages and their stages.
pub struct ScheduledMessageRepo;

impl ScheduledMessageRepo {
    /// Insert a message and its stages in one transaction.
    pub async fn create(
        pool: &PgPool,
        owner_profile_id: Option<DbId>,
        fields: &ScheduledMessageFields,
        stages: &[NewStage],
    ) -> Result<ScheduledMessageWithStages, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO scheduled_messages
                (owner_profile_id, target_group_id, title, channel, start_date, is_active)
             VALUES ($1, $2, $3, $4, $5, $6)
             RETURNING {COLUMNS}"
        );
        let message = sqlx::query_as::<_, ScheduledMessage>(&query)
            .bind(owner_profile_id)
            .bind(fields.target_group_id)
            .bind(&fields.title)
            .bind(&fields.channel)
            .bind(fields.start_date)
            .bind(fields.is_active)
            .fetch_one(&mut *tx)
            .await?;

        let stages = Self::replace_stages_inner(&mut tx, message.id, stages).await?;

        tx.commit().await?;
        Ok(ScheduledMessageWithStages { message, stages })
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ScheduledMessage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM scheduled_messages WHERE id = $1");
        sqlx::query_as::<_, ScheduledMessage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn find_with_stages(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<ScheduledMessageWithStages>, sqlx::Error> {
        let Some(message) = Self::find_by_id(pool, id).await? else {
            return Ok(None);
        };
        let stages = Self::stages(pool, id).await?;
        Ok(Some(ScheduledMessageWithStages { message, stages }))
    }

    pub async fn stages(pool: &PgPool, message_id: DbId) -> Result<Vec<MessageStage>, sqlx::Error> {
        let query = format!(
            "SELECT {STAGE_COLUMNS} FROM scheduled_message_stages
             WHERE scheduled_message_id = $1 ORDER BY stage_number"
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
    ) -> Result<Vec<ScheduledMessage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM scheduled_messages
             WHERE owner_profile_id IS NOT DISTINCT FROM $1
             ORDER BY start_date DESC, id DESC"
        );
        sqlx::query_as::<_, ScheduledMessage>(&query)
            .bind(owner_profile_id)
            .fetch_all(pool)
            .await
    }

    /// Update a message, replacing its stages when `stages` is `Some`.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        fields: &ScheduledMessageFields,
        stages: Option<&[NewStage]>,
    ) -> Result<Option<ScheduledMessageWithStages>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE scheduled_messages SET
                target_group_id = $2, title = $3, channel = $4, start_date = $5, is_active = $6
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        let message = sqlx::query_as::<_, ScheduledMessage>(&query)
            .bind(id)
            .bind(fields.target_group_id)
            .bind(&fields.title)
            .bind(&fields.channel)
            .bind(fields.start_date)
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
        Ok(Some(ScheduledMessageWithStages { message, stages }))
    }

    /// Delete a message; stages cascade. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM scheduled_messages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Unsent (stage, lead) pairs of active scheduled messages whose
    /// scheduled KST day lies in `[from_kst, to_kst]`.
    pub async fn dispatch_candidates(
        pool: &PgPool,
        from_kst: NaiveDate,
        to_kst: NaiveDate,
    ) -> Result<Vec<DispatchCandidate>, sqlx::Error> {
        sqlx::query_as::<_, DispatchCandidate>(
            "SELECT m.id AS message_id, m.channel, s.id AS stage_id, s.day_offset, s.send_time,
                    s.subject, s.body, l.id AS lead_id, l.customer_name, l.phone, l.email,
                    NULL::TIMESTAMPTZ AS group_assigned_at, m.start_date,
                    p.display_name AS agent_name
             FROM scheduled_messages m
             JOIN scheduled_message_stages s ON s.scheduled_message_id = m.id
             JOIN affiliate_leads l ON l.group_id = m.target_group_id
             LEFT JOIN affiliate_profiles p ON p.id = COALESCE(l.agent_id, l.manager_id)
             WHERE m.is_active = true
               AND m.start_date + s.day_offset BETWEEN $1::DATE AND $2::DATE
               AND NOT EXISTS (
                   SELECT 1 FROM message_logs ml
                   WHERE ml.source = 'SCHEDULED' AND ml.stage_id = s.id AND ml.lead_id = l.id
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
        sqlx::query("DELETE FROM scheduled_message_stages WHERE scheduled_message_id = $1")
            .bind(message_id)
            .execute(&mut **tx)
            .await?;

        let query = format!(
            "INSERT INTO scheduled_message_stages
                (scheduled_message_id, stage_number, day_offset, send_time, subject, body)
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
