//! Repository for the `message_logs` table.

use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::message::{CreateMessageLog, MessageLog};

const COLUMNS: &str =
    "id, source, message_id, stage_id, lead_id, channel, recipient, status, error, sent_at";

/// Delivery log for funnel and scheduled messages.
pub struct MessageLogRepo;

impl MessageLogRepo {
    /// Record a delivery attempt. Returns `None` when the (source, stage,
    /// lead) pair was already logged, which means another tick got there
    /// first.
    pub async fn record(
        pool: &PgPool,
        input: &CreateMessageLog,
    ) -> Result<Option<MessageLog>, sqlx::Error> {
        let query = format!(
            "INSERT INTO message_logs
                (source, message_id, stage_id, lead_id, channel, recipient, status, error)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
             ON CONFLICT (source, stage_id, lead_id) DO NOTHING
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, MessageLog>(&query)
            .bind(input.source)
            .bind(input.message_id)
            .bind(input.stage_id)
            .bind(input.lead_id)
            .bind(&input.channel)
            .bind(&input.recipient)
            .bind(input.status)
            .bind(&input.error)
            .fetch_optional(pool)
            .await
    }

    /// Whether a (source, stage, lead) pair has already been attempted.
    pub async fn exists(
        pool: &PgPool,
        source: &str,
        stage_id: DbId,
        lead_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM message_logs WHERE source = $1 AND stage_id = $2 AND lead_id = $3
             )",
        )
        .bind(source)
        .bind(stage_id)
        .bind(lead_id)
        .fetch_one(pool)
        .await
    }

    /// Log entries for one message, newest first.
    pub async fn list_for_message(
        pool: &PgPool,
        source: &str,
        message_id: DbId,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<MessageLog>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM message_logs
             WHERE source = $1 AND message_id = $2
             ORDER BY sent_at DESC, id DESC
             LIMIT $3 OFFSET $4"
        );
        sqlx::query_as::<_, MessageLog>(&query)
            .bind(source)
            .bind(message_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }
}
