//! Repository for the `backup_runs` table.

use cruisemall_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::backup_run::{
    BackupRun, FinishBackupRun, BACKUP_STATUS_COMPLETED, BACKUP_STATUS_RUNNING,
};

const COLUMNS: &str = "id, kind, trigger_type, status, location, tables_ok, tables_failed, \
                        failed_tables, rows_appended, error, started_at, finished_at, created_by";

/// Records the history of backup runs.
pub struct BackupRunRepo;

impl BackupRunRepo {
    /// Insert a `RUNNING` row for a new backup.
    pub async fn start(
        pool: &PgPool,
        kind: &str,
        trigger_type: &str,
        created_by: Option<DbId>,
    ) -> Result<BackupRun, sqlx::Error> {
        let query = format!(
            "INSERT INTO backup_runs (kind, trigger_type, status, created_by)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(kind)
            .bind(trigger_type)
            .bind(BACKUP_STATUS_RUNNING)
            .bind(created_by)
            .fetch_one(pool)
            .await
    }

    /// Record the outcome of a run.
    pub async fn finish(
        pool: &PgPool,
        id: DbId,
        outcome: &FinishBackupRun,
    ) -> Result<BackupRun, sqlx::Error> {
        let query = format!(
            "UPDATE backup_runs SET
                status = $2, location = $3, tables_ok = $4, tables_failed = $5,
                failed_tables = $6, rows_appended = $7, error = $8, finished_at = NOW()
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(id)
            .bind(outcome.status)
            .bind(&outcome.location)
            .bind(outcome.tables_ok)
            .bind(outcome.tables_failed)
            .bind(&outcome.failed_tables)
            .bind(outcome.rows_appended)
            .bind(&outcome.error)
            .fetch_one(pool)
            .await
    }

    /// Recent runs, optionally filtered by kind.
    pub async fn list(
        pool: &PgPool,
        kind: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<BackupRun>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM backup_runs
             WHERE ($1::TEXT IS NULL OR kind = $1)
             ORDER BY started_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, BackupRun>(&query)
            .bind(kind)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Start time of the most recent completed run of `kind` in which
    /// `table` did not fail. Spreadsheet backups append from here.
    pub async fn table_watermark(
        pool: &PgPool,
        kind: &str,
        table: &str,
    ) -> Result<Option<Timestamp>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT MAX(started_at) FROM backup_runs
             WHERE kind = $1 AND status = $2 AND NOT ($3 = ANY(failed_tables))",
        )
        .bind(kind)
        .bind(BACKUP_STATUS_COMPLETED)
        .bind(table)
        .fetch_one(pool)
        .await
    }

    /// Whether a run of `kind` with the given trigger started at or after
    /// `since`. Used to run the scheduled backup once per day.
    pub async fn started_since(
        pool: &PgPool,
        kind: &str,
        trigger_type: &str,
        since: Timestamp,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS(
                SELECT 1 FROM backup_runs
                WHERE kind = $1 AND trigger_type = $2 AND started_at >= $3
             )",
        )
        .bind(kind)
        .bind(trigger_type)
        .bind(since)
        .fetch_one(pool)
        .await
    }
}
