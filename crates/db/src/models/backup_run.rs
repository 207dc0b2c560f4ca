//! Backup run history model.

use cruisemall_core::types::{DbId, Timestamp};
use serde::Serialize;
use sqlx::FromRow;

pub const BACKUP_KIND_DATABASE: &str = "DATABASE";
pub const BACKUP_KIND_SPREADSHEET: &str = "SPREADSHEET";

pub const BACKUP_TRIGGER_MANUAL: &str = "MANUAL";
pub const BACKUP_TRIGGER_SCHEDULED: &str = "SCHEDULED";

pub const BACKUP_STATUS_RUNNING: &str = "RUNNING";
pub const BACKUP_STATUS_COMPLETED: &str = "COMPLETED";
pub const BACKUP_STATUS_FAILED: &str = "FAILED";

/// A row from the `backup_runs` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct BackupRun {
    pub id: DbId,
    pub kind: String,
    pub trigger_type: String,
    pub status: String,
    pub location: Option<String>,
    pub tables_ok: i32,
    pub tables_failed: i32,
    pub failed_tables: Vec<String>,
    pub rows_appended: i64,
    pub error: Option<String>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
    pub created_by: Option<DbId>,
}

/// Outcome written when a run finishes.
#[derive(Debug, Clone, Default)]
pub struct FinishBackupRun {
    pub status: &'static str,
    pub location: Option<String>,
    pub tables_ok: i32,
    pub tables_failed: i32,
    pub failed_tables: Vec<String>,
    pub rows_appended: i64,
    pub error: Option<String>,
}
