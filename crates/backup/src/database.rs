//! Full database dump.

use chrono::{DateTime, Utc};
use cruisemall_core::schedule::kst;
use sqlx::PgPool;

use crate::error::BackupError;
use crate::export::{fetch_table, rows_to_csv, zip_files, BACKUP_TABLES};
use crate::sink::BackupSink;
use crate::BackupReport;

/// Dumps every table in [`BACKUP_TABLES`] to CSV and uploads them as one
/// zip archive.
pub struct DatabaseBackup;

impl DatabaseBackup {
    /// Folder name for a run started at `at`, in KST.
    pub fn folder_name(at: DateTime<Utc>) -> String {
        at.with_timezone(&kst())
            .format("backup-%Y%m%d-%H%M")
            .to_string()
    }

    /// Run the backup. A table that fails to export is logged and counted;
    /// the run only fails when no table could be exported or the upload
    /// fails.
    pub async fn run(
        pool: &PgPool,
        sink: &dyn BackupSink,
        at: DateTime<Utc>,
    ) -> Result<BackupReport, BackupError> {
        let folder_name = Self::folder_name(at);
        let mut report = BackupReport::default();
        let mut files = Vec::with_capacity(BACKUP_TABLES.len());

        for table in BACKUP_TABLES {
            let exported = match fetch_table(pool, table).await {
                Ok(rows) => rows_to_csv(&rows).map(|csv| (rows.len(), csv)),
                Err(e) => Err(e),
            };
            match exported {
                Ok((row_count, csv)) => {
                    report.tables_ok += 1;
                    report.rows += row_count as i64;
                    files.push((format!("{table}.csv"), csv));
                }
                Err(e) => {
                    tracing::warn!(table, error = %e, "Table export failed, continuing");
                    report.tables_failed += 1;
                    report.failed_tables.push(table.to_string());
                }
            }
        }

        if files.is_empty() {
            return Err(BackupError::NothingExported);
        }

        let archive = zip_files(&files)?;
        let folder = sink.ensure_folder(&folder_name).await?;
        let location = sink
            .upload_file(&folder, &format!("{folder_name}.zip"), archive)
            .await?;

        tracing::info!(
            sink = sink.name(),
            tables_ok = report.tables_ok,
            tables_failed = report.tables_failed,
            rows = report.rows,
            location = %location,
            "Database backup uploaded"
        );

        report.location = Some(location);
        Ok(report)
    }
}
