//! Database and spreadsheet backups.
//!
//! A backup writes through a [`BackupSink`]: a local directory in
//! development, an HTTP upload endpoint in production. The database backup
//! dumps every table in [`export::BACKUP_TABLES`] to CSV and uploads them as
//! one zip archive; the spreadsheet backup appends new leads and orders to
//! running sheets.

pub mod database;
pub mod error;
pub mod export;
pub mod sink;
pub mod spreadsheet;

pub use database::DatabaseBackup;
pub use error::BackupError;
pub use sink::{BackupSink, HttpSink, LocalDirSink};
pub use spreadsheet::{SheetWatermarks, SpreadsheetBackup};

/// Outcome of one backup run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BackupReport {
    /// Tables (database backup) or sheets (spreadsheet backup) written.
    pub tables_ok: i32,
    pub tables_failed: i32,
    pub failed_tables: Vec<String>,
    /// Rows exported or appended across all tables.
    pub rows: i64,
    /// Where the output landed, as reported by the sink.
    pub location: Option<String>,
}
