//! Backup targets.

mod http;
mod local;

pub use http::HttpSink;
pub use local::LocalDirSink;

use async_trait::async_trait;

use crate::error::BackupError;
use crate::export::Table;

/// Where backups are written.
#[async_trait]
pub trait BackupSink: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Create (or reuse) a folder and return its identifier.
    async fn ensure_folder(&self, name: &str) -> Result<String, BackupError>;

    /// Store a file in a folder returned by [`ensure_folder`](Self::ensure_folder)
    /// and return its location.
    async fn upload_file(
        &self,
        folder: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<String, BackupError>;

    /// Append records to a running sheet, creating it with `table.header`
    /// on first use. Returns the number of rows appended.
    async fn append_rows(&self, sheet: &str, table: &Table) -> Result<u64, BackupError>;
}

/// Folder, file, and sheet names are single path segments of
/// `[A-Za-z0-9._-]` that do not start with a dot.
pub(crate) fn check_name(name: &str) -> Result<(), BackupError> {
    let valid = !name.is_empty()
        && !name.starts_with('.')
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
    if valid {
        Ok(())
    } else {
        Err(BackupError::InvalidName(name.to_string()))
    }
}
