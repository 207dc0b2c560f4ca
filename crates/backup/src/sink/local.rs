//! Filesystem backup sink.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use super::{check_name, BackupSink};
use crate::error::BackupError;
use crate::export::{table_to_csv, Table};

/// Subdirectory holding the running sheets.
const SHEETS_DIR: &str = "sheets";

/// Writes backups under a root directory. Sheets are CSV files under
/// `<root>/sheets/`.
pub struct LocalDirSink {
    root: PathBuf,
}

impl LocalDirSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[async_trait]
impl BackupSink for LocalDirSink {
    fn name(&self) -> &'static str {
        "local"
    }

    async fn ensure_folder(&self, name: &str) -> Result<String, BackupError> {
        check_name(name)?;
        tokio::fs::create_dir_all(self.root.join(name)).await?;
        Ok(name.to_string())
    }

    async fn upload_file(
        &self,
        folder: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<String, BackupError> {
        check_name(folder)?;
        check_name(file_name)?;
        let path = self.root.join(folder).join(file_name);
        tokio::fs::write(&path, data).await?;
        Ok(path.display().to_string())
    }

    async fn append_rows(&self, sheet: &str, table: &Table) -> Result<u64, BackupError> {
        check_name(sheet)?;
        if table.records.is_empty() {
            return Ok(0);
        }

        let dir = self.root.join(SHEETS_DIR);
        tokio::fs::create_dir_all(&dir).await?;
        let path = dir.join(format!("{sheet}.csv"));

        let is_new = !tokio::fs::try_exists(&path).await?;
        let bytes = table_to_csv(table, is_new)?;

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await?;
        file.write_all(&bytes).await?;
        file.flush().await?;

        Ok(table.records.len() as u64)
    }
}
