//! HTTP backup sink.
//!
//! Talks to a storage endpoint exposing:
//!
//! | Method | Path                         | Body                      | Response         |
//! |--------|------------------------------|---------------------------|------------------|
//! | POST   | `/folders`                   | `{"name"}`                | `{"id"}`         |
//! | POST   | `/folders/{id}/files`        | multipart field `file`    | `{"location"}`   |
//! | POST   | `/sheets/{name}/rows`        | `{"header", "rows"}`      | `{"appended"}`   |

use std::time::Duration;

use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use serde::Deserialize;

use super::{check_name, BackupSink};
use crate::error::BackupError;
use crate::export::Table;

/// Uploads can be large; allow more time than an API call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Deserialize)]
struct FolderResponse {
    id: String,
}

#[derive(Deserialize)]
struct FileResponse {
    location: Option<String>,
}

#[derive(Deserialize)]
struct AppendResponse {
    appended: Option<u64>,
}

/// Writes backups to a remote storage endpoint with a bearer token.
pub struct HttpSink {
    client: reqwest::Client,
    base_url: String,
    token: Option<String>,
}

impl HttpSink {
    pub fn new(base_url: impl Into<String>, token: Option<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .expect("Failed to build reqwest HTTP client");
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        }
    }

    fn post(&self, path: &str) -> reqwest::RequestBuilder {
        let builder = self.client.post(format!("{}{path}", self.base_url));
        match &self.token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn check(response: reqwest::Response) -> Result<reqwest::Response, BackupError> {
        if !response.status().is_success() {
            return Err(BackupError::HttpStatus(response.status().as_u16()));
        }
        Ok(response)
    }
}

#[async_trait]
impl BackupSink for HttpSink {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn ensure_folder(&self, name: &str) -> Result<String, BackupError> {
        check_name(name)?;
        let response = self
            .post("/folders")
            .json(&serde_json::json!({ "name": name }))
            .send()
            .await?;
        let folder: FolderResponse = Self::check(response).await?.json().await?;
        Ok(folder.id)
    }

    async fn upload_file(
        &self,
        folder: &str,
        file_name: &str,
        data: Vec<u8>,
    ) -> Result<String, BackupError> {
        check_name(file_name)?;
        let part = Part::bytes(data).file_name(file_name.to_string());
        let response = self
            .post(&format!("/folders/{folder}/files"))
            .multipart(Form::new().part("file", part))
            .send()
            .await?;
        let file: FileResponse = Self::check(response).await?.json().await?;
        Ok(file
            .location
            .unwrap_or_else(|| format!("{}/folders/{folder}/{file_name}", self.base_url)))
    }

    async fn append_rows(&self, sheet: &str, table: &Table) -> Result<u64, BackupError> {
        check_name(sheet)?;
        if table.records.is_empty() {
            return Ok(0);
        }
        let response = self
            .post(&format!("/sheets/{sheet}/rows"))
            .json(&serde_json::json!({ "header": table.header, "rows": table.records }))
            .send()
            .await?;
        let appended: AppendResponse = Self::check(response).await?.json().await?;
        Ok(appended.appended.unwrap_or(table.records.len() as u64))
    }
}
