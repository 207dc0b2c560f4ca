//! Admin handlers for backup history and manual backups.

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use cruisemall_core::error::CoreError;
use cruisemall_core::types::DbId;
use cruisemall_db::models::backup_run::{
    BackupRun, BACKUP_KIND_DATABASE, BACKUP_KIND_SPREADSHEET, BACKUP_TRIGGER_MANUAL,
};
use cruisemall_db::repositories::BackupRunRepo;
use serde::Deserialize;

use crate::background::backup_scheduler::run_backup;
use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct BackupListParams {
    /// `DATABASE` or `SPREADSHEET`.
    pub kind: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

/// GET /api/v1/admin/backups
pub async fn list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<BackupListParams>,
) -> AppResult<Json<DataResponse<Vec<BackupRun>>>> {
    let kind = params
        .kind
        .as_deref()
        .map(|k| k.trim().to_uppercase())
        .filter(|k| !k.is_empty());
    if let Some(kind) = kind.as_deref() {
        if kind != BACKUP_KIND_DATABASE && kind != BACKUP_KIND_SPREADSHEET {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown backup kind '{kind}'"
            ))));
        }
    }

    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let runs = BackupRunRepo::list(&state.pool, kind.as_deref(), limit, offset).await?;
    Ok(Json(DataResponse { data: runs }))
}

/// POST /api/v1/admin/backups/database
pub async fn run_database(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<DataResponse<BackupRun>>)> {
    run_manual(&state, BACKUP_KIND_DATABASE, admin.user_id).await
}

/// POST /api/v1/admin/backups/spreadsheet
pub async fn run_spreadsheet(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
) -> AppResult<(StatusCode, Json<DataResponse<BackupRun>>)> {
    run_manual(&state, BACKUP_KIND_SPREADSHEET, admin.user_id).await
}

/// Runs inline; the returned row carries `COMPLETED` or `FAILED`.
async fn run_manual(
    state: &AppState,
    kind: &'static str,
    user_id: DbId,
) -> AppResult<(StatusCode, Json<DataResponse<BackupRun>>)> {
    let run = run_backup(
        &state.pool,
        state.backup_sink.as_ref(),
        &state.event_bus,
        kind,
        BACKUP_TRIGGER_MANUAL,
        Some(user_id),
    )
    .await?;
    Ok((StatusCode::CREATED, Json(DataResponse { data: run })))
}
