//! Route definitions for the `/admin/backups` resource.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::backups;
use crate::state::AppState;

/// Routes mounted at `/admin/backups`.
///
/// ```text
/// GET  /              -> list
/// POST /database      -> run_database
/// POST /spreadsheet   -> run_spreadsheet
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(backups::list))
        .route("/database", post(backups::run_database))
        .route("/spreadsheet", post(backups::run_spreadsheet))
}
