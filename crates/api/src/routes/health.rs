use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

/// Liveness payload for the cruisemall API and its Postgres pool.
#[derive(Serialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` while Postgres is unreachable.
    pub status: &'static str,
    /// `cruisemall-api` package version.
    pub version: &'static str,
    /// Whether the database is reachable.
    pub db_healthy: bool,
}

/// GET /health
///
/// Always 200 so load balancers can tell a live process from a dead one;
/// database reachability is reported in the body.
async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = cruisemall_db::health_check(&state.pool).await.is_ok();

    let status = if db_healthy { "ok" } else { "degraded" };

    Json(HealthResponse {
        status,
        version: env!("CARGO_PKG_VERSION"),
        db_healthy,
    })
}

/// Mounted at the root, outside `/api/v1`.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
