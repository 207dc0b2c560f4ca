//! Route definitions for the `/passport-submissions` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::passport;
use crate::state::AppState;

/// Routes mounted at `/passport-submissions`.
///
/// ```text
/// GET  /?order_id=   -> list
/// POST /             -> create
/// GET  /{id}         -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(passport::list).post(passport::create))
        .route("/{id}", get(passport::get_by_id))
}
