//! Route definitions for funnel and scheduled messages.

use axum::routing::get;
use axum::Router;

use crate::handlers::{funnel_messages, scheduled_messages};
use crate::state::AppState;

/// Routes mounted at `/funnel-messages`.
///
/// ```text
/// GET    /       -> list
/// POST   /       -> create
/// GET    /{id}   -> get_by_id
/// PUT    /{id}   -> update (replaces stages)
/// DELETE /{id}   -> delete
/// ```
pub fn funnel_router() -> Router<AppState> {
    Router::new()
        .route("/", get(funnel_messages::list).post(funnel_messages::create))
        .route(
            "/{id}",
            get(funnel_messages::get_by_id)
                .put(funnel_messages::update)
                .delete(funnel_messages::delete),
        )
}

/// Routes mounted at `/scheduled-messages`.
///
/// ```text
/// GET    /             -> list
/// POST   /             -> create
/// GET    /{id}         -> get_by_id
/// PUT    /{id}         -> update (replaces stages)
/// DELETE /{id}         -> delete
/// GET    /{id}/logs    -> logs
/// ```
pub fn scheduled_router() -> Router<AppState> {
    Router::new()
        .route(
            "/",
            get(scheduled_messages::list).post(scheduled_messages::create),
        )
        .route(
            "/{id}",
            get(scheduled_messages::get_by_id)
                .put(scheduled_messages::update)
                .delete(scheduled_messages::delete),
        )
        .route("/{id}/logs", get(scheduled_messages::logs))
}
