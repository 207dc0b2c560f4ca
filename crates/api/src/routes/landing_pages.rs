//! Route definitions for the `/landing-pages` resource.

use axum::routing::get;
use axum::Router;

use crate::handlers::landing_pages;
use crate::state::AppState;

/// Routes mounted at `/landing-pages`.
///
/// ```text
/// GET    /       -> list
/// POST   /       -> create
/// GET    /{id}   -> get_by_id
/// PUT    /{id}   -> update
/// DELETE /{id}   -> delete
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(landing_pages::list).post(landing_pages::create))
        .route(
            "/{id}",
            get(landing_pages::get_by_id)
                .put(landing_pages::update)
                .delete(landing_pages::delete),
        )
}
