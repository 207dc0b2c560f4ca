//! Route definitions for the cruise catalog.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::products;
use crate::state::AppState;

/// Public routes mounted at `/products`.
///
/// ```text
/// GET /       -> list
/// GET /{id}   -> get_by_id
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(products::list))
        .route("/{id}", get(products::get_by_id))
}

/// Admin routes mounted at `/admin/products`.
///
/// ```text
/// GET    /       -> admin_list
/// POST   /       -> create
/// PUT    /{id}   -> update
/// DELETE /{id}   -> deactivate
/// ```
pub fn admin_router() -> Router<AppState> {
    Router::new()
        .route("/", get(products::admin_list).post(products::create))
        .route("/{id}", put(products::update).delete(products::deactivate))
}
