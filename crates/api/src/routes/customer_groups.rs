//! Route definitions for the `/customer-groups` resource.

use axum::routing::{delete, get};
use axum::Router;

use crate::handlers::customer_groups;
use crate::state::AppState;

/// Routes mounted at `/customer-groups`.
///
/// ```text
/// GET    /                          -> list
/// POST   /                          -> create
/// GET    /{id}                      -> get_by_id
/// PUT    /{id}                      -> update
/// DELETE /{id}                      -> delete
/// GET    /{id}/members              -> list_members
/// POST   /{id}/members              -> add_members
/// DELETE /{id}/members/{lead_id}    -> remove_member
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(customer_groups::list).post(customer_groups::create))
        .route(
            "/{id}",
            get(customer_groups::get_by_id)
                .put(customer_groups::update)
                .delete(customer_groups::delete),
        )
        .route(
            "/{id}/members",
            get(customer_groups::list_members).post(customer_groups::add_members),
        )
        .route(
            "/{id}/members/{lead_id}",
            delete(customer_groups::remove_member),
        )
}
