//! Route definitions for checkout, payments and orders.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{checkout, orders, payments};
use crate::state::AppState;

/// Routes mounted at `/checkout`.
pub fn checkout_router() -> Router<AppState> {
    Router::new().route("/", post(checkout::checkout))
}

/// Routes mounted at `/payments`.
///
/// ```text
/// POST /confirm   -> confirm (signed webhook)
/// ```
pub fn payments_router() -> Router<AppState> {
    Router::new().route("/confirm", post(payments::confirm))
}

/// Routes mounted at `/orders`.
///
/// ```text
/// GET  /              -> list
/// GET  /{id}          -> get_by_id
/// POST /{id}/cancel   -> cancel (admin)
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(orders::list))
        .route("/{id}", get(orders::get_by_id))
        .route("/{id}/cancel", post(orders::cancel))
}
