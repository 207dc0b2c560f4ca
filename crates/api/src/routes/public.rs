//! Unauthenticated customer-facing routes.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{landing_pages, passport};
use crate::state::AppState;

/// Routes mounted at `/public`.
///
/// ```text
/// GET  /landing-pages/{slug}            -> landing_pages::public_get
/// POST /landing-pages/{slug}/register   -> landing_pages::register
/// GET  /passport/{token}                -> passport::public_get
/// POST /passport/{token}                -> passport::public_submit
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/landing-pages/{slug}", get(landing_pages::public_get))
        .route(
            "/landing-pages/{slug}/register",
            post(landing_pages::register),
        )
        .route(
            "/passport/{token}",
            get(passport::public_get).post(passport::public_submit),
        )
}
