//! Route definitions for documents, calculators and the assistant.

use axum::routing::{get, post};
use axum::Router;

use crate::handlers::{assistant, calculators, documents};
use crate::state::AppState;

/// Routes mounted at `/documents`.
///
/// ```text
/// GET  /orders/{id}/certificate   -> certificate (SVG)
/// POST /quote                     -> quote
/// ```
pub fn documents_router() -> Router<AppState> {
    Router::new()
        .route("/orders/{id}/certificate", get(documents::certificate))
        .route("/quote", post(documents::quote))
}

/// Routes mounted at `/calculators`.
pub fn calculators_router() -> Router<AppState> {
    Router::new()
        .route("/tax", post(calculators::tax))
        .route("/margin", post(calculators::margin))
}

/// Routes mounted at `/assistant`.
pub fn assistant_router() -> Router<AppState> {
    Router::new().route("/chat", post(assistant::chat))
}
