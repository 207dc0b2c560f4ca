//! Route definitions for the `/affiliate` resource.

use axum::routing::{get, put};
use axum::Router;

use crate::handlers::{affiliate_leads, affiliate_profiles, affiliate_sales};
use crate::state::AppState;

/// Routes mounted at `/affiliate`.
///
/// ```text
/// GET    /me                  -> affiliate_profiles::me
///
/// GET    /profiles            -> affiliate_profiles::list
/// POST   /profiles            -> affiliate_profiles::create
/// GET    /profiles/{id}       -> affiliate_profiles::get_by_id
/// PUT    /profiles/{id}       -> affiliate_profiles::update
///
/// GET    /leads               -> affiliate_leads::list
/// POST   /leads               -> affiliate_leads::create
/// GET    /leads/lookup        -> affiliate_leads::lookup
/// GET    /leads/{id}          -> affiliate_leads::get_by_id
/// PUT    /leads/{id}          -> affiliate_leads::update
/// DELETE /leads/{id}          -> affiliate_leads::delete
/// PUT    /leads/{id}/assign   -> affiliate_leads::assign
///
/// GET    /sales               -> affiliate_sales::list
/// GET    /sales/summary       -> affiliate_sales::summary
/// ```
pub fn router() -> Router<AppState> {
    let profile_routes = Router::new()
        .route(
            "/",
            get(affiliate_profiles::list).post(affiliate_profiles::create),
        )
        .route(
            "/{id}",
            get(affiliate_profiles::get_by_id).put(affiliate_profiles::update),
        );

    let lead_routes = Router::new()
        .route("/", get(affiliate_leads::list).post(affiliate_leads::create))
        .route("/lookup", get(affiliate_leads::lookup))
        .route(
            "/{id}",
            get(affiliate_leads::get_by_id)
                .put(affiliate_leads::update)
                .delete(affiliate_leads::delete),
        )
        .route("/{id}/assign", put(affiliate_leads::assign));

    let sale_routes = Router::new()
        .route("/", get(affiliate_sales::list))
        .route("/summary", get(affiliate_sales::summary));

    Router::new()
        .route("/me", get(affiliate_profiles::me))
        .nest("/profiles", profile_routes)
        .nest("/leads", lead_routes)
        .nest("/sales", sale_routes)
}
