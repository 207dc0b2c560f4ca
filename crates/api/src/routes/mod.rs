pub mod affiliate;
pub mod auth;
pub mod backups;
pub mod customer_groups;
pub mod health;
pub mod landing_pages;
pub mod messages;
pub mod orders;
pub mod passport;
pub mod products;
pub mod public;
pub mod tools;

use axum::Router;

use crate::state::AppState;

/// Build the `/api/v1` route tree.
///
/// Route hierarchy:
///
/// ```text
/// /auth/signup                                      signup (public)
/// /auth/username-check                              availability + suggestions (public)
/// /auth/login                                       login (public)
/// /auth/refresh                                     refresh (public)
/// /auth/logout                                      logout (requires auth)
///
/// /products                                         list (public)
/// /products/{id}                                    get (public)
/// /admin/products                                   list, create (admin only)
/// /admin/products/{id}                              update, deactivate
///
/// /checkout                                         open an order (public)
/// /payments/confirm                                 signed payment webhook
/// /orders                                           list (admin, scoped affiliates)
/// /orders/{id}                                      get
/// /orders/{id}/cancel                               cancel (admin only)
///
/// /affiliate/me                                     caller's profile
/// /affiliate/profiles                               list, create
/// /affiliate/profiles/{id}                          get, update
/// /affiliate/leads                                  list, create
/// /affiliate/leads/lookup                           ownership by phone
/// /affiliate/leads/{id}                             get, update, delete
/// /affiliate/leads/{id}/assign                      assign agent (PUT)
/// /affiliate/sales                                  list
/// /affiliate/sales/summary                          commission totals
///
/// /customer-groups                                  list, create
/// /customer-groups/{id}                             get, update, delete
/// /customer-groups/{id}/members                     list, add
/// /customer-groups/{id}/members/{lead_id}           remove
///
/// /funnel-messages                                  list, create
/// /funnel-messages/{id}                             get, update, delete
/// /scheduled-messages                               list, create
/// /scheduled-messages/{id}                          get, update, delete
/// /scheduled-messages/{id}/logs                     delivery log
///
/// /landing-pages                                    list, create
/// /landing-pages/{id}                               get, update, delete
///
/// /passport-submissions                             list, create
/// /passport-submissions/{id}                        get with guests
///
/// /public/landing-pages/{slug}                      published page (public)
/// /public/landing-pages/{slug}/register             registration form (public)
/// /public/passport/{token}                          get, submit (public)
///
/// /documents/orders/{id}/certificate                SVG certificate
/// /documents/quote                                  price quote (public)
/// /calculators/tax                                  tax calculator
/// /calculators/margin                               margin calculator
///
/// /admin/backups                                    run history (admin only)
/// /admin/backups/database                           run database backup (POST)
/// /admin/backups/spreadsheet                        run spreadsheet backup (POST)
///
/// /assistant/chat                                   travel assistant (public)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        // Accounts and sessions.
        .nest("/auth", auth::router())
        // Catalog, public and admin.
        .nest("/products", products::router())
        .nest("/admin/products", products::admin_router())
        // Orders and payments.
        .nest("/checkout", orders::checkout_router())
        .nest("/payments", orders::payments_router())
        .nest("/orders", orders::router())
        // Affiliate hierarchy, leads and commissions.
        .nest("/affiliate", affiliate::router())
        .nest("/customer-groups", customer_groups::router())
        // Outbound messaging.
        .nest("/funnel-messages", messages::funnel_router())
        .nest("/scheduled-messages", messages::scheduled_router())
        .nest("/landing-pages", landing_pages::router())
        .nest("/passport-submissions", passport::router())
        // Customer-facing pages without auth.
        .nest("/public", public::router())
        .nest("/documents", tools::documents_router())
        .nest("/calculators", tools::calculators_router())
        .nest("/admin/backups", backups::router())
        .nest("/assistant", tools::assistant_router())
}
