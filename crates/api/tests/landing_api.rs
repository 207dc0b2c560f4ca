//! HTTP-level tests for landing pages and their public registration form.

mod common;

use axum::http::StatusCode;
use common::{affiliate, body_json, get, get_auth, post_json, post_json_as, post_json_auth};
use cruisemall_db::repositories::{AffiliateLeadRepo, LandingPageRepo};
use serde_json::json;
use sqlx::PgPool;

const GOOGLEBOT: &str = "Mozilla/5.0 (compatible; Googlebot/2.1; +http://www.google.com/bot.html)";

/// A published page owned by `token`'s profile, attached to a new group.
/// Returns `(page_id, group_id)`.
async fn published_page(pool: &PgPool, token: &str, slug: &str) -> (i64, i64) {
    let app = common::build_test_app(pool.clone());
    let group = body_json(
        post_json_auth(app, "/api/v1/customer-groups", json!({ "name": "Landing leads" }), token).await,
    )
    .await;
    let group_id = group["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let body = json!({
        "slug": slug,
        "title": "Spring Japan Cruise",
        "headline": "Four nights from Busan",
        "group_id": group_id,
        "is_published": true,
    });
    let response = post_json_auth(app, "/api/v1/landing-pages", body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let page = body_json(response).await;
    (page["data"]["id"].as_i64().unwrap(), group_id)
}

fn registration(phone: &str) -> serde_json::Value {
    json!({ "customer_name": "Oh Seojin", "phone": phone, "metadata": { "utm_source": "instagram" } })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn registration_attributes_lead_to_page_owner(pool: PgPool) {
    let (manager, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (page_id, group_id) = published_page(&pool, &token, "spring-japan").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/public/landing-pages/spring-japan/register",
        registration("010-8080-9090"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let lead = AffiliateLeadRepo::find_by_normalized_phone(&pool, "01080809090")
        .await
        .unwrap()
        .expect("lead should exist");
    assert_eq!(lead.manager_id, Some(manager.id));
    assert_eq!(lead.group_id, Some(group_id));
    assert_eq!(lead.landing_page_id, Some(page_id));
    assert_eq!(lead.source, "LANDING");
    assert_eq!(lead.metadata["utm_source"], "instagram");

    let page = LandingPageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(page.registration_count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_touch_keeps_existing_owner(pool: PgPool) {
    let (first, first_token) = affiliate(&pool, "first_mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (_, second_token) = affiliate(&pool, "second_mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool.clone());
    post_json_auth(
        app,
        "/api/v1/affiliate/leads",
        json!({ "customer_name": "Oh Seojin", "phone": "01011112222" }),
        &first_token,
    )
    .await;

    let (_, second_group) = published_page(&pool, &second_token, "autumn-alaska").await;
    let app = common::build_test_app(pool.clone());
    let response = post_json(
        app,
        "/api/v1/public/landing-pages/autumn-alaska/register",
        registration("010-1111-2222"),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let lead = AffiliateLeadRepo::find_by_normalized_phone(&pool, "01011112222")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(lead.manager_id, Some(first.id), "first touch wins");
    assert_ne!(lead.group_id, Some(second_group), "conflicting lead stays out of the group");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn crawlers_cannot_register(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    published_page(&pool, &token, "bot-trap").await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_as(
        app,
        "/api/v1/public/landing-pages/bot-trap/register",
        registration("01099998888"),
        GOOGLEBOT,
    )
    .await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(AffiliateLeadRepo::find_by_normalized_phone(&pool, "01099998888")
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn public_view_counts_visits(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (page_id, _) = published_page(&pool, &token, "winter-med").await;

    let app = common::build_test_app(pool.clone());
    let response = get(app, "/api/v1/public/landing-pages/winter-med").await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["title"], "Spring Japan Cruise");
    assert!(json["data"].get("view_count").is_none(), "counters stay private");

    let page = LandingPageRepo::find_by_id(&pool, page_id).await.unwrap().unwrap();
    assert_eq!(page.view_count, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn pages_are_scoped_to_owner(pool: PgPool) {
    let (_, token_a) = affiliate(&pool, "mgr_a", "BRANCH_MANAGER", None, 500, 100).await;
    let (_, token_b) = affiliate(&pool, "mgr_b", "BRANCH_MANAGER", None, 500, 100).await;
    let (page_id, _) = published_page(&pool, &token_a, "owned-page").await;

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, &format!("/api/v1/landing-pages/{page_id}"), &token_b).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let listed = body_json(get_auth(app, "/api/v1/landing-pages", &token_b).await).await;
    assert!(listed["data"].as_array().unwrap().is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bad_slug_is_rejected(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool);
    let body = json!({ "slug": "Bad Slug!", "title": "Nope" });
    let response = post_json_auth(app, "/api/v1/landing-pages", body, &token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
