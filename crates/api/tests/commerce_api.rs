//! HTTP-level tests for the product catalog, checkout, the payment webhook,
//! order access and commission reporting.

mod common;

use axum::http::StatusCode;
use common::{
    admin, affiliate, body_json, delete_auth, get, get_auth, post_json, post_json_auth,
    post_signed, product, put_json_auth, WEBHOOK_SECRET,
};
use cruisemall_core::tokens::compute_signature;
use cruisemall_db::repositories::AffiliateLeadRepo;
use serde_json::json;
use sqlx::PgPool;

const FARE: i64 = 1_000_000;

/// Check out two guests, optionally through an affiliate code, and return
/// the created order JSON.
async fn checkout(pool: &PgPool, product_id: i64, code: Option<&str>) -> serde_json::Value {
    let app = common::build_test_app(pool.clone());
    let body = json!({
        "product_id": product_id,
        "guests": 2,
        "buyer_name": "Kang Jiwoo",
        "buyer_phone": "010-3030-4040",
        "buyer_email": "jiwoo@test.com",
        "affiliate_code": code,
    });
    let response = post_json(app, "/api/v1/checkout", body).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["data"]["order"].clone()
}

fn payment_body(order_id: i64, tx_id: &str, amount: i64) -> String {
    json!({
        "order_id": order_id,
        "provider": "toss",
        "provider_tx_id": tx_id,
        "method": "CARD",
        "amount": amount,
    })
    .to_string()
}

async fn confirm(pool: &PgPool, body: &str) -> axum::http::Response<axum::body::Body> {
    let app = common::build_test_app(pool.clone());
    let signature = compute_signature(WEBHOOK_SECRET, body.as_bytes());
    post_signed(app, "/api/v1/payments/confirm", body, &signature).await
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn checkout_prices_order_and_attributes_lead(pool: PgPool) {
    let (manager, _) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (agent, _) = affiliate(&pool, "agent", "SALES_AGENT", Some(manager.id), 300, 0).await;
    let item = product(&pool, FARE).await;

    let order = checkout(&pool, item.id, Some("agent")).await;

    assert_eq!(order["status"], "PENDING");
    assert_eq!(order["total_amount"], 2 * FARE);
    assert_eq!(order["buyer_phone"], "01030304040");
    assert!(order["order_number"].as_str().unwrap().starts_with("CM-"));

    let lead_id = order["lead_id"].as_i64().unwrap();
    let lead = AffiliateLeadRepo::find_by_id(&pool, lead_id).await.unwrap().unwrap();
    assert_eq!(lead.agent_id, Some(agent.id));
    assert_eq!(lead.manager_id, Some(manager.id));
    assert_eq!(lead.source, "CHECKOUT");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unknown_affiliate_code_does_not_block_checkout(pool: PgPool) {
    let item = product(&pool, FARE).await;

    let order = checkout(&pool, item.id, Some("NOPE")).await;

    let lead_id = order["lead_id"].as_i64().unwrap();
    let lead = AffiliateLeadRepo::find_by_id(&pool, lead_id).await.unwrap().unwrap();
    assert_eq!(lead.manager_id, None);
    assert_eq!(lead.agent_id, None);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn signed_payment_marks_order_paid_and_splits_commission(pool: PgPool) {
    let (manager, _) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (agent, agent_token) = affiliate(&pool, "agent", "SALES_AGENT", Some(manager.id), 300, 0).await;
    let item = product(&pool, FARE).await;
    let order = checkout(&pool, item.id, Some("AGENT")).await;
    let order_id = order["id"].as_i64().unwrap();

    let response = confirm(&pool, &payment_body(order_id, "tx-1001", 2 * FARE)).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["duplicate"], false);
    let commission = &json["data"]["commission"];
    assert_eq!(commission["agent"]["profile_id"], agent.id);
    assert_eq!(commission["agent"]["withholding"]["gross"], 60_000);
    assert_eq!(commission["manager"]["profile_id"], manager.id);
    assert_eq!(commission["manager"]["withholding"]["gross"], 20_000);

    let app = common::build_test_app(pool.clone());
    let detail = body_json(get_auth(app, &format!("/api/v1/orders/{order_id}"), &agent_token).await).await;
    assert_eq!(detail["data"]["status"], "PAID");
    assert_eq!(detail["data"]["payments"].as_array().unwrap().len(), 1);
    assert_eq!(detail["data"]["sale"]["agent_commission"], 60_000);

    let lead_id = order["lead_id"].as_i64().unwrap();
    let lead = AffiliateLeadRepo::find_by_id(&pool, lead_id).await.unwrap().unwrap();
    assert_eq!(lead.status, "PURCHASED");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn repeated_notification_is_idempotent(pool: PgPool) {
    let item = product(&pool, FARE).await;
    let order = checkout(&pool, item.id, None).await;
    let body = payment_body(order["id"].as_i64().unwrap(), "tx-2002", 2 * FARE);

    let first = body_json(confirm(&pool, &body).await).await;
    let response = confirm(&pool, &body).await;

    assert_eq!(response.status(), StatusCode::OK);
    let second = body_json(response).await;
    assert_eq!(second["data"]["duplicate"], true);
    assert_eq!(second["data"]["payment"]["id"], first["data"]["payment"]["id"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn bad_signature_is_rejected(pool: PgPool) {
    let item = product(&pool, FARE).await;
    let order = checkout(&pool, item.id, None).await;
    let body = payment_body(order["id"].as_i64().unwrap(), "tx-3003", 2 * FARE);

    let app = common::build_test_app(pool);
    let response = post_signed(app, "/api/v1/payments/confirm", &body, "deadbeef").await;

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn amount_mismatch_is_rejected(pool: PgPool) {
    let item = product(&pool, FARE).await;
    let order = checkout(&pool, item.id, None).await;

    let response = confirm(&pool, &payment_body(order["id"].as_i64().unwrap(), "tx-4004", FARE)).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_cancels_paid_order(pool: PgPool) {
    let (_, admin_token) = admin(&pool).await;
    let item = product(&pool, FARE).await;
    let order = checkout(&pool, item.id, None).await;
    let order_id = order["id"].as_i64().unwrap();
    confirm(&pool, &payment_body(order_id, "tx-5005", 2 * FARE)).await;

    let uri = format!("/api/v1/orders/{order_id}/cancel");
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, &uri, json!({}), &admin_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["status"], "CANCELLED");

    let app = common::build_test_app(pool);
    let response = post_json_auth(app, &uri, json!({}), &admin_token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn orders_outside_scope_are_forbidden(pool: PgPool) {
    let (_, token_a) = affiliate(&pool, "mgr_a", "BRANCH_MANAGER", None, 500, 100).await;
    let (_, token_b) = affiliate(&pool, "mgr_b", "BRANCH_MANAGER", None, 500, 100).await;
    let item = product(&pool, FARE).await;
    let order = checkout(&pool, item.id, Some("MGR_A")).await;
    let uri = format!("/api/v1/orders/{}", order["id"]);

    let app = common::build_test_app(pool.clone());
    assert_eq!(get_auth(app, &uri, &token_a).await.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    assert_eq!(get_auth(app, &uri, &token_b).await.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn sales_summary_totals_own_commission(pool: PgPool) {
    let (manager, manager_token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let item = product(&pool, FARE).await;
    let order = checkout(&pool, item.id, Some("MGR")).await;
    confirm(&pool, &payment_body(order["id"].as_i64().unwrap(), "tx-6006", 2 * FARE)).await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/affiliate/sales/summary", &manager_token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    let profiles = json["data"]["profiles"].as_array().unwrap();
    assert_eq!(profiles.len(), 1);
    assert_eq!(profiles[0]["profile_id"], manager.id);
    assert_eq!(profiles[0]["sale_count"], 1);
    // Manager-owned lead: the manager's own 5% rate applies.
    assert_eq!(profiles[0]["gross"], 100_000);
}

// ---------------------------------------------------------------------------
// Catalog administration
// ---------------------------------------------------------------------------

fn new_product_body(code: &str) -> serde_json::Value {
    json!({
        "code": code,
        "title": "Mediterranean Highlights 10 Nights",
        "cruise_line": "MSC",
        "ship_name": "MSC World Europa",
        "departure_port": "Barcelona",
        "departure_date": "2030-09-12",
        "nights": 10,
        "price": 3_900_000,
        "cost_price": 3_100_000,
        "single_supplement_bps": 6_000,
    })
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_manages_product_lifecycle(pool: PgPool) {
    let (_, token) = admin(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/admin/products", new_product_body("MED-10"), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = body_json(response).await["data"].clone();
    let id = created["id"].as_i64().unwrap();
    assert_eq!(created["is_active"], true);
    assert_eq!(created["price"], 3_900_000);

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/admin/products/{id}"),
        json!({ "price": 3_600_000, "nights": 11 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await["data"].clone();
    assert_eq!(updated["price"], 3_600_000);
    assert_eq!(updated["nights"], 11);
    assert_eq!(updated["title"], "Mediterranean Highlights 10 Nights");

    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/products/{id}")).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/admin/products/{id}"), &token).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    // Hidden from the public catalog, still visible to admins on request.
    let app = common::build_test_app(pool.clone());
    let response = get(app, &format!("/api/v1/products/{id}")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = common::build_test_app(pool.clone());
    let listed = body_json(get(app, "/api/v1/products").await).await;
    assert!(listed["data"].as_array().unwrap().iter().all(|p| p["id"] != id));

    let app = common::build_test_app(pool);
    let listed = body_json(get_auth(app, "/api/v1/admin/products?include_inactive=true", &token).await).await;
    let stored = listed["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|p| p["id"] == id)
        .expect("deactivated product listed for admins")
        .clone();
    assert_eq!(stored["is_active"], false);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn product_admin_validates_input(pool: PgPool) {
    let (_, token) = admin(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/admin/products", new_product_body("MED-10"), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/admin/products", new_product_body("MED-10"), &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let mut negative = new_product_body("MED-11");
    negative["price"] = json!(-1);
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/admin/products", negative, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let mut supplement = new_product_body("MED-12");
    supplement["single_supplement_bps"] = json!(20_000);
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/admin/products", supplement, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, "/api/v1/admin/products/999999", json!({ "price": 1 }), &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let app = common::build_test_app(pool);
    let response = delete_auth(app, "/api/v1/admin/products/999999", &token).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn product_admin_requires_admin(pool: PgPool) {
    let item = product(&pool, FARE).await;
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/admin/products", new_product_body("MED-10"), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/admin/products/{}", item.id),
        json!({ "price": 1 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = delete_auth(app, &format!("/api/v1/admin/products/{}", item.id), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
