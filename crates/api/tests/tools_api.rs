//! HTTP-level tests for calculators, documents, the assistant and admin
//! backups.

mod common;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use common::{
    admin, affiliate, body_json, body_text, get_auth, post_json, post_json_auth, post_signed,
    product, WEBHOOK_SECRET,
};
use cruisemall_core::tokens::compute_signature;
use serde_json::json;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn tax_calculator_withholding(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/calculators/tax",
        json!({ "mode": "withholding", "amount": 1_000_000 }),
        &token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["national"], 30_000);
    assert_eq!(data["local"], 3_000);
    assert_eq!(data["net"], 967_000);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn tax_calculator_requires_login(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/calculators/tax",
        json!({ "mode": "vat", "amount": 110_000 }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn margin_calculator_uses_configured_card_fee(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool);
    let body = json!({
        "sale_price": 1_100_000,
        "cost_price": 800_000,
        "commission": 50_000,
        "target_margin_bps": 1_500,
    });
    let response = post_json_auth(app, "/api/v1/calculators/margin", body, &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["supply_value"], 1_000_000);
    assert_eq!(data["vat"], 100_000);
    // 2.5% of the sale price.
    assert_eq!(data["card_fee"], 27_500);
    assert_eq!(data["margin"], 122_500);
    assert_eq!(data["margin_rate_bps"], 1_225);
    assert!(data["target_price"].as_i64().unwrap() > 1_100_000);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn calculators_reject_amounts_past_the_cap(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/calculators/tax",
        json!({ "mode": "vat", "amount": 1_000_000_000_000_000_i64 }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["code"], "VALIDATION_ERROR");

    let app = common::build_test_app(pool);
    let body = json!({
        "sale_price": 1_100_000,
        "cost_price": i64::MAX,
        "target_margin_bps": 1_500,
    });
    let response = post_json_auth(app, "/api/v1/calculators/margin", body, &token).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn quote_prices_active_product(pool: PgPool) {
    let item = product(&pool, 1_100_000).await;

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/documents/quote",
        json!({ "product_id": item.id, "guests": 2, "discount": 200_000 }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["subtotal"], 2_200_000);
    assert_eq!(data["total"], 2_000_000);
    assert_eq!(data["supply_value"], 1_818_182);
    assert_eq!(data["vat"], 181_818);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn certificate_is_issued_after_payment(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let item = product(&pool, 1_000_000).await;

    let app = common::build_test_app(pool.clone());
    let checkout = body_json(
        post_json(
            app,
            "/api/v1/checkout",
            json!({
                "product_id": item.id,
                "guests": 1,
                "buyer_name": "Seo Yuna",
                "buyer_phone": "01020203030",
            }),
        )
        .await,
    )
    .await;
    let order = &checkout["data"]["order"];
    let order_id = order["id"].as_i64().unwrap();
    let uri = format!("/api/v1/documents/orders/{order_id}/certificate");

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::CONFLICT);

    let payment = json!({
        "order_id": order_id,
        "provider": "toss",
        "provider_tx_id": "tx-cert-1",
        "method": "CARD",
        "amount": order["total_amount"],
    })
    .to_string();
    let app = common::build_test_app(pool.clone());
    let signature = compute_signature(WEBHOOK_SECRET, payment.as_bytes());
    let response = post_signed(app, "/api/v1/payments/confirm", &payment, &signature).await;
    assert_eq!(response.status(), StatusCode::OK);

    let app = common::build_test_app(pool);
    let response = get_auth(app, &uri, &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "image/svg+xml");
    let svg = body_text(response).await;
    assert!(svg.starts_with("<svg"));
    assert!(svg.contains(order["order_number"].as_str().unwrap()));
    assert!(svg.contains("Seo Yuna"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assistant_suggests_matching_products(pool: PgPool) {
    product(&pool, 2_400_000).await;

    let app = common::build_test_app(pool);
    let response = post_json(
        app,
        "/api/v1/assistant/chat",
        json!({ "message": "How much is an Alaska cruise?" }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let data = &body_json(response).await["data"];
    assert_eq!(data["intent"], "price");
    assert_eq!(data["suggestions"].as_array().unwrap().len(), 1);
    assert!(data["reply"].as_str().unwrap().contains("2,400,000"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn assistant_rejects_empty_message(pool: PgPool) {
    let app = common::build_test_app(pool);
    let response = post_json(app, "/api/v1/assistant/chat", json!({ "message": "   " })).await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn admin_runs_database_backup(pool: PgPool) {
    let (_, token) = admin(&pool).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, "/api/v1/admin/backups/database", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let run = &body_json(response).await["data"];
    assert_eq!(run["kind"], "DATABASE");
    assert_eq!(run["trigger_type"], "MANUAL");
    assert_eq!(run["status"], "COMPLETED");
    assert!(run["tables_ok"].as_i64().unwrap() > 0);

    let app = common::build_test_app(pool);
    let listed = body_json(get_auth(app, "/api/v1/admin/backups?kind=DATABASE", &token).await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn backups_are_admin_only(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool);
    let response = post_json_auth(app, "/api/v1/admin/backups/database", json!({}), &token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
