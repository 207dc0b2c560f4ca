#![allow(dead_code)]

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE, USER_AGENT};
use axum::http::{Method, Request, Response};
use axum::Router;
use chrono::NaiveDate;
use cruisemall_api::auth::jwt::{generate_access_token, JwtConfig};
use cruisemall_api::auth::password::hash_password;
use cruisemall_api::config::ServerConfig;
use cruisemall_api::router::build_app_router;
use cruisemall_api::state::AppState;
use cruisemall_backup::LocalDirSink;
use cruisemall_db::models::affiliate_profile::{AffiliateProfile, CreateAffiliateProfile};
use cruisemall_db::models::cruise_product::{CreateCruiseProduct, CruiseProduct};
use cruisemall_db::models::user::{CreateUser, User};
use cruisemall_db::repositories::{AffiliateProfileRepo, CruiseProductRepo, RoleRepo, UserRepo};
use cruisemall_events::{EventBus, OutboundDispatcher};
use http_body_util::BodyExt;
use sqlx::PgPool;
use tower::ServiceExt;

pub const TEST_PASSWORD: &str = "test_password_123!";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const BROWSER_UA: &str =
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_4) AppleWebKit/605.1.15 Safari/605.1.15";

/// A `ServerConfig` with safe test defaults.
pub fn test_config() -> ServerConfig {
    ServerConfig {
        host: "127.0.0.1".to_string(),
        port: 0,
        cors_origins: vec!["http://localhost:5173".to_string()],
        request_timeout_secs: 30,
        shutdown_timeout_secs: 5,
        public_base_url: "https://mall.test".to_string(),
        payment_webhook_secret: Some(WEBHOOK_SECRET.to_string()),
        passport_link_ttl_days: 14,
        card_fee_bps: 250,
        jwt: JwtConfig {
            secret: "test-jwt-secret".to_string(),
            access_token_expiry_mins: 60,
            refresh_token_expiry_days: 14,
        },
    }
}

/// The production router over `pool`, with outbound messages logged only
/// and backups written under the system temp directory.
pub fn build_test_app(pool: PgPool) -> Router {
    let config = test_config();
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        event_bus: Arc::new(EventBus::default()),
        dispatcher: Arc::new(OutboundDispatcher::log_only()),
        backup_sink: Arc::new(LocalDirSink::new(
            std::env::temp_dir().join("cruisemall-test-backups"),
        )),
    };
    build_app_router(state, &config)
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    serde_json::from_slice(&bytes).expect("body should be JSON")
}

pub async fn body_text(response: Response<Body>) -> String {
    let bytes = response
        .into_body()
        .collect()
        .await
        .expect("body should be readable")
        .to_bytes();
    String::from_utf8(bytes.to_vec()).expect("body should be UTF-8")
}

async fn send(
    app: Router,
    method: Method,
    uri: &str,
    token: Option<&str>,
    body: Option<serde_json::Value>,
) -> Response<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(USER_AGENT, BROWSER_UA);
    if let Some(token) = token {
        builder = builder.header(AUTHORIZATION, format!("Bearer {token}"));
    }
    let request = match body {
        Some(json) => builder
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(json.to_string())),
        None => builder.body(Body::empty()),
    }
    .expect("request should build");
    app.oneshot(request).await.expect("request should complete")
}

pub async fn get(app: Router, uri: &str) -> Response<Body> {
    send(app, Method::GET, uri, None, None).await
}

pub async fn get_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::GET, uri, Some(token), None).await
}

pub async fn post_json(app: Router, uri: &str, body: serde_json::Value) -> Response<Body> {
    send(app, Method::POST, uri, None, Some(body)).await
}

pub async fn post_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::POST, uri, Some(token), Some(body)).await
}

pub async fn put_json_auth(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    token: &str,
) -> Response<Body> {
    send(app, Method::PUT, uri, Some(token), Some(body)).await
}

/// POST JSON as a specific client, for crawler detection.
pub async fn post_json_as(
    app: Router,
    uri: &str,
    body: serde_json::Value,
    user_agent: &str,
) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(USER_AGENT, user_agent)
        .header(CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .expect("request should build");
    app.oneshot(request).await.expect("request should complete")
}

/// POST a raw body signed the way the payment gateway signs webhooks.
pub async fn post_signed(app: Router, uri: &str, body: &str, signature: &str) -> Response<Body> {
    let request = Request::builder()
        .method(Method::POST)
        .uri(uri)
        .header(CONTENT_TYPE, "application/json")
        .header("x-payment-signature", signature)
        .body(Body::from(body.to_string()))
        .expect("request should build");
    app.oneshot(request).await.expect("request should complete")
}

pub async fn delete_auth(app: Router, uri: &str, token: &str) -> Response<Body> {
    send(app, Method::DELETE, uri, Some(token), None).await
}

// ---------------------------------------------------------------------------
// Fixtures
// ---------------------------------------------------------------------------

/// Insert a user with `role` and the shared test password.
pub async fn create_user(pool: &PgPool, username: &str, role: &str) -> User {
    let role = RoleRepo::find_by_name(pool, role)
        .await
        .expect("role lookup should succeed")
        .expect("role should be seeded");
    UserRepo::create(
        pool,
        &CreateUser {
            username: username.to_string(),
            email: format!("{username}@test.com"),
            password_hash: hash_password(TEST_PASSWORD).expect("hashing should succeed"),
            role_id: role.id,
            display_name: None,
            phone: None,
        },
    )
    .await
    .expect("user creation should succeed")
}

/// Access token for `user` signed with the test secret.
pub fn token_for(user: &User, role: &str) -> String {
    generate_access_token(user.id, role, &test_config().jwt).expect("token should sign")
}

/// An admin account and its access token.
pub async fn admin(pool: &PgPool) -> (User, String) {
    let user = create_user(pool, "hq_admin", "admin").await;
    let token = token_for(&user, "admin");
    (user, token)
}

/// A user with an affiliate profile, plus its access token.
pub async fn affiliate(
    pool: &PgPool,
    username: &str,
    profile_type: &str,
    manager_profile_id: Option<i64>,
    commission_rate_bps: i64,
    override_rate_bps: i64,
) -> (AffiliateProfile, String) {
    let role = if profile_type == "BRANCH_MANAGER" {
        "branch_manager"
    } else {
        "sales_agent"
    };
    let user = create_user(pool, username, role).await;
    let profile = AffiliateProfileRepo::create(
        pool,
        &CreateAffiliateProfile {
            user_id: user.id,
            profile_type: profile_type.to_string(),
            manager_profile_id,
            code: username.to_uppercase(),
            display_name: username.to_string(),
            phone: None,
            commission_rate_bps: Some(commission_rate_bps),
            override_rate_bps: Some(override_rate_bps),
        },
    )
    .await
    .expect("profile creation should succeed");
    (profile, token_for(&user, role))
}

/// An active product departing far enough out for passport validity rules.
pub async fn product(pool: &PgPool, price: i64) -> CruiseProduct {
    CruiseProductRepo::create(
        pool,
        &CreateCruiseProduct {
            code: format!("ALASKA-{price}"),
            title: "Alaska Inside Passage 7 Nights".to_string(),
            cruise_line: "Princess".to_string(),
            ship_name: "Discovery Princess".to_string(),
            departure_port: "Seattle".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2030, 6, 1).expect("valid date"),
            nights: 7,
            price,
            cost_price: Some(price * 8 / 10),
            port_charge: Some(0),
            single_supplement_bps: None,
            description: None,
            itinerary: None,
        },
    )
    .await
    .expect("product creation should succeed")
}
