//! Dispatch tick tests: timing, failure logging, and the
//! once-per-(stage, lead) guarantee, plus message stage management.

mod common;

use axum::http::StatusCode;
use chrono::{Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use common::{admin, body_json, get_auth, post_json_auth, put_json_auth};
use cruisemall_api::background::message_dispatch::{tick, DispatchStats};
use cruisemall_core::schedule::scheduled_at;
use cruisemall_events::{GatewayConfig, OutboundDispatcher};
use httpmock::prelude::*;
use serde_json::json;
use sqlx::PgPool;

const BASE_URL: &str = "https://mall.test";

/// One dispatch interval.
fn interval() -> Duration {
    Duration::seconds(300)
}

async fn create(pool: &PgPool, token: &str, uri: &str, body: serde_json::Value) -> i64 {
    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(app, uri, body, token).await;
    assert_eq!(response.status(), StatusCode::CREATED, "POST {uri}");
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// A group holding two leads that have phones but no email.
async fn group_with_leads(pool: &PgPool, token: &str) -> (i64, i64, i64) {
    let group_id = create(pool, token, "/api/v1/customer-groups", json!({ "name": "June sailing" })).await;
    let reachable = create(
        pool,
        token,
        "/api/v1/affiliate/leads",
        json!({ "customer_name": "Yoon Ara", "phone": "010-1234-5678" }),
    )
    .await;
    let other = create(
        pool,
        token,
        "/api/v1/affiliate/leads",
        json!({ "customer_name": "Jang Hoon", "phone": "01087654321" }),
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/customer-groups/{group_id}/members"),
        json!({ "lead_ids": [reachable, other] }),
        token,
    )
    .await;
    assert!(response.status().is_success());
    (group_id, reachable, other)
}

/// A scheduled SMS message for `group_id` with one stage on day `day_offset`.
async fn scheduled_sms(
    pool: &PgPool,
    token: &str,
    group_id: i64,
    start: NaiveDate,
    day_offset: i32,
    send_time: &str,
) -> i64 {
    create(
        pool,
        token,
        "/api/v1/scheduled-messages",
        json!({
            "target_group_id": group_id,
            "title": "Departure reminder",
            "channel": "SMS",
            "start_date": start,
            "stages": [
                { "stage_number": 1, "day_offset": day_offset, "send_time": send_time,
                  "body": "{{name}}, check {{landing_url}} before you sail" }
            ],
        }),
    )
    .await
}

fn start_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn scheduled_stage_is_sent_once(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let (group_id, reachable, _) = group_with_leads(&pool, &token).await;
    let message_id = scheduled_sms(&pool, &token, group_id, start_date(), 1, "09:30").await;

    let due = scheduled_at(start_date(), 1, NaiveTime::from_hms_opt(9, 30, 0).unwrap());
    let dispatcher = OutboundDispatcher::log_only();

    let early_tick = due - Duration::seconds(60);
    let early = tick(&pool, &dispatcher, early_tick - interval(), early_tick, BASE_URL)
        .await
        .unwrap();
    assert_eq!(early, DispatchStats::default());

    let next_tick = early_tick + interval();
    let stats = tick(&pool, &dispatcher, early_tick, next_tick, BASE_URL).await.unwrap();
    assert_eq!(stats.sent, 2);
    assert_eq!(stats.failed, 0);

    // Overlapping spans never resend a logged pair.
    let again = tick(&pool, &dispatcher, early_tick, next_tick + interval(), BASE_URL)
        .await
        .unwrap();
    assert_eq!(again, DispatchStats::default());

    let app = common::build_test_app(pool.clone());
    let logs = body_json(
        get_auth(app, &format!("/api/v1/scheduled-messages/{message_id}/logs"), &token).await,
    )
    .await;
    let logs = logs["data"].as_array().unwrap();
    assert_eq!(logs.len(), 2);
    let first = logs
        .iter()
        .find(|log| log["lead_id"] == reachable)
        .expect("log for reachable lead");
    assert_eq!(first["status"], "SENT");
    assert_eq!(first["recipient"], "01012345678");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn late_tick_sends_stage_from_the_gap(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let (group_id, _, _) = group_with_leads(&pool, &token).await;
    scheduled_sms(&pool, &token, group_id, start_date(), 0, "10:00").await;

    let due = scheduled_at(start_date(), 0, NaiveTime::from_hms_opt(10, 0, 0).unwrap());
    let dispatcher = OutboundDispatcher::log_only();

    // The first tick fires just before the stage, the next one more than an
    // interval later.
    let first_tick = due - Duration::seconds(1);
    let first = tick(&pool, &dispatcher, first_tick - interval(), first_tick, BASE_URL)
        .await
        .unwrap();
    assert_eq!(first.sent, 0);

    let late_tick = first_tick + interval() + Duration::seconds(2);
    let late = tick(&pool, &dispatcher, first_tick, late_tick, BASE_URL).await.unwrap();
    assert_eq!(late.sent, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn stage_before_the_span_is_not_sent(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let (group_id, _, _) = group_with_leads(&pool, &token).await;
    scheduled_sms(&pool, &token, group_id, start_date(), 0, "08:00").await;

    let due = scheduled_at(start_date(), 0, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    let now = due + Duration::hours(3);
    let stats = tick(&pool, &OutboundDispatcher::log_only(), now - interval(), now, BASE_URL)
        .await
        .unwrap();

    assert_eq!(stats.sent, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn funnel_stage_counts_from_group_join(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let (group_id, _, _) = group_with_leads(&pool, &token).await;

    // Joined at 15:00 KST on 2026-04-10.
    let joined = Utc.with_ymd_and_hms(2026, 4, 10, 6, 0, 0).unwrap();
    sqlx::query("UPDATE affiliate_leads SET group_assigned_at = $1 WHERE group_id = $2")
        .bind(joined)
        .bind(group_id)
        .execute(&pool)
        .await
        .unwrap();

    create(
        &pool,
        &token,
        "/api/v1/funnel-messages",
        json!({
            "group_id": group_id,
            "title": "Welcome series",
            "channel": "EMAIL",
            "stages": [{ "stage_number": 1, "day_offset": 2, "send_time": "10:00",
                         "subject": "Hello {{name}}", "body": "Welcome aboard" }],
        }),
    )
    .await;

    let due = scheduled_at(
        NaiveDate::from_ymd_opt(2026, 4, 10).unwrap(),
        2,
        NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
    );
    let stats = tick(&pool, &OutboundDispatcher::log_only(), due - interval(), due, BASE_URL)
        .await
        .unwrap();

    // Neither lead has an email address.
    assert_eq!(stats.sent, 0);
    assert_eq!(stats.unreachable, 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn failed_delivery_is_logged_and_not_retried(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let (group_id, _, other) = group_with_leads(&pool, &token).await;
    let message_id = scheduled_sms(&pool, &token, group_id, start_date(), 0, "11:00").await;

    let server = MockServer::start_async().await;
    let rejected = server
        .mock_async(|when, then| {
            when.method(POST).path("/sms").json_body_partial(r#"{ "to": "01087654321" }"#);
            then.status(500);
        })
        .await;
    let accepted = server
        .mock_async(|when, then| {
            when.method(POST).path("/sms").json_body_partial(r#"{ "to": "01012345678" }"#);
            then.status(200);
        })
        .await;
    let dispatcher = OutboundDispatcher::new(
        None,
        Some(GatewayConfig {
            sms_url: Some(server.url("/sms")),
            kakao_url: None,
            api_key: None,
        }),
    );

    let due = scheduled_at(start_date(), 0, NaiveTime::from_hms_opt(11, 0, 0).unwrap());
    let stats = tick(&pool, &dispatcher, due - interval(), due, BASE_URL).await.unwrap();
    assert_eq!(stats.sent, 1, "a failing lead does not stop the tick");
    assert_eq!(stats.failed, 1);
    accepted.assert_hits_async(1).await;

    let hits_before = rejected.hits_async().await;
    let again = tick(&pool, &dispatcher, due - interval(), due + interval(), BASE_URL)
        .await
        .unwrap();
    assert_eq!(again, DispatchStats::default());
    assert_eq!(rejected.hits_async().await, hits_before, "failed pair is not retried");

    let app = common::build_test_app(pool);
    let logs = body_json(
        get_auth(app, &format!("/api/v1/scheduled-messages/{message_id}/logs"), &token).await,
    )
    .await;
    let failed = logs["data"]
        .as_array()
        .unwrap()
        .iter()
        .find(|log| log["lead_id"] == other)
        .expect("log for the rejected lead")
        .clone();
    assert_eq!(failed["status"], "FAILED");
    assert!(failed["error"].as_str().unwrap().contains("500"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn update_replaces_stages(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let (group_id, _, _) = group_with_leads(&pool, &token).await;
    let funnel_id = create(
        &pool,
        &token,
        "/api/v1/funnel-messages",
        json!({
            "group_id": group_id,
            "title": "Welcome series",
            "channel": "SMS",
            "stages": [
                { "stage_number": 1, "day_offset": 0, "send_time": "10:00", "body": "Hi {{name}}" },
                { "stage_number": 2, "day_offset": 3, "send_time": "10:00", "body": "Still there?" },
            ],
        }),
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/funnel-messages/{funnel_id}"),
        json!({
            "title": "Welcome series v2",
            "stages": [{ "stage_number": 1, "day_offset": 1, "send_time": "09:15",
                         "body": "Good morning {{name}}" }],
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["data"]["title"], "Welcome series v2");
    let stages = updated["data"]["stages"].as_array().unwrap();
    assert_eq!(stages.len(), 1);
    assert_eq!(stages[0]["day_offset"], 1);
    assert_eq!(stages[0]["body"], "Good morning {{name}}");

    let scheduled_id = scheduled_sms(&pool, &token, group_id, start_date(), 0, "10:00").await;
    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/scheduled-messages/{scheduled_id}"),
        json!({
            "start_date": "2026-03-09",
            "stages": [
                { "stage_number": 1, "day_offset": 0, "send_time": "08:00", "body": "Packing list" },
                { "stage_number": 2, "day_offset": 2, "send_time": "08:00", "body": "Boarding today" },
            ],
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    let updated = body_json(response).await;
    assert_eq!(updated["data"]["start_date"], "2026-03-09");
    assert_eq!(updated["data"]["stages"].as_array().unwrap().len(), 2);

    // A rejected update leaves the stored stages alone.
    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(
        app,
        &format!("/api/v1/scheduled-messages/{scheduled_id}"),
        json!({ "stages": [{ "stage_number": 1, "day_offset": 0, "send_time": "08:00",
                             "body": "Use code {{coupon}}" }] }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let app = common::build_test_app(pool);
    let stored = body_json(
        get_auth(app, &format!("/api/v1/scheduled-messages/{scheduled_id}"), &token).await,
    )
    .await;
    assert_eq!(stored["data"]["stages"].as_array().unwrap().len(), 2);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn unsupported_placeholders_are_rejected(pool: PgPool) {
    let (_, token) = admin(&pool).await;
    let (group_id, _, _) = group_with_leads(&pool, &token).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/funnel-messages",
        json!({
            "group_id": group_id,
            "title": "Promo",
            "channel": "SMS",
            "stages": [{ "stage_number": 1, "day_offset": 0, "send_time": "10:00",
                         "body": "Hi {{name}}, your code is {{coupon}}" }],
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let error = body_json(response).await;
    assert_eq!(error["code"], "VALIDATION_ERROR");
    assert!(error["error"].as_str().unwrap().contains("coupon"));

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/scheduled-messages",
        json!({
            "target_group_id": group_id,
            "title": "Promo",
            "channel": "EMAIL",
            "start_date": "2026-03-02",
            "stages": [{ "stage_number": 1, "day_offset": 0, "send_time": "10:00",
                         "subject": "{{discount}} off", "body": "Hello {{name}}" }],
        }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}
