//! HTTP-level tests for the affiliate hierarchy: profiles, lead ownership
//! and customer groups.

mod common;

use axum::http::StatusCode;
use common::{
    admin, affiliate, body_json, create_user, delete_auth, get_auth, post_json_auth,
    put_json_auth,
};
use cruisemall_db::repositories::AffiliateLeadRepo;
use serde_json::json;
use sqlx::PgPool;

fn lead_body(name: &str, phone: &str) -> serde_json::Value {
    json!({ "customer_name": name, "phone": phone })
}

// ---------------------------------------------------------------------------
// Profiles
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn manager_creates_agents_in_own_team(pool: PgPool) {
    let (manager, manager_token) = affiliate(&pool, "busan_mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let agent_user = create_user(&pool, "busan_agent", "sales_agent").await;

    let app = common::build_test_app(pool.clone());
    let body = json!({
        "user_id": agent_user.id,
        "profile_type": "SALES_AGENT",
        "display_name": "Busan Agent",
        "commission_rate_bps": 300,
    });
    let response = post_json_auth(app, "/api/v1/affiliate/profiles", body, &manager_token).await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["manager_profile_id"], manager.id);
    assert_eq!(json["data"]["profile_type"], "SALES_AGENT");
    assert!(json["data"]["code"].as_str().is_some_and(|c| !c.is_empty()));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn agents_cannot_create_profiles(pool: PgPool) {
    let (manager, _) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (_, agent_token) = affiliate(&pool, "agent", "SALES_AGENT", Some(manager.id), 300, 0).await;
    let other = create_user(&pool, "newbie", "sales_agent").await;

    let app = common::build_test_app(pool);
    let body = json!({ "user_id": other.id, "profile_type": "SALES_AGENT", "display_name": "New" });
    let response = post_json_auth(app, "/api/v1/affiliate/profiles", body, &agent_token).await;

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn profile_role_must_match_user_role(pool: PgPool) {
    let (_, admin_token) = admin(&pool).await;
    let customer = create_user(&pool, "shopper", "customer").await;

    let app = common::build_test_app(pool);
    let body = json!({ "user_id": customer.id, "profile_type": "BRANCH_MANAGER", "display_name": "X" });
    let response = post_json_auth(app, "/api/v1/affiliate/profiles", body, &admin_token).await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn me_returns_callers_profile(pool: PgPool) {
    let (manager, token) = affiliate(&pool, "seoul_mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/affiliate/me", &token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["id"], manager.id);
    assert_eq!(json["data"]["code"], "SEOUL_MGR");
}

// ---------------------------------------------------------------------------
// Leads
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn agent_lead_is_owned_by_agent_and_manager(pool: PgPool) {
    let (manager, _) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (agent, agent_token) = affiliate(&pool, "agent", "SALES_AGENT", Some(manager.id), 300, 0).await;

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/affiliate/leads",
        lead_body("Kim Minji", "010-2222-3333"),
        &agent_token,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CREATED);
    let json = body_json(response).await;
    assert_eq!(json["data"]["agent_id"], agent.id);
    assert_eq!(json["data"]["manager_id"], manager.id);
    assert_eq!(json["data"]["normalized_phone"], "01022223333");
    assert_eq!(json["data"]["status"], "NEW");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn duplicate_phone_is_rejected_with_masked_number(pool: PgPool) {
    let (_, token_a) = affiliate(&pool, "mgr_a", "BRANCH_MANAGER", None, 500, 100).await;
    let (_, token_b) = affiliate(&pool, "mgr_b", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        "/api/v1/affiliate/leads",
        lead_body("Park", "010-4444-5555"),
        &token_a,
    )
    .await;
    assert_eq!(response.status(), StatusCode::CREATED);

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        "/api/v1/affiliate/leads",
        lead_body("Park Again", "+82 10 4444 5555"),
        &token_b,
    )
    .await;

    assert_eq!(response.status(), StatusCode::CONFLICT);
    let json = body_json(response).await;
    let message = json["error"].as_str().unwrap();
    assert!(message.contains("010-****-5555"), "got {message}");
    assert!(message.contains("already owned"));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn other_teams_leads_are_forbidden(pool: PgPool) {
    let (_, token_a) = affiliate(&pool, "mgr_a", "BRANCH_MANAGER", None, 500, 100).await;
    let (_, token_b) = affiliate(&pool, "mgr_b", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool.clone());
    let created = body_json(
        post_json_auth(app, "/api/v1/affiliate/leads", lead_body("Lee", "01077778888"), &token_a)
            .await,
    )
    .await;
    let lead_id = created["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool.clone());
    let response = get_auth(app, &format!("/api/v1/affiliate/leads/{lead_id}"), &token_b).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool.clone());
    let listed = body_json(get_auth(app, "/api/v1/affiliate/leads", &token_b).await).await;
    assert_eq!(listed["data"].as_array().unwrap().len(), 0);

    // Lookup stays inside the caller's scope.
    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/affiliate/leads/lookup?phone=010-7777-8888", &token_b).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn lookup_resolves_owner(pool: PgPool) {
    let (manager, manager_token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (agent, agent_token) = affiliate(&pool, "agent", "SALES_AGENT", Some(manager.id), 300, 0).await;

    let app = common::build_test_app(pool.clone());
    post_json_auth(app, "/api/v1/affiliate/leads", lead_body("Choi", "01012121212"), &agent_token).await;

    let app = common::build_test_app(pool);
    let response = get_auth(app, "/api/v1/affiliate/leads/lookup?phone=010-1212-1212", &manager_token).await;

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["owner"]["type"], "AGENT");
    assert_eq!(json["data"]["owner"]["agent_id"], agent.id);
    assert_eq!(json["data"]["owner"]["manager_id"], manager.id);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn manager_assigns_lead_only_within_team(pool: PgPool) {
    let (manager, manager_token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (own_agent, _) = affiliate(&pool, "own_agent", "SALES_AGENT", Some(manager.id), 300, 0).await;
    let (other_mgr, _) = affiliate(&pool, "other_mgr", "BRANCH_MANAGER", None, 500, 100).await;
    let (foreign_agent, _) =
        affiliate(&pool, "foreign_agent", "SALES_AGENT", Some(other_mgr.id), 300, 0).await;

    let app = common::build_test_app(pool.clone());
    let created = body_json(
        post_json_auth(app, "/api/v1/affiliate/leads", lead_body("Jung", "01034343434"), &manager_token)
            .await,
    )
    .await;
    let lead_id = created["data"]["id"].as_i64().unwrap();
    let uri = format!("/api/v1/affiliate/leads/{lead_id}/assign");

    let app = common::build_test_app(pool.clone());
    let response = put_json_auth(app, &uri, json!({ "agent_id": foreign_agent.id }), &manager_token).await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let app = common::build_test_app(pool);
    let response = put_json_auth(app, &uri, json!({ "agent_id": own_agent.id }), &manager_token).await;
    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["data"]["agent_id"], own_agent.id);
    assert_eq!(json["data"]["manager_id"], manager.id);
}

// ---------------------------------------------------------------------------
// Customer groups
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn deleting_group_releases_members(pool: PgPool) {
    let (_, token) = affiliate(&pool, "mgr", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool.clone());
    let group = body_json(
        post_json_auth(app, "/api/v1/customer-groups", json!({ "name": "Alaska 2026" }), &token).await,
    )
    .await;
    let group_id = group["data"]["id"].as_i64().unwrap();

    let mut lead_ids = Vec::new();
    for (name, phone) in [("Han", "01050505050"), ("Yoon", "01060606060")] {
        let app = common::build_test_app(pool.clone());
        let lead = body_json(
            post_json_auth(app, "/api/v1/affiliate/leads", lead_body(name, phone), &token).await,
        )
        .await;
        lead_ids.push(lead["data"]["id"].as_i64().unwrap());
    }

    let app = common::build_test_app(pool.clone());
    let response = post_json_auth(
        app,
        &format!("/api/v1/customer-groups/{group_id}/members"),
        json!({ "lead_ids": lead_ids }),
        &token,
    )
    .await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["added"], 2);

    let app = common::build_test_app(pool.clone());
    let response = delete_auth(app, &format!("/api/v1/customer-groups/{group_id}"), &token).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["data"]["released_members"], 2);

    for id in lead_ids {
        let lead = AffiliateLeadRepo::find_by_id(&pool, id).await.unwrap().unwrap();
        assert_eq!(lead.group_id, None);
        assert_eq!(lead.group_assigned_at, None);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn groups_reject_inaccessible_leads(pool: PgPool) {
    let (_, token_a) = affiliate(&pool, "mgr_a", "BRANCH_MANAGER", None, 500, 100).await;
    let (_, token_b) = affiliate(&pool, "mgr_b", "BRANCH_MANAGER", None, 500, 100).await;

    let app = common::build_test_app(pool.clone());
    let foreign = body_json(
        post_json_auth(app, "/api/v1/affiliate/leads", lead_body("Seo", "01090909090"), &token_a)
            .await,
    )
    .await;

    let app = common::build_test_app(pool.clone());
    let group = body_json(
        post_json_auth(app, "/api/v1/customer-groups", json!({ "name": "Mine" }), &token_b).await,
    )
    .await;
    let group_id = group["data"]["id"].as_i64().unwrap();

    let app = common::build_test_app(pool);
    let response = post_json_auth(
        app,
        &format!("/api/v1/customer-groups/{group_id}/members"),
        json!({ "lead_ids": [foreign["data"]["id"]] }),
        &token_b,
    )
    .await;
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
