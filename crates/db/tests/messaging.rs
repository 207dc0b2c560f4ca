//! Integration tests for funnel messages, dispatch candidates, and the
//! delivery log.

use chrono::{NaiveTime, Utc};
use cruisemall_core::ownership::LeadOwnership;
use cruisemall_core::schedule::kst_date;
use cruisemall_db::models::affiliate_lead::CreateAffiliateLead;
use cruisemall_db::models::customer_group::CreateCustomerGroup;
use cruisemall_db::models::message::{CreateMessageLog, NewStage, SOURCE_FUNNEL};
use cruisemall_db::repositories::funnel_message_repo::FunnelMessageFields;
use cruisemall_db::repositories::{
    AffiliateLeadRepo, CustomerGroupRepo, FunnelMessageRepo, MessageLogRepo,
};
use sqlx::PgPool;

fn stage(number: i32, day_offset: i32, body: &str) -> NewStage {
    NewStage {
        stage_number: number,
        day_offset,
        send_time: NaiveTime::from_hms_opt(10, 0, 0).unwrap(),
        subject: None,
        body: body.to_string(),
    }
}

fn fields(group_id: i64) -> FunnelMessageFields {
    FunnelMessageFields {
        group_id: Some(group_id),
        title: "Welcome series".to_string(),
        channel: "SMS".to_string(),
        is_active: true,
    }
}

async fn grouped_lead(pool: &PgPool, phone: &str) -> (i64, i64) {
    let group = CustomerGroupRepo::create(
        pool,
        None,
        &CreateCustomerGroup {
            name: format!("group-{phone}"),
            description: None,
            color: None,
        },
    )
    .await
    .unwrap();
    let lead = AffiliateLeadRepo::create(
        pool,
        &CreateAffiliateLead {
            customer_name: "Lee".to_string(),
            phone: phone.to_string(),
            normalized_phone: phone.to_string(),
            email: None,
            ownership: LeadOwnership::default(),
            group_id: Some(group.id),
            status: None,
            source: "MANUAL".to_string(),
            landing_page_id: None,
            notes: None,
            metadata: None,
        },
    )
    .await
    .unwrap();
    (group.id, lead.id)
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn create_and_replace_stages(pool: PgPool) {
    let (group_id, _) = grouped_lead(&pool, "01011112222").await;
    let created = FunnelMessageRepo::create(
        &pool,
        None,
        &fields(group_id),
        &[stage(2, 3, "second"), stage(1, 0, "first")],
    )
    .await
    .unwrap();
    let numbers: Vec<i32> = created.stages.iter().map(|s| s.stage_number).collect();
    assert_eq!(numbers, vec![1, 2]);

    let updated = FunnelMessageRepo::update(
        &pool,
        created.message.id,
        &fields(group_id),
        Some(&[stage(1, 1, "only")]),
    )
    .await
    .unwrap()
    .unwrap();
    assert_eq!(updated.stages.len(), 1);
    assert_eq!(updated.stages[0].body, "only");

    let untouched = FunnelMessageRepo::update(&pool, created.message.id, &fields(group_id), None)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(untouched.stages.len(), 1);

    assert!(FunnelMessageRepo::delete(&pool, created.message.id).await.unwrap());
    assert!(FunnelMessageRepo::find_with_stages(&pool, created.message.id)
        .await
        .unwrap()
        .is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn candidates_exclude_logged_pairs(pool: PgPool) {
    let (group_id, lead_id) = grouped_lead(&pool, "01033334444").await;
    let message = FunnelMessageRepo::create(&pool, None, &fields(group_id), &[stage(1, 0, "hi")])
        .await
        .unwrap();

    let today = kst_date(Utc::now());
    let candidates = FunnelMessageRepo::dispatch_candidates(&pool, today, today).await.unwrap();
    assert_eq!(candidates.len(), 1);
    let candidate = &candidates[0];
    assert_eq!(candidate.lead_id, lead_id);
    assert!(candidate.group_assigned_at.is_some());
    assert!(candidate.start_date.is_none());

    let log = CreateMessageLog {
        source: SOURCE_FUNNEL,
        message_id: message.message.id,
        stage_id: candidate.stage_id,
        lead_id,
        channel: "SMS".to_string(),
        recipient: "01033334444".to_string(),
        status: "SENT",
        error: None,
    };
    assert!(MessageLogRepo::record(&pool, &log).await.unwrap().is_some());
    assert!(MessageLogRepo::record(&pool, &log).await.unwrap().is_none());
    assert!(MessageLogRepo::exists(&pool, SOURCE_FUNNEL, candidate.stage_id, lead_id)
        .await
        .unwrap());

    let after = FunnelMessageRepo::dispatch_candidates(&pool, today, today).await.unwrap();
    assert!(after.is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn inactive_messages_have_no_candidates(pool: PgPool) {
    let (group_id, _) = grouped_lead(&pool, "01055556666").await;
    let mut inactive = fields(group_id);
    inactive.is_active = false;
    FunnelMessageRepo::create(&pool, None, &inactive, &[stage(1, 0, "hi")])
        .await
        .unwrap();

    let today = kst_date(Utc::now());
    let candidates = FunnelMessageRepo::dispatch_candidates(&pool, today, today)
        .await
        .unwrap();
    assert!(candidates.is_empty());
}
