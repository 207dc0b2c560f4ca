//! Integration tests for orders, payment confirmation, and affiliate sales.

use chrono::{Duration, NaiveDate, Utc};
use cruisemall_core::ownership::LeadOwnership;
use cruisemall_db::models::affiliate_lead::CreateAffiliateLead;
use cruisemall_db::models::affiliate_sale::CreateAffiliateSale;
use cruisemall_db::models::cruise_product::CreateCruiseProduct;
use cruisemall_db::models::order::CreateOrder;
use cruisemall_db::models::payment::CreatePayment;
use cruisemall_db::repositories::{
    AffiliateLeadRepo, AffiliateSaleRepo, CruiseProductRepo, OrderRepo, PaymentConfirmation,
    PaymentRepo,
};
use sqlx::PgPool;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

async fn new_product(pool: &PgPool) -> i64 {
    CruiseProductRepo::create(
        pool,
        &CreateCruiseProduct {
            code: "AK-0601".to_string(),
            title: "Alaska Inside Passage".to_string(),
            cruise_line: "Holland America".to_string(),
            ship_name: "Koningsdam".to_string(),
            departure_port: "Seattle".to_string(),
            departure_date: NaiveDate::from_ymd_opt(2027, 6, 1).unwrap(),
            nights: 7,
            price: 2_200_000,
            cost_price: Some(1_800_000),
            port_charge: Some(150_000),
            single_supplement_bps: None,
            description: None,
            itinerary: None,
        },
    )
    .await
    .unwrap()
    .id
}

async fn new_order(pool: &PgPool, product_id: i64, lead_id: Option<i64>, number: &str) -> i64 {
    OrderRepo::create(
        pool,
        &CreateOrder {
            order_number: number.to_string(),
            product_id,
            lead_id,
            user_id: None,
            buyer_name: "Hong Gildong".to_string(),
            buyer_phone: "01012345678".to_string(),
            buyer_email: None,
            guests: 2,
            subtotal: 4_400_000,
            discount: 0,
            total_amount: 4_400_000,
            vat: 400_000,
        },
    )
    .await
    .unwrap()
    .id
}

fn payment(order_id: i64, tx_id: &str) -> CreatePayment {
    CreatePayment {
        order_id,
        provider: "testpg".to_string(),
        provider_tx_id: tx_id.to_string(),
        method: Some("CARD".to_string()),
        amount: 4_400_000,
        raw_payload: serde_json::json!({ "tx": tx_id }),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../db/migrations")]
async fn confirm_is_idempotent_per_provider_tx(pool: PgPool) {
    let product = new_product(&pool).await;
    let order_id = new_order(&pool, product, None, "CM-1").await;

    let first = PaymentRepo::confirm(&pool, &payment(order_id, "tx-1"), None, None)
        .await
        .unwrap();
    let PaymentConfirmation::Recorded(recorded) = first else {
        panic!("expected Recorded, got {first:?}");
    };

    let second = PaymentRepo::confirm(&pool, &payment(order_id, "tx-1"), None, None)
        .await
        .unwrap();
    match second {
        PaymentConfirmation::Duplicate(existing) => assert_eq!(existing.id, recorded.id),
        other => panic!("expected Duplicate, got {other:?}"),
    }

    let order = OrderRepo::find_by_id(&pool, order_id).await.unwrap().unwrap();
    assert_eq!(order.status, "PAID");
    assert!(order.paid_at.is_some());
    assert_eq!(PaymentRepo::list_for_order(&pool, order_id).await.unwrap().len(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn confirm_on_cancelled_order_changes_nothing(pool: PgPool) {
    let product = new_product(&pool).await;
    let order_id = new_order(&pool, product, None, "CM-2").await;
    OrderRepo::cancel(&pool, order_id).await.unwrap().unwrap();

    let outcome = PaymentRepo::confirm(&pool, &payment(order_id, "tx-2"), None, None)
        .await
        .unwrap();
    assert!(matches!(outcome, PaymentConfirmation::OrderNotPending));
    assert!(PaymentRepo::find_by_provider_tx_id(&pool, "tx-2").await.unwrap().is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn confirm_records_sale_and_marks_lead(pool: PgPool) {
    let product = new_product(&pool).await;
    let lead = AffiliateLeadRepo::create(
        &pool,
        &CreateAffiliateLead {
            customer_name: "Kim".to_string(),
            phone: "010-9999-8888".to_string(),
            normalized_phone: "01099998888".to_string(),
            email: None,
            ownership: LeadOwnership::default(),
            group_id: None,
            status: None,
            source: "CHECKOUT".to_string(),
            landing_page_id: None,
            notes: None,
            metadata: None,
        },
    )
    .await
    .unwrap();
    let order_id = new_order(&pool, product, Some(lead.id), "CM-3").await;

    let sale = CreateAffiliateSale {
        order_id,
        lead_id: Some(lead.id),
        sale_amount: 4_400_000,
        ..Default::default()
    };
    PaymentRepo::confirm(&pool, &payment(order_id, "tx-3"), Some(lead.id), Some(&sale))
        .await
        .unwrap();

    let lead = AffiliateLeadRepo::find_by_id(&pool, lead.id).await.unwrap().unwrap();
    assert_eq!(lead.status, "PURCHASED");

    let recorded = AffiliateSaleRepo::find_by_order_id(&pool, order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(recorded.status, "CONFIRMED");

    OrderRepo::cancel(&pool, order_id).await.unwrap().unwrap();
    let cancelled = AffiliateSaleRepo::find_by_order_id(&pool, order_id)
        .await
        .unwrap()
        .unwrap();
    assert_eq!(cancelled.status, "CANCELLED");

    let now = Utc::now();
    let lines = AffiliateSaleRepo::commission_lines(&pool, None, now - Duration::days(1), now + Duration::days(1))
        .await
        .unwrap();
    assert!(lines.is_empty(), "cancelled sales must not pay out");
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn cancel_twice_returns_none(pool: PgPool) {
    let product = new_product(&pool).await;
    let order_id = new_order(&pool, product, None, "CM-4").await;
    assert!(OrderRepo::cancel(&pool, order_id).await.unwrap().is_some());
    assert!(OrderRepo::cancel(&pool, order_id).await.unwrap().is_none());
}
