//! Handler for `POST /checkout`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use cruisemall_core::documents::{build_quote, Quote, QuoteRequest};
use cruisemall_core::ownership::{ownership_for_profile, LeadOwnership};
use cruisemall_core::schedule::kst_date;
use cruisemall_core::tokens::random_alphanumeric;
use cruisemall_core::types::DbId;
use cruisemall_db::models::affiliate_lead::LEAD_SOURCE_CHECKOUT;
use cruisemall_db::models::cruise_product::CruiseProduct;
use cruisemall_db::models::order::{CreateOrder, Order};
use cruisemall_db::repositories::{AffiliateProfileRepo, CruiseProductRepo, OrderRepo};
use cruisemall_events::bus::event_types;
use cruisemall_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;
use validator::Validate;

use super::affiliate_leads::{parse_phone, required_name, touch_lead, LeadTouch};
use crate::error::{not_found, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize, Validate)]
pub struct CheckoutRequest {
    pub product_id: DbId,
    pub guests: i32,
    pub buyer_name: String,
    pub buyer_phone: String,
    #[validate(email)]
    pub buyer_email: Option<String>,
    /// Code of the affiliate who referred the buyer.
    pub affiliate_code: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CheckoutResponse {
    pub order: Order,
    pub quote: Quote,
}

/// POST /api/v1/checkout
///
/// Price the booking, attribute the buyer's lead and open a `PENDING` order.
/// Signed-in customers get the order linked to their account.
pub async fn checkout(
    State(state): State<AppState>,
    auth: Option<AuthUser>,
    Json(input): Json<CheckoutRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<CheckoutResponse>>)> {
    input.validate()?;
    let buyer_name = required_name(&input.buyer_name)?;
    let normalized = parse_phone(&input.buyer_phone)?;

    let product = CruiseProductRepo::find_by_id(&state.pool, input.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| not_found("CruiseProduct", input.product_id))?;
    let quote = quote_for(&product, input.guests)?;

    let incoming = match input.affiliate_code.as_deref() {
        Some(code) => referral_ownership(&state.pool, code).await?,
        None => None,
    };

    let touched = touch_lead(
        &state.pool,
        LeadTouch {
            customer_name: buyer_name.clone(),
            phone: input.buyer_phone.trim().to_string(),
            normalized_phone: normalized.clone(),
            email: input.buyer_email.clone(),
            source: LEAD_SOURCE_CHECKOUT,
            landing_page_id: None,
            incoming,
            metadata: None,
        },
    )
    .await?;

    let user_id = auth.as_ref().map(|a| a.user_id);
    let order = OrderRepo::create(
        &state.pool,
        &CreateOrder {
            order_number: generate_order_number(),
            product_id: product.id,
            lead_id: Some(touched.lead.id),
            user_id,
            buyer_name,
            buyer_phone: normalized,
            buyer_email: input.buyer_email,
            guests: input.guests,
            subtotal: quote.subtotal,
            discount: quote.discount,
            total_amount: quote.total,
            vat: quote.vat,
        },
    )
    .await?;

    tracing::info!(
        order_id = order.id,
        order_number = %order.order_number,
        lead_id = touched.lead.id,
        total = order.total_amount,
        "Order created",
    );

    if touched.created {
        state.event_bus.publish(
            PlatformEvent::new(event_types::LEAD_CREATED)
                .with_source("affiliate_lead", touched.lead.id)
                .with_optional_actor(user_id)
                .with_payload(json!({ "source": LEAD_SOURCE_CHECKOUT })),
        );
    }
    state.event_bus.publish(
        PlatformEvent::new(event_types::ORDER_CREATED)
            .with_source("order", order.id)
            .with_optional_actor(user_id)
            .with_payload(json!({
                "order_number": order.order_number,
                "product_id": product.id,
                "total_amount": order.total_amount,
                "attribution_conflict": touched.conflict,
            })),
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: CheckoutResponse { order, quote },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn quote_for(product: &CruiseProduct, guests: i32) -> AppResult<Quote> {
    Ok(build_quote(&QuoteRequest {
        product_title: product.title.clone(),
        departure_date: product.departure_date,
        guests,
        fare_per_guest: product.price,
        port_charge_per_guest: product.port_charge,
        single_supplement_bps: product.single_supplement_bps,
        discount: 0,
    })?)
}

/// Ownership carried by a referral code. Unknown or inactive codes are
/// ignored so a mistyped code never blocks a purchase.
async fn referral_ownership(pool: &PgPool, code: &str) -> AppResult<Option<LeadOwnership>> {
    let code = code.trim().to_uppercase();
    if code.is_empty() {
        return Ok(None);
    }
    match AffiliateProfileRepo::find_active_by_code(pool, &code).await? {
        Some(profile) => Ok(Some(ownership_for_profile(
            profile.kind(),
            profile.id,
            profile.manager_profile_id,
        ))),
        None => {
            tracing::warn!(code = %code, "Checkout with unknown affiliate code");
            Ok(None)
        }
    }
}

/// `CM-YYYYMMDD-XXXXXX`, dated in KST.
fn generate_order_number() -> String {
    format!(
        "CM-{}-{}",
        kst_date(Utc::now()).format("%Y%m%d"),
        random_alphanumeric(6).to_uppercase()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn order_number_shape() {
        let number = generate_order_number();
        assert!(number.starts_with("CM-"));
        assert_eq!(number.len(), "CM-20260301-ABC123".len());
        assert!(number[12..].chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }
}
