//! Customer documents: booking certificates and price quotes.

use axum::extract::{Path, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use chrono::Utc;
use cruisemall_core::documents::{build_quote, render_certificate_svg, CertificateData, Quote, QuoteRequest};
use cruisemall_core::error::CoreError;
use cruisemall_core::passport::SubmissionStatus;
use cruisemall_core::schedule::kst_date;
use cruisemall_core::types::{DbId, Won};
use cruisemall_db::models::order::{Order, ORDER_STATUS_PAID};
use cruisemall_db::repositories::{CruiseProductRepo, PassportRepo};
use serde::Deserialize;
use sqlx::PgPool;

use super::orders;
use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QuoteParams {
    pub product_id: DbId,
    pub guests: i32,
    #[serde(default)]
    pub discount: Won,
}

/// GET /api/v1/documents/orders/{id}/certificate
///
/// SVG booking certificate for a paid order.
pub async fn certificate(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Response> {
    let order = orders::load_accessible(&state.pool, &viewer, id).await?;
    if order.status != ORDER_STATUS_PAID {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Certificates are issued for paid orders only (order {} is {})",
            order.order_number, order.status
        ))));
    }
    let product = CruiseProductRepo::find_by_id(&state.pool, order.product_id)
        .await?
        .ok_or_else(|| not_found("CruiseProduct", order.product_id))?;
    let guest_names = guest_names(&state.pool, &order).await?;

    let svg = render_certificate_svg(&CertificateData {
        order_number: order.order_number.clone(),
        product_title: product.title,
        ship_name: product.ship_name,
        departure_date: product.departure_date,
        nights: product.nights,
        guest_names,
        total_amount: order.total_amount,
        issued_on: kst_date(Utc::now()),
    });

    tracing::debug!(order_id = order.id, user_id = viewer.user.user_id, "Certificate rendered");
    let mut response = (StatusCode::OK, svg).into_response();
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("image/svg+xml"));
    Ok(response)
}

/// POST /api/v1/documents/quote
pub async fn quote(
    State(state): State<AppState>,
    Json(input): Json<QuoteParams>,
) -> AppResult<Json<DataResponse<Quote>>> {
    let product = CruiseProductRepo::find_by_id(&state.pool, input.product_id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| not_found("CruiseProduct", input.product_id))?;

    let quote = build_quote(&QuoteRequest {
        product_title: product.title,
        departure_date: product.departure_date,
        guests: input.guests,
        fare_per_guest: product.price,
        port_charge_per_guest: product.port_charge,
        single_supplement_bps: product.single_supplement_bps,
        discount: input.discount,
    })?;
    Ok(Json(DataResponse { data: quote }))
}

/// Names from the most recent submitted passport form, falling back to the
/// buyer.
async fn guest_names(pool: &PgPool, order: &Order) -> AppResult<Vec<String>> {
    let submissions = PassportRepo::list_for_order(pool, order.id).await?;
    let latest = submissions
        .iter()
        .find(|s| s.status == SubmissionStatus::Submitted.as_str());
    if let Some(submission) = latest {
        let guests = PassportRepo::guests(pool, submission.id).await?;
        if !guests.is_empty() {
            return Ok(guests.iter().map(|g| g.full_english_name()).collect());
        }
    }
    Ok(vec![order.buyer_name.clone()])
}
