//! Passport submission workflow.
//!
//! Staff open a submission for an order and send the customer a link with
//! an unguessable token. The customer fills in every traveller's passport
//! details on the public form; submitting stores the guests and closes the
//! link.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::{Duration, NaiveDate, Utc};
use cruisemall_core::error::CoreError;
use cruisemall_core::passport::{is_link_expired, validate_guests, GuestInput, SubmissionStatus};
use cruisemall_core::schedule::kst_date;
use cruisemall_core::tokens::generate_link_token;
use cruisemall_core::types::{DbId, Timestamp};
use cruisemall_db::models::order::ORDER_STATUS_CANCELLED;
use cruisemall_db::models::passport::{
    CreatePassportSubmission, PassportSubmission, PassportSubmissionWithGuests,
};
use cruisemall_db::repositories::{CruiseProductRepo, OrderRepo, PassportRepo};
use cruisemall_events::bus::event_types;
use cruisemall_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::orders;
use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::response::DataResponse;
use crate::state::AppState;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct CreateSubmissionRequest {
    pub order_id: DbId,
}

#[derive(Debug, Deserialize)]
pub struct SubmissionListParams {
    pub order_id: DbId,
}

#[derive(Debug, Serialize)]
pub struct SubmissionCreated {
    #[serde(flatten)]
    pub submission: PassportSubmission,
    /// Public form URL to send to the customer.
    pub link: String,
}

/// What the public form shows before the customer fills it in.
#[derive(Debug, Serialize)]
pub struct PublicSubmission {
    pub order_number: String,
    pub buyer_name: String,
    pub product_title: String,
    pub departure_date: NaiveDate,
    pub guests: i32,
    pub status: String,
    pub expires_at: Timestamp,
}

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub guests: Vec<GuestInput>,
}

// ---------------------------------------------------------------------------
// Staff handlers
// ---------------------------------------------------------------------------

/// POST /api/v1/passport-submissions
pub async fn create(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Json(input): Json<CreateSubmissionRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<SubmissionCreated>>)> {
    let order = orders::load_accessible(&state.pool, &viewer, input.order_id).await?;
    if order.status == ORDER_STATUS_CANCELLED {
        return Err(AppError::Core(CoreError::Conflict(format!(
            "Order {} is cancelled",
            order.order_number
        ))));
    }

    let submission = PassportRepo::create(
        &state.pool,
        &CreatePassportSubmission {
            order_id: order.id,
            token: generate_link_token(),
            expires_at: Utc::now() + Duration::days(state.config.passport_link_ttl_days),
            created_by: Some(viewer.user.user_id),
        },
    )
    .await?;

    tracing::info!(
        submission_id = submission.id,
        order_id = order.id,
        expires_at = %submission.expires_at,
        "Passport submission opened",
    );
    let link = state.config.passport_link(&submission.token);
    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: SubmissionCreated { submission, link },
        }),
    ))
}

/// GET /api/v1/passport-submissions?order_id=
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Query(params): Query<SubmissionListParams>,
) -> AppResult<Json<DataResponse<Vec<PassportSubmission>>>> {
    orders::load_accessible(&state.pool, &viewer, params.order_id).await?;
    let submissions = PassportRepo::list_for_order(&state.pool, params.order_id).await?;
    Ok(Json(DataResponse { data: submissions }))
}

/// GET /api/v1/passport-submissions/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<PassportSubmissionWithGuests>>> {
    let submission = PassportRepo::find_with_guests(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("PassportSubmission", id))?;
    orders::load_accessible(&state.pool, &viewer, submission.submission.order_id).await?;
    Ok(Json(DataResponse { data: submission }))
}

// ---------------------------------------------------------------------------
// Public handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/public/passport/{token}
pub async fn public_get(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> AppResult<Json<DataResponse<PublicSubmission>>> {
    let submission = open_submission(&state, &token).await?;
    let (summary, _) = summarize(&state, &submission).await?;
    Ok(Json(DataResponse { data: summary }))
}

/// POST /api/v1/public/passport/{token}
pub async fn public_submit(
    State(state): State<AppState>,
    Path(token): Path<String>,
    Json(input): Json<SubmitRequest>,
) -> AppResult<Json<DataResponse<PublicSubmission>>> {
    let submission = open_submission(&state, &token).await?;
    if submission.status != SubmissionStatus::Pending.as_str() {
        return Err(already_submitted());
    }

    let (_, departure_date) = summarize(&state, &submission).await?;
    let guests: Vec<GuestInput> = input.guests.into_iter().map(GuestInput::normalized).collect();
    validate_guests(&guests, departure_date, kst_date(Utc::now()))?;

    let stored = PassportRepo::submit(&state.pool, submission.id, &guests)
        .await?
        .ok_or_else(already_submitted)?;

    tracing::info!(
        submission_id = stored.submission.id,
        order_id = stored.submission.order_id,
        guests = stored.guests.len(),
        "Passport details submitted",
    );
    state.event_bus.publish(
        PlatformEvent::new(event_types::PASSPORT_SUBMITTED)
            .with_source("passport_submission", stored.submission.id)
            .with_payload(json!({
                "order_id": stored.submission.order_id,
                "guests": stored.guests.len(),
            })),
    );

    let (summary, _) = summarize(&state, &stored.submission).await?;
    Ok(Json(DataResponse { data: summary }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn already_submitted() -> AppError {
    AppError::Core(CoreError::Conflict(
        "Passport details were already submitted for this link".into(),
    ))
}

/// Resolve a token, refusing expired links with 403. A pending link found
/// past its expiry is marked expired on the way out.
async fn open_submission(state: &AppState, token: &str) -> AppResult<PassportSubmission> {
    let submission = PassportRepo::find_by_token(&state.pool, token.trim())
        .await?
        .ok_or_else(|| AppError::NotFound("Unknown passport link".into()))?;

    let expired = submission.status == SubmissionStatus::Expired.as_str()
        || (submission.status == SubmissionStatus::Pending.as_str()
            && is_link_expired(submission.expires_at, Utc::now()));
    if expired {
        PassportRepo::mark_expired(&state.pool, submission.id).await?;
        return Err(AppError::Core(CoreError::Forbidden(
            "This passport link has expired. Please ask for a new one.".into(),
        )));
    }
    Ok(submission)
}

async fn summarize(
    state: &AppState,
    submission: &PassportSubmission,
) -> AppResult<(PublicSubmission, NaiveDate)> {
    let order = OrderRepo::find_by_id(&state.pool, submission.order_id)
        .await?
        .ok_or_else(|| not_found("Order", submission.order_id))?;
    let product = CruiseProductRepo::find_by_id(&state.pool, order.product_id)
        .await?
        .ok_or_else(|| not_found("CruiseProduct", order.product_id))?;

    Ok((
        PublicSubmission {
            order_number: order.order_number,
            buyer_name: order.buyer_name,
            product_title: product.title,
            departure_date: product.departure_date,
            guests: order.guests,
            status: submission.status.clone(),
            expires_at: submission.expires_at,
        },
        product.departure_date,
    ))
}
