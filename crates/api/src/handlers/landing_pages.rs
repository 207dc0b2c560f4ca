//! Handlers for landing pages: affiliate-managed CRUD under
//! `/landing-pages` and the public page and registration form under
//! `/public/landing-pages`.

use axum::extract::{Path, State};
use axum::http::header::USER_AGENT;
use axum::http::{HeaderMap, StatusCode};
use axum::Json;
use cruisemall_core::bot_detection::is_bot;
use cruisemall_core::error::CoreError;
use cruisemall_core::ownership::{ownership_for_profile, LeadOwnership};
use cruisemall_core::types::DbId;
use cruisemall_db::models::affiliate_lead::LEAD_SOURCE_LANDING;
use cruisemall_db::models::landing_page::{
    CreateLandingPage, LandingPage, PublicLandingPage, UpdateLandingPage,
};
use cruisemall_db::repositories::{AffiliateLeadRepo, AffiliateProfileRepo, LandingPageRepo};
use cruisemall_events::bus::event_types;
use cruisemall_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use super::affiliate_leads::{parse_phone, required_name, touch_lead, LeadTouch};
use super::customer_groups;
use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::response::DataResponse;
use crate::state::AppState;

const SLUG_MIN: usize = 3;
const SLUG_MAX: usize = 80;

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    /// Form extras (UTM tags, preferred travel month). Stored on new leads.
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub registered: bool,
}

// ---------------------------------------------------------------------------
// Affiliate handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/landing-pages
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<LandingPage>>>> {
    let pages =
        LandingPageRepo::list(&state.pool, viewer.owner_profile_id(), viewer.is_admin()).await?;
    Ok(Json(DataResponse { data: pages }))
}

/// POST /api/v1/landing-pages
pub async fn create(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Json(input): Json<CreateLandingPage>,
) -> AppResult<(StatusCode, Json<DataResponse<LandingPage>>)> {
    let slug = normalize_slug(&input.slug)?;
    required_name(&input.title)?;
    if let Some(group_id) = input.group_id {
        customer_groups::load_owned(&state.pool, &viewer, group_id).await?;
    }

    let page = LandingPageRepo::create(&state.pool, viewer.owner_profile_id(), &slug, &input).await?;
    tracing::info!(page_id = page.id, slug = %page.slug, user_id = viewer.user.user_id, "Landing page created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: page })))
}

/// GET /api/v1/landing-pages/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<LandingPage>>> {
    let page = load_owned(&state.pool, &viewer, id).await?;
    Ok(Json(DataResponse { data: page }))
}

/// PUT /api/v1/landing-pages/{id}
pub async fn update(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateLandingPage>,
) -> AppResult<Json<DataResponse<LandingPage>>> {
    load_owned(&state.pool, &viewer, id).await?;
    if let Some(title) = input.title.as_deref() {
        required_name(title)?;
    }
    if let Some(group_id) = input.group_id {
        customer_groups::load_owned(&state.pool, &viewer, group_id).await?;
    }

    let page = LandingPageRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("LandingPage", id))?;
    Ok(Json(DataResponse { data: page }))
}

/// DELETE /api/v1/landing-pages/{id}
pub async fn delete(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    load_owned(&state.pool, &viewer, id).await?;
    if LandingPageRepo::delete(&state.pool, id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("LandingPage", id))
    }
}

// ---------------------------------------------------------------------------
// Public handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/public/landing-pages/{slug}
///
/// Views from crawlers and link previews are not counted.
pub async fn public_get(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
) -> AppResult<Json<DataResponse<PublicLandingPage>>> {
    let page = find_published(&state.pool, &slug).await?;
    if !is_bot(user_agent(&headers)) {
        LandingPageRepo::increment_views(&state.pool, page.id).await?;
    }
    Ok(Json(DataResponse {
        data: PublicLandingPage::from(&page),
    }))
}

/// POST /api/v1/public/landing-pages/{slug}/register
///
/// The lead is attributed to the page owner unless another affiliate got
/// there first, and joins the page's group.
pub async fn register(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    headers: HeaderMap,
    Json(input): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<Registered>>)> {
    if is_bot(user_agent(&headers)) {
        tracing::info!(slug = %slug, "Refused automated landing registration");
        return Err(AppError::Core(CoreError::Forbidden(
            "Automated submissions are not accepted".into(),
        )));
    }

    let page = find_published(&state.pool, &slug).await?;
    let customer_name = required_name(&input.customer_name)?;
    let normalized = parse_phone(&input.phone)?;
    let incoming = page_ownership(&state.pool, &page).await?;

    let touched = touch_lead(
        &state.pool,
        LeadTouch {
            customer_name,
            phone: input.phone.trim().to_string(),
            normalized_phone: normalized,
            email: input.email,
            source: LEAD_SOURCE_LANDING,
            landing_page_id: Some(page.id),
            incoming,
            metadata: input.metadata,
        },
    )
    .await?;

    // Another affiliate's lead stays out of this page owner's group.
    if let Some(group_id) = page.group_id.filter(|_| !touched.conflict) {
        AffiliateLeadRepo::add_to_group(&state.pool, group_id, &[touched.lead.id]).await?;
    }
    LandingPageRepo::increment_registrations(&state.pool, page.id).await?;

    tracing::info!(
        page_id = page.id,
        lead_id = touched.lead.id,
        created = touched.created,
        "Landing page registration",
    );
    if touched.created {
        state.event_bus.publish(
            PlatformEvent::new(event_types::LEAD_CREATED)
                .with_source("affiliate_lead", touched.lead.id)
                .with_payload(json!({ "source": LEAD_SOURCE_LANDING })),
        );
    }
    state.event_bus.publish(
        PlatformEvent::new(event_types::LANDING_REGISTERED)
            .with_source("landing_page", page.id)
            .with_payload(json!({
                "lead_id": touched.lead.id,
                "new_lead": touched.created,
                "attribution_conflict": touched.conflict,
            })),
    );

    Ok((
        StatusCode::CREATED,
        Json(DataResponse {
            data: Registered { registered: true },
        }),
    ))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn user_agent(headers: &HeaderMap) -> Option<&str> {
    headers.get(USER_AGENT).and_then(|v| v.to_str().ok())
}

/// Lowercase URL slug of letters, digits and single hyphens.
fn normalize_slug(raw: &str) -> AppResult<String> {
    let slug = raw.trim().to_lowercase();
    let valid_chars = slug
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-');
    if !(SLUG_MIN..=SLUG_MAX).contains(&slug.len())
        || !valid_chars
        || slug.starts_with('-')
        || slug.ends_with('-')
        || slug.contains("--")
    {
        return Err(AppError::Core(CoreError::Validation(format!(
            "slug must be {SLUG_MIN}-{SLUG_MAX} characters of a-z, 0-9 and single hyphens"
        ))));
    }
    Ok(slug)
}

async fn find_published(pool: &PgPool, slug: &str) -> AppResult<LandingPage> {
    LandingPageRepo::find_published_by_slug(pool, &slug.trim().to_lowercase())
        .await?
        .ok_or_else(|| AppError::NotFound(format!("No published landing page '{slug}'")))
}

/// Ownership a registration through `page` carries. Headquarters pages and
/// pages of deactivated affiliates attribute nobody.
async fn page_ownership(pool: &PgPool, page: &LandingPage) -> AppResult<Option<LeadOwnership>> {
    let Some(owner_id) = page.owner_profile_id else {
        return Ok(None);
    };
    Ok(AffiliateProfileRepo::find_by_id(pool, owner_id)
        .await?
        .filter(|p| p.is_active)
        .map(|p| ownership_for_profile(p.kind(), p.id, p.manager_profile_id)))
}

async fn load_owned(pool: &PgPool, viewer: &AffiliateViewer, id: DbId) -> AppResult<LandingPage> {
    let page = LandingPageRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found("LandingPage", id))?;
    viewer.ensure_owner(page.owner_profile_id)?;
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slug_is_lowercased() {
        assert_eq!(normalize_slug(" Spring-Alaska-2026 ").unwrap(), "spring-alaska-2026");
    }

    #[test]
    fn slug_rejects_bad_shapes() {
        for bad in ["ab", "-alaska", "alaska-", "ala--ska", "알래스카", "alaska cruise"] {
            assert!(normalize_slug(bad).is_err(), "{bad} should be rejected");
        }
    }
}
