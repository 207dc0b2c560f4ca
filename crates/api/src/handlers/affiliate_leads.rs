//! Handlers for the `/affiliate/leads` resource.
//!
//! Every read and write is scoped through [`AffiliateViewer`]: managers see
//! their branch, agents see their own leads, admins see everything.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cruisemall_core::error::CoreError;
use cruisemall_core::ownership::{attribute, Attribution, LeadOwner, LeadOwnership, ProfileType};
use cruisemall_core::phone::{mask_phone, normalize_phone};
use cruisemall_core::types::DbId;
use cruisemall_db::models::affiliate_lead::{
    AffiliateLead, CreateAffiliateLead, LeadFilter, UpdateAffiliateLead, LEAD_SOURCE_MANUAL,
    LEAD_STATUSES,
};
use cruisemall_db::repositories::{AffiliateLeadRepo, AffiliateProfileRepo, CustomerGroupRepo};
use cruisemall_events::bus::event_types;
use cruisemall_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

const PHONE_CONSTRAINT: &str = "uq_affiliate_leads_normalized_phone";

// ---------------------------------------------------------------------------
// Request / response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct LeadListParams {
    pub status: Option<String>,
    pub group_id: Option<DbId>,
    pub q: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CreateLeadRequest {
    pub customer_name: String,
    pub phone: String,
    pub email: Option<String>,
    pub group_id: Option<DbId>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

#[derive(Debug, Deserialize)]
pub struct LookupParams {
    pub phone: String,
}

#[derive(Debug, Serialize)]
pub struct LeadLookup {
    pub lead_id: DbId,
    pub owner: LeadOwner,
}

#[derive(Debug, Deserialize)]
pub struct AssignRequest {
    /// `None` hands the lead back to the manager.
    pub agent_id: Option<DbId>,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// GET /api/v1/affiliate/leads
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Query(params): Query<LeadListParams>,
) -> AppResult<Json<DataResponse<Vec<AffiliateLead>>>> {
    if let Some(status) = params.status.as_deref() {
        validate_status(status)?;
    }
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let filter = LeadFilter {
        status: params.status,
        group_id: params.group_id,
        q: params.q.map(|q| q.trim().to_string()).filter(|q| !q.is_empty()),
    };
    let leads =
        AffiliateLeadRepo::list(&state.pool, viewer.lead_scope(), &filter, limit, offset).await?;
    Ok(Json(DataResponse { data: leads }))
}

/// POST /api/v1/affiliate/leads
///
/// A phone number already on file answers 409 without revealing the owner.
pub async fn create(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Json(input): Json<CreateLeadRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AffiliateLead>>)> {
    let customer_name = required_name(&input.customer_name)?;
    let normalized = parse_phone(&input.phone)?;
    if let Some(status) = input.status.as_deref() {
        validate_status(status)?;
    }
    if let Some(group_id) = input.group_id {
        ensure_group_owner(&state.pool, &viewer, group_id).await?;
    }

    let created = AffiliateLeadRepo::create(
        &state.pool,
        &CreateAffiliateLead {
            customer_name,
            phone: input.phone.trim().to_string(),
            normalized_phone: normalized.clone(),
            email: input.email,
            ownership: viewer.viewer.creation_ownership(),
            group_id: input.group_id,
            status: input.status,
            source: LEAD_SOURCE_MANUAL.to_string(),
            landing_page_id: None,
            notes: input.notes,
            metadata: input.metadata,
        },
    )
    .await;

    let lead = match created {
        Ok(lead) => lead,
        Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some(PHONE_CONSTRAINT) => {
            return Err(duplicate_phone(&normalized));
        }
        Err(e) => return Err(e.into()),
    };

    tracing::info!(lead_id = lead.id, user_id = viewer.user.user_id, "Lead created");
    state.event_bus.publish(
        PlatformEvent::new(event_types::LEAD_CREATED)
            .with_source("affiliate_lead", lead.id)
            .with_actor(viewer.user.user_id)
            .with_payload(json!({ "source": lead.source })),
    );

    Ok((StatusCode::CREATED, Json(DataResponse { data: lead })))
}

/// GET /api/v1/affiliate/leads/lookup?phone=
///
/// Resolve who owns a phone number. Admin-wide; affiliates only resolve
/// leads inside their own scope.
pub async fn lookup(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Query(params): Query<LookupParams>,
) -> AppResult<Json<DataResponse<LeadLookup>>> {
    let normalized = parse_phone(&params.phone)?;
    let lead = AffiliateLeadRepo::find_by_normalized_phone(&state.pool, &normalized)
        .await?
        .filter(|lead| viewer.viewer.can_access(lead.ownership()))
        .ok_or_else(|| AppError::NotFound("No lead with this phone number".into()))?;

    Ok(Json(DataResponse {
        data: LeadLookup {
            lead_id: lead.id,
            owner: lead.ownership().owner(),
        },
    }))
}

/// GET /api/v1/affiliate/leads/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AffiliateLead>>> {
    let lead = load_accessible(&state.pool, &viewer, id).await?;
    Ok(Json(DataResponse { data: lead }))
}

/// PUT /api/v1/affiliate/leads/{id}
pub async fn update(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAffiliateLead>,
) -> AppResult<Json<DataResponse<AffiliateLead>>> {
    load_accessible(&state.pool, &viewer, id).await?;
    if let Some(status) = input.status.as_deref() {
        validate_status(status)?;
    }
    if let Some(name) = input.customer_name.as_deref() {
        required_name(name)?;
    }

    let lead = AffiliateLeadRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("AffiliateLead", id))?;
    Ok(Json(DataResponse { data: lead }))
}

/// DELETE /api/v1/affiliate/leads/{id}
pub async fn delete(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    load_accessible(&state.pool, &viewer, id).await?;
    if AffiliateLeadRepo::delete(&state.pool, id).await? {
        tracing::info!(lead_id = id, user_id = viewer.user.user_id, "Lead deleted");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("AffiliateLead", id))
    }
}

/// PUT /api/v1/affiliate/leads/{id}/assign
///
/// Hand a lead to an agent. Managers may only pick agents from their own
/// team; the lead's manager follows the agent.
pub async fn assign(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AssignRequest>,
) -> AppResult<Json<DataResponse<AffiliateLead>>> {
    let lead = load_accessible(&state.pool, &viewer, id).await?;

    let ownership = match input.agent_id {
        Some(agent_id) => {
            let agent = AffiliateProfileRepo::find_by_id(&state.pool, agent_id)
                .await?
                .filter(|p| p.is_active && p.kind() == ProfileType::SalesAgent)
                .ok_or_else(|| {
                    AppError::BadRequest(format!("{agent_id} is not an active sales agent"))
                })?;
            if !viewer.viewer.can_assign_agent(agent.manager_profile_id) {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Agent belongs to another branch".into(),
                )));
            }
            LeadOwnership::new(agent.manager_profile_id, Some(agent.id))
        }
        None => {
            if viewer.profile.as_ref().is_some_and(|p| p.kind() == ProfileType::SalesAgent) {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Agents cannot release leads".into(),
                )));
            }
            LeadOwnership::new(lead.manager_id, None)
        }
    };

    let updated = AffiliateLeadRepo::set_ownership(&state.pool, id, ownership)
        .await?
        .ok_or_else(|| not_found("AffiliateLead", id))?;

    tracing::info!(
        lead_id = id,
        agent_id = ?ownership.agent_id,
        user_id = viewer.user.user_id,
        "Lead assigned",
    );
    state.event_bus.publish(
        PlatformEvent::new(event_types::LEAD_ASSIGNED)
            .with_source("affiliate_lead", id)
            .with_actor(viewer.user.user_id)
            .with_payload(json!({
                "manager_id": ownership.manager_id,
                "agent_id": ownership.agent_id,
            })),
    );

    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// An inbound contact (checkout, landing registration) to record against
/// the lead that owns its phone number.
pub(crate) struct LeadTouch {
    pub customer_name: String,
    pub phone: String,
    pub normalized_phone: String,
    pub email: Option<String>,
    pub source: &'static str,
    pub landing_page_id: Option<DbId>,
    /// Affiliate the contact came through, if any.
    pub incoming: Option<LeadOwnership>,
    pub metadata: Option<serde_json::Value>,
}

/// Result of [`touch_lead`].
pub(crate) struct TouchedLead {
    pub lead: AffiliateLead,
    pub created: bool,
    /// Another affiliate already owned the lead.
    pub conflict: bool,
}

/// Find or create the lead for a contact, applying first-touch attribution.
pub(crate) async fn touch_lead(pool: &PgPool, touch: LeadTouch) -> AppResult<TouchedLead> {
    if let Some(existing) =
        AffiliateLeadRepo::find_by_normalized_phone(pool, &touch.normalized_phone).await?
    {
        return reattribute(pool, existing, touch.incoming).await;
    }

    let created = AffiliateLeadRepo::create(
        pool,
        &CreateAffiliateLead {
            customer_name: touch.customer_name,
            phone: touch.phone,
            normalized_phone: touch.normalized_phone.clone(),
            email: touch.email,
            ownership: touch.incoming.unwrap_or_default(),
            group_id: None,
            status: None,
            source: touch.source.to_string(),
            landing_page_id: touch.landing_page_id,
            notes: None,
            metadata: touch.metadata,
        },
    )
    .await;

    match created {
        Ok(lead) => Ok(TouchedLead {
            lead,
            created: true,
            conflict: false,
        }),
        // A concurrent touch created the lead first.
        Err(sqlx::Error::Database(db_err)) if db_err.constraint() == Some(PHONE_CONSTRAINT) => {
            let existing =
                AffiliateLeadRepo::find_by_normalized_phone(pool, &touch.normalized_phone)
                    .await?
                    .ok_or_else(|| AppError::InternalError("lead vanished after conflict".into()))?;
            reattribute(pool, existing, touch.incoming).await
        }
        Err(e) => Err(e.into()),
    }
}

async fn reattribute(
    pool: &PgPool,
    existing: AffiliateLead,
    incoming: Option<LeadOwnership>,
) -> AppResult<TouchedLead> {
    match attribute(existing.ownership(), incoming) {
        Attribution::Assign(ownership) => {
            let claimed = AffiliateLeadRepo::claim_ownership(pool, existing.id, ownership).await?;
            if let Some(lead) = claimed {
                tracing::info!(lead_id = lead.id, "Unowned lead claimed by first touch");
                return Ok(TouchedLead {
                    lead,
                    created: false,
                    conflict: false,
                });
            }
            // Another touch claimed the lead after it was read.
            let current = AffiliateLeadRepo::find_by_id(pool, existing.id)
                .await?
                .ok_or_else(|| not_found("AffiliateLead", existing.id))?;
            let conflict = current.ownership() != ownership;
            if conflict {
                tracing::info!(
                    lead_id = current.id,
                    "Lead claimed concurrently by another affiliate; keeping first touch",
                );
            }
            Ok(TouchedLead {
                lead: current,
                created: false,
                conflict,
            })
        }
        Attribution::Keep { conflict } => {
            if conflict {
                tracing::info!(
                    lead_id = existing.id,
                    "Lead already owned by another affiliate; keeping first touch",
                );
            }
            Ok(TouchedLead {
                lead: existing,
                created: false,
                conflict,
            })
        }
    }
}

pub(crate) fn parse_phone(raw: &str) -> AppResult<String> {
    normalize_phone(raw).ok_or_else(|| {
        AppError::Core(CoreError::Validation(format!(
            "Invalid phone number: {}",
            raw.trim()
        )))
    })
}

pub(crate) fn required_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "Name must not be empty".into(),
        )));
    }
    Ok(trimmed.to_string())
}

fn validate_status(status: &str) -> AppResult<()> {
    if LEAD_STATUSES.contains(&status) {
        Ok(())
    } else {
        Err(AppError::Core(CoreError::Validation(format!(
            "Unknown lead status '{status}'. Expected one of: {}",
            LEAD_STATUSES.join(", ")
        ))))
    }
}

fn duplicate_phone(normalized: &str) -> AppError {
    AppError::Core(CoreError::Conflict(format!(
        "Phone number {} is already owned by another lead",
        mask_phone(normalized)
    )))
}

/// Load a lead, answering 404 when missing and 403 when out of scope.
pub(crate) async fn load_accessible(
    pool: &PgPool,
    viewer: &AffiliateViewer,
    id: DbId,
) -> AppResult<AffiliateLead> {
    let lead = AffiliateLeadRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found("AffiliateLead", id))?;
    viewer.ensure_access(lead.ownership())?;
    Ok(lead)
}

async fn ensure_group_owner(pool: &PgPool, viewer: &AffiliateViewer, group_id: DbId) -> AppResult<()> {
    let group = CustomerGroupRepo::find_by_id(pool, group_id)
        .await?
        .ok_or_else(|| not_found("CustomerGroup", group_id))?;
    viewer.ensure_owner(group.owner_profile_id)
}
