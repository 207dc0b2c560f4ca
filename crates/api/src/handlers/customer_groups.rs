//! Handlers for the `/customer-groups` resource and its members.
//!
//! Groups belong to the affiliate profile that created them; admin-created
//! groups belong to headquarters (`owner_profile_id = NULL`). Deleting a
//! group releases its members instead of deleting them.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cruisemall_core::error::CoreError;
use cruisemall_core::types::DbId;
use cruisemall_db::models::affiliate_lead::{AffiliateLead, LeadFilter};
use cruisemall_db::models::customer_group::{
    CreateCustomerGroup, CustomerGroup, CustomerGroupWithCount, UpdateCustomerGroup,
};
use cruisemall_db::repositories::{AffiliateLeadRepo, CustomerGroupRepo};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Upper bound on lead ids per membership request.
const MAX_MEMBERS_PER_REQUEST: usize = 500;

#[derive(Debug, Deserialize)]
pub struct AddMembersRequest {
    pub lead_ids: Vec<DbId>,
}

#[derive(Debug, Serialize)]
pub struct MembersAdded {
    /// Leads that moved into the group; existing members are not counted.
    pub added: u64,
}

#[derive(Debug, Serialize)]
pub struct GroupDeleted {
    pub id: DbId,
    /// Members whose `group_id` was cleared.
    pub released_members: u64,
}

/// GET /api/v1/customer-groups
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<CustomerGroupWithCount>>>> {
    let groups = CustomerGroupRepo::list_for_owner(&state.pool, viewer.owner_profile_id()).await?;
    Ok(Json(DataResponse { data: groups }))
}

/// POST /api/v1/customer-groups
pub async fn create(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Json(mut input): Json<CreateCustomerGroup>,
) -> AppResult<(StatusCode, Json<DataResponse<CustomerGroup>>)> {
    input.name = validate_name(&input.name)?;
    let group = CustomerGroupRepo::create(&state.pool, viewer.owner_profile_id(), &input).await?;
    tracing::info!(group_id = group.id, user_id = viewer.user.user_id, "Customer group created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: group })))
}

/// GET /api/v1/customer-groups/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CustomerGroup>>> {
    let group = load_owned(&state.pool, &viewer, id).await?;
    Ok(Json(DataResponse { data: group }))
}

/// PUT /api/v1/customer-groups/{id}
pub async fn update(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(mut input): Json<UpdateCustomerGroup>,
) -> AppResult<Json<DataResponse<CustomerGroup>>> {
    load_owned(&state.pool, &viewer, id).await?;
    if let Some(name) = input.name.as_deref() {
        input.name = Some(validate_name(name)?);
    }
    let group = CustomerGroupRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("CustomerGroup", id))?;
    Ok(Json(DataResponse { data: group }))
}

/// DELETE /api/v1/customer-groups/{id}
pub async fn delete(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<GroupDeleted>>> {
    load_owned(&state.pool, &viewer, id).await?;
    let released = CustomerGroupRepo::delete(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("CustomerGroup", id))?;
    tracing::info!(group_id = id, released, user_id = viewer.user.user_id, "Customer group deleted");
    Ok(Json(DataResponse {
        data: GroupDeleted {
            id,
            released_members: released,
        },
    }))
}

/// GET /api/v1/customer-groups/{id}/members
pub async fn list_members(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<AffiliateLead>>>> {
    load_owned(&state.pool, &viewer, id).await?;
    let (limit, offset) = page.resolve();
    let filter = LeadFilter {
        group_id: Some(id),
        ..LeadFilter::default()
    };
    let members =
        AffiliateLeadRepo::list(&state.pool, viewer.lead_scope(), &filter, limit, offset).await?;
    Ok(Json(DataResponse { data: members }))
}

/// POST /api/v1/customer-groups/{id}/members
///
/// Every lead must exist and be visible to the caller, otherwise nothing
/// is added.
pub async fn add_members(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<AddMembersRequest>,
) -> AppResult<Json<DataResponse<MembersAdded>>> {
    load_owned(&state.pool, &viewer, id).await?;

    let mut lead_ids = input.lead_ids;
    lead_ids.sort_unstable();
    lead_ids.dedup();
    if lead_ids.is_empty() || lead_ids.len() > MAX_MEMBERS_PER_REQUEST {
        return Err(AppError::Core(CoreError::Validation(format!(
            "lead_ids must contain between 1 and {MAX_MEMBERS_PER_REQUEST} ids"
        ))));
    }

    let leads = AffiliateLeadRepo::find_many(&state.pool, &lead_ids).await?;
    if leads.len() != lead_ids.len() {
        let missing = lead_ids
            .iter()
            .find(|id| !leads.iter().any(|l| l.id == **id))
            .copied()
            .unwrap_or_default();
        return Err(not_found("AffiliateLead", missing));
    }
    for lead in &leads {
        viewer.ensure_access(lead.ownership())?;
    }

    let added = AffiliateLeadRepo::add_to_group(&state.pool, id, &lead_ids).await?;
    tracing::info!(group_id = id, added, user_id = viewer.user.user_id, "Leads added to group");
    Ok(Json(DataResponse {
        data: MembersAdded { added },
    }))
}

/// DELETE /api/v1/customer-groups/{id}/members/{lead_id}
pub async fn remove_member(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path((id, lead_id)): Path<(DbId, DbId)>,
) -> AppResult<StatusCode> {
    load_owned(&state.pool, &viewer, id).await?;
    if AffiliateLeadRepo::remove_from_group(&state.pool, id, lead_id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("AffiliateLead", lead_id))
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_name(name: &str) -> AppResult<String> {
    let trimmed = name.trim();
    if trimmed.is_empty() || trimmed.chars().count() > 100 {
        return Err(AppError::Core(CoreError::Validation(
            "Group name must be 1 to 100 characters".into(),
        )));
    }
    Ok(trimmed.to_string())
}

pub(crate) async fn load_owned(
    pool: &PgPool,
    viewer: &AffiliateViewer,
    id: DbId,
) -> AppResult<CustomerGroup> {
    let group = CustomerGroupRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found("CustomerGroup", id))?;
    viewer.ensure_owner(group.owner_profile_id)?;
    Ok(group)
}
