//! Handlers for affiliate profiles (`/affiliate/profiles`, `/affiliate/me`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use cruisemall_core::commission::validate_rate;
use cruisemall_core::error::CoreError;
use cruisemall_core::ownership::{ProfileType, Viewer};
use cruisemall_core::roles::{ROLE_BRANCH_MANAGER, ROLE_SALES_AGENT};
use cruisemall_core::tokens::generate_affiliate_code;
use cruisemall_core::types::{Bps, DbId};
use cruisemall_db::models::affiliate_profile::{
    AffiliateProfile, CreateAffiliateProfile, UpdateAffiliateProfile,
};
use cruisemall_db::repositories::{AffiliateProfileRepo, RoleRepo, UserRepo};
use serde::Deserialize;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateProfileRequest {
    pub user_id: DbId,
    pub profile_type: String,
    pub manager_profile_id: Option<DbId>,
    /// Generated when absent.
    pub code: Option<String>,
    pub display_name: String,
    pub phone: Option<String>,
    pub commission_rate_bps: Option<Bps>,
    pub override_rate_bps: Option<Bps>,
}

/// GET /api/v1/affiliate/profiles
///
/// Admins list everyone, managers their own team, agents only themselves.
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<AffiliateProfile>>>> {
    let profiles = match (&viewer.viewer, viewer.profile) {
        (Viewer::Agent { .. }, Some(own)) => vec![own],
        (Viewer::Manager { profile_id }, _) => {
            let (limit, offset) = page.resolve();
            AffiliateProfileRepo::list(&state.pool, Some(*profile_id), limit, offset).await?
        }
        _ => {
            let (limit, offset) = page.resolve();
            AffiliateProfileRepo::list(&state.pool, None, limit, offset).await?
        }
    };
    Ok(Json(DataResponse { data: profiles }))
}

/// POST /api/v1/affiliate/profiles
pub async fn create(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Json(input): Json<CreateProfileRequest>,
) -> AppResult<(StatusCode, Json<DataResponse<AffiliateProfile>>)> {
    let kind = ProfileType::parse(&input.profile_type)?;
    let display_name = input.display_name.trim().to_string();
    if display_name.is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "display_name must not be empty".into(),
        )));
    }
    validate_rates(input.commission_rate_bps, input.override_rate_bps)?;

    let manager_profile_id = match (viewer.viewer, kind) {
        (Viewer::Admin, ProfileType::BranchManager) => None,
        (Viewer::Admin, ProfileType::SalesAgent) => input.manager_profile_id,
        (Viewer::Manager { profile_id }, ProfileType::SalesAgent) => {
            if input.manager_profile_id.is_some_and(|m| m != profile_id) {
                return Err(AppError::Core(CoreError::Forbidden(
                    "Managers can only add agents to their own team".into(),
                )));
            }
            Some(profile_id)
        }
        _ => {
            return Err(AppError::Core(CoreError::Forbidden(
                "Not allowed to create this kind of profile".into(),
            )));
        }
    };

    if let Some(manager_id) = manager_profile_id {
        AffiliateProfileRepo::find_by_id(&state.pool, manager_id)
            .await?
            .filter(|m| m.is_active && m.kind() == ProfileType::BranchManager)
            .ok_or_else(|| {
                AppError::BadRequest(format!("{manager_id} is not an active branch manager"))
            })?;
    }

    let user = UserRepo::find_by_id(&state.pool, input.user_id)
        .await?
        .ok_or_else(|| not_found("User", input.user_id))?;
    let expected_role = match kind {
        ProfileType::BranchManager => ROLE_BRANCH_MANAGER,
        ProfileType::SalesAgent => ROLE_SALES_AGENT,
    };
    let role = RoleRepo::find_by_id(&state.pool, user.role_id).await?;
    if role.as_ref().map(|r| r.name.as_str()) != Some(expected_role) {
        return Err(AppError::BadRequest(format!(
            "User {} must have the {expected_role} role",
            user.id
        )));
    }

    let code = match input.code.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
        Some(code) => code.to_uppercase(),
        None => generate_affiliate_code(),
    };

    let profile = AffiliateProfileRepo::create(
        &state.pool,
        &CreateAffiliateProfile {
            user_id: user.id,
            profile_type: kind.as_str().to_string(),
            manager_profile_id,
            code,
            display_name,
            phone: input.phone,
            commission_rate_bps: input.commission_rate_bps,
            override_rate_bps: input.override_rate_bps,
        },
    )
    .await?;

    tracing::info!(
        profile_id = profile.id,
        profile_type = %profile.profile_type,
        created_by = viewer.user.user_id,
        "Affiliate profile created",
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: profile })))
}

/// GET /api/v1/affiliate/me
pub async fn me(viewer: AffiliateViewer) -> AppResult<Json<DataResponse<AffiliateProfile>>> {
    let profile = viewer.profile.ok_or_else(|| {
        AppError::NotFound("Administrators have no affiliate profile".into())
    })?;
    Ok(Json(DataResponse { data: profile }))
}

/// GET /api/v1/affiliate/profiles/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<AffiliateProfile>>> {
    let profile = load_accessible(&state, &viewer, id).await?;
    Ok(Json(DataResponse { data: profile }))
}

/// PUT /api/v1/affiliate/profiles/{id}
///
/// Rates and activation are set from above: by an admin, or by a manager on
/// one of their agents. Everyone may edit their own contact details.
pub async fn update(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateAffiliateProfile>,
) -> AppResult<Json<DataResponse<AffiliateProfile>>> {
    let profile = load_accessible(&state, &viewer, id).await?;
    validate_rates(input.commission_rate_bps, input.override_rate_bps)?;

    let touches_terms = input.commission_rate_bps.is_some()
        || input.override_rate_bps.is_some()
        || input.is_active.is_some();
    let manages_target = match viewer.viewer {
        Viewer::Admin => true,
        Viewer::Manager { profile_id } => profile.manager_profile_id == Some(profile_id),
        Viewer::Agent { .. } => false,
    };
    if touches_terms && !manages_target {
        return Err(AppError::Core(CoreError::Forbidden(
            "Commission rates and activation are managed by your manager or an administrator"
                .into(),
        )));
    }
    if let Some(name) = input.display_name.as_deref() {
        if name.trim().is_empty() {
            return Err(AppError::Core(CoreError::Validation(
                "display_name must not be empty".into(),
            )));
        }
    }

    let updated = AffiliateProfileRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("AffiliateProfile", id))?;
    tracing::info!(profile_id = id, user_id = viewer.user.user_id, "Affiliate profile updated");
    Ok(Json(DataResponse { data: updated }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn validate_rates(commission: Option<Bps>, override_rate: Option<Bps>) -> AppResult<()> {
    if let Some(rate) = commission {
        validate_rate(rate, "commission_rate_bps")?;
    }
    if let Some(rate) = override_rate {
        validate_rate(rate, "override_rate_bps")?;
    }
    Ok(())
}

async fn load_accessible(
    state: &AppState,
    viewer: &AffiliateViewer,
    id: DbId,
) -> AppResult<AffiliateProfile> {
    let profile = AffiliateProfileRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("AffiliateProfile", id))?;
    if viewer
        .viewer
        .can_access_profile(profile.id, profile.manager_profile_id)
    {
        Ok(profile)
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "This profile belongs to another branch".into(),
        )))
    }
}
