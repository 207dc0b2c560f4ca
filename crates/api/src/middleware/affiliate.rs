//! Affiliate scope extractor.
//!
//! Resolves the caller into a [`Viewer`]: admins see everything, branch
//! managers and sales agents are scoped to their active affiliate profile.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use cruisemall_core::error::CoreError;
use cruisemall_core::ownership::{LeadOwnership, Viewer};
use cruisemall_core::roles::{is_affiliate_role, ROLE_ADMIN};
use cruisemall_core::types::DbId;
use cruisemall_db::models::affiliate_lead::LeadScope;
use cruisemall_db::models::affiliate_profile::AffiliateProfile;
use cruisemall_db::repositories::AffiliateProfileRepo;

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

pub struct AffiliateViewer {
    pub user: AuthUser,
    pub viewer: Viewer,
    /// `None` for admins.
    pub profile: Option<AffiliateProfile>,
}

impl AffiliateViewer {
    pub fn is_admin(&self) -> bool {
        matches!(self.viewer, Viewer::Admin)
    }

    /// Owner recorded on groups, messages and landing pages this viewer
    /// creates. `None` means headquarters.
    pub fn owner_profile_id(&self) -> Option<DbId> {
        self.viewer.profile_id()
    }

    /// Lead list filter matching [`Viewer::can_access`].
    pub fn lead_scope(&self) -> LeadScope {
        match self.viewer {
            Viewer::Admin => LeadScope::default(),
            Viewer::Manager { profile_id } => LeadScope {
                manager_id: Some(profile_id),
                agent_id: None,
            },
            Viewer::Agent { profile_id, .. } => LeadScope {
                manager_id: None,
                agent_id: Some(profile_id),
            },
        }
    }

    /// 403 unless the viewer may see a record with this ownership.
    pub fn ensure_access(&self, ownership: LeadOwnership) -> Result<(), AppError> {
        if self.viewer.can_access(ownership) {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "This lead belongs to another affiliate".into(),
            )))
        }
    }

    /// 403 unless the viewer owns a resource with `owner_profile_id`.
    /// Admins own headquarters resources and may manage any.
    pub fn ensure_owner(&self, owner_profile_id: Option<DbId>) -> Result<(), AppError> {
        if self.is_admin() || owner_profile_id == self.owner_profile_id() {
            Ok(())
        } else {
            Err(AppError::Core(CoreError::Forbidden(
                "This resource belongs to another affiliate".into(),
            )))
        }
    }
}

impl FromRequestParts<AppState> for AffiliateViewer {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;

        if user.role == ROLE_ADMIN {
            return Ok(Self {
                user,
                viewer: Viewer::Admin,
                profile: None,
            });
        }

        if !is_affiliate_role(&user.role) {
            return Err(AppError::Core(CoreError::Forbidden(
                "Affiliate role required".into(),
            )));
        }

        let profile = AffiliateProfileRepo::find_active_by_user_id(&state.pool, user.user_id)
            .await?
            .ok_or_else(|| {
                AppError::Core(CoreError::Forbidden(
                    "No active affiliate profile for this account".into(),
                ))
            })?;

        let viewer = Viewer::from_profile(profile.kind(), profile.id, profile.manager_profile_id);
        Ok(Self {
            user,
            viewer,
            profile: Some(profile),
        })
    }
}
