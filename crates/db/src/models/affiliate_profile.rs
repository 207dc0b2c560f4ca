//! Affiliate profile model and DTOs.

use cruisemall_core::ownership::ProfileType;
use cruisemall_core::types::{Bps, DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `affiliate_profiles` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AffiliateProfile {
    pub id: DbId,
    pub user_id: DbId,
    /// `BRANCH_MANAGER` or `SALES_AGENT`.
    pub profile_type: String,
    pub manager_profile_id: Option<DbId>,
    pub code: String,
    pub display_name: String,
    pub phone: Option<String>,
    /// Own commission rate on leads this profile sells.
    pub commission_rate_bps: Bps,
    /// Managers only: override earned on sales by their agents.
    pub override_rate_bps: Bps,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AffiliateProfile {
    /// Typed profile kind. Rows are constrained by a `CHECK`, so an unknown
    /// value falls back to the least-privileged kind.
    pub fn kind(&self) -> ProfileType {
        ProfileType::parse(&self.profile_type).unwrap_or(ProfileType::SalesAgent)
    }
}

/// DTO for creating a profile.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateAffiliateProfile {
    pub user_id: DbId,
    pub profile_type: String,
    pub manager_profile_id: Option<DbId>,
    pub code: String,
    pub display_name: String,
    pub phone: Option<String>,
    pub commission_rate_bps: Option<Bps>,
    pub override_rate_bps: Option<Bps>,
}

/// DTO for updating a profile. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAffiliateProfile {
    pub display_name: Option<String>,
    pub phone: Option<String>,
    pub commission_rate_bps: Option<Bps>,
    pub override_rate_bps: Option<Bps>,
    pub is_active: Option<bool>,
}
