//! Affiliate lead model and DTOs.

use cruisemall_core::ownership::LeadOwnership;
use cruisemall_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const LEAD_STATUS_NEW: &str = "NEW";
pub const LEAD_STATUS_CONTACTED: &str = "CONTACTED";
pub const LEAD_STATUS_IN_PROGRESS: &str = "IN_PROGRESS";
pub const LEAD_STATUS_PURCHASED: &str = "PURCHASED";
pub const LEAD_STATUS_LOST: &str = "LOST";

/// Every value the `status` column accepts.
pub const LEAD_STATUSES: &[&str] = &[
    LEAD_STATUS_NEW,
    LEAD_STATUS_CONTACTED,
    LEAD_STATUS_IN_PROGRESS,
    LEAD_STATUS_PURCHASED,
    LEAD_STATUS_LOST,
];

pub const LEAD_SOURCE_MANUAL: &str = "MANUAL";
pub const LEAD_SOURCE_LANDING: &str = "LANDING";
pub const LEAD_SOURCE_CHECKOUT: &str = "CHECKOUT";

/// A row from the `affiliate_leads` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AffiliateLead {
    pub id: DbId,
    pub customer_name: String,
    pub phone: String,
    pub normalized_phone: String,
    pub email: Option<String>,
    pub manager_id: Option<DbId>,
    pub agent_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub group_assigned_at: Option<Timestamp>,
    pub status: String,
    pub source: String,
    pub landing_page_id: Option<DbId>,
    pub notes: Option<String>,
    /// Free-form attributes captured from forms (UTM tags, preferences).
    pub metadata: serde_json::Value,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl AffiliateLead {
    pub fn ownership(&self) -> LeadOwnership {
        LeadOwnership::new(self.manager_id, self.agent_id)
    }
}

/// DTO for inserting a lead. `normalized_phone` must already be normalized.
#[derive(Debug, Clone)]
pub struct CreateAffiliateLead {
    pub customer_name: String,
    pub phone: String,
    pub normalized_phone: String,
    pub email: Option<String>,
    pub ownership: LeadOwnership,
    pub group_id: Option<DbId>,
    pub status: Option<String>,
    pub source: String,
    pub landing_page_id: Option<DbId>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// DTO for updating a lead. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAffiliateLead {
    pub customer_name: Option<String>,
    pub email: Option<String>,
    pub status: Option<String>,
    pub notes: Option<String>,
    pub metadata: Option<serde_json::Value>,
}

/// Filters for listing leads. Ownership scope is applied separately.
#[derive(Debug, Clone, Default)]
pub struct LeadFilter {
    pub status: Option<String>,
    pub group_id: Option<DbId>,
    /// Matches name or phone digits.
    pub q: Option<String>,
}

/// Ownership scope for list queries: `None` fields do not restrict.
#[derive(Debug, Clone, Copy, Default)]
pub struct LeadScope {
    pub manager_id: Option<DbId>,
    pub agent_id: Option<DbId>,
}
