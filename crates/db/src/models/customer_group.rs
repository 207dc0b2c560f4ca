//! Customer group model and DTOs.

use cruisemall_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `customer_groups` table. `owner_profile_id` is `None` for
/// headquarters groups.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerGroup {
    pub id: DbId,
    pub owner_profile_id: Option<DbId>,
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A group with its current member count.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CustomerGroupWithCount {
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub group: CustomerGroup,
    pub member_count: i64,
}

/// DTO for creating a group.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCustomerGroup {
    pub name: String,
    pub description: Option<String>,
    pub color: Option<String>,
}

/// DTO for updating a group. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCustomerGroup {
    pub name: Option<String>,
    pub description: Option<String>,
    pub color: Option<String>,
}
