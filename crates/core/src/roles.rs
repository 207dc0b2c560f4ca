//! Well-known role name constants.
//!
//! These must match the seed data in `20260301000001_create_users.sql`.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_BRANCH_MANAGER: &str = "branch_manager";
pub const ROLE_SALES_AGENT: &str = "sales_agent";
pub const ROLE_CUSTOMER: &str = "customer";

/// Roles that act on behalf of an affiliate profile.
pub fn is_affiliate_role(role: &str) -> bool {
    role == ROLE_BRANCH_MANAGER || role == ROLE_SALES_AGENT
}
