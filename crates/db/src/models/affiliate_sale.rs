//! Affiliate sale model and DTOs.

use cruisemall_core::types::{DbId, Timestamp, Won};
use serde::Serialize;
use sqlx::FromRow;

pub const SALE_STATUS_CONFIRMED: &str = "CONFIRMED";
pub const SALE_STATUS_CANCELLED: &str = "CANCELLED";

/// A row from the `affiliate_sales` table: one per paid order, with the
/// commission split frozen at payment time.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct AffiliateSale {
    pub id: DbId,
    pub order_id: DbId,
    pub lead_id: Option<DbId>,
    pub agent_profile_id: Option<DbId>,
    pub manager_profile_id: Option<DbId>,
    pub sale_amount: Won,
    pub agent_commission: Won,
    pub agent_withholding: Won,
    pub manager_commission: Won,
    pub manager_withholding: Won,
    pub status: String,
    pub sold_at: Timestamp,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a sale.
#[derive(Debug, Clone, Default)]
pub struct CreateAffiliateSale {
    pub order_id: DbId,
    pub lead_id: Option<DbId>,
    pub agent_profile_id: Option<DbId>,
    pub manager_profile_id: Option<DbId>,
    pub sale_amount: Won,
    pub agent_commission: Won,
    pub agent_withholding: Won,
    pub manager_commission: Won,
    pub manager_withholding: Won,
}

/// One recipient's gross share of one sale, as summarized by the
/// commission report.
#[derive(Debug, Clone, Copy, FromRow)]
pub struct CommissionLine {
    pub profile_id: DbId,
    pub sale_amount: Won,
    pub commission: Won,
}
