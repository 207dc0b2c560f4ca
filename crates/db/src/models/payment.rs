//! Payment model and DTOs.

use cruisemall_core::types::{DbId, Timestamp, Won};
use serde::Serialize;
use sqlx::FromRow;

pub const PAYMENT_STATUS_COMPLETED: &str = "COMPLETED";

/// A row from the `payments` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Payment {
    pub id: DbId,
    pub order_id: DbId,
    pub provider: String,
    pub provider_tx_id: String,
    pub method: Option<String>,
    pub amount: Won,
    pub status: String,
    /// Provider payload as received, kept for reconciliation.
    pub raw_payload: serde_json::Value,
    pub paid_at: Timestamp,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for recording a completed payment.
#[derive(Debug, Clone)]
pub struct CreatePayment {
    pub order_id: DbId,
    pub provider: String,
    pub provider_tx_id: String,
    pub method: Option<String>,
    pub amount: Won,
    pub raw_payload: serde_json::Value,
}
