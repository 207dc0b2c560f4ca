//! Order model and DTOs.

use cruisemall_core::types::{DbId, Timestamp, Won};
use serde::Serialize;
use sqlx::FromRow;

pub const ORDER_STATUS_PENDING: &str = "PENDING";
pub const ORDER_STATUS_PAID: &str = "PAID";
pub const ORDER_STATUS_CANCELLED: &str = "CANCELLED";

/// A row from the `orders` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Order {
    pub id: DbId,
    pub order_number: String,
    pub product_id: DbId,
    pub lead_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
    pub guests: i32,
    pub subtotal: Won,
    pub discount: Won,
    pub total_amount: Won,
    pub vat: Won,
    pub status: String,
    pub paid_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating an order.
#[derive(Debug, Clone)]
pub struct CreateOrder {
    pub order_number: String,
    pub product_id: DbId,
    pub lead_id: Option<DbId>,
    pub user_id: Option<DbId>,
    pub buyer_name: String,
    pub buyer_phone: String,
    pub buyer_email: Option<String>,
    pub guests: i32,
    pub subtotal: Won,
    pub discount: Won,
    pub total_amount: Won,
    pub vat: Won,
}
