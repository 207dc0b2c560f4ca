//! Cruise product model and DTOs.

use chrono::NaiveDate;
use cruisemall_core::types::{Bps, DbId, Timestamp, Won};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `cruise_products` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct CruiseProduct {
    pub id: DbId,
    pub code: String,
    pub title: String,
    pub cruise_line: String,
    pub ship_name: String,
    pub departure_port: String,
    pub departure_date: NaiveDate,
    pub nights: i32,
    /// VAT-inclusive fare per guest.
    pub price: Won,
    #[serde(skip_serializing)]
    pub cost_price: Won,
    pub port_charge: Won,
    pub single_supplement_bps: Bps,
    pub description: Option<String>,
    /// Day-by-day ports of call; shape is owned by the storefront.
    pub itinerary: serde_json::Value,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// DTO for creating a product.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateCruiseProduct {
    pub code: String,
    pub title: String,
    pub cruise_line: String,
    pub ship_name: String,
    pub departure_port: String,
    pub departure_date: NaiveDate,
    pub nights: i32,
    pub price: Won,
    pub cost_price: Option<Won>,
    pub port_charge: Option<Won>,
    pub single_supplement_bps: Option<Bps>,
    pub description: Option<String>,
    pub itinerary: Option<serde_json::Value>,
}

/// DTO for updating a product. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCruiseProduct {
    pub title: Option<String>,
    pub cruise_line: Option<String>,
    pub ship_name: Option<String>,
    pub departure_port: Option<String>,
    pub departure_date: Option<NaiveDate>,
    pub nights: Option<i32>,
    pub price: Option<Won>,
    pub cost_price: Option<Won>,
    pub port_charge: Option<Won>,
    pub single_supplement_bps: Option<Bps>,
    pub description: Option<String>,
    pub itinerary: Option<serde_json::Value>,
    pub is_active: Option<bool>,
}

/// Catalog filters.
#[derive(Debug, Clone, Default)]
pub struct ProductFilter {
    pub q: Option<String>,
    pub cruise_line: Option<String>,
    pub departure_from: Option<NaiveDate>,
    pub departure_to: Option<NaiveDate>,
    pub include_inactive: bool,
}
