//! Domain model structs and DTOs.
//!
//! Each submodule contains:
//! - A `FromRow` + `Serialize` entity struct matching the database row
//! - A `Deserialize` create DTO for inserts
//! - A `Deserialize` update DTO (all `Option` fields) for patches

pub mod affiliate_lead;
pub mod affiliate_profile;
pub mod affiliate_sale;
pub mod backup_run;
pub mod cruise_product;
pub mod customer_group;
pub mod event;
pub mod landing_page;
pub mod message;
pub mod order;
pub mod passport;
pub mod payment;
pub mod role;
pub mod session;
pub mod user;
