//! Domain logic for the cruise mall: affiliate ownership and commission,
//! tax and margin arithmetic, message scheduling, and document rendering.
//!
//! This crate has no internal dependencies and performs no I/O.

pub mod assistant;
pub mod bot_detection;
pub mod commission;
pub mod documents;
pub mod error;
pub mod margin;
pub mod ownership;
pub mod pagination;
pub mod passport;
pub mod phone;
pub mod roles;
pub mod schedule;
pub mod tax;
pub mod template;
pub mod tokens;
pub mod types;
pub mod username;
