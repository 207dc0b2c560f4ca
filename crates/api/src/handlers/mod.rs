//! Request handlers, one module per resource.
//!
//! Handlers validate input, enforce affiliate scope, delegate to the
//! repositories in `cruisemall_db` and map errors via
//! [`AppError`](crate::error::AppError).

pub mod affiliate_leads;
pub mod affiliate_profiles;
pub mod affiliate_sales;
pub mod assistant;
pub mod auth;
pub mod backups;
pub mod calculators;
pub mod checkout;
pub mod customer_groups;
pub mod documents;
pub mod funnel_messages;
pub mod landing_pages;
pub mod orders;
pub mod passport;
pub mod payments;
pub mod products;
pub mod scheduled_messages;
