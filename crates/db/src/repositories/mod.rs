//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async CRUD methods
//! that accept `&PgPool` as the first argument.

pub mod affiliate_lead_repo;
pub mod affiliate_profile_repo;
pub mod affiliate_sale_repo;
pub mod backup_run_repo;
pub mod cruise_product_repo;
pub mod customer_group_repo;
pub mod event_repo;
pub mod funnel_message_repo;
pub mod landing_page_repo;
pub mod message_log_repo;
pub mod order_repo;
pub mod passport_repo;
pub mod payment_repo;
pub mod role_repo;
pub mod scheduled_message_repo;
pub mod session_repo;
pub mod user_repo;

pub use affiliate_lead_repo::AffiliateLeadRepo;
pub use affiliate_profile_repo::AffiliateProfileRepo;
pub use affiliate_sale_repo::AffiliateSaleRepo;
pub use backup_run_repo::BackupRunRepo;
pub use cruise_product_repo::CruiseProductRepo;
pub use customer_group_repo::CustomerGroupRepo;
pub use event_repo::EventRepo;
pub use funnel_message_repo::FunnelMessageRepo;
pub use landing_page_repo::LandingPageRepo;
pub use message_log_repo::MessageLogRepo;
pub use order_repo::OrderRepo;
pub use passport_repo::PassportRepo;
pub use payment_repo::{PaymentConfirmation, PaymentRepo};
pub use role_repo::RoleRepo;
pub use scheduled_message_repo::ScheduledMessageRepo;
pub use session_repo::SessionRepo;
pub use user_repo::UserRepo;
