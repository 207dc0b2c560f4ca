//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the user behind a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`affiliate::AffiliateViewer`] -- an admin or an active affiliate
//!   profile, resolved into the lead-access scope.

pub mod affiliate;
pub mod auth;
pub mod rbac;
