//! Landing page model and DTOs.

use cruisemall_core::types::{DbId, Timestamp};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row from the `landing_pages` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct LandingPage {
    pub id: DbId,
    pub owner_profile_id: Option<DbId>,
    pub slug: String,
    pub title: String,
    pub headline: Option<String>,
    pub body: Option<String>,
    pub product_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub is_published: bool,
    pub view_count: i64,
    pub registration_count: i64,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Public view of a published page.
#[derive(Debug, Clone, Serialize)]
pub struct PublicLandingPage {
    pub slug: String,
    pub title: String,
    pub headline: Option<String>,
    pub body: Option<String>,
    pub product_id: Option<DbId>,
}

impl From<&LandingPage> for PublicLandingPage {
    fn from(page: &LandingPage) -> Self {
        Self {
            slug: page.slug.clone(),
            title: page.title.clone(),
            headline: page.headline.clone(),
            body: page.body.clone(),
            product_id: page.product_id,
        }
    }
}

/// DTO for creating a landing page.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateLandingPage {
    pub slug: String,
    pub title: String,
    pub headline: Option<String>,
    pub body: Option<String>,
    pub product_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub is_published: Option<bool>,
}

/// DTO for updating a landing page. All fields are optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateLandingPage {
    pub title: Option<String>,
    pub headline: Option<String>,
    pub body: Option<String>,
    pub product_id: Option<DbId>,
    pub group_id: Option<DbId>,
    pub is_published: Option<bool>,
}
