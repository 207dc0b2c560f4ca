//! Repository for the `landing_pages` table.

use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::landing_page::{CreateLandingPage, LandingPage, UpdateLandingPage};

const COLUMNS: &str = "id, owner_profile_id, slug, title, headline, body, product_id, group_id, \
                        is_published, view_count, registration_count, created_at, updated_at";

/// Provides CRUD operations and counters for landing pages.
pub struct LandingPageRepo;

impl LandingPageRepo {
    /// Create a page owned by `owner_profile_id` (`None` = headquarters).
    /// The slug must already be normalized.
    pub async fn create(
        pool: &PgPool,
        owner_profile_id: Option<DbId>,
        slug: &str,
        input: &CreateLandingPage,
    ) -> Result<LandingPage, sqlx::Error> {
        let query = format!(
            "INSERT INTO landing_pages
                (owner_profile_id, slug, title, headline, body, product_id, group_id, is_published)
             VALUES ($1, $2, $3, $4, $5, $6, $7, COALESCE($8, false))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LandingPage>(&query)
            .bind(owner_profile_id)
            .bind(slug)
            .bind(&input.title)
            .bind(&input.headline)
            .bind(&input.body)
            .bind(input.product_id)
            .bind(input.group_id)
            .bind(input.is_published)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<LandingPage>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM landing_pages WHERE id = $1");
        sqlx::query_as::<_, LandingPage>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find a published page by slug.
    pub async fn find_published_by_slug(
        pool: &PgPool,
        slug: &str,
    ) -> Result<Option<LandingPage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM landing_pages WHERE slug = $1 AND is_published = true"
        );
        sqlx::query_as::<_, LandingPage>(&query)
            .bind(slug)
            .fetch_optional(pool)
            .await
    }

    /// Pages owned by `owner_profile_id`. Admins pass `all = true` to see
    /// every page.
    pub async fn list(
        pool: &PgPool,
        owner_profile_id: Option<DbId>,
        all: bool,
    ) -> Result<Vec<LandingPage>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM landing_pages
             WHERE $2 OR owner_profile_id IS NOT DISTINCT FROM $1
             ORDER BY created_at DESC, id DESC"
        );
        sqlx::query_as::<_, LandingPage>(&query)
            .bind(owner_profile_id)
            .bind(all)
            .fetch_all(pool)
            .await
    }

    /// Update a page. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateLandingPage,
    ) -> Result<Option<LandingPage>, sqlx::Error> {
        let query = format!(
            "UPDATE landing_pages SET
                title = COALESCE($2, title),
                headline = COALESCE($3, headline),
                body = COALESCE($4, body),
                product_id = COALESCE($5, product_id),
                group_id = COALESCE($6, group_id),
                is_published = COALESCE($7, is_published)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, LandingPage>(&query)
            .bind(id)
            .bind(&input.title)
            .bind(&input.headline)
            .bind(&input.body)
            .bind(input.product_id)
            .bind(input.group_id)
            .bind(input.is_published)
            .fetch_optional(pool)
            .await
    }

    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM landing_pages WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn increment_views(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE landing_pages SET view_count = view_count + 1 WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(())
    }

    pub async fn increment_registrations(pool: &PgPool, id: DbId) -> Result<(), sqlx::Error> {
        sqlx::query(
            "UPDATE landing_pages SET registration_count = registration_count + 1 WHERE id = $1",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(())
    }
}
