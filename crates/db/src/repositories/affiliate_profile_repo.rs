//! Repository for the `affiliate_profiles` table.

use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::affiliate_profile::{
    AffiliateProfile, CreateAffiliateProfile, UpdateAffiliateProfile,
};

const COLUMNS: &str = "id, user_id, profile_type, manager_profile_id, code, display_name, \
                        phone, commission_rate_bps, override_rate_bps, is_active, \
                        created_at, updated_at";

/// Provides CRUD operations for affiliate profiles.
pub struct AffiliateProfileRepo;

impl AffiliateProfileRepo {
    pub async fn create(
        pool: &PgPool,
        input: &CreateAffiliateProfile,
    ) -> Result<AffiliateProfile, sqlx::Error> {
        let query = format!(
            "INSERT INTO affiliate_profiles
                (user_id, profile_type, manager_profile_id, code, display_name, phone,
                 commission_rate_bps, override_rate_bps)
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, 0), COALESCE($8, 0))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AffiliateProfile>(&query)
            .bind(input.user_id)
            .bind(&input.profile_type)
            .bind(input.manager_profile_id)
            .bind(&input.code)
            .bind(&input.display_name)
            .bind(&input.phone)
            .bind(input.commission_rate_bps)
            .bind(input.override_rate_bps)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<AffiliateProfile>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM affiliate_profiles WHERE id = $1");
        sqlx::query_as::<_, AffiliateProfile>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// The active profile belonging to a user account, if any.
    pub async fn find_active_by_user_id(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Option<AffiliateProfile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_profiles WHERE user_id = $1 AND is_active = true"
        );
        sqlx::query_as::<_, AffiliateProfile>(&query)
            .bind(user_id)
            .fetch_optional(pool)
            .await
    }

    /// Look up an active profile by its public affiliate code.
    pub async fn find_active_by_code(
        pool: &PgPool,
        code: &str,
    ) -> Result<Option<AffiliateProfile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_profiles WHERE code = $1 AND is_active = true"
        );
        sqlx::query_as::<_, AffiliateProfile>(&query)
            .bind(code)
            .fetch_optional(pool)
            .await
    }

    /// List profiles. With `team_of = Some(manager)` only that manager and
    /// their agents are returned.
    pub async fn list(
        pool: &PgPool,
        team_of: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AffiliateProfile>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_profiles
             WHERE ($1::BIGINT IS NULL OR id = $1 OR manager_profile_id = $1)
             ORDER BY profile_type, display_name
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AffiliateProfile>(&query)
            .bind(team_of)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update a profile. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAffiliateProfile,
    ) -> Result<Option<AffiliateProfile>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_profiles SET
                display_name = COALESCE($2, display_name),
                phone = COALESCE($3, phone),
                commission_rate_bps = COALESCE($4, commission_rate_bps),
                override_rate_bps = COALESCE($5, override_rate_bps),
                is_active = COALESCE($6, is_active)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AffiliateProfile>(&query)
            .bind(id)
            .bind(&input.display_name)
            .bind(&input.phone)
            .bind(input.commission_rate_bps)
            .bind(input.override_rate_bps)
            .bind(input.is_active)
            .fetch_optional(pool)
            .await
    }
}
