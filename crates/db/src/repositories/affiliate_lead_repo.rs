//! Repository for the `affiliate_leads` table.

use cruisemall_core::ownership::LeadOwnership;
use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::affiliate_lead::{
    AffiliateLead, CreateAffiliateLead, LeadFilter, LeadScope, UpdateAffiliateLead,
};

/// Column list shared across queries to avoid repetition.
const COLUMNS: &str = "id, customer_name, phone, normalized_phone, email, manager_id, agent_id, \
                        group_id, group_assigned_at, status, source, landing_page_id, notes, \
                        metadata, created_at, updated_at";

/// Provides CRUD, ownership, and group-membership operations for leads.
pub struct AffiliateLeadRepo;

impl AffiliateLeadRepo {
    /// Insert a new lead. Fails with `uq_affiliate_leads_normalized_phone`
    /// when the phone is already owned by another lead.
    pub async fn create(
        pool: &PgPool,
        input: &CreateAffiliateLead,
    ) -> Result<AffiliateLead, sqlx::Error> {
        let query = format!(
            "INSERT INTO affiliate_leads
                (customer_name, phone, normalized_phone, email, manager_id, agent_id,
                 group_id, group_assigned_at, status, source, landing_page_id, notes, metadata)
             VALUES ($1, $2, $3, $4, $5, $6,
                     $7, CASE WHEN $7::BIGINT IS NULL THEN NULL ELSE NOW() END,
                     COALESCE($8, 'NEW'), $9, $10, $11, COALESCE($12, '{{}}'::jsonb))
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(&input.customer_name)
            .bind(&input.phone)
            .bind(&input.normalized_phone)
            .bind(&input.email)
            .bind(input.ownership.manager_id)
            .bind(input.ownership.agent_id)
            .bind(input.group_id)
            .bind(&input.status)
            .bind(&input.source)
            .bind(input.landing_page_id)
            .bind(&input.notes)
            .bind(&input.metadata)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<AffiliateLead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM affiliate_leads WHERE id = $1");
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Find the lead that owns a normalized phone number.
    pub async fn find_by_normalized_phone(
        pool: &PgPool,
        normalized_phone: &str,
    ) -> Result<Option<AffiliateLead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM affiliate_leads WHERE normalized_phone = $1");
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(normalized_phone)
            .fetch_optional(pool)
            .await
    }

    /// List leads within an ownership scope, newest first.
    pub async fn list(
        pool: &PgPool,
        scope: LeadScope,
        filter: &LeadFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AffiliateLead>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_leads
             WHERE ($1::BIGINT IS NULL OR manager_id = $1)
               AND ($2::BIGINT IS NULL OR agent_id = $2)
               AND ($3::TEXT IS NULL OR status = $3)
               AND ($4::BIGINT IS NULL OR group_id = $4)
               AND ($5::TEXT IS NULL
                    OR customer_name ILIKE '%' || $5 || '%'
                    OR normalized_phone LIKE '%' || $5 || '%')
             ORDER BY created_at DESC, id DESC
             LIMIT $6 OFFSET $7"
        );
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(scope.manager_id)
            .bind(scope.agent_id)
            .bind(&filter.status)
            .bind(filter.group_id)
            .bind(&filter.q)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Update a lead. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateAffiliateLead,
    ) -> Result<Option<AffiliateLead>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_leads SET
                customer_name = COALESCE($2, customer_name),
                email = COALESCE($3, email),
                status = COALESCE($4, status),
                notes = COALESCE($5, notes),
                metadata = COALESCE($6, metadata)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(id)
            .bind(&input.customer_name)
            .bind(&input.email)
            .bind(&input.status)
            .bind(&input.notes)
            .bind(&input.metadata)
            .fetch_optional(pool)
            .await
    }

    /// Overwrite a lead's ownership. Used for explicit assignment.
    pub async fn set_ownership(
        pool: &PgPool,
        id: DbId,
        ownership: LeadOwnership,
    ) -> Result<Option<AffiliateLead>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_leads SET manager_id = $2, agent_id = $3
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(id)
            .bind(ownership.manager_id)
            .bind(ownership.agent_id)
            .fetch_optional(pool)
            .await
    }

    /// Claim an unowned lead. Returns `None` when the lead is missing or
    /// already has an owner, so concurrent first touches cannot overwrite
    /// each other.
    pub async fn claim_ownership(
        pool: &PgPool,
        id: DbId,
        ownership: LeadOwnership,
    ) -> Result<Option<AffiliateLead>, sqlx::Error> {
        let query = format!(
            "UPDATE affiliate_leads SET manager_id = $2, agent_id = $3
             WHERE id = $1 AND manager_id IS NULL AND agent_id IS NULL
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(id)
            .bind(ownership.manager_id)
            .bind(ownership.agent_id)
            .fetch_optional(pool)
            .await
    }

    /// Hard-delete a lead. Returns `true` if a row was removed.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM affiliate_leads WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    // -----------------------------------------------------------------------
    // Group membership
    // -----------------------------------------------------------------------

    /// Move leads into a group. Leads already in the group keep their
    /// original `group_assigned_at` so funnel timing is not restarted.
    ///
    /// Returns the number of leads that changed group.
    pub async fn add_to_group(
        pool: &PgPool,
        group_id: DbId,
        lead_ids: &[DbId],
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE affiliate_leads SET group_id = $1, group_assigned_at = NOW()
             WHERE id = ANY($2) AND group_id IS DISTINCT FROM $1",
        )
        .bind(group_id)
        .bind(lead_ids)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Remove one lead from a group. Returns `true` if it was a member.
    pub async fn remove_from_group(
        pool: &PgPool,
        group_id: DbId,
        lead_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE affiliate_leads SET group_id = NULL, group_assigned_at = NULL
             WHERE id = $1 AND group_id = $2",
        )
        .bind(lead_id)
        .bind(group_id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Fetch several leads by id (missing ids are skipped).
    pub async fn find_many(pool: &PgPool, ids: &[DbId]) -> Result<Vec<AffiliateLead>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM affiliate_leads WHERE id = ANY($1) ORDER BY id");
        sqlx::query_as::<_, AffiliateLead>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }
}
