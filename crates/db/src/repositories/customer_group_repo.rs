//! Repository for the `customer_groups` table.

use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::customer_group::{
    CreateCustomerGroup, CustomerGroup, CustomerGroupWithCount, UpdateCustomerGroup,
};

const COLUMNS: &str = "id, owner_profile_id, name, description, color, created_at, updated_at";

/// Provides CRUD operations for customer groups.
///
/// Membership lives on `affiliate_leads.group_id`; see
/// [`AffiliateLeadRepo`](super::AffiliateLeadRepo) for member operations.
pub struct CustomerGroupRepo;

impl CustomerGroupRepo {
    /// Create a group owned by `owner_profile_id` (`None` = headquarters).
    pub async fn create(
        pool: &PgPool,
        owner_profile_id: Option<DbId>,
        input: &CreateCustomerGroup,
    ) -> Result<CustomerGroup, sqlx::Error> {
        let query = format!(
            "INSERT INTO customer_groups (owner_profile_id, name, description, color)
             VALUES ($1, $2, $3, $4)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerGroup>(&query)
            .bind(owner_profile_id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.color)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(
        pool: &PgPool,
        id: DbId,
    ) -> Result<Option<CustomerGroup>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM customer_groups WHERE id = $1");
        sqlx::query_as::<_, CustomerGroup>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Groups owned by `owner_profile_id`, with member counts. `None` lists
    /// headquarters groups.
    pub async fn list_for_owner(
        pool: &PgPool,
        owner_profile_id: Option<DbId>,
    ) -> Result<Vec<CustomerGroupWithCount>, sqlx::Error> {
        sqlx::query_as::<_, CustomerGroupWithCount>(
            "SELECT g.id, g.owner_profile_id, g.name, g.description, g.color,
                    g.created_at, g.updated_at,
                    (SELECT COUNT(*) FROM affiliate_leads l WHERE l.group_id = g.id) AS member_count
             FROM customer_groups g
             WHERE g.owner_profile_id IS NOT DISTINCT FROM $1
             ORDER BY g.name",
        )
        .bind(owner_profile_id)
        .fetch_all(pool)
        .await
    }

    /// Update a group. Only non-`None` fields in `input` are applied.
    pub async fn update(
        pool: &PgPool,
        id: DbId,
        input: &UpdateCustomerGroup,
    ) -> Result<Option<CustomerGroup>, sqlx::Error> {
        let query = format!(
            "UPDATE customer_groups SET
                name = COALESCE($2, name),
                description = COALESCE($3, description),
                color = COALESCE($4, color)
             WHERE id = $1
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, CustomerGroup>(&query)
            .bind(id)
            .bind(&input.name)
            .bind(&input.description)
            .bind(&input.color)
            .fetch_optional(pool)
            .await
    }

    /// Delete a group. Members stay as leads with `group_id` and
    /// `group_assigned_at` cleared.
    ///
    /// Returns `None` if the group does not exist, otherwise the number of
    /// leads released from it.
    pub async fn delete(pool: &PgPool, id: DbId) -> Result<Option<u64>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let released = sqlx::query(
            "UPDATE affiliate_leads SET group_id = NULL, group_assigned_at = NULL
             WHERE group_id = $1",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        let deleted = sqlx::query("DELETE FROM customer_groups WHERE id = $1")
            .bind(id)
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if deleted == 0 {
            tx.rollback().await?;
            return Ok(None);
        }

        tx.commit().await?;
        Ok(Some(released))
    }
}
