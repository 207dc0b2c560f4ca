//! Repository for the `affiliate_sales` table.

use cruisemall_core::types::{DbId, Timestamp};
use sqlx::PgPool;

use crate::models::affiliate_sale::{AffiliateSale, CommissionLine, SALE_STATUS_CONFIRMED};

const COLUMNS: &str = "id, order_id, lead_id, agent_profile_id, manager_profile_id, sale_amount, \
                        agent_commission, agent_withholding, manager_commission, \
                        manager_withholding, status, sold_at, cancelled_at, created_at, updated_at";

/// Read access to recorded sales and commission lines.
pub struct AffiliateSaleRepo;

impl AffiliateSaleRepo {
    pub async fn find_by_order_id(
        pool: &PgPool,
        order_id: DbId,
    ) -> Result<Option<AffiliateSale>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM affiliate_sales WHERE order_id = $1");
        sqlx::query_as::<_, AffiliateSale>(&query)
            .bind(order_id)
            .fetch_optional(pool)
            .await
    }

    /// Sales in which `profile_id` earned a share (as agent or manager).
    /// `None` lists every sale.
    pub async fn list(
        pool: &PgPool,
        profile_id: Option<DbId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<AffiliateSale>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM affiliate_sales
             WHERE ($1::BIGINT IS NULL OR agent_profile_id = $1 OR manager_profile_id = $1)
             ORDER BY sold_at DESC, id DESC
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, AffiliateSale>(&query)
            .bind(profile_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Every confirmed payout line in `[from, to)`, one per recipient share.
    /// `profile_id = None` returns lines for every recipient.
    pub async fn commission_lines(
        pool: &PgPool,
        profile_id: Option<DbId>,
        from: Timestamp,
        to: Timestamp,
    ) -> Result<Vec<CommissionLine>, sqlx::Error> {
        sqlx::query_as::<_, CommissionLine>(
            "SELECT agent_profile_id AS profile_id, sale_amount, agent_commission AS commission
             FROM affiliate_sales
             WHERE status = $4 AND agent_profile_id IS NOT NULL
               AND ($1::BIGINT IS NULL OR agent_profile_id = $1)
               AND sold_at >= $2 AND sold_at < $3
             UNION ALL
             SELECT manager_profile_id AS profile_id, sale_amount, manager_commission AS commission
             FROM affiliate_sales
             WHERE status = $4 AND manager_profile_id IS NOT NULL
               AND ($1::BIGINT IS NULL OR manager_profile_id = $1)
               AND sold_at >= $2 AND sold_at < $3
             ORDER BY profile_id",
        )
        .bind(profile_id)
        .bind(from)
        .bind(to)
        .bind(SALE_STATUS_CONFIRMED)
        .fetch_all(pool)
        .await
    }
}
