//! Repository for the `orders` table.

use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::affiliate_lead::LeadScope;
use crate::models::affiliate_sale::SALE_STATUS_CANCELLED;
use crate::models::order::{CreateOrder, Order, ORDER_STATUS_CANCELLED};

const COLUMNS: &str = "id, order_number, product_id, lead_id, user_id, buyer_name, buyer_phone, \
                        buyer_email, guests, subtotal, discount, total_amount, vat, status, \
                        paid_at, cancelled_at, created_at, updated_at";

/// Same columns qualified with the `o` alias for joins.
const O_COLUMNS: &str = "o.id, o.order_number, o.product_id, o.lead_id, o.user_id, o.buyer_name, \
                          o.buyer_phone, o.buyer_email, o.guests, o.subtotal, o.discount, \
                          o.total_amount, o.vat, o.status, o.paid_at, o.cancelled_at, \
                          o.created_at, o.updated_at";

/// Provides CRUD operations for orders.
pub struct OrderRepo;

impl OrderRepo {
    /// Insert a `PENDING` order.
    pub async fn create(pool: &PgPool, input: &CreateOrder) -> Result<Order, sqlx::Error> {
        let query = format!(
            "INSERT INTO orders
                (order_number, product_id, lead_id, user_id, buyer_name, buyer_phone,
                 buyer_email, guests, subtotal, discount, total_amount, vat)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
             RETURNING {COLUMNS}"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(&input.order_number)
            .bind(input.product_id)
            .bind(input.lead_id)
            .bind(input.user_id)
            .bind(&input.buyer_name)
            .bind(&input.buyer_phone)
            .bind(&input.buyer_email)
            .bind(input.guests)
            .bind(input.subtotal)
            .bind(input.discount)
            .bind(input.total_amount)
            .bind(input.vat)
            .fetch_one(pool)
            .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM orders WHERE id = $1");
        sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List orders whose lead falls within `scope`, newest first. An
    /// unrestricted scope also includes orders without a lead.
    pub async fn list(
        pool: &PgPool,
        scope: LeadScope,
        status: Option<&str>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<Order>, sqlx::Error> {
        let query = format!(
            "SELECT {O_COLUMNS} FROM orders o
             LEFT JOIN affiliate_leads l ON l.id = o.lead_id
             WHERE ($1::BIGINT IS NULL OR l.manager_id = $1)
               AND ($2::BIGINT IS NULL OR l.agent_id = $2)
               AND ($3::TEXT IS NULL OR o.status = $3)
             ORDER BY o.created_at DESC, o.id DESC
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, Order>(&query)
            .bind(scope.manager_id)
            .bind(scope.agent_id)
            .bind(status)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Cancel an order and its affiliate sale in one transaction.
    ///
    /// Returns `None` if the order does not exist or is already cancelled.
    pub async fn cancel(pool: &PgPool, id: DbId) -> Result<Option<Order>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "UPDATE orders SET status = $2, cancelled_at = NOW()
             WHERE id = $1 AND status <> $2
             RETURNING {COLUMNS}"
        );
        let order = sqlx::query_as::<_, Order>(&query)
            .bind(id)
            .bind(ORDER_STATUS_CANCELLED)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(order) = order else {
            tx.rollback().await?;
            return Ok(None);
        };

        sqlx::query(
            "UPDATE affiliate_sales SET status = $2, cancelled_at = NOW()
             WHERE order_id = $1 AND status <> $2",
        )
        .bind(id)
        .bind(SALE_STATUS_CANCELLED)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Some(order))
    }
}
