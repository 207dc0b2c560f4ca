//! Repository for the `payments` table and payment confirmation.

use cruisemall_core::types::DbId;
use sqlx::PgPool;

use crate::models::affiliate_sale::CreateAffiliateSale;
use crate::models::payment::{CreatePayment, Payment, PAYMENT_STATUS_COMPLETED};

const COLUMNS: &str = "id, order_id, provider, provider_tx_id, method, amount, status, \
                        raw_payload, paid_at, created_at, updated_at";

/// Outcome of [`PaymentRepo::confirm`].
#[derive(Debug)]
pub enum PaymentConfirmation {
    /// Payment recorded and the order marked paid.
    Recorded(Payment),
    /// The provider transaction was already recorded; nothing changed.
    Duplicate(Payment),
    /// The order was no longer pending; nothing changed.
    OrderNotPending,
}

/// Provides payment recording.
pub struct PaymentRepo;

impl PaymentRepo {
    pub async fn find_by_provider_tx_id(
        pool: &PgPool,
        provider_tx_id: &str,
    ) -> Result<Option<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE provider_tx_id = $1");
        sqlx::query_as::<_, Payment>(&query)
            .bind(provider_tx_id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_order(pool: &PgPool, order_id: DbId) -> Result<Vec<Payment>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM payments WHERE order_id = $1 ORDER BY id");
        sqlx::query_as::<_, Payment>(&query)
            .bind(order_id)
            .fetch_all(pool)
            .await
    }

    /// Record a completed payment in one transaction:
    ///
    /// 1. insert the payment (idempotent on `provider_tx_id`),
    /// 2. move the order from `PENDING` to `PAID`,
    /// 3. mark the order's lead `PURCHASED`,
    /// 4. record the affiliate sale, when there is one.
    pub async fn confirm(
        pool: &PgPool,
        payment: &CreatePayment,
        lead_id: Option<DbId>,
        sale: Option<&CreateAffiliateSale>,
    ) -> Result<PaymentConfirmation, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let insert = format!(
            "INSERT INTO payments (order_id, provider, provider_tx_id, method, amount, status, raw_payload)
             VALUES ($1, $2, $3, $4, $5, $6, $7)
             ON CONFLICT (provider_tx_id) DO NOTHING
             RETURNING {COLUMNS}"
        );
        let inserted = sqlx::query_as::<_, Payment>(&insert)
            .bind(payment.order_id)
            .bind(&payment.provider)
            .bind(&payment.provider_tx_id)
            .bind(&payment.method)
            .bind(payment.amount)
            .bind(PAYMENT_STATUS_COMPLETED)
            .bind(&payment.raw_payload)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(recorded) = inserted else {
            tx.rollback().await?;
            let existing = Self::find_by_provider_tx_id(pool, &payment.provider_tx_id)
                .await?
                .ok_or(sqlx::Error::RowNotFound)?;
            return Ok(PaymentConfirmation::Duplicate(existing));
        };

        let paid = sqlx::query(
            "UPDATE orders SET status = 'PAID', paid_at = NOW()
             WHERE id = $1 AND status = 'PENDING'",
        )
        .bind(payment.order_id)
        .execute(&mut *tx)
        .await?
        .rows_affected();

        if paid == 0 {
            tx.rollback().await?;
            return Ok(PaymentConfirmation::OrderNotPending);
        }

        if let Some(lead_id) = lead_id {
            sqlx::query("UPDATE affiliate_leads SET status = 'PURCHASED' WHERE id = $1")
                .bind(lead_id)
                .execute(&mut *tx)
                .await?;
        }

        if let Some(sale) = sale {
            sqlx::query(
                "INSERT INTO affiliate_sales
                    (order_id, lead_id, agent_profile_id, manager_profile_id, sale_amount,
                     agent_commission, agent_withholding, manager_commission, manager_withholding)
                 VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                 ON CONFLICT (order_id) DO NOTHING",
            )
            .bind(sale.order_id)
            .bind(sale.lead_id)
            .bind(sale.agent_profile_id)
            .bind(sale.manager_profile_id)
            .bind(sale.sale_amount)
            .bind(sale.agent_commission)
            .bind(sale.agent_withholding)
            .bind(sale.manager_commission)
            .bind(sale.manager_withholding)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(PaymentConfirmation::Recorded(recorded))
    }
}
