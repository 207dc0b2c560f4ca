//! Payment gateway webhook (`POST /payments/confirm`).
//!
//! The gateway signs the raw request body with HMAC-SHA256 and sends the hex
//! digest in `x-payment-signature`. Confirmation is idempotent on the
//! provider transaction id, so gateway retries are harmless.

use axum::body::Bytes;
use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use cruisemall_core::commission::{split_commission, CommissionRates, CommissionSplit};
use cruisemall_core::error::CoreError;
use cruisemall_core::ownership::LeadOwner;
use cruisemall_core::tokens::verify_signature;
use cruisemall_core::types::{DbId, Won};
use cruisemall_db::models::affiliate_sale::CreateAffiliateSale;
use cruisemall_db::models::order::{Order, ORDER_STATUS_PENDING};
use cruisemall_db::models::payment::{CreatePayment, Payment};
use cruisemall_db::repositories::{
    AffiliateLeadRepo, AffiliateProfileRepo, OrderRepo, PaymentConfirmation, PaymentRepo,
};
use cruisemall_events::bus::event_types;
use cruisemall_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use crate::error::{not_found, AppError, AppResult};
use crate::response::DataResponse;
use crate::state::AppState;

pub const SIGNATURE_HEADER: &str = "x-payment-signature";

#[derive(Debug, Deserialize)]
pub struct PaymentNotification {
    pub order_id: DbId,
    pub provider: String,
    pub provider_tx_id: String,
    pub method: Option<String>,
    pub amount: Won,
}

#[derive(Debug, Serialize)]
pub struct PaymentConfirmed {
    pub payment: Payment,
    /// `true` when this transaction had already been recorded.
    pub duplicate: bool,
    pub commission: Option<CommissionSplit>,
}

/// POST /api/v1/payments/confirm
pub async fn confirm(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> AppResult<Json<DataResponse<PaymentConfirmed>>> {
    verify_webhook(&state, &headers, &body)?;

    let raw_payload: serde_json::Value = serde_json::from_slice(&body)
        .map_err(|e| AppError::BadRequest(format!("Invalid JSON body: {e}")))?;
    let notification: PaymentNotification = serde_json::from_value(raw_payload.clone())
        .map_err(|e| AppError::BadRequest(format!("Invalid payment notification: {e}")))?;

    if notification.provider_tx_id.trim().is_empty() {
        return Err(AppError::Core(CoreError::Validation(
            "provider_tx_id must not be empty".into(),
        )));
    }

    if let Some(existing) =
        PaymentRepo::find_by_provider_tx_id(&state.pool, &notification.provider_tx_id).await?
    {
        tracing::info!(
            provider_tx_id = %existing.provider_tx_id,
            order_id = existing.order_id,
            "Duplicate payment notification",
        );
        return Ok(Json(DataResponse {
            data: PaymentConfirmed {
                payment: existing,
                duplicate: true,
                commission: None,
            },
        }));
    }

    let order = OrderRepo::find_by_id(&state.pool, notification.order_id)
        .await?
        .ok_or_else(|| not_found("Order", notification.order_id))?;
    if order.status != ORDER_STATUS_PENDING {
        return Err(order_not_pending(&order));
    }
    if notification.amount != order.total_amount {
        tracing::warn!(
            order_id = order.id,
            expected = order.total_amount,
            received = notification.amount,
            "Payment amount mismatch",
        );
        return Err(AppError::Core(CoreError::Validation(format!(
            "Payment amount {} does not match order total {}",
            notification.amount, order.total_amount
        ))));
    }

    let commission = commission_for(&state.pool, &order).await?;
    let sale = commission.map(|split| sale_record(&order, split));

    let confirmation = PaymentRepo::confirm(
        &state.pool,
        &CreatePayment {
            order_id: order.id,
            provider: notification.provider,
            provider_tx_id: notification.provider_tx_id,
            method: notification.method,
            amount: notification.amount,
            raw_payload,
        },
        order.lead_id,
        sale.as_ref(),
    )
    .await?;

    let payment = match confirmation {
        PaymentConfirmation::Recorded(payment) => payment,
        PaymentConfirmation::Duplicate(payment) => {
            return Ok(Json(DataResponse {
                data: PaymentConfirmed {
                    payment,
                    duplicate: true,
                    commission: None,
                },
            }));
        }
        PaymentConfirmation::OrderNotPending => return Err(order_not_pending(&order)),
    };

    tracing::info!(
        order_id = order.id,
        payment_id = payment.id,
        amount = payment.amount,
        "Payment confirmed",
    );
    state.event_bus.publish(
        PlatformEvent::new(event_types::ORDER_PAID)
            .with_source("order", order.id)
            .with_payload(json!({
                "order_number": order.order_number,
                "amount": payment.amount,
                "provider": payment.provider,
            })),
    );
    if let Some(split) = commission.filter(|s| s.agent.is_some() || s.manager.is_some()) {
        state.event_bus.publish(
            PlatformEvent::new(event_types::SALE_RECORDED)
                .with_source("order", order.id)
                .with_payload(json!({
                    "agent_profile_id": split.agent.map(|s| s.profile_id),
                    "manager_profile_id": split.manager.map(|s| s.profile_id),
                    "commission": split.total_gross(),
                })),
        );
    }

    Ok(Json(DataResponse {
        data: PaymentConfirmed {
            payment,
            duplicate: false,
            commission,
        },
    }))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn verify_webhook(state: &AppState, headers: &HeaderMap, body: &[u8]) -> AppResult<()> {
    let secret = state.config.payment_webhook_secret.as_deref().ok_or_else(|| {
        AppError::Core(CoreError::Forbidden(
            "Payment webhook is not configured".into(),
        ))
    })?;
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| {
            AppError::Core(CoreError::Unauthorized(format!(
                "Missing {SIGNATURE_HEADER} header"
            )))
        })?;

    if verify_signature(secret, body, signature.trim()) {
        Ok(())
    } else {
        tracing::warn!("Rejected payment webhook with a bad signature");
        Err(AppError::Core(CoreError::Unauthorized(
            "Invalid payment signature".into(),
        )))
    }
}

fn order_not_pending(order: &Order) -> AppError {
    AppError::Core(CoreError::Conflict(format!(
        "Order {} is {}, not PENDING",
        order.order_number, order.status
    )))
}

/// Commission split for an order, from the rates on the profiles that own
/// its lead. `None` for orders without a lead.
async fn commission_for(pool: &PgPool, order: &Order) -> AppResult<Option<CommissionSplit>> {
    let Some(lead_id) = order.lead_id else {
        return Ok(None);
    };
    let Some(lead) = AffiliateLeadRepo::find_by_id(pool, lead_id).await? else {
        return Ok(None);
    };

    let owner = lead.ownership().owner();
    let mut rates = CommissionRates::default();
    match owner {
        LeadOwner::Agent {
            agent_id,
            manager_id,
        } => {
            if let Some(agent) = AffiliateProfileRepo::find_by_id(pool, agent_id).await? {
                rates.agent_rate_bps = agent.commission_rate_bps;
            }
            if let Some(manager_id) = manager_id {
                if let Some(manager) = AffiliateProfileRepo::find_by_id(pool, manager_id).await? {
                    rates.manager_override_bps = manager.override_rate_bps;
                }
            }
        }
        LeadOwner::Manager { manager_id } => {
            if let Some(manager) = AffiliateProfileRepo::find_by_id(pool, manager_id).await? {
                rates.manager_rate_bps = manager.commission_rate_bps;
            }
        }
        LeadOwner::Headquarters => {}
    }

    Ok(Some(split_commission(order.total_amount, owner, rates)?))
}

fn sale_record(order: &Order, split: CommissionSplit) -> CreateAffiliateSale {
    CreateAffiliateSale {
        order_id: order.id,
        lead_id: order.lead_id,
        agent_profile_id: split.agent.map(|s| s.profile_id),
        manager_profile_id: split.manager.map(|s| s.profile_id),
        sale_amount: split.sale_amount,
        agent_commission: split.agent.map_or(0, |s| s.gross()),
        agent_withholding: split.agent.map_or(0, |s| s.withholding.total),
        manager_commission: split.manager.map_or(0, |s| s.gross()),
        manager_withholding: split.manager.map_or(0, |s| s.withholding.total),
    }
}
