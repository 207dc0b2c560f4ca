//! Handlers for the `/orders` resource.

use axum::extract::{Path, Query, State};
use axum::Json;
use cruisemall_core::error::CoreError;
use cruisemall_core::ownership::LeadOwnership;
use cruisemall_core::types::DbId;
use cruisemall_db::models::affiliate_sale::AffiliateSale;
use cruisemall_db::models::order::{
    Order, ORDER_STATUS_CANCELLED, ORDER_STATUS_PAID, ORDER_STATUS_PENDING,
};
use cruisemall_db::models::payment::Payment;
use cruisemall_db::repositories::{AffiliateLeadRepo, AffiliateSaleRepo, OrderRepo, PaymentRepo};
use cruisemall_events::bus::event_types;
use cruisemall_events::PlatformEvent;
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::PgPool;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OrderListParams {
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct OrderDetail {
    #[serde(flatten)]
    pub order: Order,
    pub payments: Vec<Payment>,
    pub sale: Option<AffiliateSale>,
}

/// GET /api/v1/orders
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Query(params): Query<OrderListParams>,
) -> AppResult<Json<DataResponse<Vec<Order>>>> {
    let status = params.status.as_deref().filter(|s| !s.is_empty());
    if let Some(status) = status {
        if ![ORDER_STATUS_PENDING, ORDER_STATUS_PAID, ORDER_STATUS_CANCELLED].contains(&status) {
            return Err(AppError::Core(CoreError::Validation(format!(
                "Unknown order status '{status}'"
            ))));
        }
    }
    let (limit, offset) = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    }
    .resolve();
    let orders = OrderRepo::list(&state.pool, viewer.lead_scope(), status, limit, offset).await?;
    Ok(Json(DataResponse { data: orders }))
}

/// GET /api/v1/orders/{id}
pub async fn get_by_id(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<OrderDetail>>> {
    let order = load_accessible(&state.pool, &viewer, id).await?;
    let payments = PaymentRepo::list_for_order(&state.pool, id).await?;
    let sale = AffiliateSaleRepo::find_by_order_id(&state.pool, id).await?;
    Ok(Json(DataResponse {
        data: OrderDetail {
            order,
            payments,
            sale,
        },
    }))
}

/// POST /api/v1/orders/{id}/cancel
///
/// Cancels the order and voids its affiliate sale.
pub async fn cancel(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<Order>>> {
    let existing = OrderRepo::find_by_id(&state.pool, id)
        .await?
        .ok_or_else(|| not_found("Order", id))?;

    let order = OrderRepo::cancel(&state.pool, id).await?.ok_or_else(|| {
        AppError::Core(CoreError::Conflict(format!(
            "Order {} is already cancelled",
            existing.order_number
        )))
    })?;

    tracing::info!(order_id = id, user_id = admin.user_id, "Order cancelled");
    state.event_bus.publish(
        PlatformEvent::new(event_types::ORDER_CANCELLED)
            .with_source("order", id)
            .with_actor(admin.user_id)
            .with_payload(json!({
                "order_number": order.order_number,
                "previous_status": existing.status,
            })),
    );

    Ok(Json(DataResponse { data: order }))
}

/// Load an order the viewer may see. Affiliates reach orders through the
/// lead they own; orders without a lead are visible to admins only.
pub(crate) async fn load_accessible(
    pool: &PgPool,
    viewer: &AffiliateViewer,
    id: DbId,
) -> AppResult<Order> {
    let order = OrderRepo::find_by_id(pool, id)
        .await?
        .ok_or_else(|| not_found("Order", id))?;
    if viewer.is_admin() {
        return Ok(order);
    }

    let ownership = match order.lead_id {
        Some(lead_id) => AffiliateLeadRepo::find_by_id(pool, lead_id)
            .await?
            .map(|lead| lead.ownership())
            .unwrap_or_default(),
        None => LeadOwnership::default(),
    };
    if viewer.viewer.can_access(ownership) {
        Ok(order)
    } else {
        Err(AppError::Core(CoreError::Forbidden(
            "This order belongs to another affiliate's customer".into(),
        )))
    }
}
