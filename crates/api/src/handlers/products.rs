//! Handlers for the cruise catalog (`/products`, `/admin/products`).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveDate;
use cruisemall_core::error::CoreError;
use cruisemall_core::types::{ensure_amount, Bps, DbId, BPS_DENOMINATOR};
use cruisemall_db::models::cruise_product::{
    CreateCruiseProduct, CruiseProduct, ProductFilter, UpdateCruiseProduct,
};
use cruisemall_db::repositories::CruiseProductRepo;
use serde::Deserialize;

use crate::error::{not_found, AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::{IncludeInactiveParams, PaginationParams};
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ProductListParams {
    pub q: Option<String>,
    pub cruise_line: Option<String>,
    pub departure_from: Option<NaiveDate>,
    pub departure_to: Option<NaiveDate>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ProductListParams {
    fn filter(&self, include_inactive: bool) -> ProductFilter {
        ProductFilter {
            q: self.q.clone().filter(|q| !q.trim().is_empty()),
            cruise_line: self.cruise_line.clone().filter(|c| !c.trim().is_empty()),
            departure_from: self.departure_from,
            departure_to: self.departure_to,
            include_inactive,
        }
    }

    fn page(&self) -> (i64, i64) {
        PaginationParams {
            limit: self.limit,
            offset: self.offset,
        }
        .resolve()
    }
}

/// GET /api/v1/products
pub async fn list(
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
) -> AppResult<Json<DataResponse<Vec<CruiseProduct>>>> {
    let (limit, offset) = params.page();
    let products =
        CruiseProductRepo::list(&state.pool, &params.filter(false), limit, offset).await?;
    Ok(Json(DataResponse { data: products }))
}

/// GET /api/v1/products/{id}
///
/// Deactivated products are hidden from the public catalog.
pub async fn get_by_id(
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<Json<DataResponse<CruiseProduct>>> {
    let product = CruiseProductRepo::find_by_id(&state.pool, id)
        .await?
        .filter(|p| p.is_active)
        .ok_or_else(|| not_found("CruiseProduct", id))?;
    Ok(Json(DataResponse { data: product }))
}

/// GET /api/v1/admin/products
pub async fn admin_list(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Query(params): Query<ProductListParams>,
    Query(inactive): Query<IncludeInactiveParams>,
) -> AppResult<Json<DataResponse<Vec<CruiseProduct>>>> {
    let (limit, offset) = params.page();
    let filter = params.filter(inactive.include_inactive);
    let products = CruiseProductRepo::list(&state.pool, &filter, limit, offset).await?;
    Ok(Json(DataResponse { data: products }))
}

fn validate_prices(
    price: Option<i64>,
    cost: Option<i64>,
    port_charge: Option<i64>,
    nights: Option<i32>,
) -> AppResult<()> {
    for (field, value) in [("price", price), ("cost_price", cost), ("port_charge", port_charge)] {
        if let Some(value) = value {
            ensure_amount(value, field)?;
        }
    }
    if nights.is_some_and(|n| n < 1) {
        return Err(AppError::Core(CoreError::Validation(
            "nights must be at least 1".into(),
        )));
    }
    Ok(())
}

fn validate_supplement(bps: Option<Bps>) -> AppResult<()> {
    match bps {
        Some(v) if !(0..=BPS_DENOMINATOR).contains(&v) => Err(AppError::Core(
            CoreError::Validation(format!(
                "single_supplement_bps must be between 0 and {BPS_DENOMINATOR}"
            )),
        )),
        _ => Ok(()),
    }
}

/// POST /api/v1/admin/products
pub async fn create(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Json(input): Json<CreateCruiseProduct>,
) -> AppResult<(StatusCode, Json<DataResponse<CruiseProduct>>)> {
    validate_prices(
        Some(input.price),
        input.cost_price,
        input.port_charge,
        Some(input.nights),
    )?;
    validate_supplement(input.single_supplement_bps)?;

    let product = CruiseProductRepo::create(&state.pool, &input).await?;
    tracing::info!(product_id = product.id, user_id = admin.user_id, code = %product.code, "Product created");
    Ok((StatusCode::CREATED, Json(DataResponse { data: product })))
}

/// PUT /api/v1/admin/products/{id}
pub async fn update(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
    Json(input): Json<UpdateCruiseProduct>,
) -> AppResult<Json<DataResponse<CruiseProduct>>> {
    validate_prices(input.price, input.cost_price, input.port_charge, input.nights)?;
    validate_supplement(input.single_supplement_bps)?;

    let product = CruiseProductRepo::update(&state.pool, id, &input)
        .await?
        .ok_or_else(|| not_found("CruiseProduct", id))?;
    Ok(Json(DataResponse { data: product }))
}

/// DELETE /api/v1/admin/products/{id}
///
/// Deactivates; orders keep referencing the product.
pub async fn deactivate(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path(id): Path<DbId>,
) -> AppResult<StatusCode> {
    if CruiseProductRepo::deactivate(&state.pool, id).await? {
        tracing::info!(product_id = id, user_id = admin.user_id, "Product deactivated");
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(not_found("CruiseProduct", id))
    }
}
