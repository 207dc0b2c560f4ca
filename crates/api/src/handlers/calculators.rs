//! Back-office calculators: tax and product margin.

use axum::extract::State;
use axum::Json;
use cruisemall_core::margin::{calculate_margin, price_for_target_margin, MarginBreakdown, MarginInput};
use cruisemall_core::tax::{income_tax, vat_from_inclusive, vat_on_supply, withholding};
use cruisemall_core::types::{Bps, Won};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMode {
    /// 3.3% business-income withholding on a gross payout.
    Withholding,
    /// Progressive income tax on taxable income.
    Income,
    /// VAT split of an amount.
    Vat,
}

#[derive(Debug, Deserialize)]
pub struct TaxRequest {
    pub mode: TaxMode,
    pub amount: Won,
    /// VAT mode only: whether `amount` already includes VAT.
    #[serde(default = "default_true")]
    pub vat_inclusive: bool,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize)]
pub struct MarginRequest {
    pub sale_price: Won,
    pub cost_price: Won,
    #[serde(default)]
    pub commission: Won,
    /// Defaults to the configured card fee.
    pub card_fee_bps: Option<Bps>,
    #[serde(default = "default_true")]
    pub vat_inclusive: bool,
    /// When set, also return the lowest price reaching this margin.
    pub target_margin_bps: Option<Bps>,
}

#[derive(Debug, Serialize)]
pub struct MarginResponse {
    #[serde(flatten)]
    pub breakdown: MarginBreakdown,
    pub target_margin_bps: Option<Bps>,
    pub target_price: Option<Won>,
}

/// POST /api/v1/calculators/tax
pub async fn tax(
    _auth: AuthUser,
    Json(input): Json<TaxRequest>,
) -> AppResult<Json<DataResponse<serde_json::Value>>> {
    let result = match input.mode {
        TaxMode::Withholding => serde_json::to_value(withholding(input.amount)?),
        TaxMode::Income => serde_json::to_value(income_tax(input.amount)?),
        TaxMode::Vat if input.vat_inclusive => serde_json::to_value(vat_from_inclusive(input.amount)?),
        TaxMode::Vat => serde_json::to_value(vat_on_supply(input.amount)?),
    }
    .map_err(|e| AppError::InternalError(format!("Serialization error: {e}")))?;
    Ok(Json(DataResponse { data: result }))
}

/// POST /api/v1/calculators/margin
pub async fn margin(
    _auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<MarginRequest>,
) -> AppResult<Json<DataResponse<MarginResponse>>> {
    let card_fee_bps = input.card_fee_bps.unwrap_or(state.config.card_fee_bps);
    let breakdown = calculate_margin(MarginInput {
        sale_price: input.sale_price,
        cost_price: input.cost_price,
        commission: input.commission,
        card_fee_bps,
        vat_inclusive: input.vat_inclusive,
    })?;

    let target_price = input
        .target_margin_bps
        .map(|target| {
            price_for_target_margin(
                input.cost_price,
                input.commission,
                card_fee_bps,
                target,
                input.vat_inclusive,
            )
        })
        .transpose()?;

    Ok(Json(DataResponse {
        data: MarginResponse {
            breakdown,
            target_margin_bps: input.target_margin_bps,
            target_price,
        },
    }))
}
