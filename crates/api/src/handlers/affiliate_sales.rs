//! Handlers for affiliate sales and commission reports.

use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::Json;
use chrono::{Datelike, Months, NaiveDate, NaiveTime, Utc};
use cruisemall_core::commission::{summarize, CommissionSummary};
use cruisemall_core::error::CoreError;
use cruisemall_core::schedule::{kst_date, scheduled_at};
use cruisemall_core::types::{DbId, Won};
use cruisemall_db::models::affiliate_sale::AffiliateSale;
use cruisemall_db::repositories::AffiliateSaleRepo;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, AppResult};
use crate::middleware::affiliate::AffiliateViewer;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// `?from=&to=`, inclusive KST dates. Defaults to the current month.
#[derive(Debug, Deserialize)]
pub struct SummaryParams {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

#[derive(Debug, Serialize)]
pub struct ProfileCommission {
    pub profile_id: DbId,
    #[serde(flatten)]
    pub summary: CommissionSummary,
}

#[derive(Debug, Serialize)]
pub struct CommissionReport {
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub profiles: Vec<ProfileCommission>,
}

/// GET /api/v1/affiliate/sales
pub async fn list(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Query(page): Query<PaginationParams>,
) -> AppResult<Json<DataResponse<Vec<AffiliateSale>>>> {
    let (limit, offset) = page.resolve();
    let sales =
        AffiliateSaleRepo::list(&state.pool, viewer.owner_profile_id(), limit, offset).await?;
    Ok(Json(DataResponse { data: sales }))
}

/// GET /api/v1/affiliate/sales/summary?from=&to=
///
/// Commission totals per recipient. Affiliates get their own line only.
pub async fn summary(
    viewer: AffiliateViewer,
    State(state): State<AppState>,
    Query(params): Query<SummaryParams>,
) -> AppResult<Json<DataResponse<CommissionReport>>> {
    let (from, to) = resolve_period(params, kst_date(Utc::now()))?;
    let start = scheduled_at(from, 0, NaiveTime::MIN);
    let end = scheduled_at(to, 1, NaiveTime::MIN);

    let lines =
        AffiliateSaleRepo::commission_lines(&state.pool, viewer.owner_profile_id(), start, end)
            .await?;

    let mut by_profile: BTreeMap<DbId, Vec<(Won, Won)>> = BTreeMap::new();
    for line in lines {
        by_profile
            .entry(line.profile_id)
            .or_default()
            .push((line.sale_amount, line.commission));
    }

    let mut profiles = Vec::with_capacity(by_profile.len());
    for (profile_id, payouts) in by_profile {
        profiles.push(ProfileCommission {
            profile_id,
            summary: summarize(payouts)?,
        });
    }

    Ok(Json(DataResponse {
        data: CommissionReport { from, to, profiles },
    }))
}

fn resolve_period(params: SummaryParams, today: NaiveDate) -> AppResult<(NaiveDate, NaiveDate)> {
    let month_start = today.with_day(1).unwrap_or(today);
    let from = params.from.unwrap_or(month_start);
    let to = params.to.unwrap_or_else(|| {
        (month_start + Months::new(1))
            .pred_opt()
            .unwrap_or(today)
    });
    if from > to {
        return Err(AppError::Core(CoreError::Validation(format!(
            "from ({from}) must not be after to ({to})"
        ))));
    }
    Ok((from, to))
}
