use crate::dtos::{DateRangeParams, DetailReportParams, MonthlyReportParams};
use crate::handlers::query_params;
use crate::middleware::BusinessContext;
use crate::services::reports::{DetailRow, GstSummary, MonthlyEntry, RateWiseEntry};
use crate::startup::AppState;
use axum::extract::{rejection::QueryRejection, Query, State};
use axum::Json;
use chrono::Utc;
use service_core::error::AppError;

pub async fn gst_summary(
    State(state): State<AppState>,
    ctx: BusinessContext,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<GstSummary>, AppError> {
    let range = query_params(params)?.range()?;
    Ok(Json(state.reports.summary(&ctx.business_id, range).await?))
}

pub async fn gst_rate_wise(
    State(state): State<AppState>,
    ctx: BusinessContext,
    params: Result<Query<DateRangeParams>, QueryRejection>,
) -> Result<Json<Vec<RateWiseEntry>>, AppError> {
    let range = query_params(params)?.range()?;
    Ok(Json(
        state
            .reports
            .rate_wise_breakdown(&ctx.business_id, range)
            .await?,
    ))
}

pub async fn gst_monthly(
    State(state): State<AppState>,
    ctx: BusinessContext,
    params: Result<Query<MonthlyReportParams>, QueryRejection>,
) -> Result<Json<Vec<MonthlyEntry>>, AppError> {
    let year = query_params(params)?.year(Utc::now())?;
    Ok(Json(
        state
            .reports
            .monthly_breakdown(&ctx.business_id, year)
            .await?,
    ))
}

pub async fn gst_details(
    State(state): State<AppState>,
    ctx: BusinessContext,
    params: Result<Query<DetailReportParams>, QueryRejection>,
) -> Result<Json<Vec<DetailRow>>, AppError> {
    let (range, search) = query_params(params)?.into_parts()?;
    Ok(Json(
        state
            .reports
            .detail_report(&ctx.business_id, range, search)
            .await?,
    ))
}
