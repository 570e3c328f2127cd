pub mod gst_reports;
pub mod health;
pub mod invoices;

pub use gst_reports::{gst_details, gst_monthly, gst_rate_wise, gst_summary};
pub use health::{health_check, metrics_endpoint, readiness_check};
pub use invoices::{
    check_overdue, create_invoice, dashboard_stats, delete_invoice, get_invoice, invoice_summary,
    list_invoices, mark_paid, update_invoice,
};

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::Query;
use axum::Json;
use service_core::error::AppError;

/// Turn axum's body rejections into the JSON error shape every other
/// failure uses.
pub(crate) fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    payload.map(|Json(body)| body).map_err(|e| {
        AppError::BadRequest(anyhow::anyhow!("Invalid request body: {}", e.body_text()))
    })
}

pub(crate) fn query_params<T>(params: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    params
        .map(|Query(params)| params)
        .map_err(|e| AppError::BadRequest(anyhow::anyhow!("Invalid query: {}", e.body_text())))
}
