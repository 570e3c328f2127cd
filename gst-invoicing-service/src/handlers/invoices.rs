use crate::dtos::{
    ClientRef, CreateInvoiceRequest, InvoiceListResponse, InvoiceResponse, ListInvoicesParams,
    MessageResponse, SweepResponse, UpdateInvoiceRequest,
};
use crate::middleware::BusinessContext;
use crate::models::Invoice;
use crate::services::dashboard::Dashboard;
use crate::services::reports::InvoiceSummary;
use crate::startup::AppState;
use crate::handlers::{json_body, query_params};
use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use service_core::error::AppError;

/// Invoice with its client fully populated.
async fn with_client(
    state: &AppState,
    business_id: &str,
    invoice: Invoice,
) -> Result<InvoiceResponse, AppError> {
    let client = state
        .repository
        .client(business_id, &invoice.client)
        .await?
        .map(ClientRef::from);
    Ok(InvoiceResponse::new(invoice, client))
}

pub async fn create_invoice(
    State(state): State<AppState>,
    ctx: BusinessContext,
    payload: Result<Json<CreateInvoiceRequest>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    let input = json_body(payload)?.into_domain()?;

    let invoice = state.repository.create(&ctx.business_id, input).await?;

    let response = with_client(&state, &ctx.business_id, invoice).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

pub async fn list_invoices(
    State(state): State<AppState>,
    ctx: BusinessContext,
    params: Result<Query<ListInvoicesParams>, QueryRejection>,
) -> Result<Json<InvoiceListResponse>, AppError> {
    let (filter, page) = query_params(params)?.into_domain()?;

    let page = state
        .repository
        .list(&ctx.business_id, &filter, page)
        .await?;
    let clients = state
        .repository
        .clients_for(&ctx.business_id, &page.items)
        .await?;

    Ok(Json(InvoiceListResponse::new(page, &clients)))
}

pub async fn invoice_summary(
    State(state): State<AppState>,
    ctx: BusinessContext,
) -> Result<Json<InvoiceSummary>, AppError> {
    Ok(Json(state.reports.invoice_summary(&ctx.business_id).await?))
}

pub async fn dashboard_stats(
    State(state): State<AppState>,
    ctx: BusinessContext,
) -> Result<Json<Dashboard>, AppError> {
    Ok(Json(
        state
            .dashboard
            .compose(&ctx.business_id, Utc::now())
            .await?,
    ))
}

pub async fn check_overdue(
    State(state): State<AppState>,
    ctx: BusinessContext,
) -> Result<Json<SweepResponse>, AppError> {
    let updated_count = state.lifecycle.sweep_overdue(&ctx.business_id).await?;

    Ok(Json(SweepResponse {
        message: format!("{} invoice(s) marked as overdue", updated_count),
        updated_count,
    }))
}

pub async fn get_invoice(
    State(state): State<AppState>,
    ctx: BusinessContext,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state.repository.get(&ctx.business_id, &invoice_id).await?;
    Ok(Json(with_client(&state, &ctx.business_id, invoice).await?))
}

pub async fn update_invoice(
    State(state): State<AppState>,
    ctx: BusinessContext,
    Path(invoice_id): Path<String>,
    payload: Result<Json<UpdateInvoiceRequest>, JsonRejection>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let patch = json_body(payload)?.into_domain()?;

    let invoice = state
        .repository
        .update(&ctx.business_id, &invoice_id, patch)
        .await?;

    Ok(Json(with_client(&state, &ctx.business_id, invoice).await?))
}

pub async fn delete_invoice(
    State(state): State<AppState>,
    ctx: BusinessContext,
    Path(invoice_id): Path<String>,
) -> Result<Json<MessageResponse>, AppError> {
    state
        .repository
        .delete(&ctx.business_id, &invoice_id)
        .await?;

    Ok(Json(MessageResponse {
        message: "Invoice deleted successfully".to_string(),
    }))
}

pub async fn mark_paid(
    State(state): State<AppState>,
    ctx: BusinessContext,
    Path(invoice_id): Path<String>,
) -> Result<Json<InvoiceResponse>, AppError> {
    let invoice = state
        .lifecycle
        .mark_paid(&ctx.business_id, &invoice_id)
        .await?;
    Ok(Json(with_client(&state, &ctx.business_id, invoice).await?))
}
