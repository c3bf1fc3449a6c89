//! Invoice generation, lookup and listing.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use service_core::error::AppError;
use service_core::validation::OptionalValidatedJson;
use validator::Validate;

use crate::dtos::{
    GenerateInvoicesRequest, ListInvoicesQuery, MarkOverdueRequest, MarkOverdueResponse,
};
use crate::models::{GenerationReport, Invoice, InvoicePage};
use crate::services::generate_invoices as run_generation;
use crate::startup::AppState;

/// Bill every active customer with a plan for the given issue date.
#[tracing::instrument(skip(state, request))]
pub async fn generate_invoices(
    State(state): State<AppState>,
    OptionalValidatedJson(request): OptionalValidatedJson<GenerateInvoicesRequest>,
) -> Result<Json<GenerationReport>, AppError> {
    let issue_date = request
        .issue_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let customers = state.db.list_customers().await?;
    let report = run_generation(&state.db, &customers, issue_date).await;

    Ok(Json(report))
}

#[tracing::instrument(skip(state, request))]
pub async fn mark_overdue(
    State(state): State<AppState>,
    OptionalValidatedJson(request): OptionalValidatedJson<MarkOverdueRequest>,
) -> Result<Json<MarkOverdueResponse>, AppError> {
    let as_of = request.as_of.unwrap_or_else(|| Utc::now().date_naive());
    let updated = state.db.mark_overdue(as_of).await?;

    Ok(Json(MarkOverdueResponse { as_of, updated }))
}

#[tracing::instrument(skip(state))]
pub async fn get_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
) -> Result<Json<Invoice>, AppError> {
    let invoice = state
        .db
        .get_invoice(invoice_id)
        .await?
        .ok_or_else(|| AppError::NotFound(anyhow::anyhow!("Invoice not found")))?;

    Ok(Json(invoice))
}

/// A customer's invoices, earliest due date first, one page at a time.
#[tracing::instrument(skip(state, query))]
pub async fn list_customer_invoices(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    Query(query): Query<ListInvoicesQuery>,
) -> Result<Json<InvoicePage>, AppError> {
    query.validate()?;

    if state.db.get_customer(customer_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
    }

    let page = state
        .db
        .list_customer_invoices(
            customer_id,
            query.page.unwrap_or(1),
            query
                .page_size
                .unwrap_or(state.config.pagination.default_page_size),
        )
        .await?;

    Ok(Json(page))
}
