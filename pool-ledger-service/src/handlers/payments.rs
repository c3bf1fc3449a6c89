//! Payment intake: customer-level allocation and direct invoice payments.

use axum::{
    extract::{Path, State},
    Json,
};
use chrono::Utc;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use service_core::error::AppError;
use service_core::validation::ValidatedJson;

use crate::dtos::{CustomerPaymentRequest, InvoicePaymentRequest};
use crate::models::{PaymentAllocation, PaymentApplication};
use crate::services::metrics::{ERRORS_TOTAL, PAYMENTS_TOTAL, PAYMENT_AMOUNT_TOTAL};
use crate::startup::AppState;

fn record_payment_metrics(path: &str, outcome: Result<Decimal, &AppError>) {
    match outcome {
        Ok(applied) => {
            PAYMENTS_TOTAL.with_label_values(&[path]).inc();
            PAYMENT_AMOUNT_TOTAL
                .with_label_values(&[path])
                .inc_by(applied.to_f64().unwrap_or_default());
        }
        Err(e) => ERRORS_TOTAL.with_label_values(&[e.kind()]).inc(),
    }
}

/// Spread a payment over the customer's outstanding invoices.
#[tracing::instrument(skip(state, request), fields(customer_id = request.customer_id))]
pub async fn allocate_payment(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CustomerPaymentRequest>,
) -> Result<Json<PaymentAllocation>, AppError> {
    let payment_date = request
        .payment_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let result = state
        .db
        .allocate_customer_payment(request.customer_id, request.amount, payment_date)
        .await;

    record_payment_metrics(
        "allocation",
        result
            .as_ref()
            .map(|allocation| allocation.amount - allocation.remaining),
    );

    Ok(Json(result?))
}

/// Apply a payment to one named invoice.
#[tracing::instrument(skip(state, request))]
pub async fn pay_invoice(
    State(state): State<AppState>,
    Path(invoice_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<InvoicePaymentRequest>,
) -> Result<Json<PaymentApplication>, AppError> {
    let payment_date = request
        .payment_date
        .unwrap_or_else(|| Utc::now().date_naive());

    let result = state
        .db
        .record_invoice_payment(invoice_id, request.amount, payment_date)
        .await;

    record_payment_metrics(
        "single_invoice",
        result.as_ref().map(|application| application.applied),
    );

    Ok(Json(result?))
}
