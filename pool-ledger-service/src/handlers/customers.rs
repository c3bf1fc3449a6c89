//! Customer-scoped ledger endpoints.

use axum::{
    extract::{Path, State},
    Json,
};
use service_core::error::AppError;
use service_core::validation::ValidatedJson;

use crate::dtos::{AssignServicePlanRequest, OwedResponse, SyncCustomerRequest};
use crate::models::{Customer, UpsertCustomer};
use crate::startup::AppState;

/// Create or refresh a customer from the user directory.
#[tracing::instrument(skip(state, request))]
pub async fn sync_customer(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<SyncCustomerRequest>,
) -> Result<Json<Customer>, AppError> {
    if customer_id < 1 {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "customer_id must be positive"
        )));
    }

    let customer = state
        .db
        .upsert_customer(&UpsertCustomer {
            customer_id,
            name: request.name,
            active: request.active,
        })
        .await?;

    tracing::info!(active = customer.active, "Customer synced from directory");

    Ok(Json(customer))
}

#[tracing::instrument(skip(state))]
pub async fn customer_owed(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
) -> Result<Json<OwedResponse>, AppError> {
    if state.db.get_customer(customer_id).await?.is_none() {
        return Err(AppError::NotFound(anyhow::anyhow!("Customer not found")));
    }

    let owed = state.db.customer_owed(customer_id).await?;

    Ok(Json(OwedResponse { customer_id, owed }))
}

/// Assign or replace the customer's billing cadence.
#[tracing::instrument(skip(state, request))]
pub async fn assign_service_plan(
    State(state): State<AppState>,
    Path(customer_id): Path<i64>,
    ValidatedJson(request): ValidatedJson<AssignServicePlanRequest>,
) -> Result<Json<Customer>, AppError> {
    let customer = state
        .db
        .assign_service_plan(customer_id, request.service_frequency)
        .await?;

    Ok(Json(customer))
}
