//! Business-wide ledger summary.

use axum::{extract::State, Json};
use service_core::error::AppError;

use crate::dtos::AnalyticsResponse;
use crate::services::chemicals;
use crate::startup::AppState;

#[tracing::instrument(skip(state))]
pub async fn get_analytics(
    State(state): State<AppState>,
) -> Result<Json<AnalyticsResponse>, AppError> {
    let total_revenue = state.db.total_revenue().await?;
    let total_owed = state.db.total_owed().await?;
    let notes = state.db.list_chemical_notes().await?;
    let chemicals_used = chemicals::summarize(notes.iter().map(String::as_str));
    let invoices = state.db.list_invoices().await?;

    Ok(Json(AnalyticsResponse::new(
        total_revenue,
        total_owed,
        chemicals_used,
        invoices,
    )))
}
