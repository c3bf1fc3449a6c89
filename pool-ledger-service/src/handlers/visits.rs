use axum::{extract::State, http::StatusCode, Json};
use service_core::error::AppError;
use service_core::validation::ValidatedJson;

use crate::dtos::CreateServiceVisitRequest;
use crate::models::{CreateServiceVisit, ServiceVisit};
use crate::startup::AppState;

#[tracing::instrument(skip(state, request), fields(customer_id = request.customer_id))]
pub async fn record_service_visit(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateServiceVisitRequest>,
) -> Result<(StatusCode, Json<ServiceVisit>), AppError> {
    let visit = state
        .db
        .record_service_visit(&CreateServiceVisit {
            customer_id: request.customer_id,
            visit_date: request.visit_date,
            chemicals_added: request.chemicals_added,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(visit)))
}
