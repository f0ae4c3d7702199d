use axum::{extract::State, http::StatusCode, response::Json};
use billing::numbering::SEQUENCE_ID;
use model::entities::bill_sequence;
use sea_orm::EntityTrait;
use tracing::{instrument, warn};
use crate::schemas::{AppState, ErrorResponse, HealthResponse};

/// Health check endpoint
///
/// Reports database connectivity and whether the bill number counter is in
/// place; bills cannot be created without it.
#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse),
        (status = 500, description = "Service is unhealthy", body = ErrorResponse)
    )
)]
#[instrument(skip(state))]
pub async fn health_check(State(state): State<AppState>) -> Result<Json<HealthResponse>, StatusCode> {
    let db_status = match state.db.ping().await {
        Ok(_) => "connected",
        Err(_) => "disconnected",
    };

    let sequence_status = match bill_sequence::Entity::find_by_id(SEQUENCE_ID).one(&state.db).await {
        Ok(Some(_)) => "ready",
        Ok(None) => {
            warn!("Bill sequence counter row is missing");
            "missing"
        }
        Err(_) => "unknown",
    };

    let status = if db_status == "connected" && sequence_status == "ready" {
        "healthy"
    } else {
        "degraded"
    };

    Ok(Json(HealthResponse {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: db_status.to_string(),
        bill_sequence: sequence_status.to_string(),
    }))
}
