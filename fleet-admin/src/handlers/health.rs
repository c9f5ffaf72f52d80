use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use fleet_core::error::AppError;
use serde_json::json;

use crate::services::get_metrics;
use crate::startup::AppState;

const SERVICE: &str = "fleet-admin";

pub async fn health_check(State(state): State<AppState>) -> impl IntoResponse {
    match state.db.health_check().await {
        Ok(_) => (
            StatusCode::OK,
            Json(json!({
                "status": "ok",
                "service": SERVICE,
                "version": env!("CARGO_PKG_VERSION")
            })),
        ),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "unhealthy",
                "service": SERVICE,
                "error": e.to_string()
            })),
        ),
    }
}

pub async fn readiness_check(State(state): State<AppState>) -> Result<StatusCode, AppError> {
    state
        .db
        .health_check()
        .await
        .map_err(|_| AppError::ServiceUnavailable)?;
    Ok(StatusCode::OK)
}

pub async fn metrics_endpoint() -> impl IntoResponse {
    (
        StatusCode::OK,
        [("content-type", "text/plain; charset=utf-8")],
        get_metrics(),
    )
}
