use axum::{extract::State, response::IntoResponse, Json};
use fleet_core::error::AppError;
use fleet_core::validation::QueryParams;

use crate::dtos::analytics::RevenueParams;
use crate::services::analytics;
use crate::startup::AppState;

/// GET /analytics/overview
pub async fn overview(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let overview = analytics::overview(&state.db).await?;
    Ok(Json(overview))
}

/// GET /analytics/revenue?from&to
pub async fn revenue(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<RevenueParams>,
) -> Result<impl IntoResponse, AppError> {
    let revenue = analytics::revenue_by_month(&state.db, params.from, params.to).await?;
    Ok(Json(revenue))
}
