use axum::{extract::State, response::IntoResponse, Json};
use chrono::Utc;
use fleet_core::error::AppError;

use crate::services::alerts;
use crate::startup::AppState;

/// GET /alerts
///
/// Derived from live data on every call; nothing is stored.
pub async fn list_alerts(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let response = alerts::current_alerts(
        &state.db,
        Utc::now(),
        state.config.alerts.overdue_critical_days,
    )
    .await?;

    if response.counts.critical > 0 {
        tracing::warn!(critical = response.counts.critical, "Critical fleet alerts present");
    }

    Ok(Json(response))
}
