use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use chrono::Utc;
use fleet_core::error::AppError;
use fleet_core::pagination::PageParams;
use fleet_core::validation::{QueryParams, ValidatedJson};
use mongodb::bson::doc;
use serde_json::json;

use super::{fetch_page, find_active, find_by_id, return_updated, Changes};
use crate::dtos::maintenance::{
    CreateMaintenanceRequest, MaintenanceFilters, UpdateMaintenanceRequest, SORTABLE,
};
use crate::models::{Maintenance, MaintenanceStatus};
use crate::services::populate;
use crate::startup::AppState;

const ENTITY: &str = "Maintenance record";

/// GET /maintenance
pub async fn list_maintenance(
    State(state): State<AppState>,
    QueryParams(page): QueryParams<PageParams>,
    QueryParams(filters): QueryParams<MaintenanceFilters>,
) -> Result<impl IntoResponse, AppError> {
    let page = page.resolve(SORTABLE)?;
    let (items, pagination) =
        fetch_page(&state.db.maintenance(), filters.to_document()?, &page).await?;
    let maintenance = populate::maintenance_responses(&state.db, items).await?;

    Ok(Json(
        json!({ "maintenance": maintenance, "pagination": pagination }),
    ))
}

/// GET /maintenance/:id
pub async fn get_maintenance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let record = find_by_id(&state.db.maintenance(), ENTITY, &id).await?;
    let record = populate::maintenance_response(&state.db, record).await?;
    Ok(Json(json!({ "maintenance": record })))
}

/// POST /maintenance
///
/// A record created as `in_progress` takes an available bike out of service.
pub async fn create_maintenance(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateMaintenanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let bike = find_active(&state.db.bikes(), "Bike", &req.bike_id)
        .await
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Bike {} not found", req.bike_id)))?;

    let now = Utc::now();
    let mut record = Maintenance::new(
        bike.id,
        req.title,
        req.kind,
        req.priority,
        req.scheduled_date,
    );
    record.description = req.description;
    record.technician = req.technician;
    record.notes = req.notes;
    if let Some(status) = req.status {
        record.status = status;
    }
    if record.status == MaintenanceStatus::Completed {
        record.completed_date = Some(now);
    }
    if let Some(cost) = req.cost {
        record.set_cost(cost);
    }

    state.db.maintenance().insert_one(&record, None).await?;

    tracing::info!(
        maintenance_id = %record.id,
        bike_id = %record.bike_id,
        status = %record.status,
        "Maintenance scheduled"
    );

    if record.status == MaintenanceStatus::InProgress {
        state.sync.hold_bike_for_maintenance(&record.bike_id).await;
    }

    let record = populate::maintenance_response(&state.db, record).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Maintenance record created successfully",
            "maintenance": record,
        })),
    ))
}

/// PUT /maintenance/:id
///
/// Moving into `in_progress` holds the bike. Completing the work, or
/// cancelling it once underway, hands the bike back if it is still in
/// `maintenance` and no other record on it is in progress.
pub async fn update_maintenance(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateMaintenanceRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_active(&state.db.maintenance(), ENTITY, &id).await?;

    let now = Utc::now();
    let status = req.status.unwrap_or(existing.status);
    let finishing = existing.status.releases_bike(status);
    let starting =
        existing.status != MaintenanceStatus::InProgress && status == MaintenanceStatus::InProgress;

    let completed_date = match req.completed_date {
        Some(date) => Some(date),
        None if status == MaintenanceStatus::Completed && existing.completed_date.is_none() => {
            Some(now)
        }
        None => None,
    };

    let update = Changes::new(now)
        .value("title", req.title)
        .value("description", req.description)
        .value("kind", req.kind)
        .value("status", req.status)
        .value("priority", req.priority)
        .date("scheduled_date", req.scheduled_date)
        .date("completed_date", completed_date)
        .nested("cost", req.cost.as_ref())?
        .value("total_cost", req.cost.map(|c| c.total()))
        .value("technician", req.technician)
        .value("notes", req.notes)
        .into_update();

    let record = state
        .db
        .maintenance()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    if finishing {
        state
            .sync
            .restore_bike_after_maintenance(&record.bike_id, &record.id)
            .await;
    } else if starting {
        state.sync.hold_bike_for_maintenance(&record.bike_id).await;
    }

    tracing::info!(
        maintenance_id = %record.id,
        from = %existing.status,
        to = %record.status,
        "Maintenance updated"
    );

    let record = populate::maintenance_response(&state.db, record).await?;
    Ok(Json(json!({
        "message": "Maintenance record updated successfully",
        "maintenance": record,
    })))
}

/// DELETE /maintenance/:id
pub async fn delete_maintenance(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let update = Changes::new(Utc::now())
        .value("is_active", Some(false))
        .value("status", Some(MaintenanceStatus::Cancelled))
        .into_update();

    let previous = state
        .db
        .maintenance()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, None)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    if previous.status == MaintenanceStatus::InProgress {
        state
            .sync
            .restore_bike_after_maintenance(&previous.bike_id, &previous.id)
            .await;
    }

    let record = find_by_id(&state.db.maintenance(), ENTITY, &id).await?;
    tracing::info!(maintenance_id = %record.id, "Maintenance cancelled");

    let record = populate::maintenance_response(&state.db, record).await?;
    Ok(Json(json!({
        "message": "Maintenance record deleted successfully",
        "maintenance": record,
    })))
}
