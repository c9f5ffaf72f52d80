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
use crate::dtos::riders::{
    CreateRiderRequest, RiderFilters, RiderResponse, UpdateRiderRequest, SORTABLE,
};
use crate::models::{Rider, RiderStatus};
use crate::services::database::conflict_on_duplicate;
use crate::startup::AppState;

const ENTITY: &str = "Rider";

/// GET /riders
pub async fn list_riders(
    State(state): State<AppState>,
    QueryParams(page): QueryParams<PageParams>,
    QueryParams(filters): QueryParams<RiderFilters>,
) -> Result<impl IntoResponse, AppError> {
    let page = page.resolve(SORTABLE)?;
    let (riders, pagination) =
        fetch_page(&state.db.riders(), filters.to_document(), &page).await?;
    let riders: Vec<RiderResponse> = riders.into_iter().map(RiderResponse::from).collect();

    Ok(Json(json!({ "riders": riders, "pagination": pagination })))
}

/// GET /riders/:id
pub async fn get_rider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let rider = find_by_id(&state.db.riders(), ENTITY, &id).await?;
    Ok(Json(json!({ "rider": RiderResponse::from(rider) })))
}

/// POST /riders
pub async fn create_rider(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateRiderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut rider = Rider::new(req.name, req.phone);
    rider.email = req.email;
    rider.address = req.address;
    rider.id_document = req.id_document;
    rider.emergency_contact = req.emergency_contact;
    if let Some(status) = req.status {
        rider.status = status;
    }

    state
        .db
        .riders()
        .insert_one(&rider, None)
        .await
        .map_err(|e| conflict_on_duplicate(e, "A rider with this phone number already exists"))?;

    tracing::info!(rider_id = %rider.id, "Rider created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Rider created successfully",
            "rider": RiderResponse::from(rider),
        })),
    ))
}

/// PUT /riders/:id
pub async fn update_rider(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateRiderRequest>,
) -> Result<impl IntoResponse, AppError> {
    let update = Changes::new(Utc::now())
        .value("name", req.name)
        .value("phone", req.phone)
        .value("email", req.email)
        .value("address", req.address)
        .value("status", req.status)
        .nested("id_document", req.id_document.as_ref())?
        .nested("emergency_contact", req.emergency_contact.as_ref())?
        .into_update();

    let rider = state
        .db
        .riders()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await
        .map_err(|e| conflict_on_duplicate(e, "A rider with this phone number already exists"))?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    tracing::info!(rider_id = %rider.id, "Rider updated");

    Ok(Json(json!({
        "message": "Rider updated successfully",
        "rider": RiderResponse::from(rider),
    })))
}

/// DELETE /riders/:id
///
/// Soft delete. Refused while the rider still holds an open assignment.
pub async fn delete_rider(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    find_active(&state.db.riders(), ENTITY, &id).await?;

    let open = state
        .db
        .assignments()
        .count_documents(doc! { "rider_id": &id, "is_open": true }, None)
        .await?;
    if open > 0 {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Rider {} has an open assignment; complete or cancel it first",
            id
        )));
    }

    let update = Changes::new(Utc::now())
        .value("is_active", Some(false))
        .value("status", Some(RiderStatus::Inactive))
        .into_update();

    let rider = state
        .db
        .riders()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    tracing::info!(rider_id = %rider.id, "Rider deactivated");

    Ok(Json(json!({
        "message": "Rider deleted successfully",
        "rider": RiderResponse::from(rider),
    })))
}
