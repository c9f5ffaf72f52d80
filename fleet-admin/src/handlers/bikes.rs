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
use crate::dtos::bikes::{
    BikeDetailResponse, BikeFilters, BikeResponse, CreateBikeRequest, UpdateBikeRequest, SORTABLE,
};
use crate::dtos::{AssignmentSummary, RiderSummary};
use crate::models::{Bike, BikeStatus};
use crate::services::database::conflict_on_duplicate;
use crate::startup::AppState;

const ENTITY: &str = "Bike";
const DUPLICATE: &str = "A bike with this bike number or registration number already exists";

/// GET /bikes
pub async fn list_bikes(
    State(state): State<AppState>,
    QueryParams(page): QueryParams<PageParams>,
    QueryParams(filters): QueryParams<BikeFilters>,
) -> Result<impl IntoResponse, AppError> {
    let page = page.resolve(SORTABLE)?;
    let (bikes, pagination) = fetch_page(&state.db.bikes(), filters.to_document(), &page).await?;
    let bikes: Vec<BikeResponse> = bikes.into_iter().map(BikeResponse::from).collect();

    Ok(Json(json!({ "bikes": bikes, "pagination": pagination })))
}

/// GET /bikes/:id
///
/// Includes the open assignment and its rider when the bike is out with someone.
pub async fn get_bike(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let bike = find_by_id(&state.db.bikes(), ENTITY, &id).await?;

    let assignment = match &bike.current_assignment_id {
        Some(assignment_id) => {
            state
                .db
                .assignments()
                .find_one(doc! { "_id": assignment_id }, None)
                .await?
        }
        None => None,
    };
    let rider = match &assignment {
        Some(a) => state
            .db
            .riders()
            .find_one(doc! { "_id": &a.rider_id }, None)
            .await?
            .map(RiderSummary::from),
        None => None,
    };

    let detail = BikeDetailResponse {
        bike: BikeResponse::from(bike),
        current_assignment: assignment.map(AssignmentSummary::from),
        current_rider: rider,
    };

    Ok(Json(json!({ "bike": detail })))
}

/// POST /bikes
pub async fn create_bike(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateBikeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let mut bike = Bike::new(req.bike_number, req.registration_number, req.model);
    bike.zone = req.zone;
    bike.purchase_date = req.purchase_date;

    state
        .db
        .bikes()
        .insert_one(&bike, None)
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?;

    tracing::info!(bike_id = %bike.id, bike_number = %bike.bike_number, "Bike created");

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Bike created successfully",
            "bike": BikeResponse::from(bike),
        })),
    ))
}

/// PUT /bikes/:id
///
/// Status is written as given; assignment and maintenance flows move it
/// conditionally on their own.
pub async fn update_bike(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateBikeRequest>,
) -> Result<impl IntoResponse, AppError> {
    let update = Changes::new(Utc::now())
        .value("bike_number", req.bike_number)
        .value("registration_number", req.registration_number)
        .value("model", req.model)
        .value("zone", req.zone)
        .value("status", req.status)
        .date("purchase_date", req.purchase_date)
        .into_update();

    let bike = state
        .db
        .bikes()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await
        .map_err(|e| conflict_on_duplicate(e, DUPLICATE))?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    tracing::info!(bike_id = %bike.id, status = %bike.status, "Bike updated");

    Ok(Json(json!({
        "message": "Bike updated successfully",
        "bike": BikeResponse::from(bike),
    })))
}

/// DELETE /bikes/:id
///
/// Retires the bike. Refused while an open assignment holds it.
pub async fn delete_bike(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    find_active(&state.db.bikes(), ENTITY, &id).await?;

    let open = state
        .db
        .assignments()
        .count_documents(doc! { "bike_id": &id, "is_open": true }, None)
        .await?;
    if open > 0 {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Bike {} has an open assignment; complete or cancel it first",
            id
        )));
    }

    let update = Changes::new(Utc::now())
        .value("is_active", Some(false))
        .value("status", Some(BikeStatus::Retired))
        .into_update();

    let bike = state
        .db
        .bikes()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    tracing::info!(bike_id = %bike.id, "Bike retired");

    Ok(Json(json!({
        "message": "Bike deleted successfully",
        "bike": BikeResponse::from(bike),
    })))
}
