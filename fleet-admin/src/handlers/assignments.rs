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
use crate::dtos::assignments::{
    AssignmentFilters, CreateAssignmentRequest, UpdateAssignmentRequest, SORTABLE,
};
use crate::models::{end_date_for, Assignment, AssignmentStatus};
use crate::services::database::conflict_on_duplicate;
use crate::services::populate;
use crate::startup::AppState;

const ENTITY: &str = "Assignment";
const ALREADY_OPEN: &str = "Rider or bike already has an open assignment";

fn invalid_tenure() -> AppError {
    AppError::BadRequest(anyhow::anyhow!("Tenure produces an invalid end date"))
}

async fn ensure_no_open_assignment(
    state: &AppState,
    field: &str,
    id: &str,
    label: &str,
) -> Result<(), AppError> {
    let mut filter = doc! { "is_open": true };
    filter.insert(field, id);
    let open = state.db.assignments().count_documents(filter, None).await?;
    if open > 0 {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "{} {} already has an open assignment",
            label,
            id
        )));
    }
    Ok(())
}

/// GET /assignments
pub async fn list_assignments(
    State(state): State<AppState>,
    QueryParams(page): QueryParams<PageParams>,
    QueryParams(filters): QueryParams<AssignmentFilters>,
) -> Result<impl IntoResponse, AppError> {
    let page = page.resolve(SORTABLE)?;
    let (items, pagination) =
        fetch_page(&state.db.assignments(), filters.to_document(), &page).await?;
    let assignments = populate::assignment_responses(&state.db, items).await?;

    Ok(Json(
        json!({ "assignments": assignments, "pagination": pagination }),
    ))
}

/// GET /assignments/:id
pub async fn get_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = find_by_id(&state.db.assignments(), ENTITY, &id).await?;
    let assignment = populate::assignment_response(&state.db, assignment).await?;
    Ok(Json(json!({ "assignment": assignment })))
}

/// POST /assignments
///
/// Claims the bike (available -> assigned). If another request claimed it
/// first, the new assignment is removed again and the call fails with 409.
pub async fn create_assignment(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let rider = find_active(&state.db.riders(), "Rider", &req.rider_id)
        .await
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Rider {} not found", req.rider_id)))?;
    if !rider.can_rent() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "Rider {} is not active",
            rider.id
        )));
    }

    let bike = find_active(&state.db.bikes(), "Bike", &req.bike_id)
        .await
        .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Bike {} not found", req.bike_id)))?;
    if !bike.is_assignable() {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Bike {} is not available (status: {})",
            bike.bike_number,
            bike.status
        )));
    }

    let status = req.status.unwrap_or(AssignmentStatus::Active);
    if !status.is_open() {
        return Err(AppError::BadRequest(anyhow::anyhow!(
            "New assignments must be pending or active, not {}",
            status
        )));
    }

    ensure_no_open_assignment(&state, "rider_id", &rider.id, "Rider").await?;
    ensure_no_open_assignment(&state, "bike_id", &bike.id, "Bike").await?;

    let mut assignment = Assignment::new(
        rider.id,
        bike.id,
        req.start_date,
        req.tenure_months,
        req.monthly_charge,
        req.security_deposit,
    )
    .ok_or_else(invalid_tenure)?;
    assignment.status = status;
    assignment.is_open = status.is_open();
    assignment.notes = req.notes;

    state
        .db
        .assignments()
        .insert_one(&assignment, None)
        .await
        .map_err(|e| conflict_on_duplicate(e, ALREADY_OPEN))?;

    match state
        .sync
        .assign_bike(&assignment.bike_id, &assignment.id)
        .await
    {
        Ok(true) => {}
        outcome => {
            state
                .db
                .assignments()
                .delete_one(doc! { "_id": &assignment.id }, None)
                .await?;
            tracing::warn!(
                assignment_id = %assignment.id,
                bike_id = %assignment.bike_id,
                "Bike claimed concurrently; assignment rolled back"
            );
            return Err(match outcome {
                Err(e) => e,
                Ok(_) => AppError::Conflict(anyhow::anyhow!(
                    "Bike {} is no longer available",
                    assignment.bike_id
                )),
            });
        }
    }

    tracing::info!(
        assignment_id = %assignment.id,
        rider_id = %assignment.rider_id,
        bike_id = %assignment.bike_id,
        "Assignment created"
    );

    let assignment = populate::assignment_response(&state.db, assignment).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Assignment created successfully",
            "assignment": assignment,
        })),
    ))
}

/// PUT /assignments/:id
///
/// Closing an assignment (completed/cancelled) releases its bike. Reopening
/// one claims the bike again and fails with 409 if it is no longer available.
pub async fn update_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateAssignmentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_active(&state.db.assignments(), ENTITY, &id).await?;

    let status = req.status.unwrap_or(existing.status);
    let reopening = !existing.status.is_open() && status.is_open();
    let closing = existing.status.is_open() && !status.is_open();

    let start_date = req.start_date.unwrap_or(existing.start_date);
    let tenure_months = req.tenure_months.unwrap_or(existing.tenure_months);
    let end_date = end_date_for(start_date, tenure_months).ok_or_else(invalid_tenure)?;

    if reopening && !state.sync.assign_bike(&existing.bike_id, &id).await? {
        return Err(AppError::Conflict(anyhow::anyhow!(
            "Bike {} is not available to reopen this assignment",
            existing.bike_id
        )));
    }

    let update = Changes::new(Utc::now())
        .date("start_date", Some(start_date))
        .value("tenure_months", Some(tenure_months))
        .date("end_date", Some(end_date))
        .value("monthly_charge", req.monthly_charge)
        .value("security_deposit", req.security_deposit)
        .value("notes", req.notes)
        .value("status", Some(status))
        .value("is_open", Some(status.is_open()))
        .into_update();

    let updated = state
        .db
        .assignments()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await;

    let assignment = match updated {
        Ok(Some(assignment)) => assignment,
        other => {
            if reopening {
                state.sync.release_bike(&existing.bike_id, &id).await;
            }
            return Err(match other {
                Err(e) => conflict_on_duplicate(e, ALREADY_OPEN),
                _ => AppError::not_found(ENTITY, &id),
            });
        }
    };

    if closing {
        state.sync.release_bike(&assignment.bike_id, &assignment.id).await;
    }

    tracing::info!(
        assignment_id = %assignment.id,
        status = %assignment.status,
        "Assignment updated"
    );

    let assignment = populate::assignment_response(&state.db, assignment).await?;
    Ok(Json(json!({
        "message": "Assignment updated successfully",
        "assignment": assignment,
    })))
}

/// DELETE /assignments/:id
///
/// Cancels and deactivates the assignment and frees its bike.
pub async fn delete_assignment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let update = Changes::new(Utc::now())
        .value("is_active", Some(false))
        .value("is_open", Some(false))
        .value("status", Some(AssignmentStatus::Cancelled))
        .into_update();

    let previous = state
        .db
        .assignments()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, None)
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    if previous.status.is_open() {
        state.sync.release_bike(&previous.bike_id, &previous.id).await;
    }

    let assignment = find_by_id(&state.db.assignments(), ENTITY, &id).await?;
    tracing::info!(assignment_id = %assignment.id, "Assignment cancelled");

    let assignment = populate::assignment_response(&state.db, assignment).await?;
    Ok(Json(json!({
        "message": "Assignment deleted successfully",
        "assignment": assignment,
    })))
}
