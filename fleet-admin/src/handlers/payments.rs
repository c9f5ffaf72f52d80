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
use crate::dtos::payments::{
    CreatePaymentRequest, OverdueSweepResponse, PaymentFilters, UpdatePaymentRequest, SORTABLE,
};
use crate::models::{resolve_paid_date, Payment, PaymentStatus};
use crate::services::populate;
use crate::startup::AppState;

const ENTITY: &str = "Payment";

/// GET /payments
pub async fn list_payments(
    State(state): State<AppState>,
    QueryParams(page): QueryParams<PageParams>,
    QueryParams(filters): QueryParams<PaymentFilters>,
) -> Result<impl IntoResponse, AppError> {
    let page = page.resolve(SORTABLE)?;
    let (items, pagination) =
        fetch_page(&state.db.payments(), filters.to_document()?, &page).await?;
    let payments = populate::payment_responses(&state.db, items).await?;

    Ok(Json(json!({ "payments": payments, "pagination": pagination })))
}

/// GET /payments/:id
pub async fn get_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let payment = find_by_id(&state.db.payments(), ENTITY, &id).await?;
    let payment = populate::payment_response(&state.db, payment).await?;
    Ok(Json(json!({ "payment": payment })))
}

/// POST /payments
pub async fn create_payment(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let assignment = find_active(&state.db.assignments(), "Assignment", &req.assignment_id)
        .await
        .map_err(|_| {
            AppError::BadRequest(anyhow::anyhow!(
                "Assignment {} not found",
                req.assignment_id
            ))
        })?;

    if let Some(rider_id) = &req.rider_id {
        if *rider_id != assignment.rider_id {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Rider {} does not hold assignment {}",
                rider_id,
                assignment.id
            )));
        }
    }

    let now = Utc::now();
    let mut payment = Payment::new(
        assignment.id.clone(),
        assignment.rider_id.clone(),
        req.amount,
        req.kind,
        req.due_date,
    );
    payment.method = req.method;
    payment.status = req.status.unwrap_or(PaymentStatus::Pending);
    payment.paid_date = resolve_paid_date(None, req.paid_date, payment.status, now);
    payment.transaction_ref = req.transaction_ref;
    payment.notes = req.notes;

    state.db.payments().insert_one(&payment, None).await?;

    tracing::info!(
        payment_id = %payment.id,
        assignment_id = %payment.assignment_id,
        amount = payment.amount,
        status = %payment.status,
        "Payment recorded"
    );

    state.sync.sync_assignment_totals(&payment.assignment_id).await;

    let payment = populate::payment_response(&state.db, payment).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Payment created successfully",
            "payment": payment,
        })),
    ))
}

/// PUT /payments/:id
///
/// The first move to `paid` stamps `paid_date` unless one is supplied.
pub async fn update_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdatePaymentRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_active(&state.db.payments(), ENTITY, &id).await?;

    let now = Utc::now();
    let status = req.status.unwrap_or(existing.status);
    let paid_date = resolve_paid_date(existing.paid_date, req.paid_date, status, now);

    let update = Changes::new(now)
        .value("amount", req.amount)
        .value("kind", req.kind)
        .value("method", req.method)
        .value("status", req.status)
        .date("due_date", req.due_date)
        .date("paid_date", paid_date)
        .value("transaction_ref", req.transaction_ref)
        .value("notes", req.notes)
        .into_update();

    let payment = state
        .db
        .payments()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    if existing.status != payment.status {
        tracing::info!(
            payment_id = %payment.id,
            from = %existing.status,
            to = %payment.status,
            "Payment status changed"
        );
    }

    state.sync.sync_assignment_totals(&payment.assignment_id).await;

    let payment = populate::payment_response(&state.db, payment).await?;
    Ok(Json(json!({
        "message": "Payment updated successfully",
        "payment": payment,
    })))
}

/// DELETE /payments/:id
///
/// Cancels and deactivates the payment, dropping it from the assignment totals.
pub async fn delete_payment(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let update = Changes::new(Utc::now())
        .value("is_active", Some(false))
        .value("status", Some(PaymentStatus::Cancelled))
        .into_update();

    let payment = state
        .db
        .payments()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    tracing::info!(payment_id = %payment.id, "Payment cancelled");

    state.sync.sync_assignment_totals(&payment.assignment_id).await;

    let payment = populate::payment_response(&state.db, payment).await?;
    Ok(Json(json!({
        "message": "Payment deleted successfully",
        "payment": payment,
    })))
}

/// POST /payments/overdue-sweep
pub async fn sweep_overdue(State(state): State<AppState>) -> Result<impl IntoResponse, AppError> {
    let outcome = state.sync.sweep_overdue(Utc::now()).await?;
    Ok(Json(OverdueSweepResponse {
        marked_overdue: outcome.marked_overdue,
        assignments_recomputed: outcome.assignments_recomputed,
    }))
}
