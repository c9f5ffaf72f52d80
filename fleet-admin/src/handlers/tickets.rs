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
use crate::dtos::tickets::{
    CreateReplyRequest, CreateTicketRequest, ReplyResponse, TicketFilters, UpdateTicketRequest,
    SORTABLE,
};
use crate::models::{resolve_resolved_at, Ticket, TicketReply, TicketStatus};
use crate::services::populate;
use crate::startup::AppState;

const ENTITY: &str = "Ticket";

/// GET /tickets
pub async fn list_tickets(
    State(state): State<AppState>,
    QueryParams(page): QueryParams<PageParams>,
    QueryParams(filters): QueryParams<TicketFilters>,
) -> Result<impl IntoResponse, AppError> {
    let page = page.resolve(SORTABLE)?;
    let (items, pagination) =
        fetch_page(&state.db.tickets(), filters.to_document(), &page).await?;
    let tickets = populate::ticket_responses(&state.db, items).await?;

    Ok(Json(json!({ "tickets": tickets, "pagination": pagination })))
}

/// GET /tickets/:id
pub async fn get_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let ticket = find_by_id(&state.db.tickets(), ENTITY, &id).await?;
    let ticket = populate::ticket_response(&state.db, ticket).await?;
    Ok(Json(json!({ "ticket": ticket })))
}

/// POST /tickets
pub async fn create_ticket(
    State(state): State<AppState>,
    ValidatedJson(req): ValidatedJson<CreateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    if let Some(rider_id) = &req.rider_id {
        find_active(&state.db.riders(), "Rider", rider_id)
            .await
            .map_err(|_| AppError::BadRequest(anyhow::anyhow!("Rider {} not found", rider_id)))?;
    }

    let ticket = Ticket::new(
        req.rider_id,
        req.subject,
        req.description,
        req.category,
        req.priority,
    );

    state.db.tickets().insert_one(&ticket, None).await?;

    tracing::info!(
        ticket_id = %ticket.id,
        priority = %ticket.priority,
        "Ticket opened"
    );

    let ticket = populate::ticket_response(&state.db, ticket).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Ticket created successfully",
            "ticket": ticket,
        })),
    ))
}

/// PUT /tickets/:id
pub async fn update_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<UpdateTicketRequest>,
) -> Result<impl IntoResponse, AppError> {
    let existing = find_active(&state.db.tickets(), ENTITY, &id).await?;

    let now = Utc::now();
    let status = req.status.unwrap_or(existing.status);
    let resolved_at = resolve_resolved_at(existing.resolved_at, status, now);

    let update = Changes::new(now)
        .value("subject", req.subject)
        .value("description", req.description)
        .value("category", req.category)
        .value("priority", req.priority)
        .value("status", req.status)
        .date("resolved_at", resolved_at)
        .into_update();

    let ticket = state
        .db
        .tickets()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    tracing::info!(ticket_id = %ticket.id, status = %ticket.status, "Ticket updated");

    let ticket = populate::ticket_response(&state.db, ticket).await?;
    Ok(Json(json!({
        "message": "Ticket updated successfully",
        "ticket": ticket,
    })))
}

/// DELETE /tickets/:id
pub async fn delete_ticket(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, AppError> {
    let update = Changes::new(Utc::now())
        .value("is_active", Some(false))
        .value("status", Some(TicketStatus::Closed))
        .into_update();

    let ticket = state
        .db
        .tickets()
        .find_one_and_update(doc! { "_id": &id, "is_active": true }, update, return_updated())
        .await?
        .ok_or_else(|| AppError::not_found(ENTITY, &id))?;

    tracing::info!(ticket_id = %ticket.id, "Ticket closed");

    let ticket = populate::ticket_response(&state.db, ticket).await?;
    Ok(Json(json!({
        "message": "Ticket deleted successfully",
        "ticket": ticket,
    })))
}

/// POST /tickets/:id/replies
///
/// Appends to the conversation. An external reply on a closed ticket
/// reopens it.
pub async fn add_reply(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<CreateReplyRequest>,
) -> Result<impl IntoResponse, AppError> {
    let reply = TicketReply::new(req.sender_role, req.sender_name, req.message, req.is_internal);
    let outcome = state.sync.append_reply(&id, &reply).await?;

    tracing::info!(
        ticket_id = %id,
        reply_id = %reply.id,
        internal = reply.is_internal,
        reopened = outcome.reopened,
        "Reply added"
    );

    let ticket = populate::ticket_response(&state.db, outcome.ticket).await?;
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Reply added successfully",
            "reopened": outcome.reopened,
            "reply": ReplyResponse::from(reply),
            "ticket": ticket,
        })),
    ))
}
