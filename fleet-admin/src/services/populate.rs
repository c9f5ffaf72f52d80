//! Embed summaries of referenced documents in responses.
//!
//! Each collection is queried once with `$in` over the distinct ids on the
//! page. A reference with no matching document renders as `null`.

use std::collections::{HashMap, HashSet};

use futures::TryStreamExt;
use mongodb::bson::doc;
use mongodb::Collection;
use serde::de::DeserializeOwned;

use crate::dtos::assignments::AssignmentResponse;
use crate::dtos::maintenance::MaintenanceResponse;
use crate::dtos::payments::PaymentResponse;
use crate::dtos::tickets::TicketResponse;
use crate::dtos::{AssignmentSummary, BikeSummary, RiderSummary};
use crate::models::{Assignment, Maintenance, Payment, Ticket};
use crate::services::database::MongoDb;
use fleet_core::error::AppError;

async fn fetch_by_ids<T, S>(
    collection: Collection<T>,
    ids: HashSet<&str>,
    key: impl Fn(&T) -> String,
) -> Result<HashMap<String, S>, AppError>
where
    T: DeserializeOwned + Unpin + Send + Sync,
    S: From<T>,
{
    if ids.is_empty() {
        return Ok(HashMap::new());
    }
    let ids: Vec<&str> = ids.into_iter().collect();
    let docs: Vec<T> = collection
        .find(doc! { "_id": { "$in": ids } }, None)
        .await?
        .try_collect()
        .await?;
    Ok(docs
        .into_iter()
        .map(|d| (key(&d), S::from(d)))
        .collect())
}

async fn riders(
    db: &MongoDb,
    ids: HashSet<&str>,
) -> Result<HashMap<String, RiderSummary>, AppError> {
    fetch_by_ids(db.riders(), ids, |r| r.id.clone()).await
}

async fn bikes(db: &MongoDb, ids: HashSet<&str>) -> Result<HashMap<String, BikeSummary>, AppError> {
    fetch_by_ids(db.bikes(), ids, |b| b.id.clone()).await
}

async fn assignments(
    db: &MongoDb,
    ids: HashSet<&str>,
) -> Result<HashMap<String, AssignmentSummary>, AppError> {
    fetch_by_ids(db.assignments(), ids, |a| a.id.clone()).await
}

pub async fn assignment_responses(
    db: &MongoDb,
    items: Vec<Assignment>,
) -> Result<Vec<AssignmentResponse>, AppError> {
    let rider_map = riders(db, items.iter().map(|a| a.rider_id.as_str()).collect()).await?;
    let bike_map = bikes(db, items.iter().map(|a| a.bike_id.as_str()).collect()).await?;

    Ok(items
        .into_iter()
        .map(|a| {
            let rider = rider_map.get(&a.rider_id).cloned();
            let bike = bike_map.get(&a.bike_id).cloned();
            AssignmentResponse {
                rider,
                bike,
                ..AssignmentResponse::from(a)
            }
        })
        .collect())
}

pub async fn payment_responses(
    db: &MongoDb,
    items: Vec<Payment>,
) -> Result<Vec<PaymentResponse>, AppError> {
    let rider_map = riders(db, items.iter().map(|p| p.rider_id.as_str()).collect()).await?;
    let assignment_map =
        assignments(db, items.iter().map(|p| p.assignment_id.as_str()).collect()).await?;

    Ok(items
        .into_iter()
        .map(|p| {
            let rider = rider_map.get(&p.rider_id).cloned();
            let assignment = assignment_map.get(&p.assignment_id).cloned();
            PaymentResponse {
                rider,
                assignment,
                ..PaymentResponse::from(p)
            }
        })
        .collect())
}

pub async fn maintenance_responses(
    db: &MongoDb,
    items: Vec<Maintenance>,
) -> Result<Vec<MaintenanceResponse>, AppError> {
    let bike_map = bikes(db, items.iter().map(|m| m.bike_id.as_str()).collect()).await?;

    Ok(items
        .into_iter()
        .map(|m| {
            let bike = bike_map.get(&m.bike_id).cloned();
            MaintenanceResponse {
                bike,
                ..MaintenanceResponse::from(m)
            }
        })
        .collect())
}

pub async fn ticket_responses(
    db: &MongoDb,
    items: Vec<Ticket>,
) -> Result<Vec<TicketResponse>, AppError> {
    let rider_map = riders(
        db,
        items.iter().filter_map(|t| t.rider_id.as_deref()).collect(),
    )
    .await?;

    Ok(items
        .into_iter()
        .map(|t| {
            let rider = t
                .rider_id
                .as_ref()
                .and_then(|id| rider_map.get(id))
                .cloned();
            TicketResponse {
                rider,
                ..TicketResponse::from(t)
            }
        })
        .collect())
}

fn single<R>(mut items: Vec<R>) -> Result<R, AppError> {
    items
        .pop()
        .ok_or_else(|| AppError::InternalError(anyhow::anyhow!("Population returned no document")))
}

pub async fn assignment_response(
    db: &MongoDb,
    item: Assignment,
) -> Result<AssignmentResponse, AppError> {
    single(assignment_responses(db, vec![item]).await?)
}

pub async fn payment_response(db: &MongoDb, item: Payment) -> Result<PaymentResponse, AppError> {
    single(payment_responses(db, vec![item]).await?)
}

pub async fn maintenance_response(
    db: &MongoDb,
    item: Maintenance,
) -> Result<MaintenanceResponse, AppError> {
    single(maintenance_responses(db, vec![item]).await?)
}

pub async fn ticket_response(db: &MongoDb, item: Ticket) -> Result<TicketResponse, AppError> {
    single(ticket_responses(db, vec![item]).await?)
}
