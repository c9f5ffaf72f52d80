pub mod alerts;
pub mod analytics;
pub mod assignments;
pub mod bikes;
pub mod dates;
pub mod maintenance;
pub mod payments;
pub mod riders;
pub mod tickets;

use crate::models::{Assignment, AssignmentStatus, Bike, BikeStatus, Rider};
use chrono::{DateTime, Utc};
use fleet_core::error::AppError;
use mongodb::bson::{doc, Document};
use serde::{Deserialize, Serialize};

use crate::models::datetime::bson_date;

pub use dates::parse_date;

/// Soft-deleted documents are hidden unless the caller asks for them.
pub fn active_filter(include_inactive: bool) -> Document {
    if include_inactive {
        Document::new()
    } else {
        doc! { "is_active": true }
    }
}

/// `{ field: { $gte: from, $lte: to } }` for whichever bounds are present.
pub fn date_range_filter(
    field: &str,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<Option<Document>, AppError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(AppError::BadRequest(anyhow::anyhow!(
                "Invalid {} range: start is after end",
                field
            )));
        }
    }

    let mut range = Document::new();
    if let Some(from) = from {
        range.insert("$gte", bson_date(from));
    }
    if let Some(to) = to {
        range.insert("$lte", bson_date(to));
    }
    if range.is_empty() {
        return Ok(None);
    }

    let mut filter = Document::new();
    filter.insert(field, range);
    Ok(Some(filter))
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderSummary {
    pub id: String,
    pub name: String,
    pub phone: String,
}

impl From<Rider> for RiderSummary {
    fn from(rider: Rider) -> Self {
        Self {
            id: rider.id,
            name: rider.name,
            phone: rider.phone,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeSummary {
    pub id: String,
    pub bike_number: String,
    pub model: String,
    pub status: BikeStatus,
}

impl From<Bike> for BikeSummary {
    fn from(bike: Bike) -> Self {
        Self {
            id: bike.id,
            bike_number: bike.bike_number,
            model: bike.model,
            status: bike.status,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentSummary {
    pub id: String,
    pub bike_id: String,
    pub status: AssignmentStatus,
    pub start_date: String,
    pub end_date: String,
    pub monthly_charge: f64,
}

impl From<Assignment> for AssignmentSummary {
    fn from(assignment: Assignment) -> Self {
        Self {
            id: assignment.id,
            bike_id: assignment.bike_id,
            status: assignment.status,
            start_date: assignment.start_date.to_rfc3339(),
            end_date: assignment.end_date.to_rfc3339(),
            monthly_charge: assignment.monthly_charge,
        }
    }
}
