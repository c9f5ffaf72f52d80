use crate::dtos::dates::opt_date;
use crate::dtos::{AssignmentSummary, RiderSummary};
use crate::models::{Bike, BikeStatus};
use chrono::{DateTime, Utc};
use fleet_core::pagination::{search_filter, SortableFields};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SORTABLE: SortableFields = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("bikeNumber", "bike_number"),
    ("status", "status"),
    ("zone", "zone"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateBikeRequest {
    #[validate(length(min = 1, max = 50, message = "Bike number is required"))]
    pub bike_number: String,
    #[validate(length(min = 1, max = 50, message = "Registration number is required"))]
    pub registration_number: String,
    #[validate(length(min = 1, max = 100, message = "Model is required"))]
    pub model: String,
    pub zone: Option<String>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub purchase_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBikeRequest {
    #[validate(length(min = 1, max = 50, message = "Bike number cannot be empty"))]
    pub bike_number: Option<String>,
    #[validate(length(min = 1, max = 50, message = "Registration number cannot be empty"))]
    pub registration_number: Option<String>,
    #[validate(length(min = 1, max = 100, message = "Model cannot be empty"))]
    pub model: Option<String>,
    pub zone: Option<String>,
    pub status: Option<BikeStatus>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub purchase_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeFilters {
    pub status: Option<BikeStatus>,
    pub zone: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl BikeFilters {
    pub fn to_document(&self) -> Document {
        let mut filter = super::active_filter(self.include_inactive);
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(zone) = self.zone.as_deref().filter(|z| !z.is_empty()) {
            filter.insert("zone", zone);
        }
        if let Some(search) = self.search.as_deref().and_then(|term| {
            search_filter(term, &["bike_number", "registration_number", "model"])
        }) {
            filter.extend(search);
        }
        filter
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeResponse {
    pub id: String,
    pub bike_number: String,
    pub registration_number: String,
    pub model: String,
    pub zone: Option<String>,
    pub status: BikeStatus,
    pub current_assignment_id: Option<String>,
    pub purchase_date: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Bike> for BikeResponse {
    fn from(bike: Bike) -> Self {
        Self {
            id: bike.id,
            bike_number: bike.bike_number,
            registration_number: bike.registration_number,
            model: bike.model,
            zone: bike.zone,
            status: bike.status,
            current_assignment_id: bike.current_assignment_id,
            purchase_date: bike.purchase_date.map(|d| d.to_rfc3339()),
            is_active: bike.is_active,
            created_at: bike.created_at.to_rfc3339(),
            updated_at: bike.updated_at.to_rfc3339(),
        }
    }
}

/// Single-bike view with the rider currently holding it.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BikeDetailResponse {
    #[serde(flatten)]
    pub bike: BikeResponse,
    pub current_assignment: Option<AssignmentSummary>,
    pub current_rider: Option<RiderSummary>,
}
