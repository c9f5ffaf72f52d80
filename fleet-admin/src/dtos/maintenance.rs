use crate::dtos::dates::{date, opt_date};
use crate::dtos::{date_range_filter, BikeSummary};
use crate::models::{
    CostBreakdown, Maintenance, MaintenanceKind, MaintenancePriority, MaintenanceStatus,
};
use chrono::{DateTime, Utc};
use fleet_core::error::AppError;
use fleet_core::pagination::{search_filter, SortableFields};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

pub const SORTABLE: SortableFields = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("scheduledDate", "scheduled_date"),
    ("completedDate", "completed_date"),
    ("priority", "priority"),
    ("totalCost", "total_cost"),
    ("status", "status"),
];

fn non_negative_cost(cost: &CostBreakdown) -> Result<(), ValidationError> {
    if cost.parts < 0.0 || cost.labor < 0.0 || cost.other < 0.0 {
        let mut err = ValidationError::new("non_negative");
        err.message = Some("Cost components cannot be negative".into());
        return Err(err);
    }
    Ok(())
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateMaintenanceRequest {
    #[validate(length(min = 1, message = "Bike is required"))]
    pub bike_id: String,
    #[validate(length(min = 1, max = 200, message = "Title is required"))]
    pub title: String,
    pub description: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: MaintenanceKind,
    pub status: Option<MaintenanceStatus>,
    #[serde(default = "default_priority")]
    pub priority: MaintenancePriority,
    #[serde(deserialize_with = "date::deserialize")]
    pub scheduled_date: DateTime<Utc>,
    #[validate(custom(function = "non_negative_cost"))]
    pub cost: Option<CostBreakdown>,
    pub technician: Option<String>,
    pub notes: Option<String>,
}

fn default_kind() -> MaintenanceKind {
    MaintenanceKind::Routine
}

fn default_priority() -> MaintenancePriority {
    MaintenancePriority::Medium
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateMaintenanceRequest {
    #[validate(length(min = 1, max = 200, message = "Title cannot be empty"))]
    pub title: Option<String>,
    pub description: Option<String>,
    pub kind: Option<MaintenanceKind>,
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub scheduled_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub completed_date: Option<DateTime<Utc>>,
    #[validate(custom(function = "non_negative_cost"))]
    pub cost: Option<CostBreakdown>,
    pub technician: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceFilters {
    pub status: Option<MaintenanceStatus>,
    pub priority: Option<MaintenancePriority>,
    pub kind: Option<MaintenanceKind>,
    pub bike_id: Option<String>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub scheduled_from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub scheduled_to: Option<DateTime<Utc>>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl MaintenanceFilters {
    pub fn to_document(&self) -> Result<Document, AppError> {
        let mut filter = super::active_filter(self.include_inactive);
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(priority) = self.priority {
            filter.insert("priority", priority);
        }
        if let Some(kind) = self.kind {
            filter.insert("kind", kind);
        }
        if let Some(bike_id) = &self.bike_id {
            filter.insert("bike_id", bike_id.as_str());
        }
        if let Some(range) =
            date_range_filter("scheduled_date", self.scheduled_from, self.scheduled_to)?
        {
            filter.extend(range);
        }
        if let Some(search) = self
            .search
            .as_deref()
            .and_then(|term| search_filter(term, &["title", "technician"]))
        {
            filter.extend(search);
        }
        Ok(filter)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceResponse {
    pub id: String,
    pub bike_id: String,
    pub bike: Option<BikeSummary>,
    pub title: String,
    pub description: Option<String>,
    pub kind: MaintenanceKind,
    pub status: MaintenanceStatus,
    pub priority: MaintenancePriority,
    pub scheduled_date: String,
    pub completed_date: Option<String>,
    pub cost: CostBreakdown,
    pub total_cost: f64,
    pub technician: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Maintenance> for MaintenanceResponse {
    fn from(m: Maintenance) -> Self {
        Self {
            id: m.id,
            bike_id: m.bike_id,
            bike: None,
            title: m.title,
            description: m.description,
            kind: m.kind,
            status: m.status,
            priority: m.priority,
            scheduled_date: m.scheduled_date.to_rfc3339(),
            completed_date: m.completed_date.map(|d| d.to_rfc3339()),
            cost: m.cost,
            total_cost: m.total_cost,
            technician: m.technician,
            notes: m.notes,
            is_active: m.is_active,
            created_at: m.created_at.to_rfc3339(),
            updated_at: m.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_cost_fails_validation() {
        let req: CreateMaintenanceRequest = serde_json::from_str(
            r#"{
                "bikeId": "b-1",
                "title": "Chain",
                "scheduledDate": "2024-06-01",
                "cost": { "parts": -10 }
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn defaults_apply_to_kind_and_priority() {
        let req: CreateMaintenanceRequest = serde_json::from_str(
            r#"{ "bikeId": "b-1", "title": "Service", "scheduledDate": "2024-06-01" }"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.kind, MaintenanceKind::Routine);
        assert_eq!(req.priority, MaintenancePriority::Medium);
    }

    #[test]
    fn filters_cover_priority_and_search() {
        let filters = MaintenanceFilters {
            priority: Some(MaintenancePriority::Critical),
            search: Some("brake".to_string()),
            ..Default::default()
        };
        let doc = filters.to_document().unwrap();
        assert_eq!(doc.get_str("priority").unwrap(), "critical");
        assert_eq!(doc.get_array("$or").unwrap().len(), 2);
    }
}
