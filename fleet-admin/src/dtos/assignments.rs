use crate::dtos::dates::{date, opt_date};
use crate::dtos::{BikeSummary, RiderSummary};
use crate::models::{Assignment, AssignmentPaymentStatus, AssignmentStatus};
use chrono::{DateTime, Utc};
use fleet_core::pagination::SortableFields;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SORTABLE: SortableFields = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("startDate", "start_date"),
    ("endDate", "end_date"),
    ("monthlyCharge", "monthly_charge"),
    ("pendingAmount", "pending_amount"),
    ("status", "status"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateAssignmentRequest {
    #[validate(length(min = 1, message = "Rider is required"))]
    pub rider_id: String,
    #[validate(length(min = 1, message = "Bike is required"))]
    pub bike_id: String,
    #[serde(deserialize_with = "date::deserialize")]
    pub start_date: DateTime<Utc>,
    #[validate(range(min = 1, max = 60, message = "Tenure must be 1 to 60 months"))]
    pub tenure_months: i32,
    #[validate(range(min = 0.0, message = "Monthly charge cannot be negative"))]
    pub monthly_charge: f64,
    #[serde(default)]
    #[validate(range(min = 0.0, message = "Security deposit cannot be negative"))]
    pub security_deposit: f64,
    pub status: Option<AssignmentStatus>,
    pub notes: Option<String>,
}

/// Rider and bike are fixed once an assignment exists; everything else may change.
#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAssignmentRequest {
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub start_date: Option<DateTime<Utc>>,
    #[validate(range(min = 1, max = 60, message = "Tenure must be 1 to 60 months"))]
    pub tenure_months: Option<i32>,
    #[validate(range(min = 0.0, message = "Monthly charge cannot be negative"))]
    pub monthly_charge: Option<f64>,
    #[validate(range(min = 0.0, message = "Security deposit cannot be negative"))]
    pub security_deposit: Option<f64>,
    pub status: Option<AssignmentStatus>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentFilters {
    pub status: Option<AssignmentStatus>,
    pub payment_status: Option<AssignmentPaymentStatus>,
    pub rider_id: Option<String>,
    pub bike_id: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl AssignmentFilters {
    pub fn to_document(&self) -> Document {
        let mut filter = super::active_filter(self.include_inactive);
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(payment_status) = self.payment_status {
            filter.insert("payment_status", payment_status);
        }
        if let Some(rider_id) = &self.rider_id {
            filter.insert("rider_id", rider_id.as_str());
        }
        if let Some(bike_id) = &self.bike_id {
            filter.insert("bike_id", bike_id.as_str());
        }
        filter
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentResponse {
    pub id: String,
    pub rider_id: String,
    pub bike_id: String,
    pub rider: Option<RiderSummary>,
    pub bike: Option<BikeSummary>,
    pub start_date: String,
    pub tenure_months: i32,
    pub end_date: String,
    pub monthly_charge: f64,
    pub security_deposit: f64,
    pub status: AssignmentStatus,
    pub paid_amount: f64,
    pub pending_amount: f64,
    pub payment_status: AssignmentPaymentStatus,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Assignment> for AssignmentResponse {
    fn from(a: Assignment) -> Self {
        Self {
            id: a.id,
            rider_id: a.rider_id,
            bike_id: a.bike_id,
            rider: None,
            bike: None,
            start_date: a.start_date.to_rfc3339(),
            tenure_months: a.tenure_months,
            end_date: a.end_date.to_rfc3339(),
            monthly_charge: a.monthly_charge,
            security_deposit: a.security_deposit,
            status: a.status,
            paid_amount: a.paid_amount,
            pending_amount: a.pending_amount,
            payment_status: a.payment_status,
            notes: a.notes,
            is_active: a.is_active,
            created_at: a.created_at.to_rfc3339(),
            updated_at: a.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_accepts_plain_start_date() {
        let req: CreateAssignmentRequest = serde_json::from_str(
            r#"{
                "riderId": "r-1",
                "bikeId": "b-1",
                "startDate": "2024-04-01",
                "tenureMonths": 3,
                "monthlyCharge": 1500
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_ok());
        assert_eq!(req.security_deposit, 0.0);
    }

    #[test]
    fn zero_tenure_fails_validation() {
        let req: CreateAssignmentRequest = serde_json::from_str(
            r#"{
                "riderId": "r-1",
                "bikeId": "b-1",
                "startDate": "2024-04-01",
                "tenureMonths": 0,
                "monthlyCharge": 1500
            }"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
    }

    #[test]
    fn filters_match_on_payment_status() {
        let filters = AssignmentFilters {
            payment_status: Some(AssignmentPaymentStatus::Paid),
            rider_id: Some("r-1".to_string()),
            ..Default::default()
        };
        let doc = filters.to_document();
        assert_eq!(doc.get_str("payment_status").unwrap(), "paid");
        assert_eq!(doc.get_str("rider_id").unwrap(), "r-1");
    }
}
