use crate::dtos::dates::{date, opt_date};
use crate::dtos::{date_range_filter, AssignmentSummary, RiderSummary};
use crate::models::{Payment, PaymentKind, PaymentMethod, PaymentStatus};
use chrono::{DateTime, Utc};
use fleet_core::error::AppError;
use fleet_core::pagination::SortableFields;
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SORTABLE: SortableFields = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("dueDate", "due_date"),
    ("paidDate", "paid_date"),
    ("amount", "amount"),
    ("status", "status"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreatePaymentRequest {
    #[validate(length(min = 1, message = "Assignment is required"))]
    pub assignment_id: String,
    /// Optional; must match the assignment's rider when given.
    pub rider_id: Option<String>,
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: f64,
    #[serde(default = "default_kind")]
    pub kind: PaymentKind,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    #[serde(deserialize_with = "date::deserialize")]
    pub due_date: DateTime<Utc>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub paid_date: Option<DateTime<Utc>>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
}

fn default_kind() -> PaymentKind {
    PaymentKind::Rent
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdatePaymentRequest {
    #[validate(range(exclusive_min = 0.0, message = "Amount must be greater than zero"))]
    pub amount: Option<f64>,
    pub kind: Option<PaymentKind>,
    pub method: Option<PaymentMethod>,
    pub status: Option<PaymentStatus>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub due_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub paid_date: Option<DateTime<Utc>>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentFilters {
    pub status: Option<PaymentStatus>,
    pub kind: Option<PaymentKind>,
    pub assignment_id: Option<String>,
    pub rider_id: Option<String>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub due_from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub due_to: Option<DateTime<Utc>>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl PaymentFilters {
    pub fn to_document(&self) -> Result<Document, AppError> {
        let mut filter = super::active_filter(self.include_inactive);
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(kind) = self.kind {
            filter.insert("kind", kind);
        }
        if let Some(assignment_id) = &self.assignment_id {
            filter.insert("assignment_id", assignment_id.as_str());
        }
        if let Some(rider_id) = &self.rider_id {
            filter.insert("rider_id", rider_id.as_str());
        }
        if let Some(range) = date_range_filter("due_date", self.due_from, self.due_to)? {
            filter.extend(range);
        }
        Ok(filter)
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentResponse {
    pub id: String,
    pub assignment_id: String,
    pub rider_id: String,
    pub assignment: Option<AssignmentSummary>,
    pub rider: Option<RiderSummary>,
    pub amount: f64,
    pub kind: PaymentKind,
    pub method: Option<PaymentMethod>,
    pub status: PaymentStatus,
    pub due_date: String,
    pub paid_date: Option<String>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Payment> for PaymentResponse {
    fn from(p: Payment) -> Self {
        Self {
            id: p.id,
            assignment_id: p.assignment_id,
            rider_id: p.rider_id,
            assignment: None,
            rider: None,
            amount: p.amount,
            kind: p.kind,
            method: p.method,
            status: p.status,
            due_date: p.due_date.to_rfc3339(),
            paid_date: p.paid_date.map(|d| d.to_rfc3339()),
            transaction_ref: p.transaction_ref,
            notes: p.notes,
            is_active: p.is_active,
            created_at: p.created_at.to_rfc3339(),
            updated_at: p.updated_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverdueSweepResponse {
    pub marked_overdue: u64,
    pub assignments_recomputed: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_amount_fails_validation() {
        let req: CreatePaymentRequest = serde_json::from_str(
            r#"{ "assignmentId": "a-1", "amount": 0, "dueDate": "2024-05-01" }"#,
        )
        .unwrap();
        assert!(req.validate().is_err());
        assert_eq!(req.kind, PaymentKind::Rent);
    }

    #[test]
    fn due_range_filter_is_applied() {
        let filters: PaymentFilters = serde_json::from_str(
            r#"{ "dueFrom": "2024-01-01", "dueTo": "2024-01-31", "status": "pending" }"#,
        )
        .unwrap();
        let doc = filters.to_document().unwrap();
        let range = doc.get_document("due_date").unwrap();
        assert!(range.contains_key("$gte") && range.contains_key("$lte"));
        assert_eq!(doc.get_str("status").unwrap(), "pending");
    }

    #[test]
    fn inverted_due_range_is_a_bad_request() {
        let filters: PaymentFilters =
            serde_json::from_str(r#"{ "dueFrom": "2024-02-01", "dueTo": "2024-01-01" }"#)
                .unwrap();
        assert!(matches!(
            filters.to_document(),
            Err(AppError::BadRequest(_))
        ));
    }
}
