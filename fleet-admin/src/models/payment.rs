use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::datetime::{chrono_datetime_as_bson_datetime, opt_chrono_datetime_as_bson_datetime};

string_enum!(PaymentStatus {
    Pending => "pending",
    Paid => "paid",
    Overdue => "overdue",
    Partial => "partial",
    Failed => "failed",
    Refunded => "refunded",
    Cancelled => "cancelled",
});

string_enum!(PaymentKind {
    Rent => "rent",
    Deposit => "deposit",
    Penalty => "penalty",
    Other => "other",
});

string_enum!(PaymentMethod {
    Cash => "cash",
    Upi => "upi",
    Card => "card",
    BankTransfer => "bank_transfer",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Payment {
    #[serde(rename = "_id")]
    pub id: String,
    pub assignment_id: String,
    pub rider_id: String,
    pub amount: f64,
    pub kind: PaymentKind,
    pub method: Option<PaymentMethod>,
    pub status: PaymentStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub due_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub paid_date: Option<DateTime<Utc>>,
    pub transaction_ref: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Payment {
    pub fn new(
        assignment_id: String,
        rider_id: String,
        amount: f64,
        kind: PaymentKind,
        due_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            assignment_id,
            rider_id,
            amount,
            kind,
            method: None,
            status: PaymentStatus::Pending,
            due_date,
            paid_date: None,
            transaction_ref: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// Pending past its due date, or already flagged overdue.
    pub fn is_late(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            PaymentStatus::Overdue => true,
            PaymentStatus::Pending => self.due_date < now,
            _ => false,
        }
    }
}

/// Paid date after a write: an explicit date wins; otherwise the first move to
/// `paid` stamps `now`, and an existing stamp is never overwritten.
pub fn resolve_paid_date(
    existing: Option<DateTime<Utc>>,
    requested: Option<DateTime<Utc>>,
    status: PaymentStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    if requested.is_some() {
        return requested;
    }
    match (existing, status) {
        (Some(stamped), _) => Some(stamped),
        (None, PaymentStatus::Paid) => Some(now),
        (None, _) => None,
    }
}
