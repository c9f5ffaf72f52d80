use chrono::{DateTime, Months, Utc};
use serde::{Deserialize, Serialize};

use super::datetime::chrono_datetime_as_bson_datetime;

string_enum!(AssignmentStatus {
    Pending => "pending",
    Active => "active",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl AssignmentStatus {
    /// Open assignments hold their rider and bike exclusively.
    pub fn is_open(&self) -> bool {
        matches!(self, AssignmentStatus::Pending | AssignmentStatus::Active)
    }
}

string_enum!(AssignmentPaymentStatus {
    Pending => "pending",
    Paid => "paid",
});

/// A rental contract between one rider and one bike.
///
/// `paid_amount`, `pending_amount` and `payment_status` are derived from the
/// assignment's active payments and are only written by the totals
/// synchronizer, guarded by `totals_revision`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: String,
    pub rider_id: String,
    pub bike_id: String,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub start_date: DateTime<Utc>,
    pub tenure_months: i32,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub end_date: DateTime<Utc>,
    pub monthly_charge: f64,
    pub security_deposit: f64,
    pub status: AssignmentStatus,
    pub paid_amount: f64,
    pub pending_amount: f64,
    pub payment_status: AssignmentPaymentStatus,
    #[serde(default)]
    pub totals_revision: i64,
    /// Mirrors `status.is_open()`; backs the partial unique indexes.
    pub is_open: bool,
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Assignment {
    pub fn new(
        rider_id: String,
        bike_id: String,
        start_date: DateTime<Utc>,
        tenure_months: i32,
        monthly_charge: f64,
        security_deposit: f64,
    ) -> Option<Self> {
        let end_date = end_date_for(start_date, tenure_months)?;
        let now = Utc::now();
        let status = AssignmentStatus::Active;
        Some(Self {
            id: super::new_id(),
            rider_id,
            bike_id,
            start_date,
            tenure_months,
            end_date,
            monthly_charge,
            security_deposit,
            status,
            paid_amount: 0.0,
            pending_amount: 0.0,
            payment_status: AssignmentPaymentStatus::Pending,
            totals_revision: 0,
            is_open: status.is_open(),
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        })
    }

    /// Total rent over the tenure, excluding the deposit.
    pub fn contract_value(&self) -> f64 {
        self.monthly_charge * f64::from(self.tenure_months)
    }
}

/// End of a tenure starting at `start`. Month arithmetic clamps to the last
/// day of shorter months (Jan 31 + 1 month = Feb 28/29).
pub fn end_date_for(start: DateTime<Utc>, tenure_months: i32) -> Option<DateTime<Utc>> {
    let months = u32::try_from(tenure_months).ok()?;
    start.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn end_date_adds_whole_months() {
        let start = Utc.with_ymd_and_hms(2024, 3, 15, 9, 0, 0).unwrap();
        let end = end_date_for(start, 3).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 6, 15, 9, 0, 0).unwrap());
    }

    #[test]
    fn end_date_clamps_to_month_end() {
        let start = Utc.with_ymd_and_hms(2024, 1, 31, 0, 0, 0).unwrap();
        let end = end_date_for(start, 1).unwrap();
        assert_eq!(end, Utc.with_ymd_and_hms(2024, 2, 29, 0, 0, 0).unwrap());
    }

    #[test]
    fn negative_tenure_has_no_end_date() {
        let start = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        assert!(end_date_for(start, -1).is_none());
    }

    #[test]
    fn only_pending_and_active_are_open() {
        let open: Vec<_> = AssignmentStatus::ALL
            .iter()
            .filter(|s| s.is_open())
            .copied()
            .collect();
        assert_eq!(
            open,
            vec![AssignmentStatus::Pending, AssignmentStatus::Active]
        );
    }

    #[test]
    fn new_assignment_starts_unpaid_and_open() {
        let start = Utc.with_ymd_and_hms(2024, 5, 1, 0, 0, 0).unwrap();
        let a = Assignment::new("r".into(), "b".into(), start, 6, 1500.0, 2000.0).unwrap();
        assert!(a.is_open);
        assert_eq!(a.payment_status, AssignmentPaymentStatus::Pending);
        assert_eq!(a.contract_value(), 9000.0);
    }
}
