use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::datetime::{chrono_datetime_as_bson_datetime, opt_chrono_datetime_as_bson_datetime};

string_enum!(MaintenanceStatus {
    Scheduled => "scheduled",
    InProgress => "in_progress",
    Completed => "completed",
    Cancelled => "cancelled",
});

impl MaintenanceStatus {
    pub fn is_finished(&self) -> bool {
        matches!(
            self,
            MaintenanceStatus::Completed | MaintenanceStatus::Cancelled
        )
    }

    /// Whether moving a record from `self` to `to` hands its bike back.
    /// Cancelling work that never started leaves the bike where it is.
    pub fn releases_bike(self, to: MaintenanceStatus) -> bool {
        match to {
            MaintenanceStatus::Completed => !self.is_finished(),
            MaintenanceStatus::Cancelled => self == MaintenanceStatus::InProgress,
            _ => false,
        }
    }
}

string_enum!(MaintenancePriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Critical => "critical",
});

string_enum!(MaintenanceKind {
    Routine => "routine",
    Repair => "repair",
    Inspection => "inspection",
    Emergency => "emergency",
});

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CostBreakdown {
    #[serde(default)]
    pub parts: f64,
    #[serde(default)]
    pub labor: f64,
    #[serde(default)]
    pub other: f64,
}

impl CostBreakdown {
    pub fn total(&self) -> f64 {
        self.parts + self.labor + self.other
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Maintenance {
    #[serde(rename = "_id")]
    pub id: String,
    pub bike_id: String,
    pub title: String,
    pub description: Option<String>,
    pub kind: MaintenanceKind,
    pub status: MaintenanceStatus,
    pub priority: MaintenancePriority,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub scheduled_date: DateTime<Utc>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub completed_date: Option<DateTime<Utc>>,
    pub cost: CostBreakdown,
    /// Denormalized `cost.total()` so analytics can `$sum` it directly.
    pub total_cost: f64,
    pub technician: Option<String>,
    pub notes: Option<String>,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Maintenance {
    pub fn new(
        bike_id: String,
        title: String,
        kind: MaintenanceKind,
        priority: MaintenancePriority,
        scheduled_date: DateTime<Utc>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            bike_id,
            title,
            description: None,
            kind,
            status: MaintenanceStatus::Scheduled,
            priority,
            scheduled_date,
            completed_date: None,
            cost: CostBreakdown::default(),
            total_cost: 0.0,
            technician: None,
            notes: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn set_cost(&mut self, cost: CostBreakdown) {
        self.total_cost = cost.total();
        self.cost = cost;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cost_total_sums_all_parts() {
        let cost = CostBreakdown {
            parts: 450.0,
            labor: 200.0,
            other: 50.5,
        };
        assert_eq!(cost.total(), 700.5);
    }

    #[test]
    fn set_cost_keeps_total_in_step() {
        let mut m = Maintenance::new(
            "bike".into(),
            "Brake pads".into(),
            MaintenanceKind::Repair,
            MaintenancePriority::High,
            Utc::now(),
        );
        m.set_cost(CostBreakdown {
            parts: 300.0,
            labor: 100.0,
            other: 0.0,
        });
        assert_eq!(m.total_cost, 400.0);
    }

    #[test]
    fn in_progress_uses_underscore_on_the_wire() {
        let json = serde_json::to_string(&MaintenanceStatus::InProgress).unwrap();
        assert_eq!(json, "\"in_progress\"");
        assert!(!MaintenanceStatus::InProgress.is_finished());
        assert!(MaintenanceStatus::Cancelled.is_finished());
    }

    #[test]
    fn only_started_or_completed_work_releases_the_bike() {
        use MaintenanceStatus::*;
        assert!(InProgress.releases_bike(Completed));
        assert!(InProgress.releases_bike(Cancelled));
        assert!(Scheduled.releases_bike(Completed));
        assert!(!Scheduled.releases_bike(Cancelled));
        assert!(!Completed.releases_bike(Completed));
        assert!(!Cancelled.releases_bike(Completed));
        assert!(!InProgress.releases_bike(InProgress));
    }
}
