use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ordered so that `Critical` sorts highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    PaymentOverdue,
    MaintenanceOverdue,
    CriticalMaintenance,
    UrgentTicket,
    HighPriorityTicket,
    BikeMaintenanceUntracked,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub kind: AlertKind,
    pub severity: Severity,
    pub message: String,
    /// `payment`, `maintenance`, `ticket` or `bike`.
    pub entity_type: String,
    pub entity_id: String,
    /// When the condition began (due date, scheduled date or creation time).
    pub since: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct SeverityCounts {
    pub critical: u64,
    pub warning: u64,
    pub info: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsResponse {
    pub alerts: Vec<Alert>,
    pub counts: SeverityCounts,
}
