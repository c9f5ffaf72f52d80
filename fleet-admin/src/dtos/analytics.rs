use crate::dtos::dates::opt_date;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct StatusCounts {
    pub total: u64,
    pub by_status: BTreeMap<String, u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderStats {
    pub total: u64,
    pub active: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStats {
    pub collected: f64,
    pub pending: f64,
    pub overdue: f64,
    pub count: StatusCounts,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaintenanceStats {
    #[serde(flatten)]
    pub count: StatusCounts,
    pub total_cost: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OverviewResponse {
    pub riders: RiderStats,
    pub bikes: StatusCounts,
    pub assignments: StatusCounts,
    pub payments: PaymentStats,
    pub maintenance: MaintenanceStats,
    pub tickets: StatusCounts,
    pub generated_at: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueParams {
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub from: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "opt_date::deserialize")]
    pub to: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MonthlyRevenue {
    /// Calendar month, `YYYY-MM`.
    pub month: String,
    pub amount: f64,
    pub payments: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RevenueResponse {
    pub months: Vec<MonthlyRevenue>,
    pub total: f64,
}
