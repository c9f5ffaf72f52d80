use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::datetime::{chrono_datetime_as_bson_datetime, opt_chrono_datetime_as_bson_datetime};

string_enum!(BikeStatus {
    Available => "available",
    Assigned => "assigned",
    Maintenance => "maintenance",
    Retired => "retired",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Bike {
    #[serde(rename = "_id")]
    pub id: String,
    pub bike_number: String,
    pub registration_number: String,
    pub model: String,
    pub zone: Option<String>,
    pub status: BikeStatus,
    pub current_assignment_id: Option<String>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub purchase_date: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Bike {
    pub fn new(bike_number: String, registration_number: String, model: String) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            bike_number,
            registration_number,
            model,
            zone: None,
            status: BikeStatus::Available,
            current_assignment_id: None,
            purchase_date: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_assignable(&self) -> bool {
        self.is_active && self.status == BikeStatus::Available
    }
}
