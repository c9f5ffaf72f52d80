use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::datetime::chrono_datetime_as_bson_datetime;

string_enum!(RiderStatus {
    Active => "active",
    Inactive => "inactive",
});

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct IdDocument {
    /// e.g. "aadhaar", "driving_license", "passport"
    pub kind: String,
    pub number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EmergencyContact {
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rider {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub id_document: Option<IdDocument>,
    pub emergency_contact: Option<EmergencyContact>,
    pub status: RiderStatus,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Rider {
    pub fn new(name: String, phone: String) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            name,
            phone,
            email: None,
            address: None,
            id_document: None,
            emergency_contact: None,
            status: RiderStatus::Active,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }

    /// A rider can take a new bike only while active and not soft-deleted.
    pub fn can_rent(&self) -> bool {
        self.is_active && self.status == RiderStatus::Active
    }
}
