use crate::models::{EmergencyContact, IdDocument, Rider, RiderStatus};
use fleet_core::pagination::{search_filter, SortableFields};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SORTABLE: SortableFields = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("name", "name"),
    ("status", "status"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateRiderRequest {
    #[validate(length(min = 1, max = 100, message = "Name is required"))]
    pub name: String,
    #[validate(length(min = 10, max = 15, message = "Phone must be 10 to 15 characters"))]
    pub phone: String,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub id_document: Option<IdDocument>,
    pub emergency_contact: Option<EmergencyContact>,
    pub status: Option<RiderStatus>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateRiderRequest {
    #[validate(length(min = 1, max = 100, message = "Name cannot be empty"))]
    pub name: Option<String>,
    #[validate(length(min = 10, max = 15, message = "Phone must be 10 to 15 characters"))]
    pub phone: Option<String>,
    #[validate(email(message = "Invalid email format"))]
    pub email: Option<String>,
    pub address: Option<String>,
    pub id_document: Option<IdDocument>,
    pub emergency_contact: Option<EmergencyContact>,
    pub status: Option<RiderStatus>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderFilters {
    pub status: Option<RiderStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl RiderFilters {
    pub fn to_document(&self) -> Document {
        let mut filter = super::active_filter(self.include_inactive);
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(search) = self
            .search
            .as_deref()
            .and_then(|term| search_filter(term, &["name", "phone", "email"]))
        {
            filter.extend(search);
        }
        filter
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderResponse {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub email: Option<String>,
    pub address: Option<String>,
    pub id_document: Option<IdDocument>,
    pub emergency_contact: Option<EmergencyContact>,
    pub status: RiderStatus,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Rider> for RiderResponse {
    fn from(rider: Rider) -> Self {
        Self {
            id: rider.id,
            name: rider.name,
            phone: rider.phone,
            email: rider.email,
            address: rider.address,
            id_document: rider.id_document,
            emergency_contact: rider.emergency_contact,
            status: rider.status,
            is_active: rider.is_active,
            created_at: rider.created_at.to_rfc3339(),
            updated_at: rider.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson::doc;

    #[test]
    fn filters_combine_status_and_search() {
        let filters = RiderFilters {
            status: Some(RiderStatus::Active),
            search: Some("ravi".to_string()),
            include_inactive: false,
        };
        let doc = filters.to_document();
        assert!(doc.get_bool("is_active").unwrap());
        assert_eq!(doc.get_str("status").unwrap(), "active");
        assert_eq!(doc.get_array("$or").unwrap().len(), 3);
    }

    #[test]
    fn include_inactive_drops_the_soft_delete_filter() {
        let filters = RiderFilters {
            include_inactive: true,
            ..Default::default()
        };
        assert_eq!(filters.to_document(), doc! {});
    }

    #[test]
    fn short_phone_fails_validation() {
        let req: CreateRiderRequest =
            serde_json::from_str(r#"{ "name": "Asha", "phone": "12345" }"#).unwrap();
        assert!(req.validate().is_err());
    }
}
