use crate::dtos::RiderSummary;
use crate::models::{
    SenderRole, Ticket, TicketCategory, TicketPriority, TicketReply, TicketStatus,
};
use fleet_core::pagination::{search_filter, SortableFields};
use mongodb::bson::Document;
use serde::{Deserialize, Serialize};
use validator::Validate;

pub const SORTABLE: SortableFields = &[
    ("createdAt", "created_at"),
    ("updatedAt", "updated_at"),
    ("priority", "priority"),
    ("status", "status"),
    ("resolvedAt", "resolved_at"),
];

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateTicketRequest {
    pub rider_id: Option<String>,
    #[validate(length(min = 1, max = 200, message = "Subject is required"))]
    pub subject: String,
    #[validate(length(min = 1, message = "Description is required"))]
    pub description: String,
    #[serde(default = "default_category")]
    pub category: TicketCategory,
    #[serde(default = "default_priority")]
    pub priority: TicketPriority,
}

fn default_category() -> TicketCategory {
    TicketCategory::Other
}

fn default_priority() -> TicketPriority {
    TicketPriority::Medium
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTicketRequest {
    #[validate(length(min = 1, max = 200, message = "Subject cannot be empty"))]
    pub subject: Option<String>,
    #[validate(length(min = 1, message = "Description cannot be empty"))]
    pub description: Option<String>,
    pub category: Option<TicketCategory>,
    pub priority: Option<TicketPriority>,
    pub status: Option<TicketStatus>,
}

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateReplyRequest {
    #[validate(length(min = 1, max = 5000, message = "Message is required"))]
    pub message: String,
    #[serde(default = "default_sender_role")]
    pub sender_role: SenderRole,
    pub sender_name: Option<String>,
    #[serde(default)]
    pub is_internal: bool,
}

fn default_sender_role() -> SenderRole {
    SenderRole::Admin
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketFilters {
    pub status: Option<TicketStatus>,
    pub priority: Option<TicketPriority>,
    pub category: Option<TicketCategory>,
    pub rider_id: Option<String>,
    pub search: Option<String>,
    #[serde(default)]
    pub include_inactive: bool,
}

impl TicketFilters {
    pub fn to_document(&self) -> Document {
        let mut filter = super::active_filter(self.include_inactive);
        if let Some(status) = self.status {
            filter.insert("status", status);
        }
        if let Some(priority) = self.priority {
            filter.insert("priority", priority);
        }
        if let Some(category) = self.category {
            filter.insert("category", category);
        }
        if let Some(rider_id) = &self.rider_id {
            filter.insert("rider_id", rider_id.as_str());
        }
        if let Some(search) = self
            .search
            .as_deref()
            .and_then(|term| search_filter(term, &["subject", "description"]))
        {
            filter.extend(search);
        }
        filter
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReplyResponse {
    pub id: String,
    pub sender_role: SenderRole,
    pub sender_name: Option<String>,
    pub message: String,
    pub is_internal: bool,
    pub created_at: String,
}

impl From<TicketReply> for ReplyResponse {
    fn from(r: TicketReply) -> Self {
        Self {
            id: r.id,
            sender_role: r.sender_role,
            sender_name: r.sender_name,
            message: r.message,
            is_internal: r.is_internal,
            created_at: r.created_at.to_rfc3339(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TicketResponse {
    pub id: String,
    pub rider_id: Option<String>,
    pub rider: Option<RiderSummary>,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    pub replies: Vec<ReplyResponse>,
    pub reply_count: usize,
    pub resolved_at: Option<String>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<Ticket> for TicketResponse {
    fn from(t: Ticket) -> Self {
        let replies: Vec<ReplyResponse> = t.replies.into_iter().map(ReplyResponse::from).collect();
        Self {
            id: t.id,
            rider_id: t.rider_id,
            rider: None,
            subject: t.subject,
            description: t.description,
            category: t.category,
            priority: t.priority,
            status: t.status,
            reply_count: replies.len(),
            replies,
            resolved_at: t.resolved_at.map(|d| d.to_rfc3339()),
            is_active: t.is_active,
            created_at: t.created_at.to_rfc3339(),
            updated_at: t.updated_at.to_rfc3339(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn replies_default_to_external_admin_messages() {
        let req: CreateReplyRequest =
            serde_json::from_str(r#"{ "message": "We are on it" }"#).unwrap();
        assert!(!req.is_internal);
        assert_eq!(req.sender_role, SenderRole::Admin);
        assert!(req.validate().is_ok());
    }

    #[test]
    fn hyphenated_status_filter_parses() {
        let filters: TicketFilters =
            serde_json::from_str(r#"{ "status": "in-progress" }"#).unwrap();
        assert_eq!(
            filters.to_document().get_str("status").unwrap(),
            "in-progress"
        );
    }

    #[test]
    fn response_preserves_reply_order() {
        let mut ticket = Ticket::new(
            None,
            "Flat tyre".into(),
            "Rear tyre punctured".into(),
            TicketCategory::BikeIssue,
            TicketPriority::High,
        );
        ticket.replies.push(TicketReply::new(SenderRole::Rider, None, "first".into(), false));
        ticket.replies.push(TicketReply::new(SenderRole::Admin, None, "second".into(), true));

        let response = TicketResponse::from(ticket);
        assert_eq!(response.reply_count, 2);
        assert_eq!(response.replies[0].message, "first");
        assert_eq!(response.replies[1].message, "second");
    }
}
