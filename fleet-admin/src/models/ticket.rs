use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::datetime::{chrono_datetime_as_bson_datetime, opt_chrono_datetime_as_bson_datetime};

string_enum!(TicketStatus {
    Open => "open",
    InProgress => "in-progress",
    Pending => "pending",
    Resolved => "resolved",
    Closed => "closed",
});

string_enum!(TicketPriority {
    Low => "low",
    Medium => "medium",
    High => "high",
    Urgent => "urgent",
});

string_enum!(TicketCategory {
    Billing => "billing",
    Technical => "technical",
    BikeIssue => "bike_issue",
    Account => "account",
    Other => "other",
});

string_enum!(SenderRole {
    Admin => "admin",
    Rider => "rider",
    System => "system",
});

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TicketReply {
    pub id: String,
    pub sender_role: SenderRole,
    pub sender_name: Option<String>,
    pub message: String,
    pub is_internal: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl TicketReply {
    pub fn new(
        sender_role: SenderRole,
        sender_name: Option<String>,
        message: String,
        is_internal: bool,
    ) -> Self {
        Self {
            id: super::new_id(),
            sender_role,
            sender_name,
            message,
            is_internal,
            created_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ticket {
    #[serde(rename = "_id")]
    pub id: String,
    pub rider_id: Option<String>,
    pub subject: String,
    pub description: String,
    pub category: TicketCategory,
    pub priority: TicketPriority,
    pub status: TicketStatus,
    /// Insertion-ordered conversation; only ever appended to.
    #[serde(default)]
    pub replies: Vec<TicketReply>,
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "opt_chrono_datetime_as_bson_datetime"
    )]
    pub resolved_at: Option<DateTime<Utc>>,
    pub is_active: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub updated_at: DateTime<Utc>,
}

impl Ticket {
    pub fn new(
        rider_id: Option<String>,
        subject: String,
        description: String,
        category: TicketCategory,
        priority: TicketPriority,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: super::new_id(),
            rider_id,
            subject,
            description,
            category,
            priority,
            status: TicketStatus::Open,
            replies: Vec::new(),
            resolved_at: None,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}

/// An externally visible reply pulls a closed ticket back to `open`.
pub fn reply_reopens(status: TicketStatus, is_internal: bool) -> bool {
    !is_internal && status == TicketStatus::Closed
}

/// `resolved_at` is stamped on the first move to `resolved` and kept after.
pub fn resolve_resolved_at(
    existing: Option<DateTime<Utc>>,
    status: TicketStatus,
    now: DateTime<Utc>,
) -> Option<DateTime<Utc>> {
    match (existing, status) {
        (Some(at), _) => Some(at),
        (None, TicketStatus::Resolved) => Some(now),
        (None, _) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn external_reply_reopens_closed_ticket() {
        assert!(reply_reopens(TicketStatus::Closed, false));
    }

    #[test]
    fn internal_reply_never_reopens() {
        assert!(!reply_reopens(TicketStatus::Closed, true));
    }

    #[test]
    fn only_closed_tickets_are_reopened() {
        for status in TicketStatus::ALL {
            if *status != TicketStatus::Closed {
                assert!(!reply_reopens(*status, false), "{} reopened", status);
            }
        }
    }

    #[test]
    fn resolved_at_is_stamped_once() {
        let now = Utc::now();
        assert_eq!(
            resolve_resolved_at(None, TicketStatus::Resolved, now),
            Some(now)
        );
        let earlier = now - chrono::Duration::hours(2);
        assert_eq!(
            resolve_resolved_at(Some(earlier), TicketStatus::Resolved, now),
            Some(earlier)
        );
        assert_eq!(resolve_resolved_at(None, TicketStatus::Open, now), None);
    }

    #[test]
    fn in_progress_uses_hyphen_on_the_wire() {
        let json = serde_json::to_string(&TicketStatus::InProgress).unwrap();
        assert_eq!(json, "\"in-progress\"");
    }
}
