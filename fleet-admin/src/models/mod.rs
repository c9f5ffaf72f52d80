/// Declare a string-valued enum that serializes to its wire name, converts into
/// BSON for use in filters, and exposes every variant through `ALL`.
macro_rules! string_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $value:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
        pub enum $name {
            $(#[serde(rename = $value)] $variant),+
        }

        impl $name {
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $value),+
                }
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl From<$name> for mongodb::bson::Bson {
            fn from(value: $name) -> Self {
                mongodb::bson::Bson::String(value.as_str().to_string())
            }
        }
    };
}

mod assignment;
mod bike;
pub mod datetime;
mod maintenance;
mod payment;
mod rider;
mod ticket;

pub use assignment::{end_date_for, Assignment, AssignmentPaymentStatus, AssignmentStatus};
pub use bike::{Bike, BikeStatus};
pub use maintenance::{
    CostBreakdown, Maintenance, MaintenanceKind, MaintenancePriority, MaintenanceStatus,
};
pub use payment::{resolve_paid_date, Payment, PaymentKind, PaymentMethod, PaymentStatus};
pub use rider::{EmergencyContact, IdDocument, Rider, RiderStatus};
pub use ticket::{
    reply_reopens, resolve_resolved_at, SenderRole, Ticket, TicketCategory, TicketPriority,
    TicketReply, TicketStatus,
};

/// Fresh document id.
pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
