//! Alerts derived from live data on every request; nothing is stored.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson};

use crate::dtos::alerts::{Alert, AlertKind, AlertsResponse, Severity, SeverityCounts};
use crate::models::datetime::bson_date;
use crate::models::{
    Bike, BikeStatus, Maintenance, MaintenancePriority, MaintenanceStatus, Payment,
    PaymentStatus, Ticket, TicketPriority, TicketStatus,
};
use crate::services::database::MongoDb;
use fleet_core::error::AppError;

const OPEN_MAINTENANCE: [MaintenanceStatus; 2] =
    [MaintenanceStatus::Scheduled, MaintenanceStatus::InProgress];
const OPEN_TICKETS: [TicketStatus; 3] = [
    TicketStatus::Open,
    TicketStatus::InProgress,
    TicketStatus::Pending,
];

/// Warning while late, critical once more than `critical_after_days` late.
pub fn overdue_severity(days_late: i64, critical_after_days: i64) -> Severity {
    if days_late > critical_after_days {
        Severity::Critical
    } else {
        Severity::Warning
    }
}

/// Most severe first; within a severity the oldest condition first.
pub fn sort_alerts(alerts: &mut [Alert]) {
    alerts.sort_by(|a, b| b.severity.cmp(&a.severity).then(a.since.cmp(&b.since)));
}

pub fn count_by_severity(alerts: &[Alert]) -> SeverityCounts {
    let mut counts = SeverityCounts::default();
    for alert in alerts {
        match alert.severity {
            Severity::Critical => counts.critical += 1,
            Severity::Warning => counts.warning += 1,
            Severity::Info => counts.info += 1,
        }
    }
    counts
}

fn in_list<E: Copy + Into<Bson>>(values: &[E]) -> Vec<Bson> {
    values.iter().map(|v| (*v).into()).collect()
}

fn payment_alert(payment: &Payment, now: DateTime<Utc>, critical_after_days: i64) -> Alert {
    let days_late = (now - payment.due_date).num_days().max(0);
    Alert {
        kind: AlertKind::PaymentOverdue,
        severity: overdue_severity(days_late, critical_after_days),
        message: format!(
            "Payment of {:.2} is {} day(s) overdue",
            payment.amount, days_late
        ),
        entity_type: "payment".to_string(),
        entity_id: payment.id.clone(),
        since: payment.due_date,
    }
}

fn maintenance_alert(kind: AlertKind, severity: Severity, record: &Maintenance) -> Alert {
    let message = match kind {
        AlertKind::CriticalMaintenance => {
            format!("Critical maintenance '{}' is {}", record.title, record.status)
        }
        _ => format!("Maintenance '{}' is past its scheduled date", record.title),
    };
    Alert {
        kind,
        severity,
        message,
        entity_type: "maintenance".to_string(),
        entity_id: record.id.clone(),
        since: record.scheduled_date,
    }
}

fn ticket_alert(ticket: &Ticket) -> Alert {
    let (kind, severity) = match ticket.priority {
        TicketPriority::Urgent => (AlertKind::UrgentTicket, Severity::Critical),
        _ => (AlertKind::HighPriorityTicket, Severity::Warning),
    };
    Alert {
        kind,
        severity,
        message: format!(
            "{} priority ticket '{}' is {}",
            ticket.priority, ticket.subject, ticket.status
        ),
        entity_type: "ticket".to_string(),
        entity_id: ticket.id.clone(),
        since: ticket.created_at,
    }
}

fn untracked_bike_alert(bike: &Bike) -> Alert {
    Alert {
        kind: AlertKind::BikeMaintenanceUntracked,
        severity: Severity::Info,
        message: format!(
            "Bike {} is in maintenance with no open maintenance record",
            bike.bike_number
        ),
        entity_type: "bike".to_string(),
        entity_id: bike.id.clone(),
        since: bike.updated_at,
    }
}

pub async fn current_alerts(
    db: &MongoDb,
    now: DateTime<Utc>,
    critical_after_days: i64,
) -> Result<AlertsResponse, AppError> {
    let mut alerts = Vec::new();
    let now_bson = bson_date(now);

    let late_payments: Vec<Payment> = db
        .payments()
        .find(
            doc! {
                "is_active": true,
                "$or": [
                    { "status": PaymentStatus::Overdue },
                    { "status": PaymentStatus::Pending, "due_date": { "$lt": now_bson.clone() } },
                ],
            },
            None,
        )
        .await?
        .try_collect()
        .await?;
    alerts.extend(
        late_payments
            .iter()
            .map(|p| payment_alert(p, now, critical_after_days)),
    );

    let stale_schedules: Vec<Maintenance> = db
        .maintenance()
        .find(
            doc! {
                "is_active": true,
                "status": MaintenanceStatus::Scheduled,
                "scheduled_date": { "$lt": now_bson },
            },
            None,
        )
        .await?
        .try_collect()
        .await?;
    alerts.extend(stale_schedules.iter().map(|m| {
        maintenance_alert(AlertKind::MaintenanceOverdue, Severity::Warning, m)
    }));

    let open_maintenance: Vec<Maintenance> = db
        .maintenance()
        .find(
            doc! {
                "is_active": true,
                "status": { "$in": in_list(&OPEN_MAINTENANCE) },
            },
            None,
        )
        .await?
        .try_collect()
        .await?;
    alerts.extend(
        open_maintenance
            .iter()
            .filter(|m| m.priority == MaintenancePriority::Critical)
            .map(|m| maintenance_alert(AlertKind::CriticalMaintenance, Severity::Critical, m)),
    );

    let pressing_tickets: Vec<Ticket> = db
        .tickets()
        .find(
            doc! {
                "is_active": true,
                "status": { "$in": in_list(&OPEN_TICKETS) },
                "priority": { "$in": in_list(&[TicketPriority::Urgent, TicketPriority::High]) },
            },
            None,
        )
        .await?
        .try_collect()
        .await?;
    alerts.extend(pressing_tickets.iter().map(ticket_alert));

    let tracked: HashSet<&str> = open_maintenance.iter().map(|m| m.bike_id.as_str()).collect();
    let bikes_in_maintenance: Vec<Bike> = db
        .bikes()
        .find(
            doc! { "is_active": true, "status": BikeStatus::Maintenance },
            None,
        )
        .await?
        .try_collect()
        .await?;
    alerts.extend(
        bikes_in_maintenance
            .iter()
            .filter(|b| !tracked.contains(b.id.as_str()))
            .map(untracked_bike_alert),
    );

    sort_alerts(&mut alerts);
    let counts = count_by_severity(&alerts);

    Ok(AlertsResponse { alerts, counts })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentKind;
    use chrono::Duration;

    fn alert(severity: Severity, since: DateTime<Utc>) -> Alert {
        Alert {
            kind: AlertKind::PaymentOverdue,
            severity,
            message: String::new(),
            entity_type: "payment".to_string(),
            entity_id: "p".to_string(),
            since,
        }
    }

    #[test]
    fn overdue_becomes_critical_after_threshold() {
        assert_eq!(overdue_severity(0, 7), Severity::Warning);
        assert_eq!(overdue_severity(7, 7), Severity::Warning);
        assert_eq!(overdue_severity(8, 7), Severity::Critical);
    }

    #[test]
    fn alerts_sort_by_severity_then_age() {
        let now = Utc::now();
        let mut alerts = vec![
            alert(Severity::Info, now - Duration::days(30)),
            alert(Severity::Warning, now - Duration::days(1)),
            alert(Severity::Critical, now),
            alert(Severity::Warning, now - Duration::days(5)),
        ];
        sort_alerts(&mut alerts);

        let order: Vec<Severity> = alerts.iter().map(|a| a.severity).collect();
        assert_eq!(
            order,
            vec![
                Severity::Critical,
                Severity::Warning,
                Severity::Warning,
                Severity::Info
            ]
        );
        assert!(alerts[1].since < alerts[2].since);
    }

    #[test]
    fn payment_alert_reports_days_late() {
        let now = Utc::now();
        let payment = Payment::new(
            "a".into(),
            "r".into(),
            1200.0,
            PaymentKind::Rent,
            now - Duration::days(10),
        );
        let alert = payment_alert(&payment, now, 7);
        assert_eq!(alert.severity, Severity::Critical);
        assert!(alert.message.contains("10 day(s)"));
    }

    #[test]
    fn counts_tally_each_severity() {
        let now = Utc::now();
        let alerts = vec![
            alert(Severity::Critical, now),
            alert(Severity::Warning, now),
            alert(Severity::Warning, now),
        ];
        assert_eq!(
            count_by_severity(&alerts),
            SeverityCounts {
                critical: 1,
                warning: 2,
                info: 0
            }
        );
    }
}
