//! Dashboard aggregates computed with `$group` pipelines over active documents.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use mongodb::bson::{doc, Bson, Document};
use mongodb::Collection;

use crate::dtos::analytics::{
    MaintenanceStats, MonthlyRevenue, OverviewResponse, PaymentStats, RevenueResponse,
    RiderStats, StatusCounts,
};
use crate::dtos::date_range_filter;
use crate::models::{
    AssignmentStatus, BikeStatus, MaintenanceStatus, PaymentStatus, RiderStatus, TicketStatus,
};
use crate::services::database::MongoDb;
use fleet_core::error::AppError;

/// Count and optional sum for one status bucket.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct Bucket {
    count: u64,
    sum: f64,
}

/// Numeric BSON values come back as Int32, Int64 or Double depending on input.
fn number(doc: &Document, key: &str) -> f64 {
    match doc.get(key) {
        Some(Bson::Int32(v)) => f64::from(*v),
        Some(Bson::Int64(v)) => *v as f64,
        Some(Bson::Double(v)) => *v,
        _ => 0.0,
    }
}

async fn group_by_status<T: Send + Sync>(
    collection: &Collection<T>,
    sum_field: Option<&str>,
) -> Result<HashMap<String, Bucket>, AppError> {
    let sum = match sum_field {
        Some(field) => Bson::String(format!("${}", field)),
        None => Bson::Int32(0),
    };
    let pipeline = vec![
        doc! { "$match": { "is_active": true } },
        doc! { "$group": {
            "_id": "$status",
            "count": { "$sum": 1 },
            "sum": { "$sum": sum },
        } },
    ];

    let rows: Vec<Document> = collection.aggregate(pipeline, None).await?.try_collect().await?;

    Ok(rows
        .iter()
        .filter_map(|row| {
            let status = row.get_str("_id").ok()?.to_string();
            Some((
                status,
                Bucket {
                    count: number(row, "count") as u64,
                    sum: number(row, "sum"),
                },
            ))
        })
        .collect())
}

/// Every known status appears, zero-filled, so dashboards get a stable shape.
fn status_counts(buckets: &HashMap<String, Bucket>, statuses: &[&'static str]) -> StatusCounts {
    let by_status: BTreeMap<String, u64> = statuses
        .iter()
        .map(|s| (s.to_string(), buckets.get(*s).map_or(0, |b| b.count)))
        .collect();
    StatusCounts {
        total: buckets.values().map(|b| b.count).sum(),
        by_status,
    }
}

fn names<E: Copy>(all: &[E], as_str: fn(&E) -> &'static str) -> Vec<&'static str> {
    all.iter().map(as_str).collect()
}

fn bucket_sum(buckets: &HashMap<String, Bucket>, status: &str) -> f64 {
    buckets.get(status).map_or(0.0, |b| b.sum)
}

pub async fn overview(db: &MongoDb) -> Result<OverviewResponse, AppError> {
    let riders = group_by_status(&db.riders(), None).await?;
    let bikes = group_by_status(&db.bikes(), None).await?;
    let assignments = group_by_status(&db.assignments(), None).await?;
    let payments = group_by_status(&db.payments(), Some("amount")).await?;
    let maintenance = group_by_status(&db.maintenance(), Some("total_cost")).await?;
    let tickets = group_by_status(&db.tickets(), None).await?;

    let rider_counts = status_counts(&riders, &names(RiderStatus::ALL, RiderStatus::as_str));

    Ok(OverviewResponse {
        riders: RiderStats {
            total: rider_counts.total,
            active: rider_counts
                .by_status
                .get(RiderStatus::Active.as_str())
                .copied()
                .unwrap_or(0),
        },
        bikes: status_counts(&bikes, &names(BikeStatus::ALL, BikeStatus::as_str)),
        assignments: status_counts(
            &assignments,
            &names(AssignmentStatus::ALL, AssignmentStatus::as_str),
        ),
        payments: PaymentStats {
            collected: bucket_sum(&payments, PaymentStatus::Paid.as_str()),
            pending: bucket_sum(&payments, PaymentStatus::Pending.as_str()),
            overdue: bucket_sum(&payments, PaymentStatus::Overdue.as_str()),
            count: status_counts(&payments, &names(PaymentStatus::ALL, PaymentStatus::as_str)),
        },
        maintenance: MaintenanceStats {
            count: status_counts(
                &maintenance,
                &names(MaintenanceStatus::ALL, MaintenanceStatus::as_str),
            ),
            total_cost: maintenance.values().map(|b| b.sum).sum(),
        },
        tickets: status_counts(&tickets, &names(TicketStatus::ALL, TicketStatus::as_str)),
        generated_at: Utc::now().to_rfc3339(),
    })
}

/// Paid amounts grouped by calendar month of `paid_date`, oldest month first.
pub async fn revenue_by_month(
    db: &MongoDb,
    from: Option<DateTime<Utc>>,
    to: Option<DateTime<Utc>>,
) -> Result<RevenueResponse, AppError> {
    let mut matcher = doc! {
        "is_active": true,
        "status": PaymentStatus::Paid,
        "paid_date": { "$ne": Bson::Null },
    };
    if let Some(range) = date_range_filter("paid_date", from, to)? {
        matcher.extend(range);
    }

    let pipeline = vec![
        doc! { "$match": matcher },
        doc! { "$group": {
            "_id": { "$dateToString": { "format": "%Y-%m", "date": "$paid_date" } },
            "amount": { "$sum": "$amount" },
            "payments": { "$sum": 1 },
        } },
        doc! { "$sort": { "_id": 1 } },
    ];

    let rows: Vec<Document> = db
        .payments()
        .aggregate(pipeline, None)
        .await?
        .try_collect()
        .await?;

    let months: Vec<MonthlyRevenue> = rows
        .iter()
        .filter_map(|row| {
            Some(MonthlyRevenue {
                month: row.get_str("_id").ok()?.to_string(),
                amount: number(row, "amount"),
                payments: number(row, "payments") as u64,
            })
        })
        .collect();
    let total = months.iter().map(|m| m.amount).sum();

    Ok(RevenueResponse { months, total })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_counts_zero_fill_missing_statuses() {
        let mut buckets = HashMap::new();
        buckets.insert(
            "available".to_string(),
            Bucket {
                count: 4,
                sum: 0.0,
            },
        );
        buckets.insert(
            "assigned".to_string(),
            Bucket {
                count: 2,
                sum: 0.0,
            },
        );

        let counts = status_counts(&buckets, &names(BikeStatus::ALL, BikeStatus::as_str));
        assert_eq!(counts.total, 6);
        assert_eq!(counts.by_status["available"], 4);
        assert_eq!(counts.by_status["maintenance"], 0);
        assert_eq!(counts.by_status["retired"], 0);
    }

    #[test]
    fn numbers_read_from_any_numeric_bson() {
        let row = doc! { "a": 3_i32, "b": 4_i64, "c": 2.5, "d": "x" };
        assert_eq!(number(&row, "a"), 3.0);
        assert_eq!(number(&row, "b"), 4.0);
        assert_eq!(number(&row, "c"), 2.5);
        assert_eq!(number(&row, "d"), 0.0);
        assert_eq!(number(&row, "missing"), 0.0);
    }
}
