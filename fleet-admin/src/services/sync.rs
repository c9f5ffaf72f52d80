//! Cross-entity status synchronization.
//!
//! Three rules keep documents consistent after writes elsewhere:
//!
//! * payment writes recompute the owning assignment's totals;
//! * maintenance and assignment lifecycle moves drive the bike's status;
//! * an external reply on a closed ticket reopens it.
//!
//! Every write here is conditional. Assignment totals use an optimistic
//! check on `totals_revision`; bike and ticket moves filter on the status
//! they expect to replace, so a concurrent change is never overwritten.

use chrono::{DateTime, Utc};
use futures::{future, TryStreamExt};
use std::future::Future;
use mongodb::bson::{doc, to_bson, Bson, Document};
use mongodb::options::{FindOneAndUpdateOptions, ReturnDocument};

use crate::models::datetime::bson_date;
use crate::models::{
    reply_reopens, AssignmentPaymentStatus, BikeStatus, MaintenanceStatus, Payment,
    PaymentStatus, Ticket, TicketReply, TicketStatus,
};
use crate::services::database::MongoDb;
use crate::services::metrics::{
    record_sync_conflict, record_sync_failure, record_sync_run, record_ticket_reopened,
};
use fleet_core::error::AppError;

const ASSIGNMENT_TOTALS: &str = "assignment_totals";
const BIKE_STATUS: &str = "bike_status";

/// Totals derived from an assignment's active payments.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PaymentTotals {
    pub paid_amount: f64,
    pub pending_amount: f64,
    pub payment_status: AssignmentPaymentStatus,
}

impl PaymentTotals {
    /// Sum paid and pending amounts over active payments. Other statuses
    /// (overdue, partial, failed, refunded, cancelled) count toward neither.
    /// With nothing pending the assignment is `paid`, except when it has no
    /// active payments at all.
    pub fn from_payments<'a, I>(payments: I) -> Self
    where
        I: IntoIterator<Item = &'a Payment>,
    {
        let mut paid_amount = 0.0;
        let mut pending_amount = 0.0;
        let mut counted = 0usize;

        for payment in payments.into_iter().filter(|p| p.is_active) {
            counted += 1;
            match payment.status {
                PaymentStatus::Paid => paid_amount += payment.amount,
                PaymentStatus::Pending => pending_amount += payment.amount,
                _ => {}
            }
        }

        let payment_status = if counted == 0 || pending_amount > 0.0 {
            AssignmentPaymentStatus::Pending
        } else {
            AssignmentPaymentStatus::Paid
        };

        Self {
            paid_amount,
            pending_amount,
            payment_status,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOutcome {
    pub marked_overdue: u64,
    pub assignments_recomputed: u64,
}

#[derive(Debug, Clone)]
pub struct ReplyOutcome {
    pub ticket: Ticket,
    pub reopened: bool,
}

#[derive(Clone)]
pub struct Synchronizer {
    db: MongoDb,
    max_retries: u32,
}

impl Synchronizer {
    pub fn new(db: MongoDb, max_retries: u32) -> Self {
        Self {
            db,
            max_retries: max_retries.max(1),
        }
    }

    /// Recompute and store an assignment's totals.
    ///
    /// Returns `Ok(None)` when the assignment does not exist. A write that
    /// loses the race on `totals_revision` is retried from a fresh read.
    pub async fn recompute_assignment_totals(
        &self,
        assignment_id: &str,
    ) -> Result<Option<PaymentTotals>, AppError> {
        self.recompute_assignment_totals_with(assignment_id, |_| future::ready(())).await
    }

    /// [`Self::recompute_assignment_totals`], running `before_write` with the
    /// attempt number between each read and its conditional write. Exhausting
    /// `max_retries` is a `Conflict`.
    pub async fn recompute_assignment_totals_with<F, Fut>(
        &self,
        assignment_id: &str,
        mut before_write: F,
    ) -> Result<Option<PaymentTotals>, AppError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = ()>,
    {
        for attempt in 1..=self.max_retries {
            let Some(assignment) = self
                .db
                .assignments()
                .find_one(doc! { "_id": assignment_id }, None)
                .await?
            else {
                return Ok(None);
            };

            let payments: Vec<Payment> = self
                .db
                .payments()
                .find(
                    doc! { "assignment_id": assignment_id, "is_active": true },
                    None,
                )
                .await?
                .try_collect()
                .await?;

            let totals = PaymentTotals::from_payments(&payments);
            before_write(attempt).await;

            let result = self
                .db
                .assignments()
                .update_one(
                    doc! { "_id": assignment_id, "totals_revision": assignment.totals_revision },
                    doc! {
                        "$set": {
                            "paid_amount": totals.paid_amount,
                            "pending_amount": totals.pending_amount,
                            "payment_status": totals.payment_status,
                            "updated_at": bson_date(Utc::now()),
                        },
                        "$inc": { "totals_revision": 1_i64 },
                    },
                    None,
                )
                .await?;

            if result.matched_count == 1 {
                return Ok(Some(totals));
            }

            record_sync_conflict();
            tracing::debug!(
                assignment_id = %assignment_id,
                attempt,
                "Assignment totals changed concurrently; retrying"
            );
        }

        Err(AppError::Conflict(anyhow::anyhow!(
            "Assignment {} totals kept changing after {} attempts",
            assignment_id,
            self.max_retries
        )))
    }

    /// Best-effort totals sync after a payment write. Failures are logged and
    /// counted; the caller's write has already succeeded.
    pub async fn sync_assignment_totals(&self, assignment_id: &str) -> bool {
        let outcome = self.recompute_assignment_totals(assignment_id).await;
        settle_totals(assignment_id, outcome)
    }

    /// Move a bike from `from` to `to` only if it is still `from` (and matches
    /// `guard`). Returns whether the bike changed.
    pub async fn transition_bike(
        &self,
        bike_id: &str,
        from: BikeStatus,
        to: BikeStatus,
        guard: Document,
        set: Document,
    ) -> Result<bool, AppError> {
        let mut filter = doc! { "_id": bike_id, "status": from };
        filter.extend(guard);

        let mut update = doc! { "status": to, "updated_at": bson_date(Utc::now()) };
        update.extend(set);

        let result = self
            .db
            .bikes()
            .update_one(filter, doc! { "$set": update }, None)
            .await?;

        let changed = result.modified_count == 1;
        tracing::debug!(
            bike_id = %bike_id,
            from = %from,
            to = %to,
            changed,
            "Bike status transition"
        );
        Ok(changed)
    }

    /// Claim an available bike for a new assignment.
    pub async fn assign_bike(&self, bike_id: &str, assignment_id: &str) -> Result<bool, AppError> {
        self.transition_bike(
            bike_id,
            BikeStatus::Available,
            BikeStatus::Assigned,
            Document::new(),
            doc! { "current_assignment_id": assignment_id },
        )
        .await
    }

    /// Hand the bike back once its assignment is no longer open.
    pub async fn release_bike(&self, bike_id: &str, assignment_id: &str) -> bool {
        let outcome = self
            .transition_bike(
                bike_id,
                BikeStatus::Assigned,
                BikeStatus::Available,
                doc! { "current_assignment_id": assignment_id },
                doc! { "current_assignment_id": Bson::Null },
            )
            .await;
        settle_bike("release", bike_id, outcome)
    }

    /// Take an available bike out of service for in-progress maintenance.
    pub async fn hold_bike_for_maintenance(&self, bike_id: &str) -> bool {
        let outcome = self
            .transition_bike(
                bike_id,
                BikeStatus::Available,
                BikeStatus::Maintenance,
                Document::new(),
                Document::new(),
            )
            .await;
        settle_bike("maintenance_hold", bike_id, outcome)
    }

    /// Return a bike to service when maintenance record `finished_id` ends.
    /// The bike stays out while another active record on it is still
    /// `in_progress`; a bike whose status moved away from `maintenance` in
    /// the meantime is left alone.
    pub async fn restore_bike_after_maintenance(&self, bike_id: &str, finished_id: &str) -> bool {
        let outcome = match self.other_work_in_progress(bike_id, finished_id).await {
            Ok(0) => {
                self.transition_bike(
                    bike_id,
                    BikeStatus::Maintenance,
                    BikeStatus::Available,
                    Document::new(),
                    Document::new(),
                )
                .await
            }
            Ok(remaining) => {
                tracing::info!(
                    bike_id = %bike_id,
                    maintenance_id = %finished_id,
                    remaining,
                    "Bike still held by other in-progress maintenance"
                );
                Ok(false)
            }
            Err(e) => Err(e),
        };
        settle_bike("maintenance_restore", bike_id, outcome)
    }

    async fn other_work_in_progress(
        &self,
        bike_id: &str,
        except_id: &str,
    ) -> Result<u64, AppError> {
        let count = self
            .db
            .maintenance()
            .count_documents(
                doc! {
                    "bike_id": bike_id,
                    "_id": { "$ne": except_id },
                    "is_active": true,
                    "status": MaintenanceStatus::InProgress,
                },
                None,
            )
            .await?;
        Ok(count)
    }

    /// Append a reply and reopen the ticket if the reply calls for it.
    pub async fn append_reply(
        &self,
        ticket_id: &str,
        reply: &TicketReply,
    ) -> Result<ReplyOutcome, AppError> {
        let ticket = self
            .db
            .tickets()
            .find_one_and_update(
                doc! { "_id": ticket_id, "is_active": true },
                doc! {
                    "$push": { "replies": to_bson(reply)? },
                    "$set": { "updated_at": bson_date(Utc::now()) },
                },
                after_update(),
            )
            .await?
            .ok_or_else(|| AppError::not_found("Ticket", ticket_id))?;

        if !reply_reopens(ticket.status, reply.is_internal) {
            return Ok(ReplyOutcome {
                ticket,
                reopened: false,
            });
        }

        match self.reopen_closed_ticket(ticket_id).await? {
            Some(ticket) => Ok(ReplyOutcome {
                ticket,
                reopened: true,
            }),
            None => Ok(ReplyOutcome {
                ticket,
                reopened: false,
            }),
        }
    }

    /// Move a closed, active ticket back to `open`. Returns `None` when the
    /// ticket is no longer closed or has been deleted.
    pub async fn reopen_closed_ticket(&self, ticket_id: &str) -> Result<Option<Ticket>, AppError> {
        let reopened = self
            .db
            .tickets()
            .find_one_and_update(
                doc! { "_id": ticket_id, "status": TicketStatus::Closed, "is_active": true },
                doc! {
                    "$set": { "status": TicketStatus::Open, "updated_at": bson_date(Utc::now()) },
                },
                after_update(),
            )
            .await?;

        if reopened.is_some() {
            record_ticket_reopened();
            tracing::info!(ticket_id = %ticket_id, "Closed ticket reopened by reply");
        }
        Ok(reopened)
    }

    /// Flag pending payments past their due date as overdue and refresh the
    /// totals of every assignment they belong to.
    pub async fn sweep_overdue(&self, now: DateTime<Utc>) -> Result<SweepOutcome, AppError> {
        let filter = doc! {
            "is_active": true,
            "status": PaymentStatus::Pending,
            "due_date": { "$lt": bson_date(now) },
        };

        let assignment_ids = self
            .db
            .payments()
            .distinct("assignment_id", filter.clone(), None)
            .await?;

        let result = self
            .db
            .payments()
            .update_many(
                filter,
                doc! { "$set": { "status": PaymentStatus::Overdue, "updated_at": bson_date(now) } },
                None,
            )
            .await?;

        let mut assignments_recomputed = 0;
        for id in assignment_ids.iter().filter_map(Bson::as_str) {
            if self.sync_assignment_totals(id).await {
                assignments_recomputed += 1;
            }
        }

        tracing::info!(
            marked_overdue = result.modified_count,
            assignments_recomputed,
            "Overdue sweep finished"
        );

        Ok(SweepOutcome {
            marked_overdue: result.modified_count,
            assignments_recomputed,
        })
    }
}

fn after_update() -> FindOneAndUpdateOptions {
    FindOneAndUpdateOptions::builder()
        .return_document(ReturnDocument::After)
        .build()
}

/// Log and count a totals recompute. Returns whether the totals were written.
fn settle_totals(
    assignment_id: &str,
    outcome: Result<Option<PaymentTotals>, AppError>,
) -> bool {
    record_sync_run(ASSIGNMENT_TOTALS);
    match outcome {
        Ok(Some(totals)) => {
            tracing::info!(
                assignment_id = %assignment_id,
                paid_amount = totals.paid_amount,
                pending_amount = totals.pending_amount,
                payment_status = %totals.payment_status,
                "Assignment totals recomputed"
            );
            true
        }
        Ok(None) => {
            tracing::warn!(
                assignment_id = %assignment_id,
                "Assignment not found; totals not recomputed"
            );
            false
        }
        Err(e) => {
            record_sync_failure(ASSIGNMENT_TOTALS);
            tracing::error!(
                assignment_id = %assignment_id,
                error = %e,
                "Failed to recompute assignment totals"
            );
            false
        }
    }
}

fn settle_bike(action: &'static str, bike_id: &str, outcome: Result<bool, AppError>) -> bool {
    record_sync_run(BIKE_STATUS);
    match outcome {
        Ok(changed) => {
            if !changed {
                tracing::info!(
                    bike_id = %bike_id,
                    action,
                    "Bike not in expected status; left unchanged"
                );
            }
            changed
        }
        Err(e) => {
            record_sync_failure(BIKE_STATUS);
            tracing::error!(bike_id = %bike_id, action, error = %e, "Bike status sync failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaymentKind;

    fn payment(amount: f64, status: PaymentStatus) -> Payment {
        let mut p = Payment::new(
            "assignment".into(),
            "rider".into(),
            amount,
            PaymentKind::Rent,
            Utc::now(),
        );
        p.status = status;
        p
    }

    #[test]
    fn paid_and_pending_are_summed_separately() {
        let payments = vec![
            payment(500.0, PaymentStatus::Paid),
            payment(300.0, PaymentStatus::Pending),
        ];
        let totals = PaymentTotals::from_payments(&payments);
        assert_eq!(totals.paid_amount, 500.0);
        assert_eq!(totals.pending_amount, 300.0);
        assert_eq!(totals.payment_status, AssignmentPaymentStatus::Pending);
    }

    #[test]
    fn nothing_pending_means_paid() {
        let payments = vec![
            payment(500.0, PaymentStatus::Paid),
            payment(300.0, PaymentStatus::Paid),
        ];
        let totals = PaymentTotals::from_payments(&payments);
        assert_eq!(totals.paid_amount, 800.0);
        assert_eq!(totals.pending_amount, 0.0);
        assert_eq!(totals.payment_status, AssignmentPaymentStatus::Paid);
    }

    #[test]
    fn other_statuses_count_toward_neither_sum() {
        let payments = vec![
            payment(200.0, PaymentStatus::Paid),
            payment(100.0, PaymentStatus::Overdue),
            payment(50.0, PaymentStatus::Refunded),
            payment(75.0, PaymentStatus::Partial),
        ];
        let totals = PaymentTotals::from_payments(&payments);
        assert_eq!(totals.paid_amount, 200.0);
        assert_eq!(totals.pending_amount, 0.0);
        assert_eq!(totals.payment_status, AssignmentPaymentStatus::Paid);
    }

    #[test]
    fn soft_deleted_payments_are_ignored() {
        let mut deleted = payment(300.0, PaymentStatus::Pending);
        deleted.is_active = false;
        let payments = vec![payment(500.0, PaymentStatus::Paid), deleted];
        let totals = PaymentTotals::from_payments(&payments);
        assert_eq!(totals.pending_amount, 0.0);
        assert_eq!(totals.payment_status, AssignmentPaymentStatus::Paid);
    }

    #[test]
    fn no_active_payments_is_pending() {
        let totals = PaymentTotals::from_payments(&Vec::<Payment>::new());
        assert_eq!(totals.paid_amount, 0.0);
        assert_eq!(totals.pending_amount, 0.0);
        assert_eq!(totals.payment_status, AssignmentPaymentStatus::Pending);
    }

    #[test]
    fn exhausted_retries_settle_as_failure() {
        let outcome = Err(AppError::Conflict(anyhow::anyhow!("kept changing")));
        assert!(!settle_totals("a-1", outcome));
        assert!(!settle_totals("a-1", Ok(None)));

        let written = PaymentTotals::from_payments(&[payment(100.0, PaymentStatus::Paid)]);
        assert!(settle_totals("a-1", Ok(Some(written))));
    }
}
