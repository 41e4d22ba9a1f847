use crate::error::CashbackError;
use crate::models::{
    AuditEntry, BulkOutcome, PayoutRecord, PayoutStatus, Submission, SubmissionPatch,
    SubmissionStatus,
};
use crate::services::notify::{Notification, Notifier};
use crate::services::sanitize::{sanitize, sanitize_opt};
use crate::services::AuditTrail;
use crate::store::{PayoutStore, StoreError, SubmissionStore};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BulkAction {
    Approve,
    Reject,
}

const BULK_REJECTION_REASON: &str = "Rejected during bulk review";

/// Drives submissions through pending -> approved -> paid and
/// pending -> rejected.
pub struct AdminWorkflow {
    submissions: Arc<dyn SubmissionStore>,
    payouts: Arc<dyn PayoutStore>,
    audit: AuditTrail,
    notifier: Arc<dyn Notifier>,
    bulk_delay: Duration,
}

impl AdminWorkflow {
    pub fn new(
        submissions: Arc<dyn SubmissionStore>,
        payouts: Arc<dyn PayoutStore>,
        audit: AuditTrail,
        notifier: Arc<dyn Notifier>,
        bulk_delay: Duration,
    ) -> Self {
        Self {
            submissions,
            payouts,
            audit,
            notifier,
            bulk_delay,
        }
    }

    pub async fn approve(
        &self,
        submission_id: &str,
        admin_id: &str,
        notes: Option<String>,
    ) -> Result<Submission, CashbackError> {
        let current = self.load(submission_id).await?;
        ensure_transition(&current, SubmissionStatus::Approved)?;

        let patch = SubmissionPatch {
            status: Some(SubmissionStatus::Approved),
            admin_notes: sanitize_opt(notes.as_deref()),
            processed_by: Some(admin_id.to_string()),
            processed_at: Some(Utc::now()),
            ..Default::default()
        };
        let updated = self
            .update(submission_id, SubmissionStatus::Pending, &patch)
            .await?;

        tracing::info!(submission_id, admin_id, "Submission approved");
        self.audit_transition(admin_id, "submission_approved", &current, &updated)
            .await;
        self.dispatch(Notification::Approved {
            submission: updated.clone(),
        })
        .await;

        Ok(updated)
    }

    pub async fn reject(
        &self,
        submission_id: &str,
        admin_id: &str,
        reason: &str,
        notes: Option<String>,
    ) -> Result<Submission, CashbackError> {
        let reason = sanitize(reason);
        if reason.is_empty() {
            return Err(CashbackError::Validation {
                errors: vec!["A rejection reason is required".to_string()],
                warnings: Vec::new(),
            });
        }

        let current = self.load(submission_id).await?;
        ensure_transition(&current, SubmissionStatus::Rejected)?;

        let patch = SubmissionPatch {
            status: Some(SubmissionStatus::Rejected),
            admin_notes: sanitize_opt(notes.as_deref()),
            rejection_reason: Some(reason.clone()),
            processed_by: Some(admin_id.to_string()),
            processed_at: Some(Utc::now()),
        };
        let updated = self
            .update(submission_id, SubmissionStatus::Pending, &patch)
            .await?;

        tracing::info!(submission_id, admin_id, reason = %reason, "Submission rejected");
        self.audit_transition(admin_id, "submission_rejected", &current, &updated)
            .await;
        self.dispatch(Notification::Rejected {
            submission: updated.clone(),
            reason,
        })
        .await;

        Ok(updated)
    }

    /// Marks an approved submission paid and records the transfer. The
    /// status write and the ledger write are separate calls; if the ledger
    /// write fails the status is reverted so a submission is never left
    /// paid without a payout record.
    pub async fn process_payout(
        &self,
        submission_id: &str,
        admin_id: &str,
        transaction_hash: &str,
        actual_amount: Option<f64>,
    ) -> Result<PayoutRecord, CashbackError> {
        let current = self.load(submission_id).await?;
        if current.status != SubmissionStatus::Approved {
            return Err(CashbackError::NotApproved);
        }

        let transaction_hash = transaction_hash.trim();
        if transaction_hash.is_empty() {
            return Err(CashbackError::Validation {
                errors: vec!["Transaction hash is required".to_string()],
                warnings: Vec::new(),
            });
        }
        let amount_sent = actual_amount.unwrap_or(current.cashback_amount);
        if !amount_sent.is_finite() || amount_sent <= 0.0 {
            return Err(CashbackError::Validation {
                errors: vec!["Payout amount must be greater than zero".to_string()],
                warnings: Vec::new(),
            });
        }

        let tentative = TentativePayout::begin(&*self.submissions, &current, admin_id).await?;

        let record = PayoutRecord {
            id: Uuid::new_v4(),
            submission_ids: vec![current.id.clone()],
            user_id: current.user_id.clone(),
            user_email: current.email.clone(),
            wallet_address: current.wallet_address.clone(),
            amount_sent,
            transaction_hash: transaction_hash.to_string(),
            sent_by: admin_id.to_string(),
            sent_at: Utc::now(),
            status: PayoutStatus::Completed,
        };

        let paid = match self.payouts.insert_payout(&record).await {
            Ok(()) => tentative.confirm(),
            Err(e) => {
                tracing::error!(submission_id, error = %e, "Payout record failed, reverting to approved");
                tentative.revert().await?;
                return Err(CashbackError::PayoutFailed(e.to_string()));
            }
        };

        tracing::info!(
            submission_id,
            admin_id,
            amount_sent,
            transaction_hash,
            "Payout processed"
        );
        let entry = AuditEntry::new(Some(admin_id), "payout_processed", "submission")
            .entity(submission_id)
            .change(
                Some(json!({ "status": current.status })),
                Some(json!({
                    "status": paid.status,
                    "payout_id": record.id,
                    "amount_sent": amount_sent,
                    "transaction_hash": transaction_hash,
                })),
            );
        self.audit.record(entry).await;
        self.dispatch(Notification::PaymentSent {
            submission: paid,
            payout: record.clone(),
        })
        .await;

        Ok(record)
    }

    /// Applies one action to each id in order. One failure never stops the
    /// batch.
    pub async fn bulk_process(
        &self,
        ids: &[String],
        action: BulkAction,
        admin_id: &str,
        reason: Option<&str>,
    ) -> BulkOutcome {
        let mut outcome = BulkOutcome::default();
        let reason = reason
            .map(str::trim)
            .filter(|r| !r.is_empty())
            .unwrap_or(BULK_REJECTION_REASON);

        for (index, id) in ids.iter().enumerate() {
            if index > 0 && !self.bulk_delay.is_zero() {
                tokio::time::sleep(self.bulk_delay).await;
            }

            let result = match action {
                BulkAction::Approve => self.approve(id, admin_id, None).await,
                BulkAction::Reject => self.reject(id, admin_id, reason, None).await,
            };

            match result {
                Ok(_) => outcome.processed += 1,
                Err(e) => {
                    outcome.failed += 1;
                    outcome.errors.push(format!("{}: {}", id, e));
                }
            }
        }

        tracing::info!(
            admin_id,
            action = ?action,
            processed = outcome.processed,
            failed = outcome.failed,
            "Bulk action finished"
        );
        let entry = AuditEntry::new(Some(admin_id), "bulk_process", "submission").change(
            None,
            Some(json!({
                "action": action,
                "submission_ids": ids,
                "processed": outcome.processed,
                "failed": outcome.failed,
                "errors": outcome.errors,
            })),
        );
        self.audit.record(entry).await;

        outcome
    }

    async fn load(&self, submission_id: &str) -> Result<Submission, CashbackError> {
        self.submissions
            .get_submission(submission_id)
            .await?
            .ok_or(CashbackError::SubmissionNotFound)
    }

    async fn update(
        &self,
        submission_id: &str,
        expected: SubmissionStatus,
        patch: &SubmissionPatch,
    ) -> Result<Submission, CashbackError> {
        self.submissions
            .update_submission(submission_id, expected, patch)
            .await
            .map_err(transition_error)
    }

    async fn audit_transition(
        &self,
        admin_id: &str,
        action: &str,
        before: &Submission,
        after: &Submission,
    ) {
        let entry = AuditEntry::new(Some(admin_id), action, "submission")
            .entity(after.id.clone())
            .change(
                Some(json!({ "status": before.status })),
                Some(json!({
                    "status": after.status,
                    "admin_notes": after.admin_notes,
                    "rejection_reason": after.rejection_reason,
                })),
            );
        self.audit.record(entry).await;
    }

    async fn dispatch(&self, notification: Notification) {
        if let Err(e) = self.notifier.notify(&notification).await {
            tracing::warn!(kind = notification.kind(), error = %e, "Notification failed");
        }
    }
}

fn transition_error(e: StoreError) -> CashbackError {
    match e {
        StoreError::NotFound(_) => CashbackError::SubmissionNotFound,
        StoreError::Conflict { id, expected } => {
            tracing::warn!(submission_id = %id, expected = %expected, "Submission changed concurrently");
            CashbackError::ConcurrentUpdate
        }
        other => CashbackError::Store(other),
    }
}

fn ensure_transition(current: &Submission, next: SubmissionStatus) -> Result<(), CashbackError> {
    if current.status.can_transition_to(next) {
        Ok(())
    } else {
        Err(CashbackError::InvalidTransition {
            from: current.status,
            to: next,
        })
    }
}

/// First phase of a payout: the submission is already written as paid and
/// must be either confirmed or reverted to approved. The approval's
/// processor fields are kept so a revert restores them.
#[must_use = "a tentative payout must be confirmed or reverted"]
struct TentativePayout<'a> {
    store: &'a dyn SubmissionStore,
    paid: Submission,
    approved_by: Option<String>,
    approved_at: Option<DateTime<Utc>>,
}

impl<'a> TentativePayout<'a> {
    async fn begin(
        store: &'a dyn SubmissionStore,
        current: &Submission,
        admin_id: &str,
    ) -> Result<TentativePayout<'a>, CashbackError> {
        let patch = SubmissionPatch {
            status: Some(SubmissionStatus::Paid),
            processed_by: Some(admin_id.to_string()),
            processed_at: Some(Utc::now()),
            ..Default::default()
        };
        let paid = store
            .update_submission(&current.id, SubmissionStatus::Approved, &patch)
            .await
            .map_err(transition_error)?;
        Ok(Self {
            store,
            paid,
            approved_by: current.processed_by.clone(),
            approved_at: current.processed_at,
        })
    }

    fn confirm(self) -> Submission {
        self.paid
    }

    async fn revert(self) -> Result<(), CashbackError> {
        let patch = SubmissionPatch {
            status: Some(SubmissionStatus::Approved),
            processed_by: self.approved_by.clone(),
            processed_at: self.approved_at,
            ..Default::default()
        };
        match self
            .store
            .update_submission(&self.paid.id, SubmissionStatus::Paid, &patch)
            .await
        {
            Ok(_) => {
                tracing::warn!(submission_id = %self.paid.id, "Payout rolled back to approved");
                Ok(())
            }
            Err(e) => {
                tracing::error!(
                    submission_id = %self.paid.id,
                    error = %e,
                    "Payout rollback failed, submission left as paid"
                );
                Err(CashbackError::RollbackFailed {
                    submission_id: self.paid.id.clone(),
                    reason: e.to_string(),
                })
            }
        }
    }
}
