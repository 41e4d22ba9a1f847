use crate::error::CashbackError;
use crate::models::{
    AuditEntry, RequestMeta, Submission, SubmissionFilter, SubmissionReceipt, SubmissionRequest,
    SubmissionStatus,
};
use crate::services::rate_limit::{RateDecision, RateLimiter};
use crate::services::validator::SubmissionValidator;
use crate::services::AuditTrail;
use crate::store::{FirmDirectory, SubmissionStore};
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

pub const SUBMISSION_ACTION: &str = "submission";

/// Entry point for new cashback claims: rate limit, sanitize, validate,
/// dedupe, price and persist.
pub struct SubmissionService {
    validator: Arc<SubmissionValidator>,
    submissions: Arc<dyn SubmissionStore>,
    firms: Arc<dyn FirmDirectory>,
    rate_limiter: RateLimiter,
    audit: AuditTrail,
    default_cashback_percent: f64,
}

impl SubmissionService {
    pub fn new(
        validator: Arc<SubmissionValidator>,
        submissions: Arc<dyn SubmissionStore>,
        firms: Arc<dyn FirmDirectory>,
        rate_limiter: RateLimiter,
        audit: AuditTrail,
        default_cashback_percent: f64,
    ) -> Self {
        Self {
            validator,
            submissions,
            firms,
            rate_limiter,
            audit,
            default_cashback_percent,
        }
    }

    pub async fn submit(
        &self,
        request: &SubmissionRequest,
        meta: &RequestMeta,
    ) -> Result<SubmissionReceipt, CashbackError> {
        let identifier = match request.user_id.trim() {
            "" => meta.ip_address.as_deref().unwrap_or("anonymous"),
            user_id => user_id,
        };
        if let RateDecision::Limited { retry_after } =
            self.rate_limiter.check(identifier, SUBMISSION_ACTION).await
        {
            tracing::info!(identifier, retry_after = %retry_after, "Submission rate limited");
            return Err(CashbackError::RateLimitExceeded);
        }

        let request = self.validator.sanitize(request);
        let verdict = self.validator.validate(&request, meta).await;
        if !verdict.is_valid {
            return Err(CashbackError::Validation {
                errors: verdict.errors,
                warnings: verdict.warnings,
            });
        }

        if self.is_duplicate(&request).await? {
            return Err(CashbackError::Validation {
                errors: vec!["You have already submitted this purchase".to_string()],
                warnings: verdict.warnings,
            });
        }

        let percentage = match self.firms.cashback_percentage(&request.firm_id).await? {
            Some(percentage) => percentage,
            None => {
                tracing::debug!(firm_id = %request.firm_id, "Unknown firm, using default cashback rate");
                self.default_cashback_percent
            }
        };

        let now = Utc::now();
        let submission = Submission {
            id: Uuid::new_v4().to_string(),
            user_id: request.user_id.clone(),
            name: request.name.clone(),
            email: request.email.clone(),
            firm_id: request.firm_id.clone(),
            firm_name: request.firm_name.clone(),
            purchase_amount: request.purchase_amount,
            proof_of_purchase: request.proof_of_purchase.clone(),
            wallet_address: request.wallet_address.clone(),
            wallet_network: verdict
                .wallet_network
                .map(|n| n.label().to_string())
                .or_else(|| request.wallet_network.clone()),
            cashback_amount: cashback_amount(request.purchase_amount, percentage),
            status: SubmissionStatus::Pending,
            additional_details: request.additional_details.clone(),
            admin_notes: None,
            rejection_reason: None,
            processed_by: None,
            processed_at: None,
            ip_address: meta.ip_address.clone(),
            user_agent: meta.user_agent.clone(),
            created_at: now,
            updated_at: now,
        };

        self.submissions.insert_submission(&submission).await?;

        tracing::info!(
            submission_id = %submission.id,
            user_id = %submission.user_id,
            cashback_amount = submission.cashback_amount,
            warnings = verdict.warnings.len(),
            "Submission accepted"
        );

        let entry = AuditEntry::new(
            Some(submission.user_id.as_str()),
            "submission_created",
            "submission",
        )
        .entity(submission.id.clone())
        .change(
            None,
            Some(json!({
                "status": submission.status,
                "purchase_amount": submission.purchase_amount,
                "cashback_amount": submission.cashback_amount,
                "alerts": verdict.alerts.len(),
            })),
        )
        .request(meta);
        self.audit.record(entry).await;

        Ok(SubmissionReceipt {
            submission,
            warnings: verdict.warnings,
            alerts: verdict.alerts,
        })
    }

    pub async fn list_for_user(&self, user_id: &str) -> Result<Vec<Submission>, CashbackError> {
        let filter = SubmissionFilter {
            user_id: Some(user_id.to_string()),
            ..Default::default()
        };
        Ok(self.submissions.list_submissions(&filter).await?)
    }

    /// Same user, firm, amount and wallet on any non-rejected submission.
    async fn is_duplicate(&self, request: &SubmissionRequest) -> Result<bool, CashbackError> {
        let filter = SubmissionFilter {
            user_id: Some(request.user_id.clone()),
            firm_id: Some(request.firm_id.clone()),
            wallet_address: Some(request.wallet_address.clone()),
            purchase_amount: Some(request.purchase_amount),
            ..Default::default()
        };
        let existing = self.submissions.list_submissions(&filter).await?;
        Ok(existing
            .iter()
            .any(|s| s.status != SubmissionStatus::Rejected))
    }
}

/// `amount * percentage / 100`, rounded to cents.
pub fn cashback_amount(purchase_amount: f64, percentage: f64) -> f64 {
    (purchase_amount * percentage / 100.0 * 100.0).round() / 100.0
}
