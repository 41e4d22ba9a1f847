use crate::config::FraudThresholds;
use crate::models::{AlertType, FraudAlert, RequestMeta, Severity};
use crate::services::FraudAlertStore;
use crate::store::{FraudStore, StoreError};
use chrono::{Duration, Utc};
use serde_json::json;
use std::sync::Arc;
use thiserror::Error;

/// A fraud check whose datastore query failed. Callers decide whether to
/// treat it as "no alert".
#[derive(Debug, Error)]
#[error("{check} check could not complete: {source}")]
pub struct CheckError {
    pub check: &'static str,
    #[source]
    pub source: StoreError,
}

pub type CheckOutcome = Result<Vec<FraudAlert>, CheckError>;

pub struct FraudDetector {
    store: Arc<dyn FraudStore>,
    alerts: FraudAlertStore,
    thresholds: FraudThresholds,
}

impl FraudDetector {
    pub fn new(
        store: Arc<dyn FraudStore>,
        alerts: FraudAlertStore,
        thresholds: FraudThresholds,
    ) -> Self {
        Self {
            store,
            alerts,
            thresholds,
        }
    }

    pub async fn check_duplicate_wallet(
        &self,
        wallet_address: &str,
        user_id: &str,
        meta: &RequestMeta,
    ) -> CheckOutcome {
        let used = self
            .store
            .wallet_used_by_other(wallet_address, user_id)
            .await
            .map_err(|source| failed("duplicate_wallet", source))?;

        if !used {
            return Ok(Vec::new());
        }

        let alert = self
            .raise(
                user_id,
                AlertType::DuplicateWallet,
                Severity::High,
                json!({ "wallet_address": wallet_address }),
                meta,
            )
            .await;
        Ok(vec![alert])
    }

    pub async fn check_duplicate_proof(
        &self,
        proof: &str,
        user_id: &str,
        meta: &RequestMeta,
    ) -> CheckOutcome {
        let used = self
            .store
            .proof_used_by_other(proof, user_id)
            .await
            .map_err(|source| failed("duplicate_proof", source))?;

        if !used {
            return Ok(Vec::new());
        }

        let alert = self
            .raise(
                user_id,
                AlertType::DuplicateProof,
                Severity::Critical,
                json!({ "proof_of_purchase": proof }),
                meta,
            )
            .await;
        Ok(vec![alert])
    }

    /// The attempt being validated counts toward the hourly total, so the
    /// first attempt past the limit is the one flagged.
    pub async fn check_rapid_submissions(&self, user_id: &str, meta: &RequestMeta) -> CheckOutcome {
        let since = Utc::now() - Duration::hours(1);
        let previous = self
            .store
            .submissions_since(user_id, since)
            .await
            .map_err(|source| failed("rapid_submissions", source))?;

        let attempts = previous + 1;
        if attempts <= self.thresholds.max_submissions_per_hour {
            return Ok(Vec::new());
        }

        let alert = self
            .raise(
                user_id,
                AlertType::RapidRequests,
                Severity::Medium,
                json!({
                    "submissions_last_hour": attempts,
                    "limit": self.thresholds.max_submissions_per_hour,
                }),
                meta,
            )
            .await;
        Ok(vec![alert])
    }

    pub async fn check_suspicious_ip(
        &self,
        ip: &str,
        user_id: &str,
        meta: &RequestMeta,
    ) -> CheckOutcome {
        let since = Utc::now() - Duration::hours(24);
        let users = self
            .store
            .distinct_users_from_ip(ip, since)
            .await
            .map_err(|source| failed("suspicious_ip", source))?;

        if users < self.thresholds.max_users_per_ip {
            return Ok(Vec::new());
        }

        let alert = self
            .raise(
                user_id,
                AlertType::SuspiciousIp,
                Severity::Medium,
                json!({ "ip_address": ip, "distinct_users_24h": users }),
                meta,
            )
            .await;
        Ok(vec![alert])
    }

    /// Pure thresholding; persistence is the only side effect.
    pub async fn check_high_amount(
        &self,
        amount: f64,
        user_id: &str,
        meta: &RequestMeta,
    ) -> CheckOutcome {
        let severity = if amount > self.thresholds.high_amount_critical {
            Severity::Critical
        } else if amount > self.thresholds.high_amount_review {
            Severity::Medium
        } else {
            return Ok(Vec::new());
        };

        let alert = self
            .raise(
                user_id,
                AlertType::HighAmount,
                severity,
                json!({
                    "amount": amount,
                    "review_threshold": self.thresholds.high_amount_review,
                    "critical_threshold": self.thresholds.high_amount_critical,
                }),
                meta,
            )
            .await;
        Ok(vec![alert])
    }

    async fn raise(
        &self,
        user_id: &str,
        alert_type: AlertType,
        severity: Severity,
        details: serde_json::Value,
        meta: &RequestMeta,
    ) -> FraudAlert {
        let id = self
            .alerts
            .create_fraud_alert(Some(user_id), None, alert_type, severity, details.clone(), meta)
            .await;

        let mut alert = FraudAlert::new(Some(user_id), alert_type, severity, details);
        alert.id = id;
        alert
    }
}

fn failed(check: &'static str, source: StoreError) -> CheckError {
    tracing::warn!(check, error = %source, "Fraud check failed open");
    CheckError { check, source }
}
