use crate::error::CashbackError;
use crate::models::{
    AlertFilter, AlertReview, AlertStatus, AlertType, AuditEntry, FraudAlert, RequestMeta,
    Severity,
};
use crate::services::AuditTrail;
use crate::store::FraudStore;
use chrono::Utc;
use serde_json::json;
use std::sync::Arc;
use uuid::Uuid;

/// Persists fraud alerts, mirrors each one into the audit log, and carries
/// the admin review workflow for alerts.
#[derive(Clone)]
pub struct FraudAlertStore {
    store: Arc<dyn FraudStore>,
    audit: AuditTrail,
}

impl FraudAlertStore {
    pub fn new(store: Arc<dyn FraudStore>, audit: AuditTrail) -> Self {
        Self { store, audit }
    }

    /// Returns `None` when the alert could not be persisted. The risk it
    /// describes still stands; only the record is missing.
    pub async fn create_fraud_alert(
        &self,
        user_id: Option<&str>,
        submission_id: Option<&str>,
        alert_type: AlertType,
        severity: Severity,
        details: serde_json::Value,
        meta: &RequestMeta,
    ) -> Option<Uuid> {
        let mut alert = FraudAlert::new(user_id, alert_type, severity, details.clone());
        alert.submission_id = submission_id.map(str::to_string);

        let id = match self.store.create_fraud_alert(&alert).await {
            Ok(id) => id,
            Err(e) => {
                tracing::error!(
                    alert_type = alert_type.as_str(),
                    severity = severity.as_str(),
                    error = %e,
                    "Failed to record fraud alert"
                );
                return None;
            }
        };

        tracing::warn!(
            alert_id = %id,
            alert_type = alert_type.as_str(),
            severity = severity.as_str(),
            user_id = ?user_id,
            "Fraud alert raised"
        );

        let entry = AuditEntry::new(user_id, "fraud_alert_created", "fraud_alert")
            .entity(id.to_string())
            .change(
                None,
                Some(json!({
                    "alert_type": alert_type,
                    "severity": severity,
                    "details": details,
                })),
            )
            .request(meta);
        self.audit.record(entry).await;

        Some(id)
    }

    pub async fn list(&self, filter: &AlertFilter) -> Result<Vec<FraudAlert>, CashbackError> {
        Ok(self.store.list_fraud_alerts(filter).await?)
    }

    pub async fn review(
        &self,
        alert_id: Uuid,
        admin_id: &str,
        status: AlertStatus,
        notes: Option<String>,
    ) -> Result<FraudAlert, CashbackError> {
        let current = self
            .store
            .get_fraud_alert(alert_id)
            .await?
            .ok_or(CashbackError::AlertNotFound)?;

        if !current.status.can_transition_to(status) {
            return Err(CashbackError::InvalidReview(format!(
                "alert is {} and cannot become {}",
                current.status.as_str(),
                status.as_str()
            )));
        }

        let review = AlertReview {
            status,
            investigated_by: admin_id.to_string(),
            investigated_at: Utc::now(),
            resolution_notes: notes,
        };
        let updated = self.store.update_fraud_alert(alert_id, &review).await?;

        tracing::info!(
            alert_id = %alert_id,
            admin_id,
            from = current.status.as_str(),
            to = status.as_str(),
            "Fraud alert reviewed"
        );

        let entry = AuditEntry::new(Some(admin_id), "fraud_alert_reviewed", "fraud_alert")
            .entity(alert_id.to_string())
            .change(
                Some(json!({ "status": current.status })),
                Some(json!({ "status": status, "notes": review.resolution_notes })),
            );
        self.audit.record(entry).await;

        Ok(updated)
    }
}
