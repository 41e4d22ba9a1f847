//! In-memory datastore for development mode and tests.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{
    AdminDirectory, AuditStore, FirmDirectory, FraudStore, PayoutStore, RateLimitStore,
    SessionDirectory, StoreError, StoreResult, SubmissionStore,
};
use crate::models::{
    AlertFilter, AlertReview, AuditEntry, FraudAlert, PayoutRecord, RateLimitBucket, Submission,
    SubmissionFilter, SubmissionPatch, SubmissionStatus,
};

#[derive(Debug, Default)]
pub struct MemoryStore {
    submissions: Arc<RwLock<HashMap<String, Submission>>>,
    alerts: Arc<RwLock<HashMap<Uuid, FraudAlert>>>,
    payouts: Arc<RwLock<Vec<PayoutRecord>>>,
    audit_log: Arc<RwLock<Vec<AuditEntry>>>,
    rate_limits: Arc<RwLock<HashMap<(String, String), RateLimitBucket>>>,
    admins: Arc<RwLock<HashMap<String, String>>>,
    sessions: Arc<RwLock<HashMap<String, String>>>,
    firms: Arc<RwLock<HashMap<String, f64>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn add_admin(&self, user_id: &str, role: &str) {
        self.admins
            .write()
            .await
            .insert(user_id.to_string(), role.to_string());
    }

    /// Issues `access_token` for `user_id`.
    pub async fn add_session(&self, access_token: &str, user_id: &str) {
        self.sessions
            .write()
            .await
            .insert(access_token.to_string(), user_id.to_string());
    }

    pub async fn add_firm(&self, firm_id: &str, cashback_percentage: f64) {
        self.firms
            .write()
            .await
            .insert(firm_id.to_string(), cashback_percentage);
    }

    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.audit_log.read().await.clone()
    }

    pub async fn all_payouts(&self) -> Vec<PayoutRecord> {
        self.payouts.read().await.clone()
    }

    pub async fn all_alerts(&self) -> Vec<FraudAlert> {
        let mut alerts: Vec<_> = self.alerts.read().await.values().cloned().collect();
        alerts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        alerts
    }
}

#[async_trait]
impl SubmissionStore for MemoryStore {
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        let mut submissions = self.submissions.write().await;
        if submissions.contains_key(&submission.id) {
            return Err(StoreError::Unavailable(format!(
                "duplicate submission id {}",
                submission.id
            )));
        }
        submissions.insert(submission.id.clone(), submission.clone());
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> {
        Ok(self.submissions.read().await.get(id).cloned())
    }

    async fn update_submission(
        &self,
        id: &str,
        expected: SubmissionStatus,
        patch: &SubmissionPatch,
    ) -> StoreResult<Submission> {
        let mut submissions = self.submissions.write().await;
        let submission = submissions
            .get_mut(id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        if submission.status != expected {
            return Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected.to_string(),
            });
        }
        patch.apply(submission, Utc::now());
        Ok(submission.clone())
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let submissions = self.submissions.read().await;
        let mut matched: Vec<_> = submissions
            .values()
            .filter(|s| filter.matches(s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[async_trait]
impl FraudStore for MemoryStore {
    async fn wallet_used_by_other(&self, wallet_address: &str, user_id: &str) -> StoreResult<bool> {
        let submissions = self.submissions.read().await;
        Ok(submissions.values().any(|s| {
            s.wallet_address.eq_ignore_ascii_case(wallet_address)
                && s.user_id != user_id
                && s.status != SubmissionStatus::Rejected
        }))
    }

    async fn proof_used_by_other(&self, proof: &str, user_id: &str) -> StoreResult<bool> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .values()
            .any(|s| s.proof_of_purchase == proof && s.user_id != user_id))
    }

    async fn submissions_since(&self, user_id: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        let submissions = self.submissions.read().await;
        Ok(submissions
            .values()
            .filter(|s| s.user_id == user_id && s.created_at >= since)
            .count() as u64)
    }

    async fn distinct_users_from_ip(&self, ip: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        let submissions = self.submissions.read().await;
        let users: HashSet<&str> = submissions
            .values()
            .filter(|s| s.ip_address.as_deref() == Some(ip) && s.created_at >= since)
            .map(|s| s.user_id.as_str())
            .collect();
        Ok(users.len() as u64)
    }

    async fn create_fraud_alert(&self, alert: &FraudAlert) -> StoreResult<Uuid> {
        let id = Uuid::new_v4();
        let mut stored = alert.clone();
        stored.id = Some(id);
        self.alerts.write().await.insert(id, stored);
        Ok(id)
    }

    async fn get_fraud_alert(&self, id: Uuid) -> StoreResult<Option<FraudAlert>> {
        Ok(self.alerts.read().await.get(&id).cloned())
    }

    async fn update_fraud_alert(&self, id: Uuid, review: &AlertReview) -> StoreResult<FraudAlert> {
        let mut alerts = self.alerts.write().await;
        let alert = alerts
            .get_mut(&id)
            .ok_or_else(|| StoreError::NotFound(id.to_string()))?;
        alert.status = review.status;
        alert.investigated_by = Some(review.investigated_by.clone());
        alert.investigated_at = Some(review.investigated_at);
        alert.resolution_notes = review.resolution_notes.clone();
        Ok(alert.clone())
    }

    async fn list_fraud_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<FraudAlert>> {
        let mut matched: Vec<_> = self
            .all_alerts()
            .await
            .into_iter()
            .filter(|a| filter.matches(a))
            .collect();
        if let Some(limit) = filter.limit {
            matched.truncate(limit);
        }
        Ok(matched)
    }
}

#[async_trait]
impl PayoutStore for MemoryStore {
    async fn insert_payout(&self, payout: &PayoutRecord) -> StoreResult<()> {
        self.payouts.write().await.push(payout.clone());
        Ok(())
    }

    async fn payouts_for_submission(&self, submission_id: &str) -> StoreResult<Vec<PayoutRecord>> {
        Ok(self
            .payouts
            .read()
            .await
            .iter()
            .filter(|p| p.submission_ids.iter().any(|id| id == submission_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        self.audit_log.write().await.push(entry.clone());
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for MemoryStore {
    async fn get_bucket(
        &self,
        identifier: &str,
        action_type: &str,
    ) -> StoreResult<Option<RateLimitBucket>> {
        let key = (identifier.to_string(), action_type.to_string());
        Ok(self.rate_limits.read().await.get(&key).cloned())
    }

    async fn save_bucket(&self, bucket: &RateLimitBucket) -> StoreResult<()> {
        let key = (bucket.identifier.clone(), bucket.action_type.clone());
        self.rate_limits.write().await.insert(key, bucket.clone());
        Ok(())
    }

    async fn reset_bucket(&self, identifier: &str, action_type: &str) -> StoreResult<()> {
        let key = (identifier.to_string(), action_type.to_string());
        self.rate_limits.write().await.remove(&key);
        Ok(())
    }
}

#[async_trait]
impl AdminDirectory for MemoryStore {
    async fn is_admin(&self, user_id: &str) -> StoreResult<bool> {
        Ok(self.admins.read().await.contains_key(user_id))
    }

    async fn get_admin_role(&self, user_id: &str) -> StoreResult<Option<String>> {
        Ok(self.admins.read().await.get(user_id).cloned())
    }
}

#[async_trait]
impl SessionDirectory for MemoryStore {
    async fn user_for_token(&self, access_token: &str) -> StoreResult<Option<String>> {
        Ok(self.sessions.read().await.get(access_token).cloned())
    }
}

#[async_trait]
impl FirmDirectory for MemoryStore {
    async fn cashback_percentage(&self, firm_id: &str) -> StoreResult<Option<f64>> {
        Ok(self.firms.read().await.get(firm_id).copied())
    }
}
