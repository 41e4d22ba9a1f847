//! PostgREST / RPC client for the hosted datastore.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Method, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

use super::{
    AdminDirectory, AuditStore, FirmDirectory, FraudStore, PayoutStore, RateLimitStore,
    SessionDirectory, StoreError, StoreResult, SubmissionStore,
};
use crate::models::{
    AlertFilter, AlertReview, AuditEntry, FraudAlert, PayoutRecord, RateLimitBucket, Submission,
    SubmissionFilter, SubmissionPatch, SubmissionStatus,
};

const SUBMISSIONS: &str = "submissions";
const FRAUD_ALERTS: &str = "fraud_alerts";
const PAYOUTS: &str = "payout_logs";
const AUDIT_LOG: &str = "audit_log";
const RATE_LIMITS: &str = "rate_limits";
const FIRMS: &str = "firms";

#[derive(Clone)]
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl SupabaseStore {
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> StoreResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        tracing::info!("Datastore client configured for {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    fn table(&self, method: Method, table: &str) -> RequestBuilder {
        self.client
            .request(method, format!("{}/rest/v1/{}", self.base_url, table))
    }

    async fn execute(&self, request: RequestBuilder) -> StoreResult<String> {
        let response = request
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Datastore rejected request");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        Ok(body)
    }

    async fn fetch<T: DeserializeOwned>(&self, request: RequestBuilder) -> StoreResult<T> {
        let body = self.execute(request).await?;
        Ok(serde_json::from_str(&body)?)
    }

    async fn rpc<T: DeserializeOwned>(
        &self,
        function: &str,
        params: serde_json::Value,
    ) -> StoreResult<T> {
        let request = self
            .client
            .post(format!("{}/rest/v1/rpc/{}", self.base_url, function))
            .json(&params);
        self.fetch(request).await
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{}", value)
}

fn submission_query(filter: &SubmissionFilter) -> Vec<(&'static str, String)> {
    let mut query = vec![("select", "*".to_string())];
    if let Some(user_id) = &filter.user_id {
        query.push(("user_id", eq(user_id)));
    }
    if let Some(firm_id) = &filter.firm_id {
        query.push(("firm_id", eq(firm_id)));
    }
    if let Some(status) = filter.status {
        query.push(("status", eq(status.as_str())));
    }
    if let Some(wallet) = &filter.wallet_address {
        query.push(("wallet_address", eq(wallet)));
    }
    if let Some(amount) = filter.purchase_amount {
        query.push(("purchase_amount", eq(amount)));
    }
    if let Some(after) = filter.created_after {
        query.push(("created_at", format!("gte.{}", after.to_rfc3339())));
    }
    if let Some(before) = filter.created_before {
        query.push(("created_at", format!("lt.{}", before.to_rfc3339())));
    }
    query.push(("order", "created_at.desc".to_string()));
    if let Some(limit) = filter.limit {
        query.push(("limit", limit.to_string()));
    }
    query
}

#[async_trait]
impl SubmissionStore for SupabaseStore {
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        let request = self
            .table(Method::POST, SUBMISSIONS)
            .header("Prefer", "return=minimal")
            .json(submission);
        self.execute(request).await?;
        Ok(())
    }

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> {
        let request = self
            .table(Method::GET, SUBMISSIONS)
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        let rows: Vec<Submission> = self.fetch(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_submission(
        &self,
        id: &str,
        expected: SubmissionStatus,
        patch: &SubmissionPatch,
    ) -> StoreResult<Submission> {
        let mut body = serde_json::to_value(patch)?;
        if let Some(fields) = body.as_object_mut() {
            fields.insert("updated_at".to_string(), json!(Utc::now()));
        }
        let request = self
            .table(Method::PATCH, SUBMISSIONS)
            .query(&[("id", eq(id)), ("status", eq(expected.as_str()))])
            .header("Prefer", "return=representation")
            .json(&body);
        let rows: Vec<Submission> = self.fetch(request).await?;
        if let Some(updated) = rows.into_iter().next() {
            return Ok(updated);
        }

        // No row matched: either the id is unknown or the status moved on
        match self.get_submission(id).await? {
            Some(_) => Err(StoreError::Conflict {
                id: id.to_string(),
                expected: expected.to_string(),
            }),
            None => Err(StoreError::NotFound(id.to_string())),
        }
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>> {
        let request = self
            .table(Method::GET, SUBMISSIONS)
            .query(&submission_query(filter));
        self.fetch(request).await
    }
}

#[async_trait]
impl FraudStore for SupabaseStore {
    async fn wallet_used_by_other(&self, wallet_address: &str, user_id: &str) -> StoreResult<bool> {
        self.rpc(
            "check_duplicate_wallet",
            json!({ "p_wallet_address": wallet_address, "p_user_id": user_id }),
        )
        .await
    }

    async fn proof_used_by_other(&self, proof: &str, user_id: &str) -> StoreResult<bool> {
        self.rpc(
            "check_duplicate_proof",
            json!({ "p_proof_url": proof, "p_user_id": user_id }),
        )
        .await
    }

    async fn submissions_since(&self, user_id: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        self.rpc(
            "check_rapid_submissions",
            json!({ "p_user_id": user_id, "p_since": since }),
        )
        .await
    }

    async fn distinct_users_from_ip(&self, ip: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        self.rpc(
            "check_suspicious_ip",
            json!({ "p_ip_address": ip, "p_since": since }),
        )
        .await
    }

    async fn create_fraud_alert(&self, alert: &FraudAlert) -> StoreResult<Uuid> {
        self.rpc(
            "create_fraud_alert",
            json!({
                "p_user_id": alert.user_id,
                "p_submission_id": alert.submission_id,
                "p_alert_type": alert.alert_type,
                "p_severity": alert.severity,
                "p_details": alert.details,
            }),
        )
        .await
    }

    async fn get_fraud_alert(&self, id: Uuid) -> StoreResult<Option<FraudAlert>> {
        let request = self
            .table(Method::GET, FRAUD_ALERTS)
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        let rows: Vec<FraudAlert> = self.fetch(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn update_fraud_alert(&self, id: Uuid, review: &AlertReview) -> StoreResult<FraudAlert> {
        let request = self
            .table(Method::PATCH, FRAUD_ALERTS)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .json(review);
        let rows: Vec<FraudAlert> = self.fetch(request).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn list_fraud_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<FraudAlert>> {
        let mut query = vec![("select", "*".to_string())];
        if let Some(status) = filter.status {
            query.push(("status", eq(status.as_str())));
        }
        if let Some(severity) = filter.severity {
            query.push(("severity", eq(severity.as_str())));
        }
        if let Some(alert_type) = filter.alert_type {
            query.push(("alert_type", eq(alert_type.as_str())));
        }
        query.push(("order", "created_at.desc".to_string()));
        if let Some(limit) = filter.limit {
            query.push(("limit", limit.to_string()));
        }
        self.fetch(self.table(Method::GET, FRAUD_ALERTS).query(&query))
            .await
    }
}

#[async_trait]
impl PayoutStore for SupabaseStore {
    async fn insert_payout(&self, payout: &PayoutRecord) -> StoreResult<()> {
        let request = self
            .table(Method::POST, PAYOUTS)
            .header("Prefer", "return=minimal")
            .json(payout);
        self.execute(request).await?;
        Ok(())
    }

    async fn payouts_for_submission(&self, submission_id: &str) -> StoreResult<Vec<PayoutRecord>> {
        let request = self.table(Method::GET, PAYOUTS).query(&[
            ("select", "*".to_string()),
            ("submission_ids", format!("cs.{{{}}}", submission_id)),
        ]);
        self.fetch(request).await
    }
}

#[async_trait]
impl AuditStore for SupabaseStore {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()> {
        let request = self
            .table(Method::POST, AUDIT_LOG)
            .header("Prefer", "return=minimal")
            .json(entry);
        self.execute(request).await?;
        Ok(())
    }
}

#[async_trait]
impl RateLimitStore for SupabaseStore {
    async fn get_bucket(
        &self,
        identifier: &str,
        action_type: &str,
    ) -> StoreResult<Option<RateLimitBucket>> {
        let request = self.table(Method::GET, RATE_LIMITS).query(&[
            ("select", "*".to_string()),
            ("identifier", eq(identifier)),
            ("action_type", eq(action_type)),
            ("limit", "1".to_string()),
        ]);
        let rows: Vec<RateLimitBucket> = self.fetch(request).await?;
        Ok(rows.into_iter().next())
    }

    async fn save_bucket(&self, bucket: &RateLimitBucket) -> StoreResult<()> {
        let request = self
            .table(Method::POST, RATE_LIMITS)
            .query(&[("on_conflict", "identifier,action_type")])
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(bucket);
        self.execute(request).await?;
        Ok(())
    }

    async fn reset_bucket(&self, identifier: &str, action_type: &str) -> StoreResult<()> {
        let request = self
            .table(Method::DELETE, RATE_LIMITS)
            .query(&[("identifier", eq(identifier)), ("action_type", eq(action_type))]);
        self.execute(request).await?;
        Ok(())
    }
}

#[async_trait]
impl AdminDirectory for SupabaseStore {
    async fn is_admin(&self, user_id: &str) -> StoreResult<bool> {
        self.rpc("is_admin", json!({ "p_user_id": user_id })).await
    }

    async fn get_admin_role(&self, user_id: &str) -> StoreResult<Option<String>> {
        self.rpc("get_admin_role", json!({ "p_user_id": user_id }))
            .await
    }
}

#[derive(Deserialize)]
struct AuthUser {
    id: String,
}

#[async_trait]
impl SessionDirectory for SupabaseStore {
    /// Asks the auth service who owns `access_token`. The token itself is
    /// the bearer here, not the service key.
    async fn user_for_token(&self, access_token: &str) -> StoreResult<Option<String>> {
        let response = self
            .client
            .get(format!("{}/auth/v1/user", self.base_url))
            .header("apikey", &self.api_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Ok(None);
        }

        let body = response.text().await?;
        if !status.is_success() {
            tracing::warn!(status = status.as_u16(), "Auth service rejected token lookup");
            return Err(StoreError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let user: AuthUser = serde_json::from_str(&body)?;
        Ok(Some(user.id))
    }
}

#[derive(Deserialize)]
struct FirmRow {
    cashback_percentage: f64,
}

#[async_trait]
impl FirmDirectory for SupabaseStore {
    async fn cashback_percentage(&self, firm_id: &str) -> StoreResult<Option<f64>> {
        let request = self.table(Method::GET, FIRMS).query(&[
            ("select", "cashback_percentage".to_string()),
            ("id", eq(firm_id)),
        ]);
        let rows: Vec<FirmRow> = self.fetch(request).await?;
        Ok(rows.into_iter().next().map(|row| row.cashback_percentage))
    }
}
