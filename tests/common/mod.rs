//! Shared wiring for the integration tests: every service over one
//! `MemoryStore`, with optional fakes swapped in per concern.

#![allow(dead_code)]

use anyhow::{bail, Result};
use async_trait::async_trait;
use cashback_guard::config::{FraudThresholds, RateLimitPolicy};
use cashback_guard::middleware::AdminGate;
use cashback_guard::models::{
    AlertFilter, AlertReview, FraudAlert, PayoutRecord, RequestMeta, Submission,
    SubmissionFilter, SubmissionPatch, SubmissionRequest, SubmissionStatus,
};
use cashback_guard::routes::{create_router, AppState};
use cashback_guard::services::*;
use cashback_guard::store::{
    FraudStore, MemoryStore, PayoutStore, StoreError, StoreResult, SubmissionStore,
};
use axum::Router;
use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use uuid::Uuid;

pub const ADMIN: &str = "admin-1";
pub const ADMIN_TOKEN: &str = "admin-access-token";
pub const USER_TOKEN: &str = "user-access-token";

#[derive(Default)]
pub struct Overrides {
    pub submissions: Option<Arc<dyn SubmissionStore>>,
    pub fraud: Option<Arc<dyn FraudStore>>,
    pub payouts: Option<Arc<dyn PayoutStore>>,
    pub notifier: Option<Arc<dyn Notifier>>,
    pub rate_limit: Option<RateLimitPolicy>,
}

pub struct Harness {
    pub store: Arc<MemoryStore>,
    pub intake: Arc<SubmissionService>,
    pub workflow: Arc<AdminWorkflow>,
    pub alerts: Arc<FraudAlertStore>,
    pub gate: Arc<AdminGate>,
    pub cache: Arc<CacheService>,
}

impl Harness {
    pub async fn new() -> Self {
        Self::build(Overrides::default()).await
    }

    pub async fn build(overrides: Overrides) -> Self {
        let store = Arc::new(MemoryStore::new());
        store.add_admin(ADMIN, "super_admin").await;
        store.add_session(ADMIN_TOKEN, ADMIN).await;
        store.add_session(USER_TOKEN, "u1").await;
        store.add_firm("firm-x", 10.0).await;

        let fraud: Arc<dyn FraudStore> = overrides
            .fraud
            .unwrap_or_else(|| store.clone() as Arc<dyn FraudStore>);
        let payouts: Arc<dyn PayoutStore> = overrides
            .payouts
            .unwrap_or_else(|| store.clone() as Arc<dyn PayoutStore>);
        let submissions: Arc<dyn SubmissionStore> = overrides
            .submissions
            .unwrap_or_else(|| store.clone() as Arc<dyn SubmissionStore>);
        let notifier: Arc<dyn Notifier> = overrides
            .notifier
            .unwrap_or_else(|| Arc::new(LogNotifier) as Arc<dyn Notifier>);

        let audit = AuditTrail::new(store.clone(), Duration::from_secs(1));
        let alerts = Arc::new(FraudAlertStore::new(fraud.clone(), audit.clone()));
        let detector = Arc::new(FraudDetector::new(
            fraud,
            (*alerts).clone(),
            FraudThresholds::default(),
        ));
        let validator = Arc::new(SubmissionValidator::new(detector, 100_000.0));
        let rate_limiter = RateLimiter::new(
            store.clone(),
            overrides.rate_limit.unwrap_or_default(),
        );

        let intake = Arc::new(SubmissionService::new(
            validator,
            store.clone(),
            store.clone(),
            rate_limiter,
            audit.clone(),
            10.0,
        ));
        let workflow = Arc::new(AdminWorkflow::new(
            submissions,
            payouts,
            audit,
            notifier,
            Duration::ZERO,
        ));
        let cache = Arc::new(CacheService::memory_only(Duration::from_secs(60)));
        let gate = Arc::new(AdminGate::new(
            store.clone(),
            store.clone(),
            cache.clone(),
            300,
        ));

        Self {
            store,
            intake,
            workflow,
            alerts,
            gate,
            cache,
        }
    }

    pub fn router(&self) -> Router {
        let state = AppState {
            intake: self.intake.clone(),
            workflow: self.workflow.clone(),
            alerts: self.alerts.clone(),
            submissions: self.store.clone(),
            cache: self.cache.clone(),
            started_at: Instant::now(),
        };
        create_router(state, self.gate.clone())
    }

    pub async fn seed(&self, id: &str, status: SubmissionStatus) -> Submission {
        let submission = submission(id, status);
        self.store.insert_submission(&submission).await.unwrap();
        submission
    }

    pub async fn status_of(&self, id: &str) -> SubmissionStatus {
        self.store.get_submission(id).await.unwrap().unwrap().status
    }
}

pub fn evm_wallet(fill: char) -> String {
    format!("0x{}", fill.to_string().repeat(40))
}

pub fn request(user_id: &str, wallet: &str, amount: f64) -> SubmissionRequest {
    SubmissionRequest {
        user_id: user_id.to_string(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        firm_id: "firm-x".to_string(),
        firm_name: "FirmX".to_string(),
        purchase_amount: amount,
        proof_of_purchase: format!("https://proof.example.com/{}/{}", user_id, amount),
        wallet_address: wallet.to_string(),
        wallet_network: None,
        additional_details: None,
    }
}

pub fn no_ip() -> RequestMeta {
    RequestMeta::default()
}

pub fn submission(id: &str, status: SubmissionStatus) -> Submission {
    let now = Utc::now();
    Submission {
        id: id.to_string(),
        user_id: "u1".to_string(),
        name: "Ada Lovelace".to_string(),
        email: "ada@example.com".to_string(),
        firm_id: "firm-x".to_string(),
        firm_name: "FirmX".to_string(),
        purchase_amount: 100.0,
        proof_of_purchase: format!("https://proof.example.com/{}", id),
        wallet_address: evm_wallet('a'),
        wallet_network: Some("BEP20".to_string()),
        cashback_amount: 10.0,
        status,
        additional_details: None,
        admin_notes: None,
        rejection_reason: None,
        processed_by: None,
        processed_at: None,
        ip_address: None,
        user_agent: None,
        created_at: now,
        updated_at: now,
    }
}

/// Delegates to a `MemoryStore` and counts every fraud-store call.
pub struct CountingFraudStore {
    inner: Arc<MemoryStore>,
    calls: AtomicUsize,
}

impl CountingFraudStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self {
            inner,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn tick(&self) {
        self.calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl FraudStore for CountingFraudStore {
    async fn wallet_used_by_other(&self, wallet_address: &str, user_id: &str) -> StoreResult<bool> {
        self.tick();
        self.inner.wallet_used_by_other(wallet_address, user_id).await
    }

    async fn proof_used_by_other(&self, proof: &str, user_id: &str) -> StoreResult<bool> {
        self.tick();
        self.inner.proof_used_by_other(proof, user_id).await
    }

    async fn submissions_since(&self, user_id: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        self.tick();
        self.inner.submissions_since(user_id, since).await
    }

    async fn distinct_users_from_ip(&self, ip: &str, since: DateTime<Utc>) -> StoreResult<u64> {
        self.tick();
        self.inner.distinct_users_from_ip(ip, since).await
    }

    async fn create_fraud_alert(&self, alert: &FraudAlert) -> StoreResult<Uuid> {
        self.tick();
        self.inner.create_fraud_alert(alert).await
    }

    async fn get_fraud_alert(&self, id: Uuid) -> StoreResult<Option<FraudAlert>> {
        self.tick();
        self.inner.get_fraud_alert(id).await
    }

    async fn update_fraud_alert(&self, id: Uuid, review: &AlertReview) -> StoreResult<FraudAlert> {
        self.tick();
        self.inner.update_fraud_alert(id, review).await
    }

    async fn list_fraud_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<FraudAlert>> {
        self.tick();
        self.inner.list_fraud_alerts(filter).await
    }
}

/// Every query fails, as if the datastore were down.
pub struct DownFraudStore;

fn down<T>() -> StoreResult<T> {
    Err(StoreError::Unavailable("connection refused".to_string()))
}

#[async_trait]
impl FraudStore for DownFraudStore {
    async fn wallet_used_by_other(&self, _: &str, _: &str) -> StoreResult<bool> {
        down()
    }

    async fn proof_used_by_other(&self, _: &str, _: &str) -> StoreResult<bool> {
        down()
    }

    async fn submissions_since(&self, _: &str, _: DateTime<Utc>) -> StoreResult<u64> {
        down()
    }

    async fn distinct_users_from_ip(&self, _: &str, _: DateTime<Utc>) -> StoreResult<u64> {
        down()
    }

    async fn create_fraud_alert(&self, _: &FraudAlert) -> StoreResult<Uuid> {
        down()
    }

    async fn get_fraud_alert(&self, _: Uuid) -> StoreResult<Option<FraudAlert>> {
        down()
    }

    async fn update_fraud_alert(&self, _: Uuid, _: &AlertReview) -> StoreResult<FraudAlert> {
        down()
    }

    async fn list_fraud_alerts(&self, _: &AlertFilter) -> StoreResult<Vec<FraudAlert>> {
        down()
    }
}

/// Reads report every row as approved, as a second admin would have seen it
/// just before a concurrent payout. Writes go to the real store.
pub struct StaleReadStore {
    inner: Arc<MemoryStore>,
}

impl StaleReadStore {
    pub fn new(inner: Arc<MemoryStore>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl SubmissionStore for StaleReadStore {
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()> {
        self.inner.insert_submission(submission).await
    }

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>> {
        let row = self.inner.get_submission(id).await?;
        Ok(row.map(|mut s| {
            s.status = SubmissionStatus::Approved;
            s
        }))
    }

    async fn update_submission(
        &self,
        id: &str,
        expected: SubmissionStatus,
        patch: &SubmissionPatch,
    ) -> StoreResult<Submission> {
        self.inner.update_submission(id, expected, patch).await
    }

    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>> {
        self.inner.list_submissions(filter).await
    }
}

/// Payout ledger that rejects every write.
pub struct DownPayoutStore;

#[async_trait]
impl PayoutStore for DownPayoutStore {
    async fn insert_payout(&self, _: &PayoutRecord) -> StoreResult<()> {
        Err(StoreError::Status {
            status: 503,
            body: "service unavailable".to_string(),
        })
    }

    async fn payouts_for_submission(&self, _: &str) -> StoreResult<Vec<PayoutRecord>> {
        Ok(Vec::new())
    }
}

/// Notifier that always fails and remembers how often it was asked.
#[derive(Default)]
pub struct BrokenNotifier {
    pub attempts: AtomicUsize,
}

#[async_trait]
impl Notifier for BrokenNotifier {
    async fn notify(&self, _: &Notification) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        bail!("email function unreachable")
    }
}
