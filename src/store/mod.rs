//! Datastore collaborators.
//!
//! The core never owns submission or alert state across requests; every read
//! and write goes through one of these traits. `SupabaseStore` talks to the
//! hosted database, `MemoryStore` backs development mode and tests.

pub mod memory;
pub mod supabase;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use crate::models::{
    AlertFilter, AlertReview, AuditEntry, FraudAlert, PayoutRecord, RateLimitBucket, Submission,
    SubmissionFilter, SubmissionPatch, SubmissionStatus,
};

pub use memory::MemoryStore;
pub use supabase::SupabaseStore;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Datastore request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("Datastore returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Datastore response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Datastore call timed out")]
    Timeout,

    #[error("Record not found: {0}")]
    NotFound(String),

    #[error("Record {id} is no longer {expected}")]
    Conflict { id: String, expected: String },

    #[error("Datastore unavailable: {0}")]
    Unavailable(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[async_trait]
pub trait SubmissionStore: Send + Sync {
    async fn insert_submission(&self, submission: &Submission) -> StoreResult<()>;

    async fn get_submission(&self, id: &str) -> StoreResult<Option<Submission>>;

    /// Applies `patch` only while the row is still in `expected` status, so
    /// concurrent transitions serialise in the store. Returns the updated
    /// row, `StoreError::NotFound`, or `StoreError::Conflict` when the status
    /// moved underneath the caller.
    async fn update_submission(
        &self,
        id: &str,
        expected: SubmissionStatus,
        patch: &SubmissionPatch,
    ) -> StoreResult<Submission>;

    /// Newest first.
    async fn list_submissions(&self, filter: &SubmissionFilter) -> StoreResult<Vec<Submission>>;
}

/// Set-based fraud queries plus fraud alert persistence.
#[async_trait]
pub trait FraudStore: Send + Sync {
    /// Has any other user already used this wallet on a non-rejected submission.
    async fn wallet_used_by_other(&self, wallet_address: &str, user_id: &str) -> StoreResult<bool>;

    /// Has any other user already submitted this proof of purchase.
    async fn proof_used_by_other(&self, proof: &str, user_id: &str) -> StoreResult<bool>;

    async fn submissions_since(&self, user_id: &str, since: DateTime<Utc>) -> StoreResult<u64>;

    async fn distinct_users_from_ip(&self, ip: &str, since: DateTime<Utc>) -> StoreResult<u64>;

    async fn create_fraud_alert(&self, alert: &FraudAlert) -> StoreResult<Uuid>;

    async fn get_fraud_alert(&self, id: Uuid) -> StoreResult<Option<FraudAlert>>;

    async fn update_fraud_alert(&self, id: Uuid, review: &AlertReview) -> StoreResult<FraudAlert>;

    /// Newest first.
    async fn list_fraud_alerts(&self, filter: &AlertFilter) -> StoreResult<Vec<FraudAlert>>;
}

#[async_trait]
pub trait PayoutStore: Send + Sync {
    async fn insert_payout(&self, payout: &PayoutRecord) -> StoreResult<()>;

    async fn payouts_for_submission(&self, submission_id: &str) -> StoreResult<Vec<PayoutRecord>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append(&self, entry: &AuditEntry) -> StoreResult<()>;
}

#[async_trait]
pub trait RateLimitStore: Send + Sync {
    async fn get_bucket(
        &self,
        identifier: &str,
        action_type: &str,
    ) -> StoreResult<Option<RateLimitBucket>>;

    async fn save_bucket(&self, bucket: &RateLimitBucket) -> StoreResult<()>;

    async fn reset_bucket(&self, identifier: &str, action_type: &str) -> StoreResult<()>;
}

#[async_trait]
pub trait AdminDirectory: Send + Sync {
    async fn is_admin(&self, user_id: &str) -> StoreResult<bool>;

    async fn get_admin_role(&self, user_id: &str) -> StoreResult<Option<String>>;
}

/// Resolves caller access tokens issued by the auth service.
#[async_trait]
pub trait SessionDirectory: Send + Sync {
    /// User id behind `access_token`, or `None` when the token is invalid
    /// or expired.
    async fn user_for_token(&self, access_token: &str) -> StoreResult<Option<String>>;
}

#[async_trait]
pub trait FirmDirectory: Send + Sync {
    /// Cashback percentage (0-100) for a firm, if the firm is known.
    async fn cashback_percentage(&self, firm_id: &str) -> StoreResult<Option<f64>>;
}
