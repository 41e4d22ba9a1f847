use crate::models::{FraudAlert, Submission};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Serialize, Deserialize, Debug)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: T,
    pub timestamp: DateTime<Utc>,
    pub request_id: String,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
        }
    }
}

/// Result of an accepted submission.
#[derive(Serialize, Deserialize, Debug)]
pub struct SubmissionReceipt {
    pub submission: Submission,
    pub warnings: Vec<String>,
    pub alerts: Vec<FraudAlert>,
}

#[derive(Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub struct BulkOutcome {
    pub processed: usize,
    pub failed: usize,
    pub errors: Vec<String>,
}

#[derive(Serialize, Deserialize, Debug)]
pub struct HealthStatus {
    pub status: String,
    pub version: String,
    pub datastore: bool,
    /// `None` when Redis is not configured.
    pub redis: Option<bool>,
    pub uptime_seconds: u64,
    pub timestamp: DateTime<Utc>,
}
