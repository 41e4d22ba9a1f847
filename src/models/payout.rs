use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayoutStatus {
    Pending,
    Completed,
    Failed,
}

/// Ledger entry for a cashback transfer sent by an admin.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PayoutRecord {
    pub id: Uuid,
    pub submission_ids: Vec<String>,
    pub user_id: String,
    pub user_email: String,
    pub wallet_address: String,
    pub amount_sent: f64,
    pub transaction_hash: String,
    pub sent_by: String,
    pub sent_at: DateTime<Utc>,
    pub status: PayoutStatus,
}
