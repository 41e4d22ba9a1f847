use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubmissionStatus {
    Pending,
    Approved,
    Paid,
    Rejected,
}

impl SubmissionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubmissionStatus::Pending => "pending",
            SubmissionStatus::Approved => "approved",
            SubmissionStatus::Paid => "paid",
            SubmissionStatus::Rejected => "rejected",
        }
    }

    /// pending -> approved | rejected, approved -> paid. Nothing else.
    pub fn can_transition_to(self, next: SubmissionStatus) -> bool {
        matches!(
            (self, next),
            (SubmissionStatus::Pending, SubmissionStatus::Approved)
                | (SubmissionStatus::Pending, SubmissionStatus::Rejected)
                | (SubmissionStatus::Approved, SubmissionStatus::Paid)
        )
    }
}

impl std::fmt::Display for SubmissionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored cashback claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Submission {
    pub id: String,
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub firm_id: String,
    pub firm_name: String,
    pub purchase_amount: f64,
    pub proof_of_purchase: String,
    pub wallet_address: String,
    #[serde(default)]
    pub wallet_network: Option<String>,
    pub cashback_amount: f64,
    pub status: SubmissionStatus,
    #[serde(default)]
    pub additional_details: Option<String>,
    #[serde(default)]
    pub admin_notes: Option<String>,
    #[serde(default)]
    pub rejection_reason: Option<String>,
    #[serde(default)]
    pub processed_by: Option<String>,
    #[serde(default)]
    pub processed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Form payload as sent by the client. Missing fields deserialize to empty
/// values so they surface as validation errors instead of decode failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubmissionRequest {
    pub user_id: String,
    pub name: String,
    pub email: String,
    pub firm_id: String,
    pub firm_name: String,
    pub purchase_amount: f64,
    pub proof_of_purchase: String,
    pub wallet_address: String,
    pub wallet_network: Option<String>,
    pub additional_details: Option<String>,
}

/// Partial update applied by the admin workflow. `None` leaves the column
/// untouched.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SubmissionPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<SubmissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_at: Option<DateTime<Utc>>,
}

impl SubmissionPatch {
    pub fn status(status: SubmissionStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    pub fn apply(&self, submission: &mut Submission, now: DateTime<Utc>) {
        if let Some(status) = self.status {
            submission.status = status;
        }
        if let Some(notes) = &self.admin_notes {
            submission.admin_notes = Some(notes.clone());
        }
        if let Some(reason) = &self.rejection_reason {
            submission.rejection_reason = Some(reason.clone());
        }
        if let Some(admin) = &self.processed_by {
            submission.processed_by = Some(admin.clone());
        }
        if let Some(at) = self.processed_at {
            submission.processed_at = Some(at);
        }
        submission.updated_at = now;
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct SubmissionFilter {
    pub user_id: Option<String>,
    pub firm_id: Option<String>,
    pub status: Option<SubmissionStatus>,
    pub wallet_address: Option<String>,
    pub purchase_amount: Option<f64>,
    pub created_after: Option<DateTime<Utc>>,
    pub created_before: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl SubmissionFilter {
    pub fn matches(&self, submission: &Submission) -> bool {
        self.user_id.as_ref().map_or(true, |u| &submission.user_id == u)
            && self.firm_id.as_ref().map_or(true, |f| &submission.firm_id == f)
            && self.status.map_or(true, |s| submission.status == s)
            && self
                .wallet_address
                .as_ref()
                .map_or(true, |w| &submission.wallet_address == w)
            && self
                .purchase_amount
                .map_or(true, |a| submission.purchase_amount == a)
            && self.created_after.map_or(true, |t| submission.created_at >= t)
            && self.created_before.map_or(true, |t| submission.created_at < t)
    }
}

/// Client origin captured at the HTTP edge and threaded into audit entries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RequestMeta {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}
