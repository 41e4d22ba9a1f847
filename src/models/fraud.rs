use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    DuplicateWallet,
    DuplicateProof,
    SuspiciousIp,
    HighAmount,
    RapidRequests,
    InvalidData,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::DuplicateWallet => "duplicate_wallet",
            AlertType::DuplicateProof => "duplicate_proof",
            AlertType::SuspiciousIp => "suspicious_ip",
            AlertType::HighAmount => "high_amount",
            AlertType::RapidRequests => "rapid_requests",
            AlertType::InvalidData => "invalid_data",
        }
    }
}

/// Ordinal: low < medium < high < critical.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// How an alert of a given severity affects the verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    Warning,
    Error,
}

pub const SEVERITY_POLICY: [(Severity, Disposition); 4] = [
    (Severity::Low, Disposition::Warning),
    (Severity::Medium, Disposition::Warning),
    (Severity::High, Disposition::Error),
    (Severity::Critical, Disposition::Error),
];

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn disposition(self) -> Disposition {
        SEVERITY_POLICY
            .iter()
            .find(|(severity, _)| *severity == self)
            .map(|(_, disposition)| *disposition)
            .unwrap_or(Disposition::Error)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertStatus {
    Open,
    Investigating,
    Resolved,
    FalsePositive,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Open => "open",
            AlertStatus::Investigating => "investigating",
            AlertStatus::Resolved => "resolved",
            AlertStatus::FalsePositive => "false_positive",
        }
    }

    pub fn is_terminal(self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::FalsePositive)
    }

    pub fn can_transition_to(self, next: AlertStatus) -> bool {
        match self {
            AlertStatus::Open => next != AlertStatus::Open,
            AlertStatus::Investigating => next.is_terminal(),
            AlertStatus::Resolved | AlertStatus::FalsePositive => false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FraudAlert {
    /// `None` when the alert could not be persisted.
    pub id: Option<Uuid>,
    pub user_id: Option<String>,
    pub submission_id: Option<String>,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub details: serde_json::Value,
    pub status: AlertStatus,
    #[serde(default)]
    pub investigated_by: Option<String>,
    #[serde(default)]
    pub investigated_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resolution_notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl FraudAlert {
    pub fn new(
        user_id: Option<&str>,
        alert_type: AlertType,
        severity: Severity,
        details: serde_json::Value,
    ) -> Self {
        Self {
            id: None,
            user_id: user_id.map(str::to_string),
            submission_id: None,
            alert_type,
            severity,
            details,
            status: AlertStatus::Open,
            investigated_by: None,
            investigated_at: None,
            resolution_notes: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_recorded(&self) -> bool {
        self.id.is_some()
    }

    /// End-user facing text for the verdict.
    pub fn message(&self) -> String {
        match (self.alert_type, self.severity) {
            (AlertType::DuplicateWallet, _) => {
                "This wallet address is already registered to another account".to_string()
            }
            (AlertType::DuplicateProof, _) => {
                "This proof of purchase has already been submitted".to_string()
            }
            (AlertType::HighAmount, Severity::Critical) => {
                "Purchase amount exceeds the maximum allowed for automatic processing".to_string()
            }
            (AlertType::HighAmount, _) => {
                "High purchase amount will require additional review".to_string()
            }
            (AlertType::RapidRequests, _) => {
                "Multiple submissions detected in a short period; review may take longer"
                    .to_string()
            }
            (AlertType::SuspiciousIp, _) => {
                "Unusual activity detected from your network; review may take longer".to_string()
            }
            (AlertType::InvalidData, _) => "Submission data failed integrity checks".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AlertFilter {
    pub status: Option<AlertStatus>,
    pub severity: Option<Severity>,
    pub alert_type: Option<AlertType>,
    pub limit: Option<usize>,
}

impl AlertFilter {
    pub fn matches(&self, alert: &FraudAlert) -> bool {
        self.status.map_or(true, |s| alert.status == s)
            && self.severity.map_or(true, |s| alert.severity == s)
            && self.alert_type.map_or(true, |t| alert.alert_type == t)
    }
}

/// Admin decision on an open alert.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AlertReview {
    pub status: AlertStatus,
    pub investigated_by: String,
    pub investigated_at: DateTime<Utc>,
    pub resolution_notes: Option<String>,
}
