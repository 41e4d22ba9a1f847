use crate::models::SubmissionStatus;
use crate::store::StoreError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

#[derive(Error, Debug)]
pub enum CashbackError {
    #[error("Submission failed validation")]
    Validation {
        errors: Vec<String>,
        warnings: Vec<String>,
    },

    #[error("Submission not found")]
    SubmissionNotFound,

    #[error("Fraud alert not found")]
    AlertNotFound,

    #[error("Cannot move submission from {from} to {to}")]
    InvalidTransition {
        from: SubmissionStatus,
        to: SubmissionStatus,
    },

    #[error("Submission must be approved before payout")]
    NotApproved,

    #[error("Submission was changed by another request")]
    ConcurrentUpdate,

    #[error("Invalid alert review: {0}")]
    InvalidReview(String),

    #[error("Payout could not be recorded: {0}")]
    PayoutFailed(String),

    #[error("Payout rollback failed, submission {submission_id} needs manual repair: {reason}")]
    RollbackFailed {
        submission_id: String,
        reason: String,
    },

    #[error("Rate limit exceeded")]
    RateLimitExceeded,

    #[error("Admin identity required")]
    Unauthorized,

    #[error("Admin privileges required")]
    Forbidden,

    #[error("Datastore error: {0}")]
    Store(#[from] StoreError),
}

#[derive(Serialize, Deserialize, Debug)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
    pub error_code: String,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub details: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty", default)]
    pub warnings: Vec<String>,
    pub timestamp: chrono::DateTime<Utc>,
    pub request_id: String,
}

impl CashbackError {
    fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            CashbackError::Validation { .. } => {
                (StatusCode::UNPROCESSABLE_ENTITY, "VALIDATION_FAILED")
            }
            CashbackError::SubmissionNotFound | CashbackError::AlertNotFound => {
                (StatusCode::NOT_FOUND, "NOT_FOUND")
            }
            CashbackError::InvalidTransition { .. }
            | CashbackError::NotApproved
            | CashbackError::ConcurrentUpdate
            | CashbackError::InvalidReview(_) => (StatusCode::CONFLICT, "INVALID_STATE"),
            CashbackError::RateLimitExceeded => {
                (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMIT_EXCEEDED")
            }
            CashbackError::Unauthorized => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
            CashbackError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
            CashbackError::PayoutFailed(_) | CashbackError::Store(_) => {
                (StatusCode::BAD_GATEWAY, "UPSTREAM_ERROR")
            }
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message safe to show to callers. Infrastructure detail stays in logs.
    fn public_message(&self) -> String {
        match self {
            CashbackError::Store(_) | CashbackError::PayoutFailed(_) => {
                "A backend service is temporarily unavailable".to_string()
            }
            CashbackError::RollbackFailed { .. } => "Internal server error".to_string(),
            other => other.to_string(),
        }
    }
}

impl IntoResponse for CashbackError {
    fn into_response(self) -> Response {
        let (status, error_code) = self.status_and_code();

        let (details, warnings) = match &self {
            CashbackError::Validation { errors, warnings } => (errors.clone(), warnings.clone()),
            _ => (Vec::new(), Vec::new()),
        };

        let body = ErrorResponse {
            success: false,
            error: self.public_message(),
            error_code: error_code.to_string(),
            details,
            warnings,
            timestamp: Utc::now(),
            request_id: Uuid::new_v4().to_string(),
        };

        if status.is_server_error() {
            tracing::error!(error = ?self, error_code = error_code, "Request failed");
        } else {
            tracing::info!(error = %self, error_code = error_code, "Request rejected");
        }

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_message_is_stable() {
        assert_eq!(
            CashbackError::SubmissionNotFound.to_string(),
            "Submission not found"
        );
        assert_eq!(
            CashbackError::NotApproved.to_string(),
            "Submission must be approved before payout"
        );
    }

    #[test]
    fn store_errors_are_not_leaked() {
        let err = CashbackError::Store(StoreError::Unavailable("db-7 password=hunter2".into()));
        assert_eq!(err.status_and_code().0, StatusCode::BAD_GATEWAY);
        assert!(!err.public_message().contains("hunter2"));
    }
}
