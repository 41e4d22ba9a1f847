use crate::models::{Disposition, FraudAlert, RequestMeta, SubmissionRequest};
use crate::services::fraud::{CheckOutcome, FraudDetector};
use crate::services::sanitize::{sanitize, sanitize_opt};
use crate::services::wallet::{validate_wallet_address, WalletNetwork};
use serde::Serialize;
use std::sync::Arc;

pub const CHECKS_INCOMPLETE: &str =
    "Some security checks could not be completed; your submission will be reviewed manually";

/// Furthest stage a validation run reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStage {
    BasicValidation,
    FraudChecks,
}

#[derive(Debug, Clone, Serialize)]
pub struct ValidationResult {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub alerts: Vec<FraudAlert>,
    pub wallet_network: Option<WalletNetwork>,
    pub stage: ValidationStage,
}

impl ValidationResult {
    fn basic_failure(errors: Vec<String>) -> Self {
        Self {
            is_valid: false,
            errors,
            warnings: Vec::new(),
            alerts: Vec::new(),
            wallet_network: None,
            stage: ValidationStage::BasicValidation,
        }
    }
}

/// Runs basic field checks, then the fraud checks, and folds everything
/// into a verdict.
pub struct SubmissionValidator {
    detector: Arc<FraudDetector>,
    max_purchase_amount: f64,
}

impl SubmissionValidator {
    pub fn new(detector: Arc<FraudDetector>, max_purchase_amount: f64) -> Self {
        Self {
            detector,
            max_purchase_amount,
        }
    }

    /// Cleans every free-text field. Applied before persistence whatever the
    /// verdict.
    pub fn sanitize(&self, request: &SubmissionRequest) -> SubmissionRequest {
        SubmissionRequest {
            user_id: request.user_id.trim().to_string(),
            name: sanitize(&request.name),
            email: request.email.trim().to_lowercase(),
            firm_id: sanitize(&request.firm_id),
            firm_name: sanitize(&request.firm_name),
            purchase_amount: request.purchase_amount,
            proof_of_purchase: request.proof_of_purchase.trim().to_string(),
            wallet_address: request.wallet_address.trim().to_string(),
            wallet_network: request
                .wallet_network
                .as_deref()
                .map(str::trim)
                .filter(|n| !n.is_empty())
                .map(str::to_string),
            additional_details: sanitize_opt(request.additional_details.as_deref()),
        }
    }

    pub async fn validate(&self, request: &SubmissionRequest, meta: &RequestMeta) -> ValidationResult {
        let errors = self.basic_errors(request);
        if !errors.is_empty() {
            tracing::info!(user_id = %request.user_id, errors = errors.len(), "Submission failed basic validation");
            let mut result = ValidationResult::basic_failure(errors);
            result.alerts = self.over_cap_alerts(request, meta).await;
            return result;
        }

        let wallet = validate_wallet_address(
            &request.wallet_address,
            request.wallet_network.as_deref(),
        );
        if !wallet.is_valid {
            return ValidationResult::basic_failure(wallet.errors);
        }

        let outcomes = self.run_fraud_checks(request, meta).await;
        let mut result = aggregate(outcomes);
        result.wallet_network = wallet.matched_type;

        tracing::info!(
            user_id = %request.user_id,
            is_valid = result.is_valid,
            alerts = result.alerts.len(),
            warnings = result.warnings.len(),
            "Submission validated"
        );

        result
    }

    fn basic_errors(&self, request: &SubmissionRequest) -> Vec<String> {
        let mut errors = Vec::new();

        if request.user_id.trim().is_empty() {
            errors.push("User ID is required".to_string());
        }
        if request.firm_name.trim().is_empty() {
            errors.push("Firm name is required".to_string());
        }
        let amount = request.purchase_amount;
        if !amount.is_finite() || amount <= 0.0 {
            errors.push("Purchase amount must be greater than zero".to_string());
        } else if amount > self.max_purchase_amount {
            errors.push(format!(
                "Purchase amount cannot exceed {}",
                self.max_purchase_amount
            ));
        }
        if request.wallet_address.trim().is_empty() {
            errors.push("Wallet address is required".to_string());
        }
        if request.proof_of_purchase.trim().is_empty() {
            errors.push("Proof of purchase is required".to_string());
        }
        let email = request.email.trim();
        if !email.is_empty() && !looks_like_email(email) {
            errors.push("Email address is invalid".to_string());
        }

        errors
    }

    /// Claims above the purchase cap never reach the fraud tier, but they
    /// still leave a high-amount alert for admins.
    async fn over_cap_alerts(&self, request: &SubmissionRequest, meta: &RequestMeta) -> Vec<FraudAlert> {
        let amount = request.purchase_amount;
        if !amount.is_finite() || amount <= self.max_purchase_amount {
            return Vec::new();
        }

        self.detector
            .check_high_amount(amount, &request.user_id, meta)
            .await
            .unwrap_or_default()
    }

    async fn run_fraud_checks(
        &self,
        request: &SubmissionRequest,
        meta: &RequestMeta,
    ) -> Vec<CheckOutcome> {
        let detector = &self.detector;
        let user_id = request.user_id.as_str();

        let ip_check = async {
            match meta.ip_address.as_deref() {
                Some(ip) => detector.check_suspicious_ip(ip, user_id, meta).await,
                None => Ok(Vec::new()),
            }
        };

        let (wallet, proof, rapid, ip, amount) = tokio::join!(
            detector.check_duplicate_wallet(&request.wallet_address, user_id, meta),
            detector.check_duplicate_proof(&request.proof_of_purchase, user_id, meta),
            detector.check_rapid_submissions(user_id, meta),
            ip_check,
            detector.check_high_amount(request.purchase_amount, user_id, meta),
        );

        vec![wallet, proof, rapid, ip, amount]
    }
}

/// Critical/high alerts become errors, medium/low become warnings, failed
/// checks add a single "could not complete" warning.
pub fn aggregate(outcomes: Vec<CheckOutcome>) -> ValidationResult {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();
    let mut alerts = Vec::new();
    let mut incomplete = false;

    for outcome in outcomes {
        match outcome {
            Ok(found) => alerts.extend(found),
            Err(e) => {
                tracing::warn!(check = e.check, "Treating failed check as no alert");
                incomplete = true;
            }
        }
    }

    for alert in &alerts {
        match alert.severity.disposition() {
            Disposition::Error => errors.push(alert.message()),
            Disposition::Warning => warnings.push(alert.message()),
        }
    }
    if incomplete {
        warnings.push(CHECKS_INCOMPLETE.to_string());
    }

    ValidationResult {
        is_valid: errors.is_empty(),
        errors,
        warnings,
        alerts,
        wallet_network: None,
        stage: ValidationStage::FraudChecks,
    }
}

fn looks_like_email(email: &str) -> bool {
    match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty()
                && domain.contains('.')
                && !domain.starts_with('.')
                && !domain.ends_with('.')
                && !email.contains(char::is_whitespace)
        }
        None => false,
    }
}
