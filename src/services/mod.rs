pub mod admin;
pub mod alerts;
pub mod audit;
pub mod cache;
pub mod fraud;
pub mod intake;
pub mod notify;
pub mod rate_limit;
pub mod sanitize;
pub mod validator;
pub mod wallet;

pub use admin::{AdminWorkflow, BulkAction};
pub use alerts::FraudAlertStore;
pub use audit::AuditTrail;
pub use cache::CacheService;
pub use fraud::{CheckError, CheckOutcome, FraudDetector};
pub use intake::SubmissionService;
pub use notify::{LogNotifier, Notification, Notifier, WebhookNotifier};
pub use rate_limit::{RateDecision, RateLimiter};
pub use sanitize::sanitize;
pub use validator::{SubmissionValidator, ValidationResult, ValidationStage};
pub use wallet::{validate_wallet_address, WalletNetwork, WalletValidation};
