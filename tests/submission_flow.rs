//! End-to-end intake: rate limit, validation, fraud checks, persistence.

mod common;

use cashback_guard::config::RateLimitPolicy;
use cashback_guard::error::CashbackError;
use cashback_guard::models::{AlertType, RequestMeta, Severity, SubmissionStatus};
use cashback_guard::services::validator::CHECKS_INCOMPLETE;
use cashback_guard::store::MemoryStore;
use common::*;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn clean_submission_is_accepted() {
    let harness = Harness::new().await;

    let receipt = harness
        .intake
        .submit(&request("u1", &evm_wallet('a'), 100.0), &no_ip())
        .await
        .unwrap();

    assert!(receipt.warnings.is_empty());
    assert!(receipt.alerts.is_empty());
    assert_eq!(receipt.submission.status, SubmissionStatus::Pending);
    assert_eq!(receipt.submission.cashback_amount, 10.0);
    assert_eq!(receipt.submission.wallet_network.as_deref(), Some("BEP20"));
    assert!(harness.store.all_alerts().await.is_empty());
}

#[tokio::test]
async fn wallet_claimed_by_another_user_is_rejected() {
    let harness = Harness::new().await;
    let wallet = evm_wallet('b');

    harness
        .intake
        .submit(&request("u1", &wallet, 100.0), &no_ip())
        .await
        .unwrap();

    let err = harness
        .intake
        .submit(&request("u2", &wallet, 100.0), &no_ip())
        .await
        .unwrap_err();

    match err {
        CashbackError::Validation { errors, .. } => assert_eq!(errors.len(), 1),
        other => panic!("expected validation failure, got {other:?}"),
    }

    let alerts = harness.store.all_alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::DuplicateWallet);
    assert_eq!(alerts[0].severity, Severity::High);
    assert_eq!(alerts[0].user_id.as_deref(), Some("u2"));
}

#[tokio::test]
async fn sixth_submission_in_an_hour_is_flagged_but_accepted() {
    let harness = Harness::new().await;
    let wallet = evm_wallet('c');

    for n in 0..5 {
        let receipt = harness
            .intake
            .submit(&request("u1", &wallet, 100.0 + n as f64), &no_ip())
            .await
            .unwrap();
        assert!(receipt.alerts.is_empty(), "attempt {} flagged early", n + 1);
    }

    let receipt = harness
        .intake
        .submit(&request("u1", &wallet, 200.0), &no_ip())
        .await
        .unwrap();

    assert_eq!(receipt.warnings.len(), 1);
    assert_eq!(receipt.alerts.len(), 1);
    assert_eq!(receipt.alerts[0].alert_type, AlertType::RapidRequests);
    assert_eq!(receipt.alerts[0].severity, Severity::Medium);
    assert!(receipt.alerts[0].is_recorded());
}

#[tokio::test]
async fn amount_above_critical_threshold_is_rejected() {
    let harness = Harness::new().await;

    let err = harness
        .intake
        .submit(&request("u1", &evm_wallet('d'), 60_000.0), &no_ip())
        .await
        .unwrap_err();
    assert!(matches!(err, CashbackError::Validation { .. }));

    let alerts = harness.store.all_alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::HighAmount);
    assert_eq!(alerts[0].severity, Severity::Critical);
}

#[tokio::test]
async fn amount_over_purchase_cap_still_leaves_critical_alert() {
    let harness = Harness::new().await;

    let err = harness
        .intake
        .submit(&request("u1", &evm_wallet('d'), 150_000.0), &no_ip())
        .await
        .unwrap_err();

    match err {
        CashbackError::Validation { errors, .. } => {
            assert!(errors.iter().any(|e| e.contains("cannot exceed")));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }

    let alerts = harness.store.all_alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::HighAmount);
    assert_eq!(alerts[0].severity, Severity::Critical);
}

#[tokio::test]
async fn sixth_user_on_one_ip_is_flagged_but_accepted() {
    let harness = Harness::new().await;
    let meta = RequestMeta {
        ip_address: Some("1.2.3.4".to_string()),
        user_agent: None,
    };

    for (n, fill) in ['1', '2', '3', '4', '5'].into_iter().enumerate() {
        let user = format!("u{}", n + 1);
        let receipt = harness
            .intake
            .submit(&request(&user, &evm_wallet(fill), 100.0), &meta)
            .await
            .unwrap();
        assert!(receipt.alerts.is_empty(), "{user} flagged early");
    }

    let receipt = harness
        .intake
        .submit(&request("u6", &evm_wallet('6'), 100.0), &meta)
        .await
        .unwrap();

    assert_eq!(receipt.submission.status, SubmissionStatus::Pending);
    assert_eq!(receipt.warnings.len(), 1);
    assert_eq!(receipt.alerts.len(), 1);
    assert_eq!(receipt.alerts[0].alert_type, AlertType::SuspiciousIp);
    assert_eq!(receipt.alerts[0].severity, Severity::Medium);
}

#[tokio::test]
async fn proof_reused_by_another_user_is_rejected() {
    let harness = Harness::new().await;
    let original = request("u1", &evm_wallet('a'), 100.0);
    harness.intake.submit(&original, &no_ip()).await.unwrap();

    let mut reused = request("u2", &evm_wallet('b'), 100.0);
    reused.proof_of_purchase = original.proof_of_purchase.clone();
    let err = harness.intake.submit(&reused, &no_ip()).await.unwrap_err();

    match err {
        CashbackError::Validation { errors, .. } => assert_eq!(errors.len(), 1),
        other => panic!("expected validation failure, got {other:?}"),
    }

    let alerts = harness.store.all_alerts().await;
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0].alert_type, AlertType::DuplicateProof);
    assert_eq!(alerts[0].severity, Severity::Critical);
    assert_eq!(alerts[0].user_id.as_deref(), Some("u2"));
}

#[tokio::test]
async fn amount_above_review_threshold_is_accepted_with_warning() {
    let harness = Harness::new().await;

    let receipt = harness
        .intake
        .submit(&request("u1", &evm_wallet('e'), 20_000.0), &no_ip())
        .await
        .unwrap();

    assert_eq!(receipt.warnings.len(), 1);
    assert_eq!(receipt.alerts.len(), 1);
    assert_eq!(receipt.alerts[0].severity, Severity::Medium);
    assert_eq!(receipt.submission.cashback_amount, 2_000.0);
}

#[tokio::test]
async fn invalid_wallet_skips_fraud_checks() {
    let counting = Arc::new(CountingFraudStore::new(Arc::new(MemoryStore::new())));
    let harness = Harness::build(Overrides {
        fraud: Some(counting.clone()),
        ..Default::default()
    })
    .await;

    let err = harness
        .intake
        .submit(&request("u1", "not-a-wallet", 100.0), &no_ip())
        .await
        .unwrap_err();

    assert!(matches!(err, CashbackError::Validation { .. }));
    assert_eq!(counting.calls(), 0);

    harness
        .intake
        .submit(&request("u1", &evm_wallet('f'), 100.0), &no_ip())
        .await
        .unwrap();
    assert!(counting.calls() > 0);
}

#[tokio::test]
async fn fraud_store_outage_fails_open() {
    let harness = Harness::build(Overrides {
        fraud: Some(Arc::new(DownFraudStore)),
        ..Default::default()
    })
    .await;
    let meta = RequestMeta {
        ip_address: Some("203.0.113.7".to_string()),
        user_agent: Some("test-agent".to_string()),
    };

    let receipt = harness
        .intake
        .submit(&request("u1", &evm_wallet('a'), 100.0), &meta)
        .await
        .unwrap();

    assert_eq!(receipt.warnings, vec![CHECKS_INCOMPLETE.to_string()]);
    assert!(receipt.alerts.is_empty());
    assert_eq!(receipt.submission.ip_address.as_deref(), Some("203.0.113.7"));
}

#[tokio::test]
async fn high_alert_that_cannot_be_recorded_still_rejects() {
    let harness = Harness::build(Overrides {
        fraud: Some(Arc::new(DownFraudStore)),
        ..Default::default()
    })
    .await;

    let err = harness
        .intake
        .submit(&request("u1", &evm_wallet('a'), 75_000.0), &no_ip())
        .await
        .unwrap_err();

    match err {
        CashbackError::Validation { errors, warnings } => {
            assert_eq!(errors.len(), 1);
            assert!(warnings.contains(&CHECKS_INCOMPLETE.to_string()));
        }
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[tokio::test]
async fn repeated_attempts_are_rate_limited() {
    let harness = Harness::build(Overrides {
        rate_limit: Some(RateLimitPolicy {
            max_attempts: 2,
            window: Duration::from_secs(3600),
            block_duration: Duration::from_secs(600),
            store_timeout: Duration::from_secs(1),
        }),
        ..Default::default()
    })
    .await;
    let wallet = evm_wallet('a');

    for amount in [100.0, 101.0] {
        harness
            .intake
            .submit(&request("u1", &wallet, amount), &no_ip())
            .await
            .unwrap();
    }

    let err = harness
        .intake
        .submit(&request("u1", &wallet, 102.0), &no_ip())
        .await
        .unwrap_err();
    assert!(matches!(err, CashbackError::RateLimitExceeded));

    // Other users keep their own budget
    harness
        .intake
        .submit(&request("u2", &evm_wallet('9'), 100.0), &no_ip())
        .await
        .unwrap();
}

#[tokio::test]
async fn identical_purchase_cannot_be_claimed_twice() {
    let harness = Harness::new().await;
    let claim = request("u1", &evm_wallet('a'), 100.0);

    harness.intake.submit(&claim, &no_ip()).await.unwrap();
    let err = harness.intake.submit(&claim, &no_ip()).await.unwrap_err();

    match err {
        CashbackError::Validation { errors, .. } => {
            assert_eq!(errors, vec!["You have already submitted this purchase".to_string()]);
        }
        other => panic!("expected duplicate rejection, got {other:?}"),
    }
    assert_eq!(harness.intake.list_for_user("u1").await.unwrap().len(), 1);
}

#[tokio::test]
async fn free_text_is_sanitized_before_storage() {
    let harness = Harness::new().await;
    let mut claim = request("u1", &evm_wallet('a'), 100.0);
    claim.name = "<b>Ada</b>".to_string();
    claim.additional_details = Some("<script>alert(1)</script>".to_string());

    let receipt = harness.intake.submit(&claim, &no_ip()).await.unwrap();

    assert_eq!(receipt.submission.name, "bAda/b");
    assert!(!receipt
        .submission
        .additional_details
        .unwrap_or_default()
        .contains('<'));
}

#[tokio::test]
async fn unknown_firm_uses_default_rate() {
    let harness = Harness::new().await;
    let mut claim = request("u1", &evm_wallet('a'), 250.0);
    claim.firm_id = "firm-unknown".to_string();

    let receipt = harness.intake.submit(&claim, &no_ip()).await.unwrap();
    assert_eq!(receipt.submission.cashback_amount, 25.0);
}
