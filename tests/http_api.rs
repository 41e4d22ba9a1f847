//! Router-level tests: status codes, admin gate, JSON envelopes.

mod common;

use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use cashback_guard::models::SubmissionStatus;
use common::*;
use serde_json::{json, Value};
use tower::util::ServiceExt;

async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, body)
}

fn post_json(uri: &str, token: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

#[tokio::test]
async fn health_ignores_unconfigured_redis() {
    let harness = Harness::new().await;

    let (status, body) = send(harness.router(), get("/health", None)).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["datastore"], true);
    assert!(body["redis"].is_null());
    assert_eq!(body["status"], "healthy");
}

#[tokio::test]
async fn submission_is_created() {
    let harness = Harness::new().await;
    let payload = serde_json::to_value(request("u1", &evm_wallet('a'), 100.0)).unwrap();

    let (status, body) = send(
        harness.router(),
        Request::builder()
            .method("POST")
            .uri("/api/submissions")
            .header(header::CONTENT_TYPE, "application/json")
            .header("X-Forwarded-For", "198.51.100.4, 10.0.0.1")
            .body(Body::from(payload.to_string()))
            .unwrap(),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["submission"]["status"], "pending");
    assert_eq!(body["data"]["submission"]["ip_address"], "198.51.100.4");

    let (status, body) = send(harness.router(), get("/api/submissions?user_id=u1", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn invalid_submission_is_unprocessable() {
    let harness = Harness::new().await;
    let payload = serde_json::to_value(request("u1", "nope", 0.0)).unwrap();

    let (status, body) = send(
        harness.router(),
        post_json("/api/submissions", None, payload),
    )
    .await;

    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["success"], false);
    assert_eq!(body["error_code"], "VALIDATION_FAILED");
    assert!(!body["details"].as_array().unwrap().is_empty());
}

#[tokio::test]
async fn admin_routes_require_identity() {
    let harness = Harness::new().await;

    let (status, _) = send(harness.router(), get("/api/admin/submissions", None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, body) =
        send(harness.router(), get("/api/admin/submissions", Some(USER_TOKEN))).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error_code"], "FORBIDDEN");

    let (status, _) = send(harness.router(), get("/api/admin/submissions", Some(ADMIN_TOKEN))).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn admin_id_header_is_not_a_credential() {
    let harness = Harness::new().await;
    harness.seed("s1", SubmissionStatus::Pending).await;

    let forged = Request::builder()
        .method("POST")
        .uri("/api/admin/submissions/s1/approve")
        .header(header::CONTENT_TYPE, "application/json")
        .header("X-Admin-Id", ADMIN)
        .body(Body::from("{}"))
        .unwrap();
    let (status, body) = send(harness.router(), forged).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error_code"], "UNAUTHORIZED");

    // A user id in place of a token fails the same way.
    let (status, _) = send(
        harness.router(),
        post_json("/api/admin/submissions/s1/approve", Some(ADMIN), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(harness.status_of("s1").await, SubmissionStatus::Pending);
}

#[tokio::test]
async fn admin_can_approve_and_pay() {
    let harness = Harness::new().await;
    harness.seed("s1", SubmissionStatus::Pending).await;

    let (status, body) = send(
        harness.router(),
        post_json("/api/admin/submissions/s1/approve", Some(ADMIN_TOKEN), json!({})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "approved");

    let (status, body) = send(
        harness.router(),
        post_json(
            "/api/admin/submissions/s1/payout",
            Some(ADMIN_TOKEN),
            json!({ "transaction_hash": "0xabc123" }),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["amount_sent"], 10.0);
    assert_eq!(harness.status_of("s1").await, SubmissionStatus::Paid);
}

#[tokio::test]
async fn payout_before_approval_conflicts() {
    let harness = Harness::new().await;
    harness.seed("s1", SubmissionStatus::Pending).await;

    let (status, body) = send(
        harness.router(),
        post_json(
            "/api/admin/submissions/s1/payout",
            Some(ADMIN_TOKEN),
            json!({ "transaction_hash": "0xabc123" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"], "Submission must be approved before payout");
}

#[tokio::test]
async fn bulk_endpoint_returns_outcome() {
    let harness = Harness::new().await;
    harness.seed("id1", SubmissionStatus::Pending).await;

    let (status, body) = send(
        harness.router(),
        post_json(
            "/api/admin/submissions/bulk",
            Some(ADMIN_TOKEN),
            json!({ "ids": ["id1", "id2"], "action": "approve" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["processed"], 1);
    assert_eq!(body["data"]["failed"], 1);
    assert_eq!(body["data"]["errors"][0], "id2: Submission not found");
}

#[tokio::test]
async fn unknown_submission_is_not_found() {
    let harness = Harness::new().await;

    let (status, body) = send(
        harness.router(),
        post_json(
            "/api/admin/submissions/missing/reject",
            Some(ADMIN_TOKEN),
            json!({ "reason": "duplicate" }),
        ),
    )
    .await;

    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Submission not found");
}
