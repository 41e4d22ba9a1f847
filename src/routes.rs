use crate::{
    handlers::*,
    middleware::{admin_auth_layer, capture_request_meta, AdminGate},
    services::{AdminWorkflow, CacheService, FraudAlertStore, SubmissionService},
    store::SubmissionStore,
};
use axum::{
    middleware::{from_fn, from_fn_with_state},
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Instant;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, TraceLayer},
};

#[derive(Clone)]
pub struct AppState {
    pub intake: Arc<SubmissionService>,
    pub workflow: Arc<AdminWorkflow>,
    pub alerts: Arc<FraudAlertStore>,
    pub submissions: Arc<dyn SubmissionStore>,
    pub cache: Arc<CacheService>,
    pub started_at: Instant,
}

pub fn create_router(state: AppState, gate: Arc<AdminGate>) -> Router {
    // Every admin route resolves the bearer token before the handler runs
    let admin = Router::new()
        .route("/submissions", get(list_submissions))
        .route("/submissions/bulk", post(bulk_process))
        .route("/submissions/:id/approve", post(approve_submission))
        .route("/submissions/:id/reject", post(reject_submission))
        .route("/submissions/:id/payout", post(process_payout))
        .route("/fraud-alerts", get(list_fraud_alerts))
        .route("/fraud-alerts/:id/review", post(review_fraud_alert))
        .route_layer(from_fn_with_state(gate, admin_auth_layer));

    Router::new()
        .route("/health", get(health_check))
        .route(
            "/api/submissions",
            post(create_submission).get(list_user_submissions),
        )
        .nest("/api/admin", admin)
        // Router layers wrap outside-in in reverse order: CORS is outermost,
        // then tracing, then request-meta capture.
        .layer(from_fn(capture_request_meta))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::default().include_headers(true)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}
