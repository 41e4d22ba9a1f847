use crate::{
    models::{HealthStatus, SubmissionFilter},
    routes::AppState,
};
use axum::{extract::State, Json};
use chrono::Utc;
use std::time::Duration;

pub async fn health_check(State(state): State<AppState>) -> Json<HealthStatus> {
    let sample = SubmissionFilter {
        limit: Some(1),
        ..Default::default()
    };
    let datastore_ok = matches!(
        tokio::time::timeout(
            Duration::from_secs(5),
            state.submissions.list_submissions(&sample)
        )
        .await,
        Ok(Ok(_))
    );
    let redis = state.cache.ping().await;

    let status = if datastore_ok && redis != Some(false) {
        "healthy"
    } else if datastore_ok {
        "degraded"
    } else {
        "unhealthy"
    };

    Json(HealthStatus {
        status: status.to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        datastore: datastore_ok,
        redis,
        uptime_seconds: state.started_at.elapsed().as_secs(),
        timestamp: Utc::now(),
    })
}
