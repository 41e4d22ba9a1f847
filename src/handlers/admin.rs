use crate::{
    error::CashbackError,
    middleware::AdminIdentity,
    models::{
        AlertFilter, AlertStatus, ApiResponse, BulkOutcome, FraudAlert, PayoutRecord, Submission,
        SubmissionFilter,
    },
    routes::AppState,
    services::BulkAction,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct ApproveBody {
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub reason: String,
    #[serde(default)]
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PayoutBody {
    pub transaction_hash: String,
    #[serde(default)]
    pub actual_amount: Option<f64>,
}

#[derive(Debug, Deserialize)]
pub struct BulkBody {
    pub ids: Vec<String>,
    pub action: BulkAction,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReviewBody {
    pub status: AlertStatus,
    #[serde(default)]
    pub notes: Option<String>,
}

pub async fn list_submissions(
    State(state): State<AppState>,
    Query(filter): Query<SubmissionFilter>,
) -> Result<Json<ApiResponse<Vec<Submission>>>, CashbackError> {
    let submissions = state.submissions.list_submissions(&filter).await?;
    Ok(Json(ApiResponse::ok(submissions)))
}

pub async fn approve_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(admin): Extension<AdminIdentity>,
    Json(body): Json<ApproveBody>,
) -> Result<Json<ApiResponse<Submission>>, CashbackError> {
    let submission = state
        .workflow
        .approve(&id, &admin.admin_id, body.notes)
        .await?;
    Ok(Json(ApiResponse::ok(submission)))
}

pub async fn reject_submission(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(admin): Extension<AdminIdentity>,
    Json(body): Json<RejectBody>,
) -> Result<Json<ApiResponse<Submission>>, CashbackError> {
    let submission = state
        .workflow
        .reject(&id, &admin.admin_id, &body.reason, body.notes)
        .await?;
    Ok(Json(ApiResponse::ok(submission)))
}

pub async fn process_payout(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Extension(admin): Extension<AdminIdentity>,
    Json(body): Json<PayoutBody>,
) -> Result<Json<ApiResponse<PayoutRecord>>, CashbackError> {
    let payout = state
        .workflow
        .process_payout(&id, &admin.admin_id, &body.transaction_hash, body.actual_amount)
        .await?;
    Ok(Json(ApiResponse::ok(payout)))
}

pub async fn bulk_process(
    State(state): State<AppState>,
    Extension(admin): Extension<AdminIdentity>,
    Json(body): Json<BulkBody>,
) -> Json<ApiResponse<BulkOutcome>> {
    let outcome = state
        .workflow
        .bulk_process(&body.ids, body.action, &admin.admin_id, body.reason.as_deref())
        .await;
    Json(ApiResponse::ok(outcome))
}

pub async fn list_fraud_alerts(
    State(state): State<AppState>,
    Query(filter): Query<AlertFilter>,
) -> Result<Json<ApiResponse<Vec<FraudAlert>>>, CashbackError> {
    let alerts = state.alerts.list(&filter).await?;
    Ok(Json(ApiResponse::ok(alerts)))
}

pub async fn review_fraud_alert(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Extension(admin): Extension<AdminIdentity>,
    Json(body): Json<ReviewBody>,
) -> Result<Json<ApiResponse<FraudAlert>>, CashbackError> {
    let alert = state
        .alerts
        .review(id, &admin.admin_id, body.status, body.notes)
        .await?;
    Ok(Json(ApiResponse::ok(alert)))
}
