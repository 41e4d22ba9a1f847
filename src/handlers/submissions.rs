use crate::{
    error::CashbackError,
    models::{ApiResponse, RequestMeta, Submission, SubmissionReceipt, SubmissionRequest},
    routes::AppState,
};
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Extension, Json,
};
use serde::Deserialize;

pub async fn create_submission(
    State(state): State<AppState>,
    Extension(meta): Extension<RequestMeta>,
    Json(request): Json<SubmissionRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubmissionReceipt>>), CashbackError> {
    let receipt = state.intake.submit(&request, &meta).await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::ok(receipt))))
}

#[derive(Debug, Deserialize)]
pub struct UserSubmissionsQuery {
    pub user_id: String,
}

pub async fn list_user_submissions(
    State(state): State<AppState>,
    Query(query): Query<UserSubmissionsQuery>,
) -> Result<Json<ApiResponse<Vec<Submission>>>, CashbackError> {
    let submissions = state.intake.list_for_user(&query.user_id).await?;

    Ok(Json(ApiResponse::ok(submissions)))
}
