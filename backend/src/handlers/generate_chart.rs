use axum::{Json, extract::State, http::StatusCode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppState;
use crate::models::Prompt;
use crate::utils::{ApiError, ApiResult};

#[derive(Debug, Deserialize, ToSchema)]
pub struct GenerateChartRequest {
    pub prompt: String,
    pub container_id: Option<i64>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct GenerateChartResponse {
    pub job_id: Uuid,
    pub status: String,
    pub message: String,
}

/// Submits a prompt to the pipeline. Returns immediately with the job id;
/// progress and the eventual result are polled via `GET /job-status/{id}`.
#[utoipa::path(
    post,
    path = "/generate-chart",
    request_body = GenerateChartRequest,
    responses(
        (status = 202, description = "Job accepted", body = GenerateChartResponse),
        (status = 400, description = "Empty prompt"),
    ),
    tag = "Pipeline"
)]
pub async fn generate_chart(
    State(state): State<Arc<AppState>>,
    Json(request): Json<GenerateChartRequest>,
) -> ApiResult<(StatusCode, Json<GenerateChartResponse>)> {
    if request.prompt.trim().is_empty() {
        return Err(ApiError::invalid_request("prompt must not be empty"));
    }

    let job = state.orchestrator.submit(Prompt::new(request.prompt));

    Ok((
        StatusCode::ACCEPTED,
        Json(GenerateChartResponse { job_id: job.id, status: "pending".to_string(), message: "job accepted".to_string() }),
    ))
}
