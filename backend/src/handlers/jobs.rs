use axum::{Json, extract::Path, extract::State, http::StatusCode};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::AppState;
use crate::models::JobStatus;
use crate::services::job_registry::{JobSummary, RegistryError};
use crate::utils::{ApiError, ApiResult};

#[derive(Debug, Serialize, ToSchema)]
pub struct JobStatusResponse {
    pub job_id: Uuid,
    pub status: JobStatus,
    pub progress: u8,
    pub artifact_code: Option<String>,
    pub component_name: Option<String>,
    pub chart_type: Option<String>,
    pub error_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

/// Polled by the caller until `status` reaches a terminal value.
#[utoipa::path(
    get,
    path = "/job-status/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job id returned by POST /generate-chart")),
    responses(
        (status = 200, description = "Current job state", body = JobStatusResponse),
        (status = 404, description = "Unknown job id"),
    ),
    tag = "Pipeline"
)]
pub async fn job_status(State(state): State<Arc<AppState>>, Path(job_id): Path<Uuid>) -> ApiResult<Json<JobStatusResponse>> {
    let job = state.registry.get(job_id).ok_or_else(|| ApiError::job_not_found(job_id.to_string()))?;

    Ok(Json(JobStatusResponse {
        job_id: job.id,
        status: job.status,
        progress: job.progress,
        artifact_code: job.result.as_ref().map(|r| r.artifact_code.clone()),
        component_name: job.result.as_ref().map(|r| r.component_name.clone()),
        chart_type: job.result.as_ref().map(|r| r.chart_type.clone()),
        error_message: job.error.as_ref().map(|e| e.message.clone()),
        created_at: job.submitted_at,
        completed_at: job.completed_at,
    }))
}

/// Compact listing for a dashboard view: prompts truncated to 50 characters,
/// no result/error payload (§4.9).
#[utoipa::path(
    get,
    path = "/jobs",
    responses((status = 200, description = "All tracked jobs", body = Vec<JobSummary>)),
    tag = "Pipeline"
)]
pub async fn list_jobs(State(state): State<Arc<AppState>>) -> Json<Vec<JobSummary>> {
    Json(state.registry.list())
}

/// Deletes a job once it has reached a terminal state; rejects deletion of
/// a job still pending/processing (§3 Job invariants).
#[utoipa::path(
    delete,
    path = "/jobs/{job_id}",
    params(("job_id" = Uuid, Path, description = "Job id to delete")),
    responses(
        (status = 200, description = "Deleted"),
        (status = 400, description = "Job still in flight"),
        (status = 404, description = "Unknown job id"),
    ),
    tag = "Pipeline"
)]
pub async fn delete_job(State(state): State<Arc<AppState>>, Path(job_id): Path<Uuid>) -> ApiResult<StatusCode> {
    match state.registry.delete(job_id) {
        Ok(()) => Ok(StatusCode::OK),
        Err(RegistryError::NotFound(id)) => Err(ApiError::job_not_found(id.to_string())),
        Err(RegistryError::NotTerminal(id, status)) => Err(ApiError::job_not_terminal(id.to_string(), format!("{status:?}"))),
    }
}
