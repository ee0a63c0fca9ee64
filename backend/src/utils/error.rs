use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

/// Transport-facing error for the HTTP surface (§6). Distinct from
/// [`crate::models::ErrorRecord`], which is the pipeline's own first-class
/// error-handling product (C6) and is what a failed [`crate::models::Job`]
/// carries. `ApiError` is for requests that never made it into a job at
/// all: a malformed body, an unknown job id, a database outage.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Job {job_id} not found")]
    JobNotFound { job_id: String },

    #[error("Job {job_id} is still {status}; delete rejected")]
    JobNotTerminal { job_id: String, status: String },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Internal error: {0}")]
    InternalError(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ApiError {
    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        Self::JobNotFound { job_id: job_id.into() }
    }

    pub fn job_not_terminal(job_id: impl Into<String>, status: impl Into<String>) -> Self {
        Self::JobNotTerminal { job_id: job_id.into(), status: status.into() }
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest(message.into())
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::InternalError(message.into())
    }

    fn status(&self) -> StatusCode {
        match self {
            Self::JobNotFound { .. } => StatusCode::NOT_FOUND,
            Self::JobNotTerminal { .. } => StatusCode::BAD_REQUEST,
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::InternalError(_) | Self::Database(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ApiErrorResponse {
    pub error: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            Self::JobNotFound { .. } => "job_not_found",
            Self::JobNotTerminal { .. } => "job_not_terminal",
            Self::InvalidRequest(_) => "invalid_request",
            Self::InternalError(_) => "internal_error",
            Self::Database(_) => "database_error",
            Self::Other(_) => "internal_error",
        };

        let body = ApiErrorResponse { error: error.to_string(), message: self.to_string(), details: None };

        (status, Json(body)).into_response()
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::internal_error(format!("JSON serialization error: {}", err))
    }
}

pub type ApiResult<T> = Result<T, ApiError>;
