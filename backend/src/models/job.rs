use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use utoipa::ToSchema;

use super::{ErrorRecord, Prompt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

/// A unit of work tracked by the Job Registry (C9). Lifecycle: created at
/// submit, transitions monotonically (never backward), evicted after TTL
/// or on explicit delete. A job in pending/processing state cannot be
/// deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Job {
    pub id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub status: JobStatus,
    pub progress: u8,
    pub prompt: Prompt,
    pub result: Option<JobResult>,
    pub error: Option<ErrorRecord>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip)]
    pub cancel_requested: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JobResult {
    pub artifact_code: String,
    pub component_name: String,
    pub chart_type: String,
    pub cache_hit: bool,
}

impl Job {
    pub fn new(prompt: Prompt) -> Self {
        Self {
            id: Uuid::new_v4(),
            submitted_at: Utc::now(),
            status: JobStatus::Pending,
            progress: 0,
            prompt,
            result: None,
            error: None,
            completed_at: None,
            cancel_requested: false,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.status, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }

    /// A truncated view used by `GET /jobs`: prompts over 50 characters are
    /// shortened so the listing endpoint stays compact.
    pub fn truncated_prompt(&self) -> String {
        let text = &self.prompt.text;
        if text.chars().count() <= 50 {
            text.clone()
        } else {
            let mut truncated: String = text.chars().take(50).collect();
            truncated.push('…');
            truncated
        }
    }
}
