use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Input,
    Schema,
    Query,
    Chart,
    System,
    Validation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum NextAction {
    Resume,
    AwaitUser,
    Escalate,
}

/// The raw payload any component reports to C6 on failure.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorPayload {
    pub agent_id: String,
    pub timestamp: DateTime<Utc>,
    pub status: String,
    pub error_type: Option<String>,
    pub error_code: String,
    pub message: String,
    #[serde(default)]
    pub context: Value,
    pub query_id: String,
}

/// Recovery directive produced by C6's recovery-strategy dispatch (§4.6
/// step 6).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RecoveryStrategy {
    pub strategy: String,
    pub automated_actions: Vec<String>,
    pub suggestions: Vec<String>,
    pub next_action: NextAction,
}

/// The fully classified, analyzed, and recovery-annotated record C6
/// produces for every error payload. Identical (query_id, error_code)
/// pairs observed within IDEMPOTENCY_TTL return a byte-identical record.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorRecord {
    pub error_id: String,
    pub source_component: String,
    pub raw_payload: ErrorPayload,
    pub kind: ErrorKind,
    pub severity: Severity,
    pub root_cause: String,
    pub confidence: f64,
    pub recovery: RecoveryStrategy,
    pub message: String,
}

impl ErrorRecord {
    pub fn idempotency_key(&self) -> (String, String) {
        (self.raw_payload.query_id.clone(), self.raw_payload.error_code.clone())
    }
}
