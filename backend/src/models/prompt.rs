use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// Raw user input as submitted to the pipeline. Immutable once created.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Prompt {
    pub text: String,
    pub session_id: Option<String>,
    #[serde(default)]
    pub prior_queries: Vec<String>,
    pub submitted_at: DateTime<Utc>,
}

impl Prompt {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into(), session_id: None, prior_queries: Vec::new(), submitted_at: Utc::now() }
    }
}

/// Primary intent tagged onto a prompt by the input parser (C5).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PrimaryIntent {
    Show,
    Compare,
    Trend,
    Distribution,
    Correlation,
    Other,
    Invalid,
}

impl Default for PrimaryIntent {
    fn default() -> Self {
        Self::Invalid
    }
}

/// Output of text normalization (C5 stage 1-2): cleaned text plus a
/// confidence score and the primary intent the validator settled on.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CleanedPrompt {
    pub original: String,
    pub cleaned: String,
    pub confidence: f64,
    pub primary_intent: PrimaryIntent,
}

impl CleanedPrompt {
    pub fn is_valid(&self, threshold: f64) -> bool {
        self.confidence >= threshold && self.primary_intent != PrimaryIntent::Invalid
    }
}
