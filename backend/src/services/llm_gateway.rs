//! LLM Gateway (C3).
//!
//! A single structured-output request contract over the Groq
//! chat-completions API, grounded on the teacher's existing
//! `reqwest`-backed LLM client pattern and on
//! `original_source/backend/query_generation/sql_generator.py`'s
//! tolerant JSON-extraction algorithm (`_extract_json_from_response`,
//! `_clean_json_string`, `_aggressive_json_cleanup`).
//!
//! No retry logic lives here (§4.3): callers (C4, C7) own retry policy.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

const GROQ_CHAT_COMPLETIONS_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

#[derive(Debug, Clone)]
pub struct LLMRequest {
    pub system: String,
    pub user: String,
    pub temperature: f32,
    pub max_tokens: u32,
    /// Names that must be present in the parsed JSON object; missing keys
    /// fall to per-field defaults rather than failing the request.
    pub required_keys: Vec<String>,
}

impl LLMRequest {
    pub fn new(system: impl Into<String>, user: impl Into<String>) -> Self {
        Self { system: system.into(), user: user.into(), temperature: 0.3, max_tokens: 1024, required_keys: Vec::new() }
    }

    pub fn with_required_keys(mut self, keys: &[&str]) -> Self {
        self.required_keys = keys.iter().map(|k| k.to_string()).collect();
        self
    }
}

#[derive(Debug, Clone)]
pub struct LLMResponse {
    pub parsed: Value,
    pub raw_text: String,
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum LLMError {
    #[error("LLM request failed: {0}")]
    RequestFailed(String),

    #[error("could not parse JSON from LLM response: {0}")]
    ParseError(String),

    #[error("response missing required key: {0}")]
    MissingKey(String),
}

#[async_trait::async_trait]
pub trait LLMService: Send + Sync {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse, LLMError>;
}

pub struct GroqLLMClient {
    client: reqwest::Client,
    api_key: String,
    model: String,
}

impl GroqLLMClient {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self { client: reqwest::Client::new(), api_key: api_key.into(), model: model.into() }
    }
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: String,
}

#[async_trait::async_trait]
impl LLMService for GroqLLMClient {
    async fn complete(&self, request: LLMRequest) -> Result<LLMResponse, LLMError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: &request.system },
                ChatMessage { role: "user", content: &request.user },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        tracing::debug!(model = %self.model, "sending LLM completion request");

        let response = self
            .client
            .post(GROQ_CHAT_COMPLETIONS_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::RequestFailed(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(LLMError::RequestFailed(format!("status {}: {}", status, text)));
        }

        let parsed: ChatCompletionResponse =
            response.json().await.map_err(|e| LLMError::RequestFailed(e.to_string()))?;

        let raw_text = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LLMError::RequestFailed("empty choices array".to_string()))?;

        extract_json(&raw_text, &request.required_keys)
    }
}

static FENCE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)^```(?:json)?\s*|\s*```$").unwrap());
static TRAILING_COMMA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r",(\s*[}\]])").unwrap());

/// Tolerant JSON extraction per `spec.md` §4.3: strip fenced code markers,
/// locate the first `{` and last `}`, attempt a strict parse; on failure,
/// normalize whitespace/trailing commas and retry once before giving up.
pub fn extract_json(raw_text: &str, required_keys: &[String]) -> Result<LLMResponse, LLMError> {
    let stripped = FENCE_RE.replace_all(raw_text.trim(), "").to_string();

    let start = stripped.find('{');
    let end = stripped.rfind('}');

    let candidate = match (start, end) {
        (Some(s), Some(e)) if e >= s => &stripped[s..=e],
        _ => return Err(LLMError::ParseError("no JSON object found in response".to_string())),
    };

    let parsed = match serde_json::from_str::<Value>(candidate) {
        Ok(value) => value,
        Err(first_err) => match serde_json::from_str::<Value>(&aggressive_cleanup(candidate)) {
            Ok(value) => value,
            Err(_) => return Err(LLMError::ParseError(first_err.to_string())),
        },
    };

    if let Value::Object(map) = &parsed {
        for key in required_keys {
            if !map.contains_key(key) {
                return Err(LLMError::MissingKey(key.clone()));
            }
        }
    }

    Ok(LLMResponse { parsed, raw_text: raw_text.to_string() })
}

fn aggressive_cleanup(candidate: &str) -> String {
    let normalized_whitespace = candidate.split_whitespace().collect::<Vec<_>>().join(" ");
    TRAILING_COMMA_RE.replace_all(&normalized_whitespace, "$1").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn extracts_json_from_fenced_block() {
        let text = "```json\n{\"chart_type\": \"bar\", \"x\": 1}\n```";
        let result = extract_json(text, &[]).unwrap();
        assert_eq!(result.parsed["chart_type"], "bar");
    }

    #[test]
    fn extracts_json_with_surrounding_prose() {
        let text = "Here is the result:\n{\"a\": 1}\nHope that helps!";
        let result = extract_json(text, &[]).unwrap();
        assert_eq!(result.parsed["a"], 1);
    }

    #[test]
    fn recovers_from_trailing_comma_via_aggressive_cleanup() {
        let text = "{\"a\": 1, \"b\": 2,}";
        let result = extract_json(text, &[]).unwrap();
        assert_eq!(result.parsed["b"], 2);
    }

    #[test]
    fn reports_missing_required_key() {
        let text = "{\"a\": 1}";
        let err = extract_json(text, &["artifact_code".to_string()]).unwrap_err();
        assert!(matches!(err, LLMError::MissingKey(_)));
    }

    #[test]
    fn fails_cleanly_when_no_braces_present() {
        let text = "no json here at all";
        assert!(extract_json(text, &[]).is_err());
    }
}
