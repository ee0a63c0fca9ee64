//! Artifact Synthesizer (C7): ask the LLM for a self-contained chart
//! component, validate it, substitute a deterministic fallback on failure.
//!
//! Grounded on `original_source/backend/chart_generation/component_generator.py`
//! (prompt shape, validation rules, fallback rendering) and on the teacher's
//! `GroqLLMClient` usage pattern from `llm_gateway.rs` (C3) for the request
//! itself.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

use crate::models::{Artifact, NormalizedDataset};
use crate::services::llm_gateway::{LLMRequest, LLMService};

const MIN_ARTIFACT_LENGTH: usize = 50;
const SAMPLE_ROWS: usize = 5;
const FALLBACK_ROWS: usize = 10;

static DANGEROUS_PATTERNS: Lazy<Vec<&'static str>> =
    Lazy::new(|| vec!["eval(", "new Function(", "innerHTML", "dangerouslySetInnerHTML"]);

static COMPONENT_DECLARATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?m)^\s*(?:export\s+)?(?:function|const)\s+([A-Z][A-Za-z0-9]*)\s*(?:=\s*\(\s*\)\s*=>|\()").unwrap()
});

static RENDER_EXPRESSION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"return\s*\(?\s*<").unwrap());

fn sample_rows(dataset: &NormalizedDataset, limit: usize) -> Value {
    let sample: Vec<Value> = dataset
        .rows
        .iter()
        .take(limit)
        .map(|row| serde_json::to_value(row).unwrap_or(Value::Null))
        .collect();
    Value::Array(sample)
}

fn build_prompt(dataset: &NormalizedDataset, user_prompt: &str) -> (String, String) {
    let system = "You generate self-contained React chart components. Respond with JSON only.".to_string();

    let summary = serde_json::json!({
        "row_count": dataset.summary.row_count,
        "col_count": dataset.summary.col_count,
        "has_time_axis": dataset.summary.has_time_axis,
    });

    let user = format!(
        "User request: {user_prompt}\n\
         Sample rows (of {total} total): {sample}\n\
         Chart config: {chart_config}\n\
         Data summary: {summary}\n\
         Requirements:\n\
         - Declare exactly one parameterless top-level component whose name is PascalCase.\n\
         - Use the chart_config's chart_type and axes.\n\
         - Do not call eval, new Function, or set innerHTML/dangerouslySetInnerHTML.\n\
         - Return JSON: {{\"artifact_code\": string, \"artifact_name\": string, \"chart_type\": string}}.",
        user_prompt = user_prompt,
        total = dataset.summary.row_count,
        sample = sample_rows(dataset, SAMPLE_ROWS),
        chart_config = serde_json::to_string(&dataset.chart_config).unwrap_or_default(),
        summary = summary,
    );

    (system, user)
}

/// §4.7's four validation rules, checked in order; the first failure is
/// returned as the reason.
fn validate(artifact_code: &str, artifact_name: &str) -> Result<(), String> {
    if artifact_code.len() < MIN_ARTIFACT_LENGTH {
        return Err(format!("artifact_code shorter than {MIN_ARTIFACT_LENGTH} characters"));
    }

    let declares_component = COMPONENT_DECLARATION_RE
        .captures_iter(artifact_code)
        .any(|caps| caps.get(1).map(|m| m.as_str() == artifact_name).unwrap_or(false));
    if !declares_component {
        return Err(format!("no top-level declaration of component '{artifact_name}'"));
    }

    if !RENDER_EXPRESSION_RE.is_match(artifact_code) || !artifact_code.contains('}') {
        return Err("no render expression with a terminating brace".to_string());
    }

    if let Some(pattern) = DANGEROUS_PATTERNS.iter().find(|p| artifact_code.contains(**p)) {
        return Err(format!("contains disallowed pattern '{pattern}'"));
    }

    Ok(())
}

fn fallback_artifact(dataset: &NormalizedDataset, error_message: &str) -> Artifact {
    let preview_rows = sample_rows(dataset, FALLBACK_ROWS);
    let escaped_message = error_message.replace('\'', "\\'");

    let artifact_code = format!(
        "function FallbackChart() {{\n  const rows = {rows};\n  const error = '{error}';\n  return (\n    <div>\n      <p>{{error}}</p>\n      <table>\n        <tbody>\n          {{rows.map((row, i) => (\n            <tr key={{i}}>{{Object.values(row).map((v, j) => <td key={{j}}>{{String(v)}}</td>)}}</tr>\n          ))}}\n        </tbody>\n      </table>\n    </div>\n  );\n}}",
        rows = serde_json::to_string(&preview_rows).unwrap_or_else(|_| "[]".to_string()),
        error = escaped_message,
    );

    debug_assert!(validate(&artifact_code, "FallbackChart").is_ok(), "fallback artifact must always pass validation");

    Artifact { artifact_code, artifact_name: "FallbackChart".to_string(), chart_type: "error".to_string(), ok: false }
}

pub struct ArtifactSynthesizer;

impl ArtifactSynthesizer {
    pub fn new() -> Self {
        Self
    }

    pub async fn synthesize(&self, dataset: &NormalizedDataset, user_prompt: &str, llm: &dyn LLMService) -> Artifact {
        let (system, user) = build_prompt(dataset, user_prompt);
        let request = LLMRequest::new(system, user).with_required_keys(&["artifact_code", "artifact_name", "chart_type"]);

        let response = match llm.complete(request).await {
            Ok(response) => response,
            Err(e) => return fallback_artifact(dataset, &e.to_string()),
        };

        let artifact_code = response.parsed.get("artifact_code").and_then(Value::as_str).unwrap_or_default();
        let artifact_name = response.parsed.get("artifact_name").and_then(Value::as_str).unwrap_or_default();
        let chart_type = response.parsed.get("chart_type").and_then(Value::as_str).unwrap_or_default();

        match validate(artifact_code, artifact_name) {
            Ok(()) => Artifact {
                artifact_code: artifact_code.to_string(),
                artifact_name: artifact_name.to_string(),
                chart_type: chart_type.to_string(),
                ok: true,
            },
            Err(reason) => fallback_artifact(dataset, &reason),
        }
    }
}

impl Default for ArtifactSynthesizer {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartConfig, DatasetSummary};
    use crate::services::llm_gateway::{LLMError, LLMResponse};
    use async_trait::async_trait;
    use std::collections::HashMap;

    fn dataset() -> NormalizedDataset {
        let mut row = HashMap::new();
        row.insert("region".to_string(), Value::String("EMEA".to_string()));
        row.insert("total".to_string(), Value::from(100));
        NormalizedDataset {
            rows: vec![row],
            column_order: vec!["region".to_string(), "total".to_string()],
            chart_config: ChartConfig { chart_type: "bar".to_string(), x_axis: Some("region".to_string()), y_axis: Some("total".to_string()), title: String::new(), limit_applied: 1 },
            summary: DatasetSummary { row_count: 1, col_count: 2, ..Default::default() },
            cache_hit: false,
            cached_at: None,
        }
    }

    struct StubLLM(Value);

    #[async_trait]
    impl LLMService for StubLLM {
        async fn complete(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Ok(LLMResponse { parsed: self.0.clone(), raw_text: self.0.to_string() })
        }
    }

    struct FailingLLM;

    #[async_trait]
    impl LLMService for FailingLLM {
        async fn complete(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            Err(LLMError::RequestFailed("gateway down".to_string()))
        }
    }

    #[tokio::test]
    async fn valid_component_is_accepted() {
        let code = "function RevenueByRegion() {\n  const data = [1,2,3];\n  return (\n    <BarChart data={data} />\n  );\n}";
        let response = serde_json::json!({"artifact_code": code, "artifact_name": "RevenueByRegion", "chart_type": "bar"});
        let synth = ArtifactSynthesizer::new();
        let artifact = synth.synthesize(&dataset(), "show revenue by region", &StubLLM(response)).await;
        assert!(artifact.ok);
        assert_eq!(artifact.artifact_name, "RevenueByRegion");
    }

    #[tokio::test]
    async fn dangerous_pattern_triggers_fallback() {
        let code = "function Evil() {\n  eval('alert(1)');\n  return (\n    <div>{eval('x')}</div>\n  );\n}";
        let response = serde_json::json!({"artifact_code": code, "artifact_name": "Evil", "chart_type": "bar"});
        let synth = ArtifactSynthesizer::new();
        let artifact = synth.synthesize(&dataset(), "show revenue", &StubLLM(response)).await;
        assert!(!artifact.ok);
        assert_eq!(artifact.chart_type, "error");
    }

    #[tokio::test]
    async fn llm_failure_produces_fallback() {
        let synth = ArtifactSynthesizer::new();
        let artifact = synth.synthesize(&dataset(), "show revenue", &FailingLLM).await;
        assert!(!artifact.ok);
        assert!(artifact.artifact_code.contains("gateway down"));
    }

    #[test]
    fn fallback_artifact_always_passes_validation() {
        let artifact = fallback_artifact(&dataset(), "boom");
        assert!(validate(&artifact.artifact_code, &artifact.artifact_name).is_ok());
    }
}
