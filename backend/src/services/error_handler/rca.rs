//! Root cause analysis (§4.6 step 5).
//!
//! Grounded on `original_source/error_handler_agent/tools/rca_engine.py`'s
//! per-kind analyzers. Context fields (`missing_params`, `field`,
//! `available_fields`, `chart`, `dimension`, `query_time`) are read out of
//! `ErrorPayload.context`, a free-form JSON object the reporting component
//! fills in.

use crate::models::{ErrorKind, ErrorPayload, Severity};

#[derive(Debug, Clone, Default)]
pub struct Analysis {
    pub root_cause: String,
    pub severity: Severity,
    pub missing_params: Vec<String>,
    pub field: String,
    pub available_fields: Vec<String>,
    pub can_retry: bool,
    pub chart: String,
    pub dimension: String,
}

impl Default for Severity {
    fn default() -> Self {
        Severity::Medium
    }
}

fn context_str(payload: &ErrorPayload, key: &str) -> String {
    payload.context.get(key).and_then(|v| v.as_str()).unwrap_or("").to_string()
}

fn context_str_list(payload: &ErrorPayload, key: &str) -> Vec<String> {
    payload
        .context
        .get(key)
        .and_then(|v| v.as_array())
        .map(|arr| arr.iter().filter_map(|v| v.as_str().map(|s| s.to_string())).collect())
        .unwrap_or_default()
}

pub fn analyze(kind: ErrorKind, payload: &ErrorPayload) -> Analysis {
    match kind {
        ErrorKind::Input => {
            let missing = context_str_list(payload, "missing_params");
            Analysis {
                root_cause: "User input lacks required specificity".to_string(),
                severity: Severity::Low,
                missing_params: missing,
                ..Default::default()
            }
        }
        ErrorKind::Schema => {
            let field = context_str(payload, "field");
            let available = context_str_list(payload, "available_fields");
            Analysis {
                root_cause: format!("Field '{}' not found in schema", if field.is_empty() { "unknown" } else { &field }),
                severity: Severity::Medium,
                field,
                available_fields: available,
                ..Default::default()
            }
        }
        ErrorKind::Query => {
            let message = payload.message.to_lowercase();
            if message.contains("timeout") {
                Analysis { root_cause: "Query execution timeout - dataset too large".to_string(), severity: Severity::Medium, can_retry: true, ..Default::default() }
            } else if message.contains("connection") {
                Analysis { root_cause: "Database connection lost".to_string(), severity: Severity::High, can_retry: true, ..Default::default() }
            } else {
                Analysis { root_cause: "Query execution failed".to_string(), severity: Severity::High, can_retry: false, ..Default::default() }
            }
        }
        ErrorKind::Chart => {
            let chart = context_str(payload, "chart");
            let dimension = context_str(payload, "dimension");
            Analysis {
                root_cause: format!(
                    "Chart type '{}' incompatible with '{}' dimension",
                    if chart.is_empty() { "unknown" } else { &chart },
                    if dimension.is_empty() { "unknown" } else { &dimension }
                ),
                severity: Severity::Low,
                chart,
                dimension,
                ..Default::default()
            }
        }
        ErrorKind::System => {
            Analysis { root_cause: "System or service unavailable".to_string(), severity: Severity::Critical, ..Default::default() }
        }
        ErrorKind::Validation => {
            Analysis { root_cause: "Data validation failed".to_string(), severity: Severity::Medium, ..Default::default() }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload(context: serde_json::Value) -> ErrorPayload {
        ErrorPayload {
            agent_id: "x".to_string(),
            timestamp: chrono::Utc::now(),
            status: "error".to_string(),
            error_type: None,
            error_code: "E1".to_string(),
            message: "query timed out".to_string(),
            context,
            query_id: "q_1".to_string(),
        }
    }

    #[test]
    fn query_timeout_sets_can_retry_and_medium_severity() {
        let analysis = analyze(ErrorKind::Query, &payload(json!({})));
        assert!(analysis.can_retry);
        assert_eq!(analysis.severity, Severity::Medium);
    }

    #[test]
    fn schema_error_reads_field_and_available_fields() {
        let analysis = analyze(ErrorKind::Schema, &payload(json!({"field": "revenue", "available_fields": ["total_amount", "region"]})));
        assert_eq!(analysis.field, "revenue");
        assert_eq!(analysis.available_fields, vec!["total_amount".to_string(), "region".to_string()]);
    }

    #[test]
    fn system_error_is_always_critical() {
        let analysis = analyze(ErrorKind::System, &payload(json!({})));
        assert_eq!(analysis.severity, Severity::Critical);
    }
}
