//! Recovery strategy dispatch (§4.6 step 6).
//!
//! Grounded on `original_source/error_handler_agent/tools/recovery_policy.py`'s
//! `RecoveryPolicyEngine`: one strategy function per [`ErrorKind`], each
//! producing a [`RecoveryStrategy`] that names automated actions, user-facing
//! suggestions, and the next action the orchestrator should take.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::models::{ErrorKind, ErrorPayload, NextAction, RecoveryStrategy};
use crate::services::error_handler::rca::Analysis;
use crate::services::error_handler::synonym::SynonymMapper;

pub const MAX_RETRIES: u32 = 3;
pub const RETRY_DELAYS: [u64; 3] = [1, 3, 5];

static CHART_COMPATIBILITY: Lazy<HashMap<(&'static str, &'static str), &'static [&'static str]>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert(("pie", "date"), &["line", "bar", "area"][..]);
    map.insert(("pie", "time"), &["line", "bar", "area"][..]);
    map.insert(("line", "category"), &["bar", "pie", "column"][..]);
    map.insert(("scatter", "single"), &["bar", "line"][..]);
    map
});

fn context_bool(payload: &ErrorPayload, key: &str) -> bool {
    payload.context.get(key).and_then(|v| v.as_bool()).unwrap_or(false)
}

fn context_u32(payload: &ErrorPayload, key: &str) -> u32 {
    payload.context.get(key).and_then(|v| v.as_u64()).unwrap_or(0) as u32
}

/// `attempt_count` is the number of attempts already made for this
/// `query_id`, read from `payload.context["attempt_count"]` by convention.
pub fn decide(kind: ErrorKind, payload: &ErrorPayload, analysis: &Analysis, synonyms: &SynonymMapper) -> RecoveryStrategy {
    match kind {
        ErrorKind::Input => {
            let suggestions: Vec<String> = analysis
                .missing_params
                .iter()
                .take(2)
                .map(|p| format!("Please specify the {p}"))
                .chain(std::iter::once("Try: 'show revenue by month for last quarter'".to_string()))
                .collect();
            RecoveryStrategy {
                strategy: "clarify".to_string(),
                automated_actions: vec!["generate_clarifying_prompts".to_string()],
                suggestions,
                next_action: NextAction::AwaitUser,
            }
        }
        ErrorKind::Schema => {
            if let Some(mapped) = synonyms.find_mapping(&analysis.field, &analysis.available_fields) {
                RecoveryStrategy {
                    strategy: "auto_remap_field".to_string(),
                    automated_actions: vec!["apply_field_mapping".to_string(), format!("map:{}->{}", analysis.field, mapped)],
                    suggestions: vec![format!("I found a matching field: {mapped}")],
                    next_action: NextAction::Resume,
                }
            } else {
                let next_action = if analysis.available_fields.is_empty() { NextAction::Escalate } else { NextAction::AwaitUser };
                RecoveryStrategy {
                    strategy: "suggest_alternatives".to_string(),
                    automated_actions: Vec::new(),
                    suggestions: analysis.available_fields.clone(),
                    next_action,
                }
            }
        }
        ErrorKind::Query => {
            let cache_hit = context_bool(payload, "cache_available");
            if cache_hit {
                RecoveryStrategy {
                    strategy: "use_cached_data".to_string(),
                    automated_actions: vec!["provide_cached_fallback".to_string()],
                    suggestions: vec!["Using previously cached results".to_string()],
                    next_action: NextAction::Resume,
                }
            } else {
                let attempt = context_u32(payload, "attempt_count");
                if analysis.can_retry && (attempt as usize) < MAX_RETRIES as usize {
                    let delay = RETRY_DELAYS[attempt.min(RETRY_DELAYS.len() as u32 - 1) as usize];
                    RecoveryStrategy {
                        strategy: "retry_with_backoff".to_string(),
                        automated_actions: vec![format!("retry:{}", attempt + 1), format!("backoff:{delay}s"), "reduce_scope".to_string()],
                        suggestions: Vec::new(),
                        next_action: NextAction::Resume,
                    }
                } else {
                    RecoveryStrategy {
                        strategy: "escalate_query_issue".to_string(),
                        automated_actions: Vec::new(),
                        suggestions: Vec::new(),
                        next_action: NextAction::Escalate,
                    }
                }
            }
        }
        ErrorKind::Chart => {
            let alternatives = CHART_COMPATIBILITY
                .get(&(analysis.chart.to_lowercase().as_str(), analysis.dimension.to_lowercase().as_str()))
                .copied()
                .unwrap_or(&["bar", "line", "table"]);
            RecoveryStrategy {
                strategy: "suggest_chart_alternatives".to_string(),
                automated_actions: Vec::new(),
                suggestions: alternatives.iter().map(|s| s.to_string()).collect(),
                next_action: NextAction::AwaitUser,
            }
        }
        ErrorKind::System => {
            let cache_hit = context_bool(payload, "cache_available");
            let mut actions = vec!["escalate:critical".to_string(), "notify_ops".to_string()];
            if cache_hit {
                actions.push("provide_cached_fallback".to_string());
            }
            RecoveryStrategy {
                strategy: "system_failure_handling".to_string(),
                automated_actions: actions,
                suggestions: Vec::new(),
                next_action: NextAction::Escalate,
            }
        }
        ErrorKind::Validation => RecoveryStrategy {
            strategy: "provide_validation_help".to_string(),
            automated_actions: Vec::new(),
            suggestions: vec!["Please check the format of your request".to_string()],
            next_action: NextAction::AwaitUser,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::error_handler::rca;
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
    fn schema_error_auto_remaps_when_synonym_found() {
        let mapper = SynonymMapper::new();
        let analysis = Analysis { field: "sales".to_string(), available_fields: vec!["total_amount".to_string()], ..Default::default() };
        let strategy = decide(ErrorKind::Schema, &payload(json!({})), &analysis, &mapper);
        assert_eq!(strategy.strategy, "auto_remap_field");
        assert_eq!(strategy.next_action, NextAction::Resume);
    }

    #[test]
    fn schema_error_escalates_when_no_alternatives() {
        let mapper = SynonymMapper::new();
        let analysis = Analysis { field: "ghost_field".to_string(), available_fields: Vec::new(), ..Default::default() };
        let strategy = decide(ErrorKind::Schema, &payload(json!({})), &analysis, &mapper);
        assert_eq!(strategy.next_action, NextAction::Escalate);
    }

    #[test]
    fn query_error_uses_cache_before_retrying() {
        let mapper = SynonymMapper::new();
        let analysis = rca::analyze(ErrorKind::Query, &payload(json!({})));
        let strategy = decide(ErrorKind::Query, &payload(json!({"cache_available": true})), &analysis, &mapper);
        assert_eq!(strategy.strategy, "use_cached_data");
    }

    #[test]
    fn query_error_retries_with_backoff_under_budget() {
        let mapper = SynonymMapper::new();
        let analysis = rca::analyze(ErrorKind::Query, &payload(json!({})));
        let strategy = decide(ErrorKind::Query, &payload(json!({"attempt_count": 0})), &analysis, &mapper);
        assert_eq!(strategy.strategy, "retry_with_backoff");
        assert!(strategy.automated_actions.contains(&"backoff:1s".to_string()));
    }

    #[test]
    fn chart_error_falls_back_to_default_alternatives() {
        let mapper = SynonymMapper::new();
        let analysis = Analysis { chart: "radar".to_string(), dimension: "unknown".to_string(), ..Default::default() };
        let strategy = decide(ErrorKind::Chart, &payload(json!({})), &analysis, &mapper);
        assert_eq!(strategy.suggestions, vec!["bar".to_string(), "line".to_string(), "table".to_string()]);
    }
}
