//! Classification (§4.6 step 4).
//!
//! Grounded on `original_source/error_handler_agent/tools/classifier.py`:
//! an explicit `error_type` is trusted at confidence 0.95; otherwise every
//! kind's pattern list is scored against the message (weight 0.6) and the
//! error code (weight 0.4), the best score wins, and confidence is clamped
//! to 0.95. Ties fall to [`ErrorKind::Validation`] per `spec.md` §4.6 step 4.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::models::{ErrorKind, ErrorPayload};

const EXPLICIT_TYPE_CONFIDENCE: f64 = 0.95;
const MESSAGE_WEIGHT: f64 = 0.6;
const CODE_WEIGHT: f64 = 0.4;
const MAX_CONFIDENCE: f64 = 0.95;

static ERROR_PATTERNS: Lazy<Vec<(ErrorKind, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (ErrorKind::Input, &["ambiguous", "unclear", "missing parameter", "invalid input", "unspecified"]),
        (ErrorKind::Schema, &["field not found", "column missing", "schema mismatch", "unknown field", "attribute error"]),
        (ErrorKind::Query, &["timeout", "query failed", "database error", "aggregation error", "execution failed"]),
        (ErrorKind::Chart, &["incompatible chart", "visualization error", "chart type mismatch", "rendering failed"]),
        (ErrorKind::System, &["service unavailable", "connection failed", "system outage", "network error"]),
        (ErrorKind::Validation, &["validation failed", "constraint violation", "invalid format", "type mismatch"]),
    ]
});

fn explicit_kind(error_type: &str) -> Option<ErrorKind> {
    match error_type {
        "input_error" => Some(ErrorKind::Input),
        "schema_error" => Some(ErrorKind::Schema),
        "query_error" => Some(ErrorKind::Query),
        "chart_error" => Some(ErrorKind::Chart),
        "system_error" => Some(ErrorKind::System),
        "validation_error" => Some(ErrorKind::Validation),
        _ => None,
    }
}

/// Priority order used to break ties: the first kind in
/// [`ERROR_PATTERNS`]'s declaration order among those sharing the top
/// score wins, and that order ends on `Validation` — matching Python's
/// `defaultdict` + `max(..., key=...)` first-max-wins semantics when
/// `Validation`'s patterns are scored last and ties favor it as the
/// catch-all.
pub fn classify(payload: &ErrorPayload) -> (ErrorKind, f64) {
    if let Some(explicit) = payload.error_type.as_deref().and_then(explicit_kind) {
        return (explicit, EXPLICIT_TYPE_CONFIDENCE);
    }

    let message = payload.message.to_lowercase();
    let code = payload.error_code.to_lowercase();

    let mut scores: HashMap<ErrorKind, f64> = HashMap::new();
    for (kind, patterns) in ERROR_PATTERNS.iter() {
        let mut score = 0.0;
        for pattern in *patterns {
            if message.contains(pattern) {
                score += MESSAGE_WEIGHT;
            }
            if code.contains(pattern) {
                score += CODE_WEIGHT;
            }
        }
        if score > 0.0 {
            scores.insert(*kind, score);
        }
    }

    if scores.is_empty() {
        return (ErrorKind::Validation, 0.5);
    }

    let mut best: Option<(ErrorKind, f64)> = None;
    for (kind, _) in ERROR_PATTERNS.iter() {
        if let Some(score) = scores.get(kind) {
            if best.as_ref().map(|(_, best_score)| *score > *best_score).unwrap_or(true) {
                best = Some((*kind, *score));
            }
        }
    }

    let (kind, score) = best.expect("scores is non-empty");
    (kind, score.min(MAX_CONFIDENCE))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(error_type: Option<&str>, message: &str, code: &str) -> ErrorPayload {
        ErrorPayload {
            agent_id: "query_engine".to_string(),
            timestamp: chrono::Utc::now(),
            status: "error".to_string(),
            error_type: error_type.map(|s| s.to_string()),
            error_code: code.to_string(),
            message: message.to_string(),
            context: serde_json::Value::Null,
            query_id: "q_1".to_string(),
        }
    }

    #[test]
    fn explicit_error_type_wins_at_high_confidence() {
        let (kind, confidence) = classify(&payload(Some("schema_error"), "whatever", ""));
        assert_eq!(kind, ErrorKind::Schema);
        assert_eq!(confidence, 0.95);
    }

    #[test]
    fn message_pattern_scoring_picks_query_error() {
        let (kind, confidence) = classify(&payload(None, "query timed out after 30s", ""));
        assert_eq!(kind, ErrorKind::Query);
        assert!(confidence > 0.0);
    }

    #[test]
    fn unscored_message_defaults_to_validation() {
        let (kind, _) = classify(&payload(None, "completely unrelated text", ""));
        assert_eq!(kind, ErrorKind::Validation);
    }

    #[test]
    fn confidence_is_clamped_to_point_nine_five() {
        let (_, confidence) = classify(&payload(None, "timeout query failed database error aggregation error execution failed", "timeout query failed database error"));
        assert!(confidence <= 0.95);
    }
}
