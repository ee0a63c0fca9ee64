//! User-facing message synthesis (§4.6 step 8).
//!
//! Grounded on
//! `original_source/error_handler_agent/tools/message_generator.py`'s
//! `MessageGenerator`: a field remap or a cache hit gets a bespoke message;
//! everything else falls back to the per-kind template with its
//! `{root_cause}`/`{suggestion}` slots filled in.

use once_cell::sync::Lazy;
use std::collections::HashMap;

use crate::models::{ErrorKind, RecoveryStrategy};

static MESSAGE_TEMPLATES: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    let mut map = HashMap::new();
    map.insert("input", "I need more information to answer that. {root_cause} {suggestion}");
    map.insert("schema", "I couldn't find that field in the data. {root_cause} {suggestion}");
    map.insert("query", "The query couldn't be completed. {root_cause} {suggestion}");
    map.insert("chart", "That chart type won't work well here. {root_cause} {suggestion}");
    map.insert("system", "Something went wrong on our end. {root_cause} {suggestion}");
    map.insert("validation", "That request couldn't be validated. {root_cause} {suggestion}");
    map.insert("default", "An error occurred. {root_cause} {suggestion}");
    map
});

fn template_key(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::Input => "input",
        ErrorKind::Schema => "schema",
        ErrorKind::Query => "query",
        ErrorKind::Chart => "chart",
        ErrorKind::System => "system",
        ErrorKind::Validation => "validation",
    }
}

/// `field_mapping` and `cache_age_secs` mirror the two special cases
/// `message_generator.py` checks before falling back to the templates.
pub fn generate(kind: ErrorKind, root_cause: &str, recovery: &RecoveryStrategy, field_mapping: Option<&str>, cache_age_secs: Option<i64>) -> String {
    let suggestion = recovery.suggestions.first().cloned().unwrap_or_else(|| "Please try again".to_string());

    if let Some(mapped) = field_mapping {
        return format!("I found a matching field. {suggestion} ({mapped})");
    }

    if let Some(age) = cache_age_secs {
        return format!("Using cached results from {age} seconds ago. {suggestion}");
    }

    let template = MESSAGE_TEMPLATES.get(template_key(kind)).unwrap_or(&MESSAGE_TEMPLATES["default"]);
    template.replace("{root_cause}", root_cause).replace("{suggestion}", &suggestion)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NextAction;

    fn recovery(suggestions: Vec<&str>) -> RecoveryStrategy {
        RecoveryStrategy {
            strategy: "x".to_string(),
            automated_actions: Vec::new(),
            suggestions: suggestions.into_iter().map(|s| s.to_string()).collect(),
            next_action: NextAction::AwaitUser,
        }
    }

    #[test]
    fn field_mapping_produces_bespoke_message() {
        let message = generate(ErrorKind::Schema, "missing field", &recovery(vec!["use total_amount"]), Some("total_amount"), None);
        assert!(message.starts_with("I found a matching field."));
    }

    #[test]
    fn cache_hit_produces_bespoke_message() {
        let message = generate(ErrorKind::Query, "timeout", &recovery(vec!["retry later"]), None, Some(42));
        assert!(message.contains("42 seconds ago"));
    }

    #[test]
    fn default_template_fills_root_cause_and_suggestion() {
        let message = generate(ErrorKind::Validation, "bad shape", &recovery(vec!["fix your request"]), None, None);
        assert!(message.contains("bad shape"));
        assert!(message.contains("fix your request"));
    }

    #[test]
    fn missing_suggestion_falls_back_to_default_phrase() {
        let message = generate(ErrorKind::System, "outage", &recovery(vec![]), None, None);
        assert!(message.contains("Please try again"));
    }
}
