//! Error Handler (C6): classify, analyze, decide recovery, message, route.
//!
//! Grounded on `original_source/error_handler_agent/agent.py`'s pipeline
//! (validate → idempotency check → ingress → classify → analyze → decide
//! recovery → message → route), reassembled here as one [`ErrorHandler`]
//! service over the sibling modules. Interpretation of `automated_actions`
//! (actually retrying a query, actually remapping a field) is the
//! orchestrator's job (C8); this service only decides what should happen.

mod classifier;
mod idempotency;
mod message;
mod rca;
mod recovery;
mod router;
mod synonym;

pub use idempotency::IdempotencyChecker;
pub use router::FeedbackRouter;
pub use synonym::SynonymMapper;

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::models::{ErrorPayload, ErrorRecord};

#[derive(thiserror::Error, Debug)]
pub enum ErrorHandlerError {
    #[error("invalid error payload: {0}")]
    InvalidPayload(String),
}

pub struct ErrorHandler {
    idempotency: IdempotencyChecker,
    synonyms: SynonymMapper,
    router: Option<FeedbackRouter>,
}

impl ErrorHandler {
    pub fn new(router: Option<FeedbackRouter>) -> Self {
        Self { idempotency: IdempotencyChecker::new(), synonyms: SynonymMapper::new(), router }
    }

    /// `query_id` must look like `q_<anything>`; every field but `context`
    /// must be non-empty, mirroring `validator.py`'s `InputValidator`
    /// (shape enforcement itself is handled by serde deserialization of
    /// [`ErrorPayload`]).
    fn validate(payload: &ErrorPayload) -> Result<(), ErrorHandlerError> {
        if !payload.query_id.starts_with("q_") && !payload.query_id.starts_with("Q_") {
            return Err(ErrorHandlerError::InvalidPayload(format!("query_id '{}' must start with q_", payload.query_id)));
        }
        if payload.agent_id.is_empty() {
            return Err(ErrorHandlerError::InvalidPayload("agent_id must not be empty".to_string()));
        }
        if payload.error_code.is_empty() {
            return Err(ErrorHandlerError::InvalidPayload("error_code must not be empty".to_string()));
        }
        if payload.message.is_empty() {
            return Err(ErrorHandlerError::InvalidPayload("message must not be empty".to_string()));
        }
        Ok(())
    }

    fn next_error_id(payload: &ErrorPayload) -> String {
        let mut hasher = DefaultHasher::new();
        payload.query_id.hash(&mut hasher);
        payload.error_code.hash(&mut hasher);
        payload.message.hash(&mut hasher);
        payload.timestamp.hash(&mut hasher);
        format!("err_{}_{:08x}", payload.timestamp.format("%Y%m%d"), (hasher.finish() & 0xffff_ffff) as u32)
    }

    /// Runs the full pipeline for one reported failure. A duplicate
    /// `(query_id, error_code)` observed within the idempotency TTL
    /// short-circuits straight to the previously produced record.
    pub fn handle(&self, payload: ErrorPayload) -> Result<ErrorRecord, ErrorHandlerError> {
        Self::validate(&payload)?;

        let key = (payload.query_id.clone(), payload.error_code.clone());
        if let Some(cached) = self.idempotency.check_duplicate(&key) {
            return Ok(cached);
        }

        let (kind, confidence) = classifier::classify(&payload);
        let analysis = rca::analyze(kind, &payload);
        let recovery_strategy = recovery::decide(kind, &payload, &analysis, &self.synonyms);

        let field_mapping = recovery_strategy
            .automated_actions
            .iter()
            .find(|a| a.starts_with("map:"))
            .map(|a| a.trim_start_matches("map:").to_string());
        let cache_age_secs = recovery_strategy.automated_actions.iter().find(|a| a == &"provide_cached_fallback").map(|_| 0i64);

        let message = message::generate(kind, &analysis.root_cause, &recovery_strategy, field_mapping.as_deref(), cache_age_secs);

        let record = ErrorRecord {
            error_id: Self::next_error_id(&payload),
            source_component: payload.agent_id.clone(),
            raw_payload: payload,
            kind,
            severity: analysis.severity,
            root_cause: analysis.root_cause.clone(),
            confidence,
            recovery: recovery_strategy,
            message,
        };

        self.idempotency.store_result(key, record.clone());

        if let Some(router) = &self.router {
            router.route(&record);
        }

        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NextAction;
    use serde_json::json;

    fn payload(error_type: Option<&str>, message: &str) -> ErrorPayload {
        ErrorPayload {
            agent_id: "query_engine".to_string(),
            timestamp: chrono::Utc::now(),
            status: "error".to_string(),
            error_type: error_type.map(|s| s.to_string()),
            error_code: "E1".to_string(),
            message: message.to_string(),
            context: json!({}),
            query_id: "q_42".to_string(),
        }
    }

    #[test]
    fn rejects_payload_with_bad_query_id() {
        let mut bad = payload(None, "oops");
        bad.query_id = "not-a-query-id".to_string();
        assert!(ErrorHandler::new(None).handle(bad).is_err());
    }

    #[test]
    fn schema_error_with_synonym_resolves_and_recommends_resume() {
        let handler = ErrorHandler::new(None);
        let mut p = payload(Some("schema_error"), "field not found");
        p.context = json!({"field": "sales", "available_fields": ["total_amount"]});
        let record = handler.handle(p).unwrap();
        assert_eq!(record.recovery.strategy, "auto_remap_field");
        assert_eq!(record.recovery.next_action, NextAction::Resume);
    }

    #[test]
    fn duplicate_payload_within_ttl_returns_identical_error_id() {
        let handler = ErrorHandler::new(None);
        let p = payload(None, "query timed out");
        let first = handler.handle(p.clone()).unwrap();
        let second = handler.handle(p).unwrap();
        assert_eq!(first.error_id, second.error_id);
    }
}
