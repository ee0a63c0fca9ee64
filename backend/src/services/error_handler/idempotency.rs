//! Duplicate-error suppression (§4.6 step 2).
//!
//! Grounded on `original_source/error_handler_agent/services/idempotency.py`'s
//! `IdempotencyChecker`: the same `(query_id, error_code)` pair observed
//! again within `IDEMPOTENCY_TTL` seconds returns the stored record instead
//! of re-running classification/analysis/recovery.

use chrono::{DateTime, Utc};
use dashmap::DashMap;

use crate::models::ErrorRecord;

pub const IDEMPOTENCY_TTL: i64 = 300;

pub struct IdempotencyChecker {
    entries: DashMap<(String, String), (ErrorRecord, DateTime<Utc>)>,
    ttl: chrono::Duration,
}

impl IdempotencyChecker {
    pub fn new() -> Self {
        Self { entries: DashMap::new(), ttl: chrono::Duration::seconds(IDEMPOTENCY_TTL) }
    }

    /// Returns the stored record if it's still within TTL, evicting it
    /// first if it has expired.
    pub fn check_duplicate(&self, key: &(String, String)) -> Option<ErrorRecord> {
        let expired = match self.entries.get(key) {
            Some(entry) => Utc::now() - entry.1 > self.ttl,
            None => return None,
        };

        if expired {
            self.entries.remove(key);
            return None;
        }

        self.entries.get(key).map(|entry| entry.0.clone())
    }

    pub fn store_result(&self, key: (String, String), record: ErrorRecord) {
        self.entries.insert(key, (record, Utc::now()));
    }

    pub fn clear_expired(&self) {
        let now = Utc::now();
        self.entries.retain(|_, (_, inserted_at)| now - *inserted_at <= self.ttl);
    }
}

impl Default for IdempotencyChecker {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, ErrorPayload, NextAction, RecoveryStrategy, Severity};

    fn record() -> ErrorRecord {
        ErrorRecord {
            error_id: "err_1".to_string(),
            source_component: "query_engine".to_string(),
            raw_payload: ErrorPayload {
                agent_id: "query_engine".to_string(),
                timestamp: Utc::now(),
                status: "error".to_string(),
                error_type: None,
                error_code: "E1".to_string(),
                message: "failed".to_string(),
                context: serde_json::Value::Null,
                query_id: "q_1".to_string(),
            },
            kind: ErrorKind::Query,
            severity: Severity::High,
            root_cause: "x".to_string(),
            confidence: 0.9,
            recovery: RecoveryStrategy { strategy: "retry".to_string(), automated_actions: Vec::new(), suggestions: Vec::new(), next_action: NextAction::Resume },
            message: "x".to_string(),
        }
    }

    #[test]
    fn duplicate_within_ttl_returns_stored_record() {
        let checker = IdempotencyChecker::new();
        let key = ("q_1".to_string(), "E1".to_string());
        checker.store_result(key.clone(), record());
        assert!(checker.check_duplicate(&key).is_some());
    }

    #[test]
    fn unseen_key_returns_none() {
        let checker = IdempotencyChecker::new();
        assert!(checker.check_duplicate(&("q_2".to_string(), "E1".to_string())).is_none());
    }
}
