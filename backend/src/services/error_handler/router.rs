//! Feedback routing (§4.6 step 9).
//!
//! Grounded on `original_source/error_handler_agent/services/router.py`'s
//! `FeedbackRouter`: the UI channel always receives the record; the
//! pipeline channel only when recovery says `Resume`; the ops channel only
//! when it says `Escalate`. Each send is independent — a full or dropped
//! channel is logged and does not stop the other two.

use tokio::sync::mpsc::UnboundedSender;
use tracing::warn;

use crate::models::{ErrorRecord, NextAction};

pub struct FeedbackRouter {
    ui: UnboundedSender<ErrorRecord>,
    pipeline: UnboundedSender<ErrorRecord>,
    ops: UnboundedSender<ErrorRecord>,
}

impl FeedbackRouter {
    pub fn new(ui: UnboundedSender<ErrorRecord>, pipeline: UnboundedSender<ErrorRecord>, ops: UnboundedSender<ErrorRecord>) -> Self {
        Self { ui, pipeline, ops }
    }

    pub fn route(&self, record: &ErrorRecord) {
        if let Err(e) = self.ui.send(record.clone()) {
            warn!(error_id = %record.error_id, "ui channel send failed: {e}");
        }

        match record.recovery.next_action {
            NextAction::Resume => {
                if let Err(e) = self.pipeline.send(record.clone()) {
                    warn!(error_id = %record.error_id, "pipeline channel send failed: {e}");
                }
            }
            NextAction::Escalate => {
                if let Err(e) = self.ops.send(record.clone()) {
                    warn!(error_id = %record.error_id, "ops channel send failed: {e}");
                }
            }
            NextAction::AwaitUser => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ErrorKind, ErrorPayload, RecoveryStrategy, Severity};
    use chrono::Utc;
    use tokio::sync::mpsc::unbounded_channel;

    fn record(next_action: NextAction) -> ErrorRecord {
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
            recovery: RecoveryStrategy { strategy: "retry".to_string(), automated_actions: Vec::new(), suggestions: Vec::new(), next_action },
            message: "x".to_string(),
        }
    }

    #[test]
    fn resume_routes_to_ui_and_pipeline_not_ops() {
        let (ui_tx, mut ui_rx) = unbounded_channel();
        let (pipeline_tx, mut pipeline_rx) = unbounded_channel();
        let (ops_tx, mut ops_rx) = unbounded_channel();
        let router = FeedbackRouter::new(ui_tx, pipeline_tx, ops_tx);

        router.route(&record(NextAction::Resume));

        assert!(ui_rx.try_recv().is_ok());
        assert!(pipeline_rx.try_recv().is_ok());
        assert!(ops_rx.try_recv().is_err());
    }

    #[test]
    fn escalate_routes_to_ui_and_ops_not_pipeline() {
        let (ui_tx, mut ui_rx) = unbounded_channel();
        let (pipeline_tx, mut pipeline_rx) = unbounded_channel();
        let (ops_tx, mut ops_rx) = unbounded_channel();
        let router = FeedbackRouter::new(ui_tx, pipeline_tx, ops_tx);

        router.route(&record(NextAction::Escalate));

        assert!(ui_rx.try_recv().is_ok());
        assert!(pipeline_rx.try_recv().is_err());
        assert!(ops_rx.try_recv().is_ok());
    }
}
