//! Pipeline Orchestrator (C8).
//!
//! Grounded on `original_source/backend/api/endpoints.py`'s
//! `process_chart_generation` background task: the exact stage/progress
//! sequence (0/10/25/50/75/100) and the C5 -> C4 -> C7 dispatch order.
//! Each submitted job is `tokio::spawn`ed as its own worker (§5), matching
//! `services/baseline_refresh_task.rs`'s spawn-and-run-to-completion shape
//! generalized from "one recurring background task" to "one task per job".

use chrono::Utc;
use serde_json::{Value, json};
use std::sync::Arc;
use uuid::Uuid;

use crate::models::{Catalog, ErrorPayload, ErrorRecord, ErrorKind, Job, JobResult, NextAction, Prompt, ResolvedIntent, Severity};
use crate::services::artifact_synthesizer::ArtifactSynthesizer;
use crate::services::catalog::CatalogIntrospector;
use crate::services::error_handler::ErrorHandler;
use crate::services::input_parser::{InputParser, ParseOutcome};
use crate::services::job_registry::JobRegistry;
use crate::services::llm_gateway::LLMService;
use crate::services::query_engine::{QueryEngine, QueryEngineError};

fn bare_column(path: &str) -> &str {
    path.rsplit('.').next().unwrap_or(path)
}

fn table_columns(catalog: &Catalog, table: &str) -> Vec<String> {
    catalog.get(table).map(|t| t.columns.iter().map(|c| c.name.clone()).collect()).unwrap_or_default()
}

/// Replaces the bare column segment of `metric`/`dimension` with the
/// remapped target named by a `map:<old>-><new>` automated action,
/// preserving the `table.` prefix.
fn apply_field_remap(intent: &mut ResolvedIntent, action: &str) {
    let Some(rest) = action.strip_prefix("map:") else { return };
    let Some((old, new)) = rest.split_once("->") else { return };

    if bare_column(&intent.metric).eq_ignore_ascii_case(old) {
        let table = intent.metric.rsplit_once('.').map(|(t, _)| t).unwrap_or(&intent.primary_table);
        intent.metric = format!("{table}.{new}");
    }

    if let Some(dimension) = intent.dimension.clone() {
        if bare_column(&dimension).eq_ignore_ascii_case(old) {
            let table = dimension.rsplit_once('.').map(|(t, _)| t).unwrap_or(&intent.primary_table);
            intent.dimension = Some(format!("{table}.{new}"));
        }
    }
}

/// Maps a failed [`QueryEngineError`] to the `(error_type, context)` pair
/// the error handler's classifier (§4.6 step 4) expects. A SQLite "no such
/// column" failure (scenario 5, §8: `products.cat` -> `products.category`)
/// and the builder's own missing-join-path failure are both treated as
/// schema errors so a synonym remap can be attempted before escalating.
fn query_error_context(error: &QueryEngineError, catalog: &Catalog, intent: &ResolvedIntent, attempt_count: u32) -> (&'static str, Value) {
    match error {
        QueryEngineError::Validation(_) => ("validation_error", json!({ "attempt_count": attempt_count })),
        QueryEngineError::Schema(_) => {
            let field = bare_column(&intent.metric).to_string();
            let available = table_columns(catalog, &intent.primary_table);
            ("schema_error", json!({ "field": field, "available_fields": available, "attempt_count": attempt_count }))
        }
        QueryEngineError::Query(message) => {
            if message.to_lowercase().contains("no such column") {
                let field = bare_column(&intent.metric).to_string();
                let available = table_columns(catalog, &intent.primary_table);
                ("schema_error", json!({ "field": field, "available_fields": available, "attempt_count": attempt_count }))
            } else {
                ("query_error", json!({ "attempt_count": attempt_count, "cache_available": false }))
            }
        }
    }
}

/// Missing-parameter phrasing for the three ways C5 can short-circuit into
/// clarification (§4.4). The low-confidence case names "time range" to
/// match scenario 1 (§8) verbatim: input `"show revenue"` -> suggestion
/// "Please specify the time range".
fn missing_params_for(reason: &str) -> Vec<String> {
    if reason.contains("confidence") {
        vec!["time range".to_string()]
    } else if reason.contains("no tables matched") {
        vec!["a table or data source to query".to_string()]
    } else if reason.contains("no columns could be mapped") {
        vec!["a specific metric or field".to_string()]
    } else {
        vec!["a metric to chart".to_string()]
    }
}

fn fallback_record(agent_id: &str, query_id: &str, message: &str) -> ErrorRecord {
    ErrorRecord {
        error_id: format!("err_{}_fallback", Utc::now().format("%Y%m%d")),
        source_component: agent_id.to_string(),
        raw_payload: ErrorPayload {
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
            status: "error".to_string(),
            error_type: Some("system_error".to_string()),
            error_code: "E_INTERNAL".to_string(),
            message: message.to_string(),
            context: Value::Null,
            query_id: query_id.to_string(),
        },
        kind: ErrorKind::System,
        severity: Severity::Critical,
        root_cause: message.to_string(),
        confidence: 0.0,
        recovery: crate::models::RecoveryStrategy {
            strategy: "system_failure_handling".to_string(),
            automated_actions: Vec::new(),
            suggestions: Vec::new(),
            next_action: NextAction::Escalate,
        },
        message: format!("Something went wrong on our end. {message}"),
    }
}

pub struct PipelineOrchestrator {
    catalog: Arc<CatalogIntrospector>,
    input_parser: Arc<InputParser>,
    query_engine: Arc<QueryEngine>,
    artifact_synthesizer: Arc<ArtifactSynthesizer>,
    llm: Arc<dyn LLMService>,
    error_handler: Arc<ErrorHandler>,
    registry: Arc<JobRegistry>,
}

impl PipelineOrchestrator {
    pub fn new(
        catalog: Arc<CatalogIntrospector>,
        input_parser: Arc<InputParser>,
        query_engine: Arc<QueryEngine>,
        artifact_synthesizer: Arc<ArtifactSynthesizer>,
        llm: Arc<dyn LLMService>,
        error_handler: Arc<ErrorHandler>,
        registry: Arc<JobRegistry>,
    ) -> Self {
        Self { catalog, input_parser, query_engine, artifact_synthesizer, llm, error_handler, registry }
    }

    /// Registers a job and hands it to its own worker task; returns
    /// immediately with the job id (§5: "each submitted job runs on its
    /// own worker").
    pub fn submit(self: &Arc<Self>, prompt: Prompt) -> Job {
        let job = self.registry.create(prompt);
        let id = job.id;
        let orchestrator = Arc::clone(self);
        tokio::spawn(async move {
            orchestrator.run(id).await;
        });
        job
    }

    fn report(&self, id: Uuid, agent_id: &str, error_type: &str, error_code: &str, message: &str, context: Value) -> ErrorRecord {
        let payload = ErrorPayload {
            agent_id: agent_id.to_string(),
            timestamp: Utc::now(),
            status: "error".to_string(),
            error_type: Some(error_type.to_string()),
            error_code: error_code.to_string(),
            message: message.to_string(),
            context,
            query_id: format!("q_{id}"),
        };

        match self.error_handler.handle(payload) {
            Ok(record) => record,
            Err(e) => fallback_record(agent_id, &format!("q_{id}"), &e.to_string()),
        }
    }

    async fn run(&self, id: Uuid) {
        let Some(job) = self.registry.get(id) else {
            return;
        };
        let Some(cancel) = self.registry.cancel_flag(id) else {
            return;
        };

        self.registry.set_processing(id);
        self.registry.set_progress(id, 10);

        if cancel.is_requested() {
            self.registry.cancel(id);
            return;
        }

        // Step 2 (progress 25): C5 parse + enrich.
        self.registry.set_progress(id, 25);

        let catalog = match self.catalog.get_catalog().await {
            Ok(catalog) => catalog,
            Err(e) => {
                let record = self.report(id, "catalog_introspector", "schema_error", "E_CATALOG_UNAVAILABLE", &e.to_string(), json!({}));
                self.registry.fail(id, record);
                return;
            }
        };

        let mut intent = match self.input_parser.parse(&job.prompt.text, &catalog) {
            ParseOutcome::Resolved(intent) => intent,
            ParseOutcome::NeedsClarification { reason, .. } => {
                let context = json!({ "missing_params": missing_params_for(&reason) });
                let record = self.report(id, "input_parser", "input_error", "E_LOW_CONFIDENCE", &reason, context);
                self.registry.fail(id, record);
                return;
            }
        };

        if cancel.is_requested() {
            self.registry.cancel(id);
            return;
        }

        // Step 3 (progress 50): C4 plan + execute + normalize. The
        // orchestrator retries the failing stage at most once per stage,
        // applying any field-synonym remap C6 recommends (§4.8).
        self.registry.set_progress(id, 50);

        let mut attempt_count: u32 = 0;
        let dataset = loop {
            match self.query_engine.execute(&intent, &catalog, self.llm.as_ref()).await {
                Ok(dataset) => break dataset,
                Err(e) => {
                    let (error_type, context) = query_error_context(&e, &catalog, &intent, attempt_count);
                    let record = self.report(id, "query_engine", error_type, "E_QUERY_FAILED", &e.to_string(), context);

                    if record.recovery.next_action == NextAction::Resume && attempt_count == 0 {
                        attempt_count += 1;

                        if let Some(backoff) = record.recovery.automated_actions.iter().find_map(|a| a.strip_prefix("backoff:")).and_then(|s| s.strip_suffix('s')) {
                            if let Ok(secs) = backoff.parse::<u64>() {
                                tokio::time::sleep(std::time::Duration::from_secs(secs)).await;
                            }
                        }

                        if let Some(remap) = record.recovery.automated_actions.iter().find(|a| a.starts_with("map:")) {
                            apply_field_remap(&mut intent, remap);
                        }

                        if cancel.is_requested() {
                            self.registry.cancel(id);
                            return;
                        }

                        continue;
                    }

                    self.registry.fail(id, record);
                    return;
                }
            }
        };

        // Step 4 (progress 75): dataset is always structurally valid by
        // construction (C4's normalization guarantees chart_config and
        // summary are populated even for a zero-row result); this step is
        // a named checkpoint rather than a fallible gate.
        self.registry.set_progress(id, 75);

        if cancel.is_requested() {
            self.registry.cancel(id);
            return;
        }

        // Step 5 (progress 100): C7. Artifact synthesis never fails the
        // job — a validation failure substitutes the deterministic
        // fallback artifact internally (§4.7), so the job always
        // completes from here, with chart_type "error" on fallback.
        let artifact = self.artifact_synthesizer.synthesize(&dataset, &job.prompt.text, self.llm.as_ref()).await;

        self.registry.complete(
            id,
            JobResult {
                artifact_code: artifact.artifact_code,
                component_name: artifact.artifact_name,
                chart_type: artifact.chart_type,
                cache_hit: dataset.cache_hit,
            },
        );
    }

    /// Cooperative cancellation (§5): marks the cancel flag; the running
    /// worker observes it at its next stage boundary and transitions the
    /// job to `Cancelled` rather than being forcibly killed.
    pub fn cancel(&self, id: Uuid) -> Result<(), crate::services::job_registry::RegistryError> {
        self.registry.request_cancel(id)
    }
}
