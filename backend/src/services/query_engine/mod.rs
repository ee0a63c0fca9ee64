//! Query Engine (C4): plan, build SQL, execute, normalize, cache.
//!
//! Grounded on `original_source/backend/query_generation/{sql_generator,
//! query_executor,data_processor}.py`. Retry-with-repair (§4.5.3) asks the
//! LLM Gateway (C3) to fix a failing statement up to two additional times,
//! re-validating each repair through the same safe-SELECT gate as the
//! builder's own output.

mod cache;
mod normalize;
mod safe_select;
mod sql_builder;

pub use cache::QueryCache;

use serde_json::Value;
use sqlx::{Row, SqlitePool};
use std::collections::HashMap;
use std::time::Instant;

use crate::models::{Catalog, ExecutionResult, NormalizedDataset, ResolvedIntent};
use crate::services::llm_gateway::{LLMRequest, LLMService};

const MAX_ATTEMPTS: u32 = 3;

#[derive(thiserror::Error, Debug, Clone)]
pub enum QueryEngineError {
    #[error("schema error: {0}")]
    Schema(String),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("query error: {0}")]
    Query(String),
}

pub struct QueryEngine {
    pool: SqlitePool,
    cache: QueryCache,
}

impl QueryEngine {
    pub fn new(pool: SqlitePool, cache_ttl_secs: u64) -> Self {
        Self { pool, cache: QueryCache::new(cache_ttl_secs) }
    }

    /// Main entry: plan → build → execute (with repair retries) → normalize
    /// → cache. A cache hit short-circuits everything after the key lookup.
    pub async fn execute(
        &self,
        intent: &ResolvedIntent,
        catalog: &Catalog,
        llm: &dyn LLMService,
    ) -> Result<NormalizedDataset, QueryEngineError> {
        let key = QueryCache::key_for(intent);
        if let Some(cached) = self.cache.get(key) {
            return Ok(cached);
        }

        let plan = sql_builder::build(intent, catalog).map_err(QueryEngineError::Schema)?;
        let sql = sql_builder::render(&plan);
        safe_select::validate(&sql).map_err(QueryEngineError::Validation)?;

        let exec_result = self.execute_with_repair(&sql, catalog, llm).await?;
        let dataset = normalize::normalize(&exec_result, &intent.chart_type_hint);

        if dataset.summary.row_count > 0 || exec_result.ok {
            self.cache.set(key, &dataset);
        }

        Ok(dataset)
    }

    /// Read-only probe: the same safe-SELECT gate, no repair attempts.
    pub async fn execute_raw(&self, sql: &str) -> Result<ExecutionResult, QueryEngineError> {
        safe_select::validate(sql).map_err(QueryEngineError::Validation)?;
        self.run(sql).await
    }

    async fn execute_with_repair(&self, sql: &str, catalog: &Catalog, llm: &dyn LLMService) -> Result<ExecutionResult, QueryEngineError> {
        let mut current_sql = sql.to_string();
        let mut last_error = String::new();

        for attempt in 1..=MAX_ATTEMPTS {
            match self.run(&current_sql).await {
                Ok(result) if result.ok => return Ok(result),
                Ok(result) => last_error = result.error.clone().unwrap_or_default(),
                Err(e) => last_error = e.to_string(),
            }

            if attempt == MAX_ATTEMPTS {
                break;
            }

            let repaired = self.repair(&current_sql, &last_error, catalog, llm).await?;
            safe_select::validate(&repaired).map_err(QueryEngineError::Validation)?;
            current_sql = repaired;
        }

        Err(QueryEngineError::Query(format!("exhausted retry budget after {MAX_ATTEMPTS} attempts: {last_error}")))
    }

    async fn repair(&self, failed_sql: &str, error_message: &str, catalog: &Catalog, llm: &dyn LLMService) -> Result<String, QueryEngineError> {
        let table_names: Vec<&str> = catalog.tables.keys().map(|s| s.as_str()).collect();
        let system = "You repair broken SQLite SELECT statements. Respond with JSON only.".to_string();
        let user = format!(
            "The following SQL failed: {failed_sql}\nError: {error_message}\nKnown tables: {}\nReturn JSON {{\"sql\": \"<repaired statement>\"}}.",
            table_names.join(", ")
        );

        let request = LLMRequest::new(system, user).with_required_keys(&["sql"]);
        let response = llm.complete(request).await.map_err(|e| QueryEngineError::Query(e.to_string()))?;

        response.parsed.get("sql").and_then(Value::as_str).map(|s| s.to_string()).ok_or_else(|| QueryEngineError::Query("repair response missing sql field".to_string()))
    }

    async fn run(&self, sql: &str) -> Result<ExecutionResult, QueryEngineError> {
        let started = Instant::now();
        match sqlx::query(sql).fetch_all(&self.pool).await {
            Ok(db_rows) => {
                let column_order: Vec<String> =
                    db_rows.first().map(|r| r.columns().iter().map(|c| c.name().to_string()).collect()).unwrap_or_default();

                let rows: Vec<HashMap<String, Value>> = db_rows
                    .iter()
                    .map(|row| column_order.iter().enumerate().map(|(idx, name)| (name.clone(), value_at(row, idx))).collect())
                    .collect();

                let row_count = rows.len();
                Ok(ExecutionResult { rows, column_order, elapsed: started.elapsed(), row_count, ok: true, error: None })
            }
            Err(e) => Ok(ExecutionResult::failure(e.to_string())),
        }
    }
}

fn value_at(row: &sqlx::sqlite::SqliteRow, idx: usize) -> Value {
    if let Ok(v) = row.try_get::<i64, usize>(idx) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<f64, usize>(idx) {
        return Value::from(v);
    }
    if let Ok(v) = row.try_get::<String, usize>(idx) {
        return Value::from(v);
    }
    Value::Null
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSchema, ForeignKeyEdge, IntentType, TableSchema};
    use crate::services::llm_gateway::{LLMError, LLMResponse};
    use async_trait::async_trait;

    struct NeverCalledLLM;

    #[async_trait]
    impl LLMService for NeverCalledLLM {
        async fn complete(&self, _request: LLMRequest) -> Result<LLMResponse, LLMError> {
            panic!("LLM should not be called for a query that succeeds on the first attempt");
        }
    }

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query("CREATE TABLE sales (id INTEGER PRIMARY KEY, total_amount REAL, region TEXT)").execute(&pool).await.unwrap();
        sqlx::query("INSERT INTO sales (total_amount, region) VALUES (100.0, 'EMEA'), (50.0, 'APAC')").execute(&pool).await.unwrap();
        pool
    }

    fn catalog_with_sales() -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.tables.insert(
            "sales".to_string(),
            TableSchema {
                table_name: "sales".to_string(),
                columns: vec![
                    ColumnSchema { name: "total_amount".to_string(), declared_type: "REAL".to_string(), nullable: true, distinct_count: 0, non_null_count: 0 },
                    ColumnSchema { name: "region".to_string(), declared_type: "TEXT".to_string(), nullable: true, distinct_count: 0, non_null_count: 0 },
                ],
                foreign_keys: Vec::<ForeignKeyEdge>::new(),
                row_count: 2,
            },
        );
        catalog
    }

    fn summary_intent() -> ResolvedIntent {
        ResolvedIntent {
            intent_type: IntentType::Summary,
            metric: "sales.total_amount".to_string(),
            dimension: None,
            chart_type_hint: "bar".to_string(),
            filters: Vec::new(),
            schema_validated: true,
            primary_table: "sales".to_string(),
        }
    }

    #[tokio::test]
    async fn executes_and_normalizes_successful_query() {
        let engine = QueryEngine::new(seeded_pool().await, 300);
        let dataset = engine.execute(&summary_intent(), &catalog_with_sales(), &NeverCalledLLM).await.unwrap();
        assert_eq!(dataset.summary.row_count, 1);
        assert!(!dataset.cache_hit);
    }

    #[tokio::test]
    async fn second_identical_execution_is_a_cache_hit() {
        let engine = QueryEngine::new(seeded_pool().await, 300);
        let catalog = catalog_with_sales();
        engine.execute(&summary_intent(), &catalog, &NeverCalledLLM).await.unwrap();
        let second = engine.execute(&summary_intent(), &catalog, &NeverCalledLLM).await.unwrap();
        assert!(second.cache_hit);
    }

    #[tokio::test]
    async fn execute_raw_rejects_non_select() {
        let engine = QueryEngine::new(seeded_pool().await, 300);
        let err = engine.execute_raw("DELETE FROM sales").await.unwrap_err();
        assert!(matches!(err, QueryEngineError::Validation(_)));
    }
}
