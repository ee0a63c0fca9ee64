//! Catalog Introspector (C1).
//!
//! Discovers tables, columns, types, and foreign-key edges from the
//! relational store and caches the result under a single TTL-governed
//! snapshot. Grounded on `original_source/backend/database/db_manager.py`
//! (table/column enumeration) and `schema_analyzer.py` (per-table
//! statistics), reimplemented against `sqlx::SqlitePool`.

use chrono::Duration;
use sqlx::{Row, SqlitePool};
use std::sync::RwLock;
use std::sync::Arc;

use crate::models::{Catalog, ColumnSchema, FileMetadata, ForeignKeyEdge, TableSchema};
use crate::utils::ApiResult;

pub struct CatalogIntrospector {
    pool: SqlitePool,
    ttl: Duration,
    snapshot: RwLock<Arc<Catalog>>,
}

impl CatalogIntrospector {
    pub fn new(pool: SqlitePool, ttl_secs: u64) -> Self {
        Self {
            pool,
            ttl: Duration::seconds(ttl_secs as i64),
            snapshot: RwLock::new(Arc::new(Catalog::empty())),
        }
    }

    /// Returns the current Catalog snapshot, refreshing it first if the
    /// cached copy has aged past the TTL.
    pub async fn get_catalog(&self) -> ApiResult<Arc<Catalog>> {
        let needs_refresh = {
            let guard = self.snapshot.read().expect("catalog lock poisoned");
            guard.tables.is_empty() || guard.is_expired(self.ttl)
        };

        if needs_refresh {
            self.refresh().await?;
        }

        Ok(self.snapshot.read().expect("catalog lock poisoned").clone())
    }

    pub async fn get_table(&self, name: &str) -> ApiResult<Option<TableSchema>> {
        let catalog = self.get_catalog().await?;
        Ok(catalog.get(name).cloned())
    }

    pub async fn related_tables(&self, name: &str) -> ApiResult<Vec<String>> {
        let catalog = self.get_catalog().await?;
        Ok(catalog.related_tables(name))
    }

    pub async fn search_by_column(&self, pattern: &str) -> ApiResult<Vec<(String, String)>> {
        let catalog = self.get_catalog().await?;
        Ok(catalog.search_by_column(pattern))
    }

    /// Forces a reload on the next `get_catalog` call.
    pub fn invalidate(&self) {
        let mut guard = self.snapshot.write().expect("catalog lock poisoned");
        *guard = Arc::new(Catalog::empty());
    }

    /// Rebuilds the entire Catalog and atomically swaps in the new
    /// snapshot. Per-table failures are logged and skipped so one bad
    /// table never empties the whole catalog.
    async fn refresh(&self) -> ApiResult<()> {
        let table_names = self.list_table_names().await?;

        let mut catalog = Catalog::empty();
        for table_name in table_names {
            match self.introspect_table(&table_name).await {
                Ok(schema) => {
                    catalog.tables.insert(table_name, schema);
                },
                Err(e) => {
                    tracing::warn!(table = %table_name, error = %e, "skipping table during catalog refresh");
                },
            }
        }

        tracing::info!(table_count = catalog.tables.len(), "catalog refreshed");

        let mut guard = self.snapshot.write().expect("catalog lock poisoned");
        *guard = Arc::new(catalog);
        Ok(())
    }

    async fn list_table_names(&self) -> ApiResult<Vec<String>> {
        let rows = sqlx::query(
            "SELECT name FROM sqlite_master WHERE type='table' AND name != 'file_metadata' AND name NOT LIKE 'sqlite_%' ORDER BY name",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(|r| r.get::<String, _>("name")).collect())
    }

    async fn introspect_table(&self, table_name: &str) -> ApiResult<TableSchema> {
        let pragma_sql = format!("PRAGMA table_info('{}')", table_name);
        let column_rows = sqlx::query(&pragma_sql).fetch_all(&self.pool).await?;

        if column_rows.is_empty() {
            return Err(crate::utils::ApiError::internal_error(format!(
                "table {} not found or has no columns",
                table_name
            )));
        }

        let mut columns = Vec::with_capacity(column_rows.len());
        for row in &column_rows {
            let col_name: String = row.get("name");
            let col_type: String = row.get("type");
            let not_null: i64 = row.get("notnull");

            let distinct_sql =
                format!("SELECT COUNT(DISTINCT \"{}\") FROM \"{}\"", col_name, table_name);
            let distinct_count: i64 =
                sqlx::query_scalar(&distinct_sql).fetch_one(&self.pool).await.unwrap_or(0);

            let non_null_sql =
                format!("SELECT COUNT(\"{}\") FROM \"{}\" WHERE \"{}\" IS NOT NULL", col_name, table_name, col_name);
            let non_null_count: i64 =
                sqlx::query_scalar(&non_null_sql).fetch_one(&self.pool).await.unwrap_or(0);

            columns.push(ColumnSchema {
                name: col_name,
                declared_type: col_type,
                nullable: not_null == 0,
                distinct_count,
                non_null_count,
            });
        }

        let row_count_sql = format!("SELECT COUNT(*) FROM \"{}\"", table_name);
        let row_count: i64 = sqlx::query_scalar(&row_count_sql).fetch_one(&self.pool).await.unwrap_or(0);

        let fk_sql = format!("PRAGMA foreign_key_list('{}')", table_name);
        let fk_rows = sqlx::query(&fk_sql).fetch_all(&self.pool).await.unwrap_or_default();
        let foreign_keys = fk_rows
            .into_iter()
            .map(|row| ForeignKeyEdge {
                local_column: row.get("from"),
                target_table: row.get("table"),
                target_column: row.get("to"),
            })
            .collect();

        Ok(TableSchema { table_name: table_name.to_string(), columns, foreign_keys, row_count })
    }

    /// Read path over the `file_metadata` sidecar, serving
    /// `GET /database-status`. Ingestion (the write path) is out of scope.
    pub async fn list_loaded_files(&self) -> ApiResult<Vec<FileMetadata>> {
        let rows = sqlx::query_as::<_, FileMetadata>(
            "SELECT file_name, file_path, table_name, loaded_at, row_count, column_count, description FROM file_metadata ORDER BY loaded_at",
        )
        .fetch_all(&self.pool)
        .await
        .unwrap_or_default();

        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded_pool() -> SqlitePool {
        let pool = SqlitePool::connect("sqlite::memory:").await.unwrap();
        sqlx::query(
            "CREATE TABLE sales (id INTEGER PRIMARY KEY, total_amount REAL, sale_date TEXT, region TEXT, customer_id INTEGER REFERENCES customers(id))",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("CREATE TABLE customers (id INTEGER PRIMARY KEY, name TEXT, country TEXT)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO customers (id, name, country) VALUES (1, 'Ada', 'UK')")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO sales (total_amount, sale_date, region, customer_id) VALUES (100.0, '2024-01-01', 'EMEA', 1)",
        )
        .execute(&pool)
        .await
        .unwrap();
        pool
    }

    #[tokio::test]
    async fn refreshes_and_caches_catalog() {
        let pool = seeded_pool().await;
        let introspector = CatalogIntrospector::new(pool, 3600);

        let catalog = introspector.get_catalog().await.unwrap();
        assert_eq!(catalog.tables.len(), 2);
        assert!(catalog.get("sales").is_some());

        let sales = introspector.get_table("sales").await.unwrap().unwrap();
        assert!(sales.column("total_amount").unwrap().is_numeric());
    }

    #[tokio::test]
    async fn related_tables_follows_foreign_keys_both_ways() {
        let pool = seeded_pool().await;
        let introspector = CatalogIntrospector::new(pool, 3600);
        introspector.get_catalog().await.unwrap();

        let related = introspector.related_tables("sales").await.unwrap();
        assert!(related.contains(&"customers".to_string()));

        let related_back = introspector.related_tables("customers").await.unwrap();
        assert!(related_back.contains(&"sales".to_string()));
    }

    #[tokio::test]
    async fn invalidate_forces_reload() {
        let pool = seeded_pool().await;
        let introspector = CatalogIntrospector::new(pool, 3600);
        introspector.get_catalog().await.unwrap();
        introspector.invalidate();
        let catalog = introspector.get_catalog().await.unwrap();
        assert_eq!(catalog.tables.len(), 2);
    }
}
