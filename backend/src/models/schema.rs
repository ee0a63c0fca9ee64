use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use utoipa::ToSchema;

/// One column of a [`TableSchema`].
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ColumnSchema {
    pub name: String,
    pub declared_type: String,
    pub nullable: bool,
    pub distinct_count: i64,
    pub non_null_count: i64,
}

impl ColumnSchema {
    pub fn is_numeric(&self) -> bool {
        matches!(self.declared_type.to_uppercase().as_str(), "INTEGER" | "REAL" | "NUMERIC" | "FLOAT" | "DOUBLE")
    }
}

/// A local column -> target table.column foreign-key edge.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ForeignKeyEdge {
    pub local_column: String,
    pub target_table: String,
    pub target_column: String,
}

/// Schema of a single table, as introspected by the Catalog Introspector (C1).
///
/// Invariant: column names are unique within a table; every foreign-key
/// target resolves to a known table+column or is absent.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TableSchema {
    pub table_name: String,
    pub columns: Vec<ColumnSchema>,
    pub foreign_keys: Vec<ForeignKeyEdge>,
    pub row_count: i64,
}

impl TableSchema {
    pub fn column(&self, name: &str) -> Option<&ColumnSchema> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(|c| c.name.as_str())
    }
}

/// Mapping from table name to [`TableSchema`], built lazily by C1 and
/// refreshed on TTL expiry or explicit invalidation.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct Catalog {
    pub tables: HashMap<String, TableSchema>,
    pub loaded_at: DateTime<Utc>,
}

impl Catalog {
    pub fn empty() -> Self {
        Self { tables: HashMap::new(), loaded_at: Utc::now() }
    }

    pub fn is_expired(&self, ttl: chrono::Duration) -> bool {
        Utc::now() - self.loaded_at > ttl
    }

    pub fn get(&self, table_name: &str) -> Option<&TableSchema> {
        self.tables.get(table_name)
    }

    /// Tables reachable at depth 1 through foreign-key edges, in either
    /// direction (outgoing from `table_name`, or incoming from another
    /// table that references it).
    pub fn related_tables(&self, table_name: &str) -> Vec<String> {
        let mut related = Vec::new();

        if let Some(schema) = self.tables.get(table_name) {
            for fk in &schema.foreign_keys {
                if !related.contains(&fk.target_table) {
                    related.push(fk.target_table.clone());
                }
            }
        }

        for (other_name, other_schema) in &self.tables {
            if other_name == table_name {
                continue;
            }
            if other_schema.foreign_keys.iter().any(|fk| fk.target_table == table_name)
                && !related.contains(other_name)
            {
                related.push(other_name.clone());
            }
        }

        related
    }

    pub fn search_by_column(&self, pattern: &str) -> Vec<(String, String)> {
        let pattern = pattern.to_lowercase();
        let mut hits = Vec::new();
        for (table_name, schema) in &self.tables {
            for col in &schema.columns {
                if col.name.to_lowercase().contains(&pattern) {
                    hits.push((table_name.clone(), col.name.clone()));
                }
            }
        }
        hits
    }
}

/// Row recorded in the `file_metadata` sidecar table for an ingested source
/// file. Written by the (out-of-scope) ingestion path; read by C1 to serve
/// `GET /database-status`.
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow, ToSchema)]
pub struct FileMetadata {
    pub file_name: String,
    pub file_path: String,
    pub table_name: String,
    pub loaded_at: DateTime<Utc>,
    pub row_count: i64,
    pub column_count: i64,
    pub description: Option<String>,
}
