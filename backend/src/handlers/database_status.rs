use axum::{Json, extract::State};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::AppState;
use crate::utils::ApiResult;

#[derive(Debug, Serialize, ToSchema)]
pub struct TableStatus {
    pub table_name: String,
    pub file_name: Option<String>,
    pub row_count: i64,
    pub column_count: usize,
    pub columns: Vec<String>,
    pub loaded_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct DatabaseStatusResponse {
    pub total_tables: usize,
    pub tables: Vec<TableStatus>,
    pub database_path: String,
}

/// Joins the catalog's live schema view against the `file_metadata`
/// sidecar so each table is shown with the source file it was ingested
/// from, when known.
#[utoipa::path(
    get,
    path = "/database-status",
    responses((status = 200, description = "Catalog and ingestion summary", body = DatabaseStatusResponse)),
    tag = "Catalog"
)]
pub async fn database_status(State(state): State<Arc<AppState>>) -> ApiResult<Json<DatabaseStatusResponse>> {
    let catalog = state.catalog.get_catalog().await?;
    let files = state.catalog.list_loaded_files().await?;

    let tables: Vec<TableStatus> = catalog
        .tables
        .values()
        .map(|schema| {
            let file = files.iter().find(|f| f.table_name == schema.table_name);
            TableStatus {
                table_name: schema.table_name.clone(),
                file_name: file.map(|f| f.file_name.clone()),
                row_count: schema.row_count,
                column_count: schema.columns.len(),
                columns: schema.column_names().map(|s| s.to_string()).collect(),
                loaded_at: file.map(|f| f.loaded_at),
            }
        })
        .collect();

    Ok(Json(DatabaseStatusResponse {
        total_tables: tables.len(),
        tables,
        database_path: state.config.pipeline.database_path.clone(),
    }))
}
