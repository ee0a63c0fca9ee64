use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// How a [`FieldMapping`] entry was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum MappingKind {
    Exact,
    Fuzzy,
    Semantic,
    RelationshipInferred,
}

/// A single user-term -> database-field correspondence produced by C5's
/// field mapper. Never persisted; rebuilt per prompt.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FieldMapping {
    pub user_term: String,
    pub table: String,
    pub column: String,
    pub confidence: f64,
    pub kind: MappingKind,
}

impl FieldMapping {
    pub fn full_path(&self) -> String {
        if self.column == "*" {
            self.table.clone()
        } else {
            format!("{}.{}", self.table, self.column)
        }
    }
}

/// All mappings produced for one prompt, plus inferred related tables and
/// any user terms that mapped to nothing.
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct MappingResult {
    pub mappings: Vec<FieldMapping>,
    pub confidence: f64,
    pub suggested_tables: Vec<String>,
    pub unmapped_terms: Vec<String>,
}
