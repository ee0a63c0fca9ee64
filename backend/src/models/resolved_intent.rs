use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum IntentType {
    Summary,
    Comparison,
    Trend,
}

/// A single equality filter predicate: `column = literal`.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FilterPredicate {
    pub column: String,
    pub op: String,
    pub literal: String,
}

/// Structured query specification handed from C5 (Input Parser) to C4
/// (Query Engine). Never shown to the LLM.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ResolvedIntent {
    pub intent_type: IntentType,
    pub metric: String,
    pub dimension: Option<String>,
    pub chart_type_hint: String,
    pub filters: Vec<FilterPredicate>,
    pub schema_validated: bool,
    /// Table the metric/dimension were resolved against; needed by the SQL
    /// builder's join-graph selection.
    pub primary_table: String,
}
