use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// A joined-table graph: the anchor table plus zero or more LEFT JOINs onto
/// related tables along a known foreign-key path.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct JoinEdge {
    pub table: String,
    pub on_left: String,
    pub on_right: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct FromGraph {
    pub anchor_table: String,
    pub joins: Vec<JoinEdge>,
}

/// Deterministic intermediate plan derived from [`ResolvedIntent`] +
/// [`Catalog`](crate::models::Catalog); the single source the SQL builder
/// renders to text.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct SQLPlan {
    pub select_list: Vec<String>,
    pub from_graph: FromGraph,
    pub group_by: Vec<String>,
    pub order_by: Vec<String>,
    pub limit: u32,
    pub where_predicates: Vec<String>,
}
