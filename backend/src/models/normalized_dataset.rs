use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use utoipa::ToSchema;

/// Per-column chart placement plus the chart type to render with.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChartConfig {
    pub chart_type: String,
    pub x_axis: Option<String>,
    pub y_axis: Option<String>,
    pub title: String,
    pub limit_applied: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NumericStats {
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub null_count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CategoricalStats {
    pub top_values: Vec<(String, u64)>,
}

/// Summary statistics attached to every [`NormalizedDataset`].
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct DatasetSummary {
    pub row_count: usize,
    pub col_count: usize,
    pub numeric_stats: HashMap<String, NumericStats>,
    pub categorical_stats: HashMap<String, CategoricalStats>,
    pub has_time_axis: bool,
}

/// Typed, chart-ready result set produced by C4's normalization stage
/// (§4.5.4). Numeric-looking strings are coerced to numbers; nulls in
/// metric columns become 0, nulls in categorical columns become "".
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct NormalizedDataset {
    pub rows: Vec<HashMap<String, Value>>,
    pub column_order: Vec<String>,
    pub chart_config: ChartConfig,
    pub summary: DatasetSummary,
    pub cache_hit: bool,
    pub cached_at: Option<DateTime<Utc>>,
}

impl NormalizedDataset {
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}
