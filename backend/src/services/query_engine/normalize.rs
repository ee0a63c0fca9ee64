//! Normalization (§4.5.4).
//!
//! Grounded on `original_source/backend/query_generation/data_processor.py`'s
//! `DataProcessor`/`ProcessedData`: type coercion, null handling, and
//! chart-config/summary defaulting.

use serde_json::Value;
use std::collections::HashMap;

use crate::models::{CategoricalStats, ChartConfig, DatasetSummary, ExecutionResult, NormalizedDataset, NumericStats};

fn parses_as_number(s: &str) -> bool {
    s.trim().parse::<f64>().is_ok()
}

fn coerce_numeric(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) if parses_as_number(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// A column is numeric when every non-null observed value coerces to a
/// number; an all-null column is treated as categorical (there's nothing
/// to coerce).
fn is_numeric_column(rows: &[HashMap<String, Value>], column: &str) -> bool {
    let mut saw_value = false;
    for row in rows {
        match row.get(column) {
            Some(Value::Null) | None => continue,
            Some(v) => {
                saw_value = true;
                if coerce_numeric(v).is_none() {
                    return false;
                }
            }
        }
    }
    saw_value
}

/// Turns a raw [`ExecutionResult`] into a typed, chart-ready
/// [`NormalizedDataset`]. `chart_type_hint` is the builder/resolver's
/// suggestion; it is used unless the data itself forces a different
/// default (no numeric columns, or several numerics with no category to
/// group by).
pub fn normalize(result: &ExecutionResult, chart_type_hint: &str) -> NormalizedDataset {
    let column_order = result.column_order.clone();
    let numeric_columns: Vec<String> = column_order.iter().filter(|c| is_numeric_column(&result.rows, c)).cloned().collect();
    let categorical_columns: Vec<String> = column_order.iter().filter(|c| !numeric_columns.contains(c)).cloned().collect();

    let rows: Vec<HashMap<String, Value>> = result
        .rows
        .iter()
        .map(|row| {
            let mut normalized_row = HashMap::new();
            for column in &column_order {
                let raw = row.get(column).cloned().unwrap_or(Value::Null);
                let is_null = matches!(raw, Value::Null);
                let value = if numeric_columns.contains(column) {
                    if is_null {
                        Value::from(0)
                    } else {
                        coerce_numeric(&raw).map(|n| serde_json::json!(n)).unwrap_or(Value::from(0))
                    }
                } else if is_null {
                    Value::String(String::new())
                } else {
                    raw
                };
                normalized_row.insert(column.clone(), value);
            }
            normalized_row
        })
        .collect();

    let x_axis = categorical_columns.first().cloned().or_else(|| column_order.first().cloned());
    let y_axis = numeric_columns.first().cloned();

    let chart_type = if numeric_columns.is_empty() {
        "table".to_string()
    } else if numeric_columns.len() >= 2 && categorical_columns.is_empty() {
        "scatter".to_string()
    } else if chart_type_hint.is_empty() {
        "bar".to_string()
    } else {
        chart_type_hint.to_string()
    };

    let chart_config = ChartConfig {
        chart_type,
        x_axis,
        y_axis,
        title: String::new(),
        limit_applied: rows.len() as u32,
    };

    let mut numeric_stats = HashMap::new();
    for column in &numeric_columns {
        let mut values = Vec::new();
        let mut null_count = 0u64;
        for row in &result.rows {
            match row.get(column) {
                Some(Value::Null) | None => null_count += 1,
                Some(v) => {
                    if let Some(n) = coerce_numeric(v) {
                        values.push(n);
                    }
                }
            }
        }
        let (min, max, mean) = if values.is_empty() {
            (0.0, 0.0, 0.0)
        } else {
            let min = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let max = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            let mean = values.iter().sum::<f64>() / values.len() as f64;
            (min, max, mean)
        };
        numeric_stats.insert(column.clone(), NumericStats { min, max, mean, null_count });
    }

    let mut categorical_stats = HashMap::new();
    for column in categorical_columns.iter().take(3) {
        let mut counts: HashMap<String, u64> = HashMap::new();
        for row in &result.rows {
            let key = match row.get(column) {
                Some(Value::Null) | None => String::new(),
                Some(Value::String(s)) => s.clone(),
                Some(v) => v.to_string(),
            };
            *counts.entry(key).or_insert(0) += 1;
        }
        let mut top_values: Vec<(String, u64)> = counts.into_iter().collect();
        top_values.sort_by(|a, b| b.1.cmp(&a.1));
        top_values.truncate(3);
        categorical_stats.insert(column.clone(), CategoricalStats { top_values });
    }

    let has_time_axis = column_order.iter().any(|c| {
        let lower = c.to_lowercase();
        lower.contains("date") || lower.contains("time")
    });

    let summary = DatasetSummary {
        row_count: rows.len(),
        col_count: column_order.len(),
        numeric_stats,
        categorical_stats,
        has_time_axis,
    };

    NormalizedDataset { rows, column_order, chart_config, summary, cache_hit: false, cached_at: None }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn row(pairs: &[(&str, Value)]) -> HashMap<String, Value> {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn coerces_numeric_strings_and_nulls_metric_to_zero() {
        let result = ExecutionResult {
            rows: vec![row(&[("region", Value::String("EMEA".into())), ("value", Value::String("150".into()))]), row(&[("region", Value::Null), ("value", Value::Null)])],
            column_order: vec!["region".to_string(), "value".to_string()],
            elapsed: Duration::default(),
            row_count: 2,
            ok: true,
            error: None,
        };
        let dataset = normalize(&result, "bar");
        assert_eq!(dataset.rows[0]["value"], serde_json::json!(150.0));
        assert_eq!(dataset.rows[1]["value"], serde_json::json!(0.0));
        assert_eq!(dataset.rows[1]["region"], Value::String(String::new()));
    }

    #[test]
    fn no_numeric_columns_defaults_chart_type_to_table() {
        let result = ExecutionResult {
            rows: vec![row(&[("name", Value::String("Ada".into()))])],
            column_order: vec!["name".to_string()],
            elapsed: Duration::default(),
            row_count: 1,
            ok: true,
            error: None,
        };
        let dataset = normalize(&result, "bar");
        assert_eq!(dataset.chart_config.chart_type, "table");
    }

    #[test]
    fn zero_rows_still_populates_chart_config() {
        let result = ExecutionResult { rows: Vec::new(), column_order: vec!["value".to_string()], elapsed: Duration::default(), row_count: 0, ok: true, error: None };
        let dataset = normalize(&result, "bar");
        assert_eq!(dataset.summary.row_count, 0);
        assert!(!dataset.chart_config.chart_type.is_empty());
    }

    #[test]
    fn has_time_axis_detects_date_named_columns() {
        let result = ExecutionResult {
            rows: vec![row(&[("sale_date", Value::String("2024-01".into())), ("value", Value::from(10))])],
            column_order: vec!["sale_date".to_string(), "value".to_string()],
            elapsed: Duration::default(),
            row_count: 1,
            ok: true,
            error: None,
        };
        assert!(normalize(&result, "line").summary.has_time_axis);
    }
}
