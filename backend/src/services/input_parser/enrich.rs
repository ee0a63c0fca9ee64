//! Stage 5: enrich and resolve (§4.4 step 5).
//!
//! Grounded on `original_source/input_parser_agent/tools/context_injector.py`'s
//! intent-to-chart-hint rules; the original's LLM-backed ambiguity detection
//! is folded into C3's prompt-classification responsibilities instead of
//! being duplicated here, per the Open Question decision recorded in
//! `SPEC_FULL.md`.

use crate::models::{Catalog, CleanedPrompt, FieldMapping, FilterPredicate, IntentType, MappingResult, PrimaryIntent, ResolvedIntent};

fn chart_type_hint(intent: PrimaryIntent) -> &'static str {
    match intent {
        PrimaryIntent::Trend => "line",
        PrimaryIntent::Compare => "bar",
        PrimaryIntent::Distribution => "pie",
        PrimaryIntent::Correlation => "scatter",
        PrimaryIntent::Show | PrimaryIntent::Other | PrimaryIntent::Invalid => "bar",
    }
}

fn intent_type_for(intent: PrimaryIntent) -> IntentType {
    match intent {
        PrimaryIntent::Trend => IntentType::Trend,
        PrimaryIntent::Compare => IntentType::Comparison,
        _ => IntentType::Summary,
    }
}

/// A field mapping is usable as the metric when it names a real column
/// (not a bare table wildcard).
fn is_column_mapping(mapping: &FieldMapping) -> bool {
    mapping.column != "*"
}

/// A mapping names a numeric column per the catalog's declared type; an
/// unresolvable table/column (shouldn't happen for a mapping the field
/// mapper itself produced) is treated as non-numeric.
fn is_numeric_mapping(catalog: &Catalog, mapping: &FieldMapping) -> bool {
    catalog.get(&mapping.table).and_then(|t| t.column(&mapping.column)).map(|c| c.is_numeric()).unwrap_or(false)
}

/// Picks the metric and dimension from the field mapper's output, then
/// combines them with the validated prompt's primary intent into a
/// [`ResolvedIntent`]. The metric is the highest-confidence mapping onto a
/// numeric column — a measure like `total_amount`, not a categorical field
/// like `region` — falling back to the highest-confidence mapping overall
/// when nothing numeric was found; the dimension is the next
/// highest-confidence mapping with a distinct column path. Returns `None`
/// when no column mapping exists to anchor a metric on — the caller should
/// route this prompt to clarification instead.
pub fn resolve(cleaned: &CleanedPrompt, mapping: &MappingResult, catalog: &Catalog) -> Option<ResolvedIntent> {
    let mut column_mappings: Vec<&FieldMapping> = mapping.mappings.iter().filter(|m| is_column_mapping(m)).collect();
    column_mappings.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    if column_mappings.is_empty() {
        return None;
    }

    let metric_mapping = *column_mappings.iter().find(|m| is_numeric_mapping(catalog, m)).unwrap_or(&column_mappings[0]);
    let dimension_mapping = column_mappings.iter().find(|m| m.full_path() != metric_mapping.full_path());

    let primary_table = metric_mapping.table.clone();

    let filters: Vec<FilterPredicate> = Vec::new();

    Some(ResolvedIntent {
        intent_type: intent_type_for(cleaned.primary_intent),
        metric: metric_mapping.full_path(),
        dimension: dimension_mapping.map(|m| m.full_path()),
        chart_type_hint: chart_type_hint(cleaned.primary_intent).to_string(),
        filters,
        schema_validated: true,
        primary_table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSchema, MappingKind, TableSchema};

    fn cleaned(intent: PrimaryIntent) -> CleanedPrompt {
        CleanedPrompt { original: "x".to_string(), cleaned: "x".to_string(), confidence: 0.9, primary_intent: intent }
    }

    fn mapping_with(table: &str, column: &str, confidence: f64) -> FieldMapping {
        FieldMapping { user_term: column.to_string(), table: table.to_string(), column: column.to_string(), confidence, kind: MappingKind::Exact }
    }

    fn catalog() -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.tables.insert(
            "sales".to_string(),
            TableSchema {
                table_name: "sales".to_string(),
                columns: vec![
                    ColumnSchema { name: "total_amount".to_string(), declared_type: "REAL".to_string(), nullable: true, distinct_count: 0, non_null_count: 0 },
                    ColumnSchema { name: "region".to_string(), declared_type: "TEXT".to_string(), nullable: true, distinct_count: 0, non_null_count: 0 },
                ],
                foreign_keys: Vec::new(),
                row_count: 0,
            },
        );
        catalog
    }

    #[test]
    fn picks_highest_confidence_column_as_metric() {
        let mapping = MappingResult {
            mappings: vec![mapping_with("sales", "region", 0.6), mapping_with("sales", "total_amount", 0.95)],
            confidence: 0.77,
            suggested_tables: vec!["sales".to_string()],
            unmapped_terms: Vec::new(),
        };
        let resolved = resolve(&cleaned(PrimaryIntent::Trend), &mapping, &catalog()).unwrap();
        assert_eq!(resolved.metric, "sales.total_amount");
        assert_eq!(resolved.dimension.as_deref(), Some("sales.region"));
        assert_eq!(resolved.chart_type_hint, "line");
        assert_eq!(resolved.intent_type, IntentType::Trend);
    }

    #[test]
    fn no_column_mapping_yields_none() {
        let mapping = MappingResult {
            mappings: vec![FieldMapping { user_term: "sales".to_string(), table: "sales".to_string(), column: "*".to_string(), confidence: 1.0, kind: MappingKind::Exact }],
            confidence: 1.0,
            suggested_tables: vec!["sales".to_string()],
            unmapped_terms: Vec::new(),
        };
        assert!(resolve(&cleaned(PrimaryIntent::Show), &mapping, &catalog()).is_none());
    }
}
