//! Stage 3: retrieve schema (§4.4 step 3).
//!
//! Grounded on `original_source/nodes/schema_retriever_node.py`'s keyword-hit
//! scoring: table-name hit weighted 0.8, column hit weighted 0.5, per
//! `spec.md`'s explicit weights.

use crate::models::Catalog;

const STOP_WORDS_MIN_LEN: usize = 2;

#[derive(Debug, Clone)]
pub struct ScoredTable {
    pub table_name: String,
    pub score: f64,
}

fn candidate_terms(cleaned_input: &str) -> Vec<String> {
    cleaned_input
        .split_whitespace()
        .filter(|w| w.len() > STOP_WORDS_MIN_LEN)
        .map(|w| w.to_lowercase())
        .collect()
}

/// Scores every table in the Catalog by keyword hits against its name and
/// its columns' names, returning the top-5 tables with score > 0. An empty
/// Catalog or no scoring hits yields an empty relevant set (§8 boundary
/// behavior).
pub fn retrieve_relevant_schemas(catalog: &Catalog, cleaned_input: &str) -> Vec<ScoredTable> {
    let terms = candidate_terms(cleaned_input);
    if terms.is_empty() {
        return Vec::new();
    }

    let mut scored: Vec<ScoredTable> = catalog
        .tables
        .values()
        .filter_map(|schema| {
            let mut score = 0.0;
            let table_name_lower = schema.table_name.to_lowercase();

            for term in &terms {
                if table_name_lower.contains(term.as_str()) {
                    score += 0.8;
                }
                for column in &schema.columns {
                    if column.name.to_lowercase().contains(term.as_str()) {
                        score += 0.5;
                    }
                }
            }

            if score > 0.0 {
                Some(ScoredTable { table_name: schema.table_name.clone(), score })
            } else {
                None
            }
        })
        .collect();

    scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(5);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSchema, TableSchema};

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
                foreign_keys: Vec::new(),
                row_count: 0,
            },
        );
        catalog
    }

    #[test]
    fn scores_table_name_hit_higher_than_column_hit() {
        let catalog = catalog_with_sales();
        let results = retrieve_relevant_schemas(&catalog, "show sales by region");
        assert_eq!(results[0].table_name, "sales");
        assert!(results[0].score >= 0.8 + 0.5);
    }

    #[test]
    fn empty_catalog_yields_empty_relevant_set() {
        let catalog = Catalog::empty();
        let results = retrieve_relevant_schemas(&catalog, "show sales by region");
        assert!(results.is_empty());
    }
}
