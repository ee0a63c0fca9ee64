//! Stage 4: map fields (§4.4 step 4).
//!
//! Grounded on `original_source/input_parser_agent/tools/field_mapper.py`'s
//! exact/fuzzy/semantic strategy combination. Fuzzy similarity uses
//! `strsim::normalized_levenshtein` in place of the original's
//! `difflib.SequenceMatcher.ratio()` — the closest idiomatic Rust
//! equivalent to a normalized edit-based similarity ratio — at the same
//! 0.6 threshold with a 0.7 substring-containment bump.

use once_cell::sync::Lazy;
use std::collections::{HashMap, HashSet};

use crate::models::{Catalog, FieldMapping, MappingKind, MappingResult};

const FUZZY_THRESHOLD: f64 = 0.6;
const SUBSTRING_BUMP: f64 = 0.7;
const SEMANTIC_CONFIDENCE: f64 = 0.8;

static STOP_WORDS: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["show", "me", "get", "find", "the", "by", "of", "and", "or", "in", "on", "at", "to", "for"].into_iter().collect());

static SYNONYMS: Lazy<HashMap<&'static str, &'static [&'static str]>> = Lazy::new(|| {
    [
        ("revenue", &["sales", "income", "earnings", "money", "amount"][..]),
        ("customer", &["client", "user", "buyer", "purchaser"][..]),
        ("product", &["item", "goods", "merchandise"][..]),
        ("date", &["time", "when", "period"][..]),
        ("quantity", &["amount", "count", "number", "qty"][..]),
        ("price", &["cost", "value", "rate"][..]),
        ("country", &["region", "location", "area", "territory"][..]),
        ("name", &["title", "label", "identifier"][..]),
        ("email", &["contact", "address"][..]),
        ("category", &["type", "kind", "group", "class"][..]),
    ]
    .into_iter()
    .collect()
});

fn extract_terms(user_input: &str) -> Vec<String> {
    user_input
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty() && w.len() > 2 && !STOP_WORDS.contains(w))
        .map(|w| w.to_string())
        .collect()
}

fn similarity(a: &str, b: &str) -> f64 {
    let (a, b) = (a.to_lowercase(), b.to_lowercase());
    if a == b {
        return 1.0;
    }
    let mut ratio = strsim::normalized_levenshtein(&a, &b);
    if a.contains(&b) || b.contains(&a) {
        ratio = ratio.max(SUBSTRING_BUMP);
    }
    ratio
}

fn find_exact_matches(catalog: &Catalog, terms: &[String]) -> Vec<FieldMapping> {
    let mut mappings = Vec::new();
    for term in terms {
        let term_lower = term.to_lowercase();
        for schema in catalog.tables.values() {
            if term_lower == schema.table_name.to_lowercase() || term_lower == schema.table_name.trim_end_matches('s').to_lowercase() {
                mappings.push(FieldMapping { user_term: term.clone(), table: schema.table_name.clone(), column: "*".to_string(), confidence: 1.0, kind: MappingKind::Exact });
            }
            for column in &schema.columns {
                let col_spaced = column.name.replace('_', " ").to_lowercase();
                if term_lower == column.name.to_lowercase() || term_lower == col_spaced {
                    mappings.push(FieldMapping {
                        user_term: term.clone(),
                        table: schema.table_name.clone(),
                        column: column.name.clone(),
                        confidence: 1.0,
                        kind: MappingKind::Exact,
                    });
                }
            }
        }
    }
    mappings
}

fn find_fuzzy_matches(catalog: &Catalog, terms: &[String]) -> Vec<FieldMapping> {
    let mut mappings = Vec::new();
    for term in terms {
        let mut candidates = Vec::new();
        for schema in catalog.tables.values() {
            let table_similarity = similarity(term, &schema.table_name);
            if table_similarity >= FUZZY_THRESHOLD {
                candidates.push(FieldMapping {
                    user_term: term.clone(),
                    table: schema.table_name.clone(),
                    column: "*".to_string(),
                    confidence: table_similarity,
                    kind: MappingKind::Fuzzy,
                });
            }
            for column in &schema.columns {
                let column_similarity = similarity(term, &column.name);
                if column_similarity >= FUZZY_THRESHOLD {
                    candidates.push(FieldMapping {
                        user_term: term.clone(),
                        table: schema.table_name.clone(),
                        column: column.name.clone(),
                        confidence: column_similarity,
                        kind: MappingKind::Fuzzy,
                    });
                }
            }
        }
        candidates.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));
        candidates.truncate(3);
        mappings.extend(candidates);
    }
    mappings
}

fn find_semantic_matches(catalog: &Catalog, terms: &[String]) -> Vec<FieldMapping> {
    let mut mappings = Vec::new();
    for term in terms {
        let term_lower = term.to_lowercase();
        for (canonical, synonyms) in SYNONYMS.iter() {
            if synonyms.contains(&term_lower.as_str()) || term_lower == *canonical {
                // The canonical term itself may never appear verbatim in a
                // column name (e.g. "revenue" vs "total_amount"); search the
                // whole synonym group against column names instead of just
                // the canonical word.
                let search_words: Vec<&str> = std::iter::once(*canonical).chain(synonyms.iter().copied()).collect();
                for schema in catalog.tables.values() {
                    for column in &schema.columns {
                        let column_lower = column.name.to_lowercase();
                        if search_words.iter().any(|word| column_lower.contains(word)) {
                            mappings.push(FieldMapping {
                                user_term: term.clone(),
                                table: schema.table_name.clone(),
                                column: column.name.clone(),
                                confidence: SEMANTIC_CONFIDENCE,
                                kind: MappingKind::Semantic,
                            });
                        }
                    }
                }
            }
        }
    }
    mappings
}

/// Combines all three strategies, deduplicated and kept at best-confidence
/// per (user_term, full_path), then infers related tables by following
/// foreign keys out of mapped tables.
pub fn map_fields(catalog: &Catalog, user_input: &str) -> MappingResult {
    let terms = extract_terms(user_input);

    let mut all_mappings = find_exact_matches(catalog, &terms);
    let exact_terms: HashSet<String> = all_mappings.iter().map(|m| m.user_term.clone()).collect();

    let remaining: Vec<String> = terms.iter().filter(|t| !exact_terms.contains(*t)).cloned().collect();
    if !remaining.is_empty() {
        all_mappings.extend(find_fuzzy_matches(catalog, &remaining));
    }
    all_mappings.extend(find_semantic_matches(catalog, &terms));

    let mut best_by_key: HashMap<(String, String), FieldMapping> = HashMap::new();
    for mapping in all_mappings {
        let key = (mapping.user_term.clone(), mapping.full_path());
        best_by_key
            .entry(key)
            .and_modify(|existing| {
                if mapping.confidence > existing.confidence {
                    *existing = mapping.clone();
                }
            })
            .or_insert(mapping);
    }

    let mut final_mappings: Vec<FieldMapping> = best_by_key.into_values().collect();
    final_mappings.sort_by(|a, b| b.confidence.partial_cmp(&a.confidence).unwrap_or(std::cmp::Ordering::Equal));

    let overall_confidence = if final_mappings.is_empty() {
        0.0
    } else {
        final_mappings.iter().map(|m| m.confidence).sum::<f64>() / final_mappings.len() as f64
    };

    let mut suggested_tables: Vec<String> = Vec::new();
    for mapping in &final_mappings {
        if !suggested_tables.contains(&mapping.table) {
            suggested_tables.push(mapping.table.clone());
        }
        for related in catalog.related_tables(&mapping.table) {
            if !suggested_tables.contains(&related) {
                suggested_tables.push(related);
            }
        }
    }

    let mapped_terms: HashSet<&str> = final_mappings.iter().map(|m| m.user_term.as_str()).collect();
    let unmapped_terms = terms.into_iter().filter(|t| !mapped_terms.contains(t.as_str())).collect();

    MappingResult { mappings: final_mappings, confidence: overall_confidence, suggested_tables, unmapped_terms }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSchema, ForeignKeyEdge, TableSchema};

    fn catalog() -> Catalog {
        let mut catalog = Catalog::empty();
        catalog.tables.insert(
            "sales".to_string(),
            TableSchema {
                table_name: "sales".to_string(),
                columns: vec![
                    ColumnSchema { name: "total_amount".to_string(), declared_type: "REAL".to_string(), nullable: true, distinct_count: 0, non_null_count: 0 },
                    ColumnSchema { name: "region".to_string(), declared_type: "TEXT".to_string(), nullable: true, distinct_count: 0, non_null_count: 0 },
                    ColumnSchema { name: "customer_id".to_string(), declared_type: "INTEGER".to_string(), nullable: true, distinct_count: 0, non_null_count: 0 },
                ],
                foreign_keys: vec![ForeignKeyEdge { local_column: "customer_id".to_string(), target_table: "customers".to_string(), target_column: "id".to_string() }],
                row_count: 0,
            },
        );
        catalog.tables.insert(
            "customers".to_string(),
            TableSchema { table_name: "customers".to_string(), columns: vec![ColumnSchema { name: "id".to_string(), declared_type: "INTEGER".to_string(), nullable: false, distinct_count: 0, non_null_count: 0 }], foreign_keys: Vec::new(), row_count: 0 },
        );
        catalog
    }

    #[test]
    fn exact_match_on_column_name() {
        let result = map_fields(&catalog(), "show region");
        let mapping = result.mappings.iter().find(|m| m.user_term == "region").unwrap();
        assert_eq!(mapping.kind, MappingKind::Exact);
        assert_eq!(mapping.confidence, 1.0);
    }

    #[test]
    fn semantic_match_resolves_revenue_to_total_amount() {
        let result = map_fields(&catalog(), "show revenue by region");
        let mapping = result.mappings.iter().find(|m| m.user_term == "revenue").unwrap();
        assert_eq!(mapping.column, "total_amount");
        assert_eq!(mapping.kind, MappingKind::Semantic);
    }

    #[test]
    fn infers_related_table_through_foreign_key() {
        let result = map_fields(&catalog(), "show region");
        assert!(result.suggested_tables.contains(&"sales".to_string()));
        assert!(result.suggested_tables.contains(&"customers".to_string()));
    }
}
