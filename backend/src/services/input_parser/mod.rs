//! Input Parser (C5): natural-language prompt -> [`ResolvedIntent`].
//!
//! Five stages run in sequence, each grounded on a distinct file under
//! `original_source/input_parser_agent/`: clean, validate, retrieve schema,
//! map fields, enrich. A prompt that fails validation or field-mapping
//! short-circuits into [`ParseOutcome::NeedsClarification`] rather than
//! propagating an error — per `spec.md` §4.4, this is an expected outcome
//! the orchestrator routes to C6, not a system failure.

mod enrich;
mod field_mapper;
mod schema_retriever;
mod text_cleaner;

use crate::models::{Catalog, CleanedPrompt, MappingResult, ResolvedIntent};

pub use schema_retriever::ScoredTable;

#[derive(Debug, Clone)]
pub enum ParseOutcome {
    Resolved(ResolvedIntent),
    NeedsClarification { reason: String, cleaned: CleanedPrompt },
}

pub struct InputParser {
    validation_threshold: f64,
}

impl InputParser {
    pub fn new(validation_threshold: f64) -> Self {
        Self { validation_threshold }
    }

    /// Runs all five stages. `catalog` drives schema retrieval and field
    /// mapping; an empty catalog degrades gracefully to "no mappings found"
    /// rather than panicking, matching `Catalog::empty()`'s semantics.
    pub fn parse(&self, raw_input: &str, catalog: &Catalog) -> ParseOutcome {
        let cleaned = text_cleaner::clean_and_validate(raw_input);

        if !cleaned.is_valid(self.validation_threshold) {
            return ParseOutcome::NeedsClarification {
                reason: format!("prompt confidence {:.2} below threshold {:.2}", cleaned.confidence, self.validation_threshold),
                cleaned,
            };
        }

        let relevant_schemas = schema_retriever::retrieve_relevant_schemas(catalog, &cleaned.cleaned);
        if relevant_schemas.is_empty() {
            return ParseOutcome::NeedsClarification { reason: "no tables matched this prompt".to_string(), cleaned };
        }

        let mapping: MappingResult = field_mapper::map_fields(catalog, &cleaned.cleaned);
        if mapping.mappings.is_empty() {
            return ParseOutcome::NeedsClarification { reason: "no columns could be mapped from this prompt".to_string(), cleaned };
        }

        match enrich::resolve(&cleaned, &mapping, catalog) {
            Some(resolved) => ParseOutcome::Resolved(resolved),
            None => ParseOutcome::NeedsClarification { reason: "no metric column could be resolved".to_string(), cleaned },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ColumnSchema, TableSchema};

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
    fn well_formed_prompt_resolves_end_to_end() {
        let parser = InputParser::new(0.3);
        match parser.parse("show total revenue by region", &catalog()) {
            ParseOutcome::Resolved(resolved) => {
                assert_eq!(resolved.metric, "sales.total_amount");
                assert_eq!(resolved.dimension.as_deref(), Some("sales.region"));
            }
            ParseOutcome::NeedsClarification { reason, .. } => panic!("expected resolution, got clarification: {reason}"),
        }
    }

    #[test]
    fn low_confidence_prompt_needs_clarification() {
        let parser = InputParser::new(0.3);
        match parser.parse("hello there", &catalog()) {
            ParseOutcome::NeedsClarification { .. } => {}
            ParseOutcome::Resolved(_) => panic!("expected clarification"),
        }
    }

    #[test]
    fn empty_catalog_needs_clarification() {
        let parser = InputParser::new(0.3);
        match parser.parse("show total revenue by region", &Catalog::empty()) {
            ParseOutcome::NeedsClarification { .. } => {}
            ParseOutcome::Resolved(_) => panic!("expected clarification"),
        }
    }
}
