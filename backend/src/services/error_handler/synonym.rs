//! Field synonym mapping (supports §4.6 step 6's schema-error recovery).
//!
//! Grounded on `original_source/error_handler_agent/tools/synonym_mapper.py`'s
//! `SynonymMapper`: a reverse index from every synonym (and the base term
//! itself) back to its base term, built once at construction, then three
//! lookup strategies tried in order against the available fields.

use once_cell::sync::Lazy;
use std::collections::HashMap;

static FIELD_SYNONYMS: Lazy<Vec<(&'static str, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        ("revenue", &["sales", "income", "earnings", "total_amount", "turnover"]),
        ("customer", &["client", "buyer", "user", "account", "patron"]),
        ("product", &["item", "sku", "goods", "merchandise", "article"]),
        ("date", &["time", "timestamp", "day", "period", "when"]),
        ("region", &["area", "territory", "zone", "location", "market"]),
        ("quantity", &["qty", "count", "amount", "volume", "units"]),
        ("price", &["cost", "rate", "value", "fee", "charge"]),
    ]
});

pub struct SynonymMapper {
    reverse_map: HashMap<String, String>,
}

impl SynonymMapper {
    pub fn new() -> Self {
        let mut reverse_map = HashMap::new();
        for (base, synonyms) in FIELD_SYNONYMS.iter() {
            reverse_map.insert(base.to_string(), base.to_string());
            for synonym in *synonyms {
                reverse_map.insert(synonym.to_string(), base.to_string());
            }
        }
        Self { reverse_map }
    }

    /// Tries, in order: direct case-insensitive equality against an
    /// available field, then a synonym-group lookup (the missing field's
    /// base term, or any of its synonyms, matched against each available
    /// field's own base term), then substring containment. `None` if
    /// nothing matches.
    pub fn find_mapping(&self, missing_field: &str, available_fields: &[String]) -> Option<String> {
        let missing_lower = missing_field.to_lowercase();

        if let Some(exact) = available_fields.iter().find(|f| f.to_lowercase() == missing_lower) {
            return Some(exact.clone());
        }

        if let Some(base) = self.reverse_map.get(&missing_lower) {
            for field in available_fields {
                let field_lower = field.to_lowercase();
                if let Some(field_base) = self.reverse_map.get(&field_lower) {
                    if field_base == base {
                        return Some(field.clone());
                    }
                }
            }
        }

        available_fields.iter().find(|f| {
            let field_lower = f.to_lowercase();
            field_lower.contains(&missing_lower) || missing_lower.contains(&field_lower)
        }).cloned()
    }
}

impl Default for SynonymMapper {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn direct_case_insensitive_match_wins_first() {
        let mapper = SynonymMapper::new();
        let fields = vec!["Revenue".to_string(), "sales".to_string()];
        assert_eq!(mapper.find_mapping("revenue", &fields), Some("Revenue".to_string()));
    }

    #[test]
    fn synonym_group_resolves_sales_to_revenue_base_term() {
        let mapper = SynonymMapper::new();
        let fields = vec!["total_amount".to_string(), "region".to_string()];
        assert_eq!(mapper.find_mapping("sales", &fields), Some("total_amount".to_string()));
    }

    #[test]
    fn substring_fallback_catches_unrelated_terms() {
        let mapper = SynonymMapper::new();
        let fields = vec!["customer_country".to_string()];
        assert_eq!(mapper.find_mapping("country", &fields), Some("customer_country".to_string()));
    }

    #[test]
    fn no_match_returns_none() {
        let mapper = SynonymMapper::new();
        let fields = vec!["unrelated_column".to_string()];
        assert_eq!(mapper.find_mapping("revenue", &fields), None);
    }
}
