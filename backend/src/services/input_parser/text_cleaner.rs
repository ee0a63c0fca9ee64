//! Stage 1-2: clean and validate (§4.4 steps 1-2).
//!
//! Grounded on `original_source/input_parser_agent/tools/text_cleaner.py`:
//! vocabulary sets, typo dictionary, and confidence weights (0.4 intent /
//! 0.4 entity / 0.2 time) are carried verbatim since `spec.md` describes
//! the same shape without giving exact weights.

use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{HashMap, HashSet};

use crate::models::{CleanedPrompt, PrimaryIntent};

static PUNCTUATION_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\w\s\-/]").unwrap());
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());

static INTENT_KEYWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "show", "display", "chart", "graph", "plot", "visualization", "viz", "analyze", "analysis", "compare",
        "comparison", "trend", "trends", "breakdown", "break", "view", "see", "present", "examine",
    ]
    .into_iter()
    .collect()
});

static BUSINESS_VOCABULARY: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "sales", "revenue", "income", "profit", "margin", "earnings", "customer", "client", "user", "buyer",
        "purchaser", "product", "item", "goods", "merchandise", "order", "purchase", "transaction", "buy",
        "performance", "metrics", "kpi", "results", "data",
    ]
    .into_iter()
    .collect()
});

static TIME_VOCABULARY: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "year", "yearly", "annual", "month", "monthly", "quarter", "quarterly", "day", "daily", "week", "weekly",
        "time", "period", "date", "q1", "q2", "q3", "q4", "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug",
        "sep", "oct", "nov", "dec",
    ]
    .into_iter()
    .collect()
});

static NOISE_WORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "can", "you", "please", "maybe", "could", "would", "should", "want", "need", "like", "i", "me", "we",
        "us", "my", "our", "give", "get", "find", "help", "make", "create", "generate", "a", "an", "the", "and",
        "or", "but", "in", "on", "at", "for", "of", "with", "some", "any", "all", "each", "every", "this",
        "that", "these", "those",
    ]
    .into_iter()
    .collect()
});

static TYPO_CORRECTIONS: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    [
        ("reveue", "revenue"),
        ("revenu", "revenue"),
        ("revinue", "revenue"),
        ("salse", "sales"),
        ("sale", "sales"),
        ("seles", "sales"),
        ("custmer", "customer"),
        ("costumer", "customer"),
        ("cutomer", "customer"),
        ("mnoth", "month"),
        ("mont", "month"),
        ("monht", "month"),
        ("quater", "quarter"),
        ("quartly", "quarterly"),
        ("margens", "margins"),
        ("margns", "margins"),
        ("custmers", "customers"),
        ("costumers", "customers"),
    ]
    .into_iter()
    .collect()
});

static INTENT_PRIORITIES: Lazy<Vec<(PrimaryIntent, &'static [&'static str])>> = Lazy::new(|| {
    vec![
        (PrimaryIntent::Show, &["chart", "graph", "plot", "visualization", "viz"]),
        (PrimaryIntent::Show, &["show", "display", "present", "view"]),
        (PrimaryIntent::Other, &["analyze", "analysis", "examine"]),
        (PrimaryIntent::Compare, &["compare", "comparison", "vs", "versus"]),
        (PrimaryIntent::Trend, &["trend", "trends"]),
        (PrimaryIntent::Distribution, &["breakdown", "break"]),
    ]
});

fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let stripped = PUNCTUATION_RE.replace_all(&lowered, " ");
    WHITESPACE_RE.replace_all(&stripped, " ").trim().to_string()
}

fn fix_typos(text: &str) -> String {
    text.split_whitespace()
        .map(|word| *TYPO_CORRECTIONS.get(word).unwrap_or(&word))
        .collect::<Vec<_>>()
        .join(" ")
}

struct WordAnalysis {
    intent_words: Vec<String>,
    entities: Vec<String>,
    time_refs: Vec<String>,
    kept_words: Vec<String>,
}

fn analyze_and_filter(text: &str) -> WordAnalysis {
    let mut analysis =
        WordAnalysis { intent_words: Vec::new(), entities: Vec::new(), time_refs: Vec::new(), kept_words: Vec::new() };

    for word in text.split_whitespace() {
        let category = if INTENT_KEYWORDS.contains(word) {
            analysis.intent_words.push(word.to_string());
            Some("intent")
        } else if BUSINESS_VOCABULARY.contains(word) {
            analysis.entities.push(word.to_string());
            Some("entity")
        } else if TIME_VOCABULARY.contains(word) {
            analysis.time_refs.push(word.to_string());
            Some("time")
        } else if NOISE_WORDS.contains(word) {
            None
        } else {
            Some("other")
        };

        if let Some(category) = category {
            if word.len() > 2 || category != "other" {
                analysis.kept_words.push(word.to_string());
            }
        }
    }

    analysis
}

fn calculate_confidence(analysis: &WordAnalysis) -> f64 {
    let intent_score = (analysis.intent_words.len() as f64 / 2.0).min(1.0);
    let entity_score = (analysis.entities.len() as f64 / 2.0).min(1.0);
    let time_score = (analysis.time_refs.len() as f64 / 1.0).min(1.0);
    intent_score * 0.4 + entity_score * 0.4 + time_score * 0.2
}

fn detect_primary_intent(analysis: &WordAnalysis) -> PrimaryIntent {
    if analysis.intent_words.is_empty() {
        return PrimaryIntent::Other;
    }

    let mut best: Option<(PrimaryIntent, usize)> = None;
    for (intent, keywords) in INTENT_PRIORITIES.iter() {
        let score = analysis.intent_words.iter().filter(|w| keywords.contains(&w.as_str())).count();
        if score > 0 && best.as_ref().map(|(_, best_score)| score > *best_score).unwrap_or(true) {
            best = Some((*intent, score));
        }
    }

    best.map(|(intent, _)| intent).unwrap_or(PrimaryIntent::Other)
}

/// Runs clean + validate in one pass (they share the same word analysis),
/// producing the [`CleanedPrompt`] that C5's later stages consume.
pub fn clean_and_validate(raw_input: &str) -> CleanedPrompt {
    let normalized = normalize(raw_input);
    let typo_corrected = fix_typos(&normalized);
    let analysis = analyze_and_filter(&typo_corrected);

    let confidence = calculate_confidence(&analysis);
    let primary_intent = if confidence > 0.0 { detect_primary_intent(&analysis) } else { PrimaryIntent::Invalid };

    CleanedPrompt {
        original: raw_input.to_string(),
        cleaned: analysis.kept_words.join(" "),
        confidence,
        primary_intent,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cleaning_is_idempotent() {
        let once = clean_and_validate("Can you show me total revenue by region please");
        let twice = clean_and_validate(&once.cleaned);
        assert_eq!(once.cleaned, twice.cleaned);
    }

    #[test]
    fn fixes_known_typos() {
        let cleaned = clean_and_validate("show me the reveue by mnoth");
        assert!(cleaned.cleaned.contains("revenue"));
        assert!(cleaned.cleaned.contains("month"));
    }

    #[test]
    fn low_confidence_prompt_fails_validation() {
        let cleaned = clean_and_validate("hello there");
        assert!(!cleaned.is_valid(0.3));
    }

    #[test]
    fn well_formed_prompt_passes_validation() {
        let cleaned = clean_and_validate("trend of monthly revenue");
        assert!(cleaned.is_valid(0.3));
        assert_eq!(cleaned.primary_intent, PrimaryIntent::Trend);
    }
}
