//! Descriptive Index (C2).
//!
//! A nearest-neighbor store over LLM-authored prose about tables and
//! columns, grounded on
//! `original_source/backend/knowledge_base/{chroma_manager,context_extractor,file_parser}.py`.
//! The vector store itself is an out-of-scope external collaborator
//! (`spec.md` §1); this module is the indexing/query logic that would sit
//! in front of one. The default implementation holds everything in memory
//! and does a brute-force cosine scan, which is adequate for the small
//! per-database corpora this system indexes.

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    TableDescription,
    ColumnInsight,
    BusinessContext,
    QuerySuggestions,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexedRecord {
    pub doc_id: String,
    pub file_name: String,
    pub record_type: RecordType,
    pub text: String,
    #[serde(skip_serializing, default)]
    pub embedding: Vec<f32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RetrievedRecord {
    pub record: IndexedRecordSummary,
    pub distance: f64,
    pub relevant: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct IndexedRecordSummary {
    pub doc_id: String,
    pub file_name: String,
    pub record_type: RecordType,
    pub text: String,
}

impl From<&IndexedRecord> for IndexedRecordSummary {
    fn from(r: &IndexedRecord) -> Self {
        Self { doc_id: r.doc_id.clone(), file_name: r.file_name.clone(), record_type: r.record_type, text: r.text.clone() }
    }
}

/// Produces an embedding for a piece of text. The real implementation
/// would call out to an embedding model; kept behind a trait so the index
/// itself never depends on a concrete provider.
pub trait EmbeddingProvider: Send + Sync {
    fn embed(&self, text: &str) -> Vec<f32>;
}

/// Deterministic bag-of-words embedding used when no real embedding
/// provider is configured. Good enough to exercise the index's
/// nearest-neighbor logic in tests and local runs.
pub struct HashingEmbeddingProvider {
    dims: usize,
}

impl HashingEmbeddingProvider {
    pub fn new(dims: usize) -> Self {
        Self { dims }
    }
}

impl EmbeddingProvider for HashingEmbeddingProvider {
    fn embed(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dims];
        for word in text.to_lowercase().split_whitespace() {
            let mut hasher = std::collections::hash_map::DefaultHasher::new();
            std::hash::Hash::hash(&word, &mut hasher);
            let index = (std::hash::Hasher::finish(&hasher) as usize) % self.dims;
            vector[index] += 1.0;
        }
        let norm: f32 = vector.iter().map(|v| v * v).sum::<f32>().sqrt();
        if norm > 0.0 {
            for v in &mut vector {
                *v /= norm;
            }
        }
        vector
    }
}

pub struct DescriptiveIndex {
    records: DashMap<String, IndexedRecord>,
    provider: Box<dyn EmbeddingProvider>,
    relevance_threshold: f64,
}

impl DescriptiveIndex {
    pub fn new(provider: Box<dyn EmbeddingProvider>, relevance_threshold: f64) -> Self {
        Self { records: DashMap::new(), provider, relevance_threshold }
    }

    pub fn ingest(&self, doc_id: impl Into<String>, file_name: impl Into<String>, record_type: RecordType, text: impl Into<String>) {
        let text = text.into();
        let embedding = self.provider.embed(&text);
        let doc_id = doc_id.into();
        self.records.insert(
            doc_id.clone(),
            IndexedRecord { doc_id, file_name: file_name.into(), record_type, text, embedding },
        );
    }

    pub fn get(&self, doc_id: &str) -> Option<IndexedRecord> {
        self.records.get(doc_id).map(|r| r.clone())
    }

    /// Returns the top-k records by cosine similarity, each tagged
    /// `relevant` when its distance is below the configured threshold.
    pub fn query_top_k(&self, query: &str, k: usize) -> Vec<RetrievedRecord> {
        let query_embedding = self.provider.embed(query);

        let mut scored: Vec<(f64, IndexedRecordSummary)> = self
            .records
            .iter()
            .map(|entry| {
                let similarity = cosine_similarity(&query_embedding, &entry.embedding);
                let distance = 1.0 - similarity;
                (distance, IndexedRecordSummary::from(entry.value()))
            })
            .collect();

        scored.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        scored
            .into_iter()
            .map(|(distance, record)| RetrievedRecord { relevant: distance <= self.relevance_threshold, record, distance })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)) as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index() -> DescriptiveIndex {
        DescriptiveIndex::new(Box::new(HashingEmbeddingProvider::new(64)), 0.7)
    }

    #[test]
    fn retrieves_most_similar_record_first() {
        let index = index();
        index.ingest("d1", "sales.csv", RecordType::TableDescription, "revenue and sales totals by region");
        index.ingest("d2", "customers.csv", RecordType::TableDescription, "customer names and contact emails");

        let results = index.query_top_k("show me sales revenue", 2);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].record.doc_id, "d1");
    }

    #[test]
    fn threshold_marks_irrelevant_matches() {
        let index = index();
        index.ingest("d1", "f.csv", RecordType::ColumnInsight, "totally unrelated vocabulary here");

        let results = index.query_top_k("zzz qqq xyz", 1);
        assert_eq!(results.len(), 1);
        assert!(!results[0].relevant);
    }
}
