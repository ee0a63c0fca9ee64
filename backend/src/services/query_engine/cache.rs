//! Result cache (§4.5.5).
//!
//! Keyed by a hash over (intent_type, metric, dimension, sorted filters),
//! matching the teacher's `dashmap`-backed cache idiom seen in
//! `baseline_cache.rs`. Last-writer-wins; readers discard expired entries
//! on access rather than relying on a separate sweep.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use crate::models::{NormalizedDataset, ResolvedIntent};

struct CacheEntry {
    dataset: NormalizedDataset,
    inserted_at: DateTime<Utc>,
}

pub struct QueryCache {
    entries: DashMap<u64, CacheEntry>,
    ttl: chrono::Duration,
}

impl QueryCache {
    pub fn new(ttl_secs: u64) -> Self {
        Self { entries: DashMap::new(), ttl: chrono::Duration::seconds(ttl_secs as i64) }
    }

    pub fn key_for(intent: &ResolvedIntent) -> u64 {
        let mut hasher = DefaultHasher::new();
        format!("{:?}", intent.intent_type).hash(&mut hasher);
        intent.metric.hash(&mut hasher);
        intent.dimension.hash(&mut hasher);

        let mut filters: Vec<(String, String, String)> =
            intent.filters.iter().map(|f| (f.column.clone(), f.op.clone(), f.literal.clone())).collect();
        filters.sort();
        filters.hash(&mut hasher);

        hasher.finish()
    }

    /// Returns the cached dataset with `cache_hit` set, discarding it first
    /// if it has aged past the TTL.
    pub fn get(&self, key: u64) -> Option<NormalizedDataset> {
        let expired = match self.entries.get(&key) {
            Some(entry) => Utc::now() - entry.inserted_at > self.ttl,
            None => return None,
        };

        if expired {
            self.entries.remove(&key);
            return None;
        }

        self.entries.get(&key).map(|entry| {
            let mut dataset = entry.dataset.clone();
            dataset.cache_hit = true;
            dataset.cached_at = Some(entry.inserted_at);
            dataset
        })
    }

    /// Only `ok` datasets that were not themselves served from the cache
    /// are written, per §4.5.5.
    pub fn set(&self, key: u64, dataset: &NormalizedDataset) {
        if dataset.cache_hit {
            return;
        }
        self.entries.insert(key, CacheEntry { dataset: dataset.clone(), inserted_at: Utc::now() });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ChartConfig, DatasetSummary, IntentType};

    fn intent() -> ResolvedIntent {
        ResolvedIntent {
            intent_type: IntentType::Summary,
            metric: "sales.total_amount".to_string(),
            dimension: None,
            chart_type_hint: "bar".to_string(),
            filters: Vec::new(),
            schema_validated: true,
            primary_table: "sales".to_string(),
        }
    }

    fn dataset() -> NormalizedDataset {
        NormalizedDataset {
            rows: Vec::new(),
            column_order: Vec::new(),
            chart_config: ChartConfig { chart_type: "bar".to_string(), x_axis: None, y_axis: None, title: String::new(), limit_applied: 0 },
            summary: DatasetSummary::default(),
            cache_hit: false,
            cached_at: None,
        }
    }

    #[test]
    fn identical_intents_hash_to_the_same_key() {
        assert_eq!(QueryCache::key_for(&intent()), QueryCache::key_for(&intent()));
    }

    #[test]
    fn stored_dataset_is_returned_with_cache_hit_flagged() {
        let cache = QueryCache::new(300);
        let key = QueryCache::key_for(&intent());
        cache.set(key, &dataset());

        let hit = cache.get(key).unwrap();
        assert!(hit.cache_hit);
    }

    #[test]
    fn cache_hit_datasets_are_never_restored() {
        let cache = QueryCache::new(300);
        let mut already_hit = dataset();
        already_hit.cache_hit = true;
        cache.set(QueryCache::key_for(&intent()), &already_hit);
        assert!(cache.get(QueryCache::key_for(&intent())).is_none());
    }

    #[test]
    fn expired_entries_are_evicted_on_access() {
        let cache = QueryCache::new(0);
        let key = QueryCache::key_for(&intent());
        cache.set(key, &dataset());
        std::thread::sleep(std::time::Duration::from_millis(10));
        assert!(cache.get(key).is_none());
    }
}
