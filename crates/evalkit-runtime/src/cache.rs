//! Caching layer for judge scores.
//!
//! Re-running a dataset against the same candidate often produces identical
//! `(task, input, candidate, reference, rubric)` tuples. Caching their scores saves
//! judge calls. Only successful scores are stored.

use moka::future::Cache;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::time::Duration;

/// Cache key for one judge call.
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq)]
pub struct ScoreKey(u64);

impl ScoreKey {
    pub fn new(
        task: &str,
        input: &str,
        candidate: &str,
        reference: Option<&str>,
        rubric: &str,
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        task.hash(&mut hasher);
        input.hash(&mut hasher);
        candidate.hash(&mut hasher);
        reference.hash(&mut hasher);
        rubric.hash(&mut hasher);
        Self(hasher.finish())
    }
}

/// Judge score cache using moka.
#[derive(Clone)]
pub struct ScoreCache {
    cache: Cache<ScoreKey, f64>,
}

impl ScoreCache {
    pub fn new(max_entries: u64, ttl: Duration) -> Self {
        let cache = Cache::builder()
            .max_capacity(max_entries)
            .time_to_live(ttl)
            .build();

        Self { cache }
    }

    pub async fn get(&self, key: &ScoreKey) -> Option<f64> {
        self.cache.get(key).await
    }

    pub async fn insert(&self, key: ScoreKey, score: f64) {
        self.cache.insert(key, score).await;
    }

    pub fn invalidate_all(&self) {
        self.cache.invalidate_all();
    }

    /// Approximate; moka updates counts lazily.
    pub fn entry_count(&self) -> u64 {
        self.cache.entry_count()
    }
}

impl Default for ScoreCache {
    fn default() -> Self {
        Self::new(10_000, Duration::from_secs(3600))
    }
}

impl std::fmt::Debug for ScoreCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScoreCache")
            .field("entry_count", &self.cache.entry_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_cache_operations() {
        let cache = ScoreCache::default();
        let key = ScoreKey::new(
            "grammar_correction",
            "She have a book.",
            "She has a book.",
            Some("She has a book."),
            "rubric",
        );

        assert_eq!(cache.get(&key).await, None);
        cache.insert(key, 0.9).await;
        assert_eq!(cache.get(&key).await, Some(0.9));

        cache.invalidate_all();
        assert_eq!(cache.get(&key).await, None);
    }

    #[test]
    fn test_key_separates_fields() {
        let a = ScoreKey::new("qa", "ab", "c", None, "r");
        let b = ScoreKey::new("qa", "a", "bc", None, "r");
        assert_ne!(a, b);

        let with_ref = ScoreKey::new("qa", "a", "b", Some(""), "r");
        let without_ref = ScoreKey::new("qa", "a", "b", None, "r");
        assert_ne!(with_ref, without_ref);

        assert_ne!(
            ScoreKey::new("qa", "a", "b", None, "r"),
            ScoreKey::new("summarization", "a", "b", None, "r")
        );

        assert_eq!(
            ScoreKey::new("qa", "a", "b", Some("c"), "r"),
            ScoreKey::new("qa", "a", "b", Some("c"), "r")
        );
    }
}
