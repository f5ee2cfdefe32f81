//! Query result cache
//!
//! Results are keyed by a hash of the canonical serialization of the
//! `Query`. Entries carry a TTL and are invalidated lazily: an expired entry
//! is deleted when it is looked up, never by a sweeper. Node mutations do not
//! invalidate entries; staleness is bounded by the TTL.

use crate::executor::Row;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::debug;
use trellis_core::{Error, Result};
use trellis_query::Query;

/// Compute the cache key for a query.
///
/// The clause maps inside `Query` are BTreeMaps, so the JSON serialization is
/// canonical and the hash is stable for equal queries.
pub fn cache_key(query: &Query) -> Result<u64> {
    let canonical = serde_json::to_string(query)
        .map_err(|e| Error::Internal(format!("failed to serialize query for cache key: {e}")))?;
    Ok(xxhash_rust::xxh3::xxh3_64(canonical.as_bytes()))
}

struct CacheEntry {
    rows: Vec<Row>,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.duration_since(self.stored_at) >= self.ttl
    }
}

/// TTL-bounded result cache
pub struct QueryCache {
    entries: HashMap<u64, CacheEntry>,
    ttl: Duration,
    hits: u64,
    misses: u64,
}

impl QueryCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: HashMap::new(),
            ttl,
            hits: 0,
            misses: 0,
        }
    }

    /// Look up a live entry; expired entries are deleted here.
    pub fn get(&mut self, key: u64) -> Option<Vec<Row>> {
        let now = Instant::now();
        match self.entries.get(&key) {
            Some(entry) if entry.is_expired(now) => {
                self.entries.remove(&key);
                self.misses += 1;
                debug!(key, "cache entry expired");
                None
            }
            Some(entry) => {
                self.hits += 1;
                Some(entry.rows.clone())
            }
            None => {
                self.misses += 1;
                None
            }
        }
    }

    /// Store a result under the given key with the configured TTL
    pub fn put(&mut self, key: u64, rows: Vec<Row>) {
        self.entries.insert(
            key,
            CacheEntry {
                rows,
                stored_at: Instant::now(),
                ttl: self.ttl,
            },
        );
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn misses(&self) -> u64 {
        self.misses
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread::sleep;

    fn row() -> Row {
        Row::Aggregate(trellis_core::Properties::with("n", 1i64))
    }

    #[test]
    fn test_hit_within_ttl() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.put(1, vec![row()]);
        assert_eq!(cache.get(1), Some(vec![row()]));
        assert_eq!(cache.hits(), 1);
    }

    #[test]
    fn test_lazy_expiry_on_read() {
        let mut cache = QueryCache::new(Duration::from_millis(5));
        cache.put(1, vec![row()]);
        sleep(Duration::from_millis(15));

        // The entry is still stored until the lookup touches it
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(1), None);
        assert_eq!(cache.len(), 0);
        assert_eq!(cache.misses(), 1);
    }

    #[test]
    fn test_key_is_stable_and_discriminating() {
        let a = Query::fetch("user").with_where("status", "active");
        let b = Query::fetch("user").with_where("status", "active");
        let c = Query::fetch("user").with_where("status", "inactive");

        assert_eq!(cache_key(&a).unwrap(), cache_key(&b).unwrap());
        assert_ne!(cache_key(&a).unwrap(), cache_key(&c).unwrap());
    }

    #[test]
    fn test_clear() {
        let mut cache = QueryCache::new(Duration::from_secs(60));
        cache.put(1, vec![row()]);
        cache.clear();
        assert!(cache.is_empty());
    }
}
