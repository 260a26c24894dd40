//! Aggregate cache storage.
//!
//! One LRU map keyed by [`CacheKey`], holding JSON-shaped aggregates
//! (card documents, review queues, quiz sets, overviews). Writes never
//! touch this store directly; the invalidation middleware drops stale
//! entries after successful mutations and reads repopulate them.

use std::sync::{RwLock, RwLockWriteGuard};

use lru::LruCache;
use metrics::counter;
use serde_json::Value;
use tracing::warn;

use super::config::CacheConfig;
use super::keys::CacheKey;

pub(crate) const METRIC_HIT: &str = "mnemo_cache_hit_total";
pub(crate) const METRIC_MISS: &str = "mnemo_cache_miss_total";
pub(crate) const METRIC_EVICT: &str = "mnemo_cache_evict_total";
pub(crate) const METRIC_INVALIDATED: &str = "mnemo_cache_invalidated_total";

pub struct AggregateStore {
    aggregates: RwLock<LruCache<CacheKey, Value>>,
}

impl AggregateStore {
    pub fn new(config: &CacheConfig) -> Self {
        Self {
            aggregates: RwLock::new(LruCache::new(config.aggregate_limit_non_zero())),
        }
    }

    /// Fetch an aggregate, bumping its LRU position.
    pub fn get(&self, key: &CacheKey) -> Option<Value> {
        let found = self.write_guard("get").get(key).cloned();
        match &found {
            Some(_) => counter!(METRIC_HIT, "partition" => key.partition()).increment(1),
            None => counter!(METRIC_MISS, "partition" => key.partition()).increment(1),
        }
        found
    }

    /// Store an aggregate, recording a capacity eviction if one occurs.
    /// Overwriting an existing key is not an eviction.
    pub fn put(&self, key: CacheKey, value: Value) {
        let displaced = self.write_guard("put").push(key.clone(), value);
        if let Some((evicted, _)) = displaced
            && evicted != key
        {
            counter!(METRIC_EVICT, "partition" => evicted.partition()).increment(1);
        }
    }

    /// Drop one aggregate. Returns whether an entry was present.
    pub fn invalidate(&self, key: &CacheKey) -> bool {
        let dropped = self.write_guard("invalidate").pop(key).is_some();
        if dropped {
            counter!(METRIC_INVALIDATED, "partition" => key.partition()).increment(1);
        }
        dropped
    }

    /// Drop every cached aggregate.
    pub fn clear(&self) {
        self.write_guard("clear").clear();
    }

    pub fn len(&self) -> usize {
        self.write_guard("len").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Acquire the write guard, recovering from poisoning. A panic in
    /// another thread may leave a stale entry behind; stale cache data is
    /// tolerable, a permanently wedged cache is not.
    fn write_guard(&self, op: &'static str) -> RwLockWriteGuard<'_, LruCache<CacheKey, Value>> {
        match self.aggregates.write() {
            Ok(guard) => guard,
            Err(poisoned) => {
                warn!(
                    op,
                    target_module = "cache::store",
                    result = "poisoned_recovered",
                    "Recovered from poisoned aggregate store lock"
                );
                poisoned.into_inner()
            }
        }
    }
}
