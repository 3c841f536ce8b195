//! Bounded lookup-result cache
//!
//! A fixed-capacity cache in front of the range store, keyed by
//! (backing index name, ip string). Negative lookups are stored as an
//! explicit empty mapping rather than an absence marker, so they are
//! cache hits too. Eviction is least-recently-used, delegated to the
//! `lru` container.
//!
//! Concurrent misses for the same key are not deduplicated: results are
//! idempotent and the race resolves to last-write-wins, so duplicate loads
//! cost a round trip but never correctness.

use crate::error::{GeoError, Result};
use crate::store::GeoAttributes;
use lru::LruCache;
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Compound cache key with value-equality semantics
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// Backing index name (datasource-scoped, changes across refreshes)
    pub index_name: String,
    /// IP string as queried
    pub ip: String,
}

/// Fixed-capacity (index, ip) -> attributes cache
pub struct BoundedGeoCache {
    cache: Mutex<LruCache<CacheKey, GeoAttributes>>,
}

impl BoundedGeoCache {
    /// Create a cache with the given capacity
    pub fn new(capacity: usize) -> Result<Self> {
        let capacity = NonZeroUsize::new(capacity).ok_or_else(|| {
            GeoError::InvalidArgument("cache capacity must be positive".to_string())
        })?;
        Ok(Self {
            cache: Mutex::new(LruCache::new(capacity)),
        })
    }

    /// Return the cached attributes for (index, ip), or run the loader and
    /// cache its result.
    ///
    /// The loader runs synchronously on the calling thread, outside the
    /// cache lock. An absent result is normalized to an empty mapping
    /// before caching so negative lookups hit on subsequent calls.
    pub fn get_or_load<F>(&self, index_name: &str, ip: &str, loader: F) -> Result<GeoAttributes>
    where
        F: FnOnce(&str) -> Result<Option<GeoAttributes>>,
    {
        let key = CacheKey {
            index_name: index_name.to_string(),
            ip: ip.to_string(),
        };
        if let Some(hit) = self.cache.lock().unwrap().get(&key) {
            return Ok(hit.clone());
        }
        let loaded = loader(ip)?.unwrap_or_default();
        self.cache.lock().unwrap().put(key, loaded.clone());
        Ok(loaded)
    }

    /// Return the cached attributes without loading on a miss
    pub fn get(&self, index_name: &str, ip: &str) -> Option<GeoAttributes> {
        let key = CacheKey {
            index_name: index_name.to_string(),
            ip: ip.to_string(),
        };
        self.cache.lock().unwrap().get(&key).cloned()
    }

    /// Insert or replace an entry
    pub fn put(&self, index_name: &str, ip: &str, attributes: GeoAttributes) {
        let key = CacheKey {
            index_name: index_name.to_string(),
            ip: ip.to_string(),
        };
        self.cache.lock().unwrap().put(key, attributes);
    }

    /// Replace the bounded container with one of the new capacity, copying
    /// live entries best-effort up to the new limit.
    ///
    /// The copy is an optimization, not a correctness requirement: entries
    /// past the new capacity are dropped with no particular eviction-order
    /// guarantee. The container is swapped wholesale under the lock, so
    /// interleaved readers see either the old or the new cache, never a
    /// partially migrated one.
    pub fn update_capacity(&self, new_max: usize) -> Result<()> {
        let capacity = NonZeroUsize::new(new_max).ok_or_else(|| {
            GeoError::InvalidArgument("cache capacity must be positive".to_string())
        })?;
        let mut guard = self.cache.lock().unwrap();
        let mut fresh = LruCache::new(capacity);
        for (key, value) in guard.iter() {
            if fresh.len() == new_max {
                break;
            }
            fresh.put(key.clone(), value.clone());
        }
        *guard = fresh;
        Ok(())
    }

    /// Current number of cached entries
    pub fn len(&self) -> usize {
        self.cache.lock().unwrap().len()
    }

    /// True when the cache holds no entries
    pub fn is_empty(&self) -> bool {
        self.cache.lock().unwrap().is_empty()
    }
}
