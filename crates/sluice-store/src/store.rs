//! Generic thread-safe store with TTL expiry and bounded capacity.

use std::borrow::Borrow;
use std::hash::Hash;
use std::time::Instant;

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::{debug, trace};

use crate::config::{EvictionPolicy, StoreConfig};
use crate::error::Result;

/// Entry held by an [`ExpiringStore`].
///
/// Entries are owned exclusively by their store; readers receive clones
/// of the value, never references into the map.
#[derive(Debug, Clone)]
pub struct CacheEntry<V> {
    /// Cached value.
    pub value: V,

    /// When the entry was inserted. Expiry ages from this instant,
    /// regardless of later reads.
    pub created_at: Instant,

    /// When the entry was last returned by a read.
    pub last_accessed_at: Instant,

    /// Size charged against the store's byte budget.
    pub size_bytes: u64,
}

/// Inner state protected by the store mutex.
struct StoreInner<K: Hash + Eq, V> {
    /// Entries in recency order (most recently used first).
    entries: LruCache<K, CacheEntry<V>>,

    /// Sum of `size_bytes` across all entries.
    total_bytes: u64,
}

/// Thread-safe expiring map with count and byte budgets.
///
/// All operations are serialized on one internal mutex, held only for the
/// in-memory mutation. Expiry is lazy: a stale entry is removed the next
/// time a read or write touches the store, and is never returned.
///
/// Capacity eviction follows the configured [`EvictionPolicy`]: under
/// `Lru`, reads refresh recency; under `TtlOnly` they do not, so eviction
/// order degenerates to insertion order.
pub struct ExpiringStore<K: Hash + Eq, V> {
    inner: Mutex<StoreInner<K, V>>,
    config: StoreConfig,
}

impl<K: Hash + Eq + Clone, V> ExpiringStore<K, V> {
    /// Create a store, rejecting invalid policy parameters.
    pub fn new(config: StoreConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            inner: Mutex::new(StoreInner {
                entries: LruCache::unbounded(),
                total_bytes: 0,
            }),
            config,
        })
    }

    /// The store's policy parameters.
    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Look up a value, removing it instead if it has outlived the TTL.
    ///
    /// Under the `Lru` policy a hit refreshes recency; under `TtlOnly`
    /// the ordering is left untouched.
    pub fn get<Q>(&self, key: &Q) -> Option<V>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
        V: Clone,
    {
        let mut inner = self.inner.lock();

        let expired = match inner.entries.peek(key) {
            None => return None,
            Some(entry) => entry.created_at.elapsed() > self.config.ttl,
        };
        if expired {
            Self::remove_entry(&mut inner, key);
            trace!("entry expired on read");
            return None;
        }

        let entry = match self.config.policy {
            EvictionPolicy::Lru => inner.entries.get_mut(key),
            EvictionPolicy::TtlOnly => inner.entries.peek_mut(key),
        }?;
        entry.last_accessed_at = Instant::now();
        Some(entry.value.clone())
    }

    /// Insert a value, evicting as needed to honor the budgets.
    ///
    /// Eviction order: stale entries first, then least-recently-used while
    /// over the count bound, then least-recently-used while the byte
    /// budget would be exceeded. The byte loop stops at an empty store, so
    /// a single write larger than the whole budget is still admitted as
    /// the sole occupant. Re-putting an existing key replaces the entry.
    pub fn put(&self, key: K, value: V, size_hint: u64) {
        let mut inner = self.inner.lock();

        Self::remove_entry(&mut inner, &key);
        self.evict_expired(&mut inner);

        while inner.entries.len() >= self.config.max_count {
            Self::evict_oldest(&mut inner);
        }
        if let Some(max_bytes) = self.config.max_bytes {
            while inner.total_bytes + size_hint > max_bytes && !inner.entries.is_empty() {
                Self::evict_oldest(&mut inner);
            }
        }

        let now = Instant::now();
        inner.entries.put(
            key,
            CacheEntry {
                value,
                created_at: now,
                last_accessed_at: now,
                size_bytes: size_hint,
            },
        );
        inner.total_bytes += size_hint;
    }

    /// Remove an entry. Returns whether one was present.
    pub fn remove<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        Self::remove_entry(&mut self.inner.lock(), key).is_some()
    }

    /// Whether a live (non-expired) entry exists, without touching
    /// recency or removing stale state.
    pub fn contains<Q>(&self, key: &Q) -> bool
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.inner
            .lock()
            .entries
            .peek(key)
            .is_some_and(|entry| entry.created_at.elapsed() <= self.config.ttl)
    }

    /// Current number of entries, including any not yet reaped.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    /// Whether the store holds no entries.
    pub fn is_empty(&self) -> bool {
        self.inner.lock().entries.is_empty()
    }

    /// Drop every entry and reset the byte accounting.
    pub fn clear(&self) {
        let mut inner = self.inner.lock();
        inner.entries.clear();
        inner.total_bytes = 0;
    }

    /// Remove every stale entry. Returns how many were dropped.
    ///
    /// Lazy expiry already guarantees stale entries are never returned;
    /// this exists so owners can reclaim memory promptly.
    pub fn evict_stale(&self) -> usize {
        let mut inner = self.inner.lock();
        let before = inner.entries.len();
        self.evict_expired(&mut inner);
        before - inner.entries.len()
    }

    /// Occupancy statistics.
    pub fn stats(&self) -> StoreStats {
        let inner = self.inner.lock();
        StoreStats {
            count: inner.entries.len(),
            max_count: self.config.max_count,
            total_bytes: inner.total_bytes,
            max_bytes: self.config.max_bytes,
        }
    }

    /// Remove one entry and settle its byte accounting. Every removal in
    /// the store funnels through here.
    fn remove_entry<Q>(inner: &mut StoreInner<K, V>, key: &Q) -> Option<CacheEntry<V>>
    where
        K: Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        let entry = inner.entries.pop(key);
        if let Some(ref entry) = entry {
            inner.total_bytes = inner.total_bytes.saturating_sub(entry.size_bytes);
        }
        entry
    }

    fn evict_expired(&self, inner: &mut StoreInner<K, V>) {
        let ttl = self.config.ttl;
        let stale: Vec<K> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.created_at.elapsed() > ttl)
            .map(|(key, _)| key.clone())
            .collect();
        if stale.is_empty() {
            return;
        }

        let count = stale.len();
        for key in stale {
            Self::remove_entry(inner, &key);
        }
        debug!(count, "evicted expired entries");
    }

    fn evict_oldest(inner: &mut StoreInner<K, V>) {
        if let Some((_, entry)) = inner.entries.pop_lru() {
            inner.total_bytes = inner.total_bytes.saturating_sub(entry.size_bytes);
        }
    }
}

/// Occupancy statistics for a store.
#[derive(Debug, Clone, Serialize)]
pub struct StoreStats {
    /// Current number of entries.
    pub count: usize,

    /// Configured count bound.
    pub max_count: usize,

    /// Sum of size hints across current entries.
    pub total_bytes: u64,

    /// Configured byte budget, if any.
    pub max_bytes: Option<u64>,
}
