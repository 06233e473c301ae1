// Copyright (c) 2025 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

/**
 * Bountyy Oy - Per-Session Resource Cache
 * Memoizes provider list/describe calls across checks and scanners
 *
 * @copyright 2025 Bountyy Oy
 * @license Proprietary
 */

use parking_lot::{Mutex as SyncMutex, RwLock};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex as AsyncMutex;
use tracing::{debug, warn};

const DEFAULT_TTL: Duration = Duration::from_secs(300);
const DEFAULT_MAX_ENTRIES: usize = 500;

struct CacheEntry {
    data: serde_json::Value,
    created_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() >= self.ttl
    }
}

struct CacheStore {
    entries: HashMap<String, CacheEntry>,
    /// Keys in first-insertion order. A key appears exactly once; re-setting
    /// a live key keeps its original rank.
    order: VecDeque<String>,
}

/// Snapshot of cache counters
#[derive(Debug, Clone)]
pub struct CacheStats {
    pub entries: usize,
    pub hits: u64,
    pub misses: u64,
    pub evictions: u64,
    pub hit_rate: f64,
}

/// TTL-bounded key/value store scoped to one scan session.
///
/// Values are stored as JSON so heterogeneous resource inventories share one
/// cache; `get_or_fetch` gives the typed surface scanners actually use.
/// Capacity is bounded: inserting a new key at the ceiling evicts the single
/// oldest-inserted entry. Cache operations themselves never fail; only a
/// wrapped fetcher can, and its error passes through uncached.
pub struct ResourceCache {
    store: RwLock<CacheStore>,
    /// Per-key admission gates so concurrent misses for one key collapse
    /// into a single fetcher invocation
    inflight: SyncMutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    default_ttl: Duration,
    max_entries: usize,
    hits: AtomicU64,
    misses: AtomicU64,
    evictions: AtomicU64,
}

impl ResourceCache {
    pub fn new(default_ttl: Duration, max_entries: usize) -> Self {
        Self {
            store: RwLock::new(CacheStore {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            inflight: SyncMutex::new(HashMap::new()),
            default_ttl,
            max_entries,
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            evictions: AtomicU64::new(0),
        }
    }

    /// Raw JSON lookup. Expired entries are removed on access.
    pub fn get(&self, key: &str) -> Option<serde_json::Value> {
        let expired = {
            let store = self.store.read();
            match store.entries.get(key) {
                Some(entry) if !entry.is_expired() => {
                    self.hits.fetch_add(1, Ordering::Relaxed);
                    return Some(entry.data.clone());
                }
                Some(_) => true,
                None => false,
            }
        };

        if expired {
            let mut store = self.store.write();
            // Re-check under the write lock; another caller may have
            // refreshed the key in between
            if store.entries.get(key).is_some_and(|e| e.is_expired()) {
                store.entries.remove(key);
                store.order.retain(|k| k != key);
            }
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        None
    }

    /// Typed lookup. A stored value that no longer decodes as `T` counts as
    /// a miss; the next fetch overwrites it.
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get(key)?;
        match serde_json::from_value(value) {
            Ok(decoded) => Some(decoded),
            Err(e) => {
                warn!("[ResourceCache] Stored value for '{}' failed to decode: {}", key, e);
                None
            }
        }
    }

    /// Store with the default TTL
    pub fn set(&self, key: &str, value: serde_json::Value) {
        self.set_with_ttl(key, value, self.default_ttl);
    }

    pub fn set_with_ttl(&self, key: &str, value: serde_json::Value, ttl: Duration) {
        let mut store = self.store.write();

        let entry = CacheEntry {
            data: value,
            created_at: Instant::now(),
            ttl,
        };

        if store.entries.contains_key(key) {
            // In-place update keeps the original insertion rank
            store.entries.insert(key.to_string(), entry);
            return;
        }

        if store.entries.len() >= self.max_entries {
            if let Some(oldest) = store.order.pop_front() {
                store.entries.remove(&oldest);
                self.evictions.fetch_add(1, Ordering::Relaxed);
                debug!("[ResourceCache] Evicted oldest entry '{}'", oldest);
            }
        }

        store.order.push_back(key.to_string());
        store.entries.insert(key.to_string(), entry);
    }

    pub fn has(&self, key: &str) -> bool {
        let store = self.store.read();
        store.entries.get(key).is_some_and(|e| !e.is_expired())
    }

    pub fn delete(&self, key: &str) -> bool {
        let mut store = self.store.write();
        let removed = store.entries.remove(key).is_some();
        if removed {
            store.order.retain(|k| k != key);
        }
        removed
    }

    /// Drop every entry and in-flight gate. Called when the scan session
    /// ends; execution environments are reused, so this is explicit rather
    /// than left to drop timing.
    pub fn clear(&self) {
        let mut store = self.store.write();
        store.entries.clear();
        store.order.clear();
        drop(store);
        self.inflight.lock().clear();
        debug!("[ResourceCache] Cleared");
    }

    pub fn len(&self) -> usize {
        self.store.read().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        CacheStats {
            entries: self.len(),
            hits,
            misses,
            evictions: self.evictions.load(Ordering::Relaxed),
            hit_rate: if total > 0 {
                hits as f64 / total as f64
            } else {
                0.0
            },
        }
    }

    /// Cached value for `key`, or run `fetcher` once and store its result
    /// with the default TTL.
    pub async fn get_or_fetch<T, E, F, Fut>(&self, key: &str, fetcher: F) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        self.get_or_fetch_with_ttl(key, self.default_ttl, fetcher)
            .await
    }

    /// As `get_or_fetch`, with a per-call TTL override.
    ///
    /// Concurrent callers for the same uncached key serialize on a per-key
    /// gate: the first runs the fetcher, the rest find the stored value on
    /// their double-check. A failed fetch stores nothing.
    pub async fn get_or_fetch_with_ttl<T, E, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetcher: F,
    ) -> Result<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if let Some(cached) = self.get_as::<T>(key) {
            return Ok(cached);
        }

        let gate = {
            let mut inflight = self.inflight.lock();
            Arc::clone(
                inflight
                    .entry(key.to_string())
                    .or_insert_with(|| Arc::new(AsyncMutex::new(()))),
            )
        };
        let _guard = gate.lock().await;

        // Double-check: a concurrent caller holding the gate before us may
        // have already stored the value
        if let Some(cached) = self.get_as::<T>(key) {
            return Ok(cached);
        }

        let fetched = fetcher().await?;

        match serde_json::to_value(&fetched) {
            Ok(value) => self.set_with_ttl(key, value, ttl),
            Err(e) => {
                warn!("[ResourceCache] Could not serialize value for '{}': {}", key, e);
            }
        }

        Ok(fetched)
    }
}

impl Default for ResourceCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}
