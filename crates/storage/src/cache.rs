//! Bounded in-memory cache for decoded datasets.
//!
//! Entries are evicted one at a time once `capacity` is exceeded. With
//! [`EvictionPolicy::Fifo`] the victim is the oldest-inserted key, regardless
//! of how often it was read since. [`EvictionPolicy::Lru`] evicts the least
//! recently read or written key instead.

use std::fmt;
use std::hash::Hash;
use std::num::NonZeroUsize;
use std::str::FromStr;
use std::sync::Arc;

use climate_common::ClimateError;
use lru::LruCache;
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EvictionPolicy {
    #[default]
    Fifo,
    Lru,
}

impl EvictionPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            EvictionPolicy::Fifo => "fifo",
            EvictionPolicy::Lru => "lru",
        }
    }
}

impl FromStr for EvictionPolicy {
    type Err = ClimateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "fifo" => Ok(EvictionPolicy::Fifo),
            "lru" => Ok(EvictionPolicy::Lru),
            other => Err(ClimateError::invalid_parameter(
                "cache_policy",
                format!("unknown eviction policy '{}'", other),
            )),
        }
    }
}

impl fmt::Display for EvictionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics for the data cache
#[derive(Debug, Default, Clone, Serialize)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub insertions: u64,
    pub evictions: u64,
    pub entries: usize,
    pub capacity: usize,
}

impl CacheStats {
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

struct Inner<K: Hash + Eq, V> {
    /// Ordered by recency; under FIFO reads use `peek`, so the order is
    /// insertion order
    entries: LruCache<K, V>,
    stats: CacheStats,
}

/// Shared, cloneable handle to a bounded cache.
pub struct DataCache<K: Hash + Eq, V> {
    inner: Arc<RwLock<Inner<K, V>>>,
    capacity: usize,
    policy: EvictionPolicy,
}

impl<K: Hash + Eq, V> Clone for DataCache<K, V> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            capacity: self.capacity,
            policy: self.policy,
        }
    }
}

impl<K, V> DataCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// A capacity of zero is treated as one.
    pub fn new(capacity: usize, policy: EvictionPolicy) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: LruCache::new(capacity),
                stats: CacheStats {
                    capacity: capacity.get(),
                    ..CacheStats::default()
                },
            })),
            capacity: capacity.get(),
            policy,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn policy(&self) -> EvictionPolicy {
        self.policy
    }

    /// Look up a key, counting a hit or a miss.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write().await;
        let value = match self.policy {
            EvictionPolicy::Fifo => inner.entries.peek(key).cloned(),
            EvictionPolicy::Lru => inner.entries.get(key).cloned(),
        };
        match value {
            Some(_) => inner.stats.hits += 1,
            None => inner.stats.misses += 1,
        }
        value
    }

    /// Presence check that leaves statistics and recency untouched.
    pub async fn contains(&self, key: &K) -> bool {
        self.inner.read().await.entries.contains(key)
    }

    /// Insert or replace a value. Returns the evicted key, if any.
    ///
    /// Replacing an existing key keeps its FIFO position.
    pub async fn insert(&self, key: K, value: V) -> Option<K> {
        let mut inner = self.inner.write().await;
        inner.stats.insertions += 1;

        if self.policy == EvictionPolicy::Fifo {
            if let Some(slot) = inner.entries.peek_mut(&key) {
                *slot = value;
                return None;
            }
        }

        let replaced = inner.entries.contains(&key);
        let evicted = match inner.entries.push(key, value) {
            Some((victim, _)) if !replaced => {
                inner.stats.evictions += 1;
                Some(victim)
            }
            _ => None,
        };
        inner.stats.entries = inner.entries.len();
        evicted
    }

    pub async fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.write().await;
        let value = inner.entries.pop(key)?;
        inner.stats.entries = inner.entries.len();
        Some(value)
    }

    /// Keys in eviction order, next victim first.
    pub async fn keys(&self) -> Vec<K> {
        self.inner.read().await.entries.iter().rev().map(|(k, _)| k.clone()).collect()
    }

    pub async fn stats(&self) -> CacheStats {
        self.inner.read().await.stats.clone()
    }

    pub async fn clear(&self) {
        let mut inner = self.inner.write().await;
        inner.entries.clear();
        inner.stats = CacheStats {
            capacity: self.capacity,
            ..CacheStats::default()
        };
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}
