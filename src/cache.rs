//! Caching of parsed exit policies.
//!
//! Parsing a policy is cheap, but the relay lookup parses one policy per
//! matching relay on every request, and the same status entries are queried
//! over and over until the next consensus arrives. [`PolicyCache`] keeps parsed
//! policies keyed by the identity of the status entry they came from.
//!
//! # Thread Safety
//!
//! The cache is cheap to clone and every clone shares the same storage, so it
//! can be handed to concurrent request handlers. Cached policies are returned
//! as `Arc<ExitPolicy>` and are never mutated.
//!
//! # Memory Management
//!
//! Entries expire after a TTL (24 hours by default, the lifetime of a server
//! descriptor). When the maximum entry count is reached the least recently
//! used entries are evicted.
//!
//! # Example
//!
//! ```rust
//! use torstatus_rs::cache::{PolicyCache, PolicyKey};
//! use chrono::Utc;
//! use std::time::Duration;
//!
//! let cache = PolicyCache::new()
//!     .with_ttl(Duration::from_secs(3600))
//!     .with_max_entries(100);
//!
//! let key = PolicyKey::new("9695DFC35FFEB861329B9F1AB04C46397020CE31", Utc::now());
//! let policy = cache.get_or_parse(&key, "reject *:25\naccept *:*").unwrap();
//! assert_eq!(policy.len(), 2);
//!
//! let again = cache.get_or_parse(&key, "reject *:25\naccept *:*").unwrap();
//! assert_eq!(cache.stats().hits, 1);
//! assert!(std::sync::Arc::ptr_eq(&policy, &again));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::config::{StatusConfig, DEFAULT_POLICY_CACHE_MAX_ENTRIES, DEFAULT_POLICY_CACHE_TTL};
use crate::exit_policy::ExitPolicy;
use crate::store::RelaySnapshot;
use crate::Error;

/// Identity of the status entry a policy was parsed from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PolicyKey {
    /// Relay fingerprint.
    pub fingerprint: String,
    /// Timestamp of the status entry.
    pub published: DateTime<Utc>,
}

impl PolicyKey {
    /// Creates a key.
    pub fn new(fingerprint: impl Into<String>, published: DateTime<Utc>) -> Self {
        Self {
            fingerprint: fingerprint.into(),
            published,
        }
    }

    /// The key of a status entry.
    pub fn for_snapshot(snapshot: &RelaySnapshot) -> Self {
        Self::new(snapshot.fingerprint.clone(), snapshot.published)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    expires_at: Instant,
    last_accessed: Instant,
}

impl<T> CacheEntry<T> {
    fn new(value: T, ttl: Duration) -> Self {
        let now = Instant::now();
        Self {
            value,
            expires_at: now + ttl,
            last_accessed: now,
        }
    }

    fn is_expired(&self) -> bool {
        Instant::now() >= self.expires_at
    }

    fn touch(&mut self) {
        self.last_accessed = Instant::now();
    }
}

/// In-memory cache of parsed exit policies with expiration and LRU eviction.
#[derive(Debug, Clone)]
pub struct PolicyCache {
    inner: Arc<RwLock<CacheInner>>,
}

#[derive(Debug)]
struct CacheInner {
    policies: HashMap<PolicyKey, CacheEntry<Arc<ExitPolicy>>>,
    ttl: Duration,
    max_entries: usize,
    stats: CacheStats,
}

/// Statistics about cache performance.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of cache hits.
    pub hits: u64,
    /// Number of cache misses.
    pub misses: u64,
    /// Number of entries dropped because they expired.
    pub expirations: u64,
    /// Number of entries dropped to stay under the size limit.
    pub evictions: u64,
}

impl CacheStats {
    /// Returns the hit rate as a percentage (0.0 to 100.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl PolicyCache {
    /// Creates a cache with a 24 hour TTL and room for 5000 policies.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(CacheInner {
                policies: HashMap::new(),
                ttl: DEFAULT_POLICY_CACHE_TTL,
                max_entries: DEFAULT_POLICY_CACHE_MAX_ENTRIES,
                stats: CacheStats::default(),
            })),
        }
    }

    /// Creates a cache sized by `config`.
    pub fn from_config(config: &StatusConfig) -> Self {
        Self::new()
            .with_ttl(config.policy_cache_ttl)
            .with_max_entries(config.policy_cache_max_entries)
    }

    /// Sets the TTL for newly inserted policies.
    pub fn with_ttl(self, ttl: Duration) -> Self {
        self.write().ttl = ttl;
        self
    }

    /// Sets the maximum number of cached policies.
    pub fn with_max_entries(self, max: usize) -> Self {
        self.write().max_entries = max;
        self
    }

    /// Retrieves a cached policy if present and not expired.
    pub fn get(&self, key: &PolicyKey) -> Option<Arc<ExitPolicy>> {
        let mut inner = self.write();

        let is_expired = inner
            .policies
            .get(key)
            .map(|entry| entry.is_expired())
            .unwrap_or(false);

        if is_expired {
            inner.policies.remove(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            return None;
        }

        if let Some(entry) = inner.policies.get_mut(key) {
            entry.touch();
            let value = Arc::clone(&entry.value);
            inner.stats.hits += 1;
            return Some(value);
        }

        inner.stats.misses += 1;
        None
    }

    /// Stores a policy and returns the shared handle to it.
    pub fn put(&self, key: PolicyKey, policy: ExitPolicy) -> Arc<ExitPolicy> {
        let policy = Arc::new(policy);
        let mut inner = self.write();
        let ttl = inner.ttl;

        if !inner.policies.contains_key(&key) {
            inner.evict_if_needed();
        }
        inner
            .policies
            .insert(key, CacheEntry::new(Arc::clone(&policy), ttl));
        policy
    }

    /// Returns the cached policy for `key`, parsing `raw` on a miss.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedPolicy`] if `raw` does not parse. Failures are
    /// not cached.
    pub fn get_or_parse(&self, key: &PolicyKey, raw: &str) -> Result<Arc<ExitPolicy>, Error> {
        if let Some(policy) = self.get(key) {
            return Ok(policy);
        }
        let policy = ExitPolicy::parse(raw)?;
        Ok(self.put(key.clone(), policy))
    }

    /// Removes every cached policy.
    pub fn clear(&self) {
        self.write().policies.clear();
    }

    /// Removes expired policies.
    pub fn evict_expired(&self) {
        let mut inner = self.write();
        let before = inner.policies.len();
        inner.policies.retain(|_, entry| !entry.is_expired());
        let expired = (before - inner.policies.len()) as u64;
        inner.stats.expirations += expired;
        if expired > 0 {
            debug!("expired {} cached exit policies", expired);
        }
    }

    /// Returns the current statistics.
    pub fn stats(&self) -> CacheStats {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .stats
            .clone()
    }

    /// Number of cached policies.
    pub fn len(&self) -> usize {
        self.inner
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .policies
            .len()
    }

    /// Returns true if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn write(&self) -> RwLockWriteGuard<'_, CacheInner> {
        self.inner.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for PolicyCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CacheInner {
    fn evict_if_needed(&mut self) {
        if self.policies.len() < self.max_entries {
            return;
        }

        let mut by_access: Vec<(PolicyKey, Instant)> = self
            .policies
            .iter()
            .map(|(key, entry)| (key.clone(), entry.last_accessed))
            .collect();
        by_access.sort_by_key(|(_, accessed)| *accessed);

        let to_evict = self.policies.len() + 1 - self.max_entries.max(1);
        for (key, _) in by_access.into_iter().take(to_evict) {
            self.policies.remove(&key);
            self.stats.evictions += 1;
        }
        debug!("evicted {} cached exit policies", to_evict);
    }
}
