//! The LRU + TTL cache engine.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use clientele_core::{CacheSettings, ClienteleResult, ConfigError};
use parking_lot::Mutex;

use super::clock::{Clock, SystemClock};
use super::entry::CacheEntry;
use super::stats::CacheStats;

/// Engine configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheConfig {
    /// Entries older than this are treated as absent.
    pub ttl: Duration,
    /// Maximum entries before eviction triggers.
    pub item_limit: usize,
}

impl CacheConfig {
    pub fn new(ttl: Duration, item_limit: usize) -> Self {
        Self { ttl, item_limit }
    }

    /// Sizing for an individual-record cache.
    pub fn records(settings: &CacheSettings) -> Self {
        Self::new(settings.ttl, settings.item_limit)
    }

    /// Sizing for a collection-snapshot cache.
    pub fn collections(settings: &CacheSettings) -> Self {
        Self::new(settings.ttl, settings.collection_item_limit)
    }

    fn validate(&self) -> ClienteleResult<()> {
        if self.ttl.is_zero() {
            return Err(ConfigError::InvalidValue {
                field: "ttl".to_string(),
                value: format!("{:?}", self.ttl),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        if self.item_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "item_limit".to_string(),
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

struct Inner<V> {
    entries: HashMap<String, CacheEntry<V>>,
    next_seq: u64,
    stats: CacheStats,
}

impl<V> Inner<V> {
    fn next_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }

    /// Key of the entry with the oldest `(last_accessed, access_seq)`.
    ///
    /// Expired entries get no special treatment.
    fn least_recently_used(&self) -> Option<String> {
        self.entries
            .iter()
            .min_by_key(|(_, entry)| entry.recency())
            .map(|(key, _)| key.clone())
    }
}

/// A string-keyed cache bounded by entry count and entry age.
///
/// All operations take a single per-instance lock, so the eviction scan and
/// the insert it makes room for happen atomically. Share an instance between
/// tasks with [`Arc`].
///
/// # Eviction order
///
/// When a new key is inserted into a full cache, the entry with the smallest
/// `last_accessed` is removed. Timestamps that compare equal are ordered by a
/// per-cache access counter, so the entry touched earliest is evicted. The
/// result never depends on hash map iteration order.
pub struct LruTtlCache<V> {
    config: CacheConfig,
    clock: Arc<dyn Clock>,
    inner: Mutex<Inner<V>>,
}

impl<V> fmt::Debug for LruTtlCache<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LruTtlCache")
            .field("config", &self.config)
            .field("len", &self.len())
            .finish()
    }
}

impl<V> LruTtlCache<V> {
    /// Create a cache reading wall-clock time.
    pub fn new(config: CacheConfig) -> ClienteleResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    /// Create a cache reading time from `clock`.
    pub fn with_clock(config: CacheConfig, clock: Arc<dyn Clock>) -> ClienteleResult<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                next_seq: 0,
                stats: CacheStats::default(),
            }),
        })
    }

    /// Get the cache configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Returns true iff `key` holds a live entry, touching it.
    ///
    /// An expired entry is removed and reported absent.
    pub fn has(&self, key: &str) -> bool {
        self.lookup(key, |_| ()).is_some()
    }

    /// Store `value` under `key`.
    ///
    /// Overwriting an existing key, expired or not, resets its age and
    /// recency as if it were freshly inserted. Inserting a new key into a full
    /// cache first evicts exactly one entry.
    pub fn set(&self, key: impl Into<String>, value: V) {
        let key = key.into();
        let now = self.clock.now();
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let seq = inner.next_seq();

        if let Some(entry) = inner.entries.get_mut(&key) {
            entry.value = value;
            entry.renew_at(now, seq);
            return;
        }

        if inner.entries.len() >= self.config.item_limit {
            if let Some(victim) = inner.least_recently_used() {
                inner.entries.remove(&victim);
                inner.stats.evictions += 1;
                tracing::trace!(key = %victim, "cache entry evicted");
            }
        }

        inner.entries.insert(key, CacheEntry::new(value, now, seq));
    }

    /// Apply `patch` to a live entry in place and renew it as [`set`](Self::set) would.
    ///
    /// This is an atomic read-modify-write. Returns false, leaving the cache
    /// untouched, when `key` is absent. An expired entry is removed and
    /// false returned.
    pub fn update_live<F>(&self, key: &str, patch: F) -> bool
    where
        F: FnOnce(&mut V),
    {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let expired = match inner.entries.get(key) {
            None => return false,
            Some(entry) => entry.is_expired_at(now, ttl),
        };
        if expired {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            return false;
        }

        let seq = inner.next_seq();
        match inner.entries.get_mut(key) {
            Some(entry) => {
                patch(&mut entry.value);
                entry.renew_at(now, seq);
                true
            }
            None => false,
        }
    }

    /// Remove `key`, returning its value if it was live.
    pub fn remove(&self, key: &str) -> Option<V> {
        let now = self.clock.now();
        let mut inner = self.inner.lock();
        let entry = inner.entries.remove(key)?;
        if entry.is_expired_at(now, self.config.ttl) {
            inner.stats.expirations += 1;
            None
        } else {
            Some(entry.value)
        }
    }

    /// Drop every entry. Statistics are kept.
    pub fn clear(&self) {
        self.inner.lock().entries.clear();
    }

    /// Remove all expired entries now instead of waiting for them to be looked up.
    ///
    /// Returns the number of entries removed.
    pub fn purge_expired(&self) -> usize {
        let now = self.clock.now();
        let ttl = self.config.ttl;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;

        let before = inner.entries.len();
        inner.entries.retain(|_, entry| !entry.is_expired_at(now, ttl));
        let purged = before - inner.entries.len();
        inner.stats.expirations += purged as u64;
        purged
    }

    /// Number of stored entries. Includes expired entries not yet discovered.
    pub fn len(&self) -> usize {
        self.inner.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of the usage counters.
    pub fn stats(&self) -> CacheStats {
        let inner = self.inner.lock();
        CacheStats {
            entry_count: inner.entries.len() as u64,
            ..inner.stats.clone()
        }
    }

    /// Shared expiry/touch logic of `has` and `get`.
    fn lookup<R, F>(&self, key: &str, read: F) -> Option<R>
    where
        F: FnOnce(&V) -> R,
    {
        let now: Instant = self.clock.now();
        let ttl = self.config.ttl;
        let mut guard = self.inner.lock();
        let inner = &mut *guard;
        let seq = inner.next_seq();

        let Some(entry) = inner.entries.get_mut(key) else {
            inner.stats.misses += 1;
            return None;
        };

        if entry.is_expired_at(now, ttl) {
            inner.entries.remove(key);
            inner.stats.expirations += 1;
            inner.stats.misses += 1;
            tracing::trace!(key, "cache entry expired");
            return None;
        }

        entry.touch_at(now, seq);
        inner.stats.hits += 1;
        Some(read(&entry.value))
    }
}

impl<V: Clone> LruTtlCache<V> {
    /// Return a clone of the live value under `key`, touching it.
    ///
    /// An expired entry is removed and reported absent.
    pub fn get(&self, key: &str) -> Option<V> {
        self.lookup(key, V::clone)
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use crate::cache::ManualClock;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Set(u8, u32),
        Get(u8),
        Has(u8),
        Advance(u16),
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            4 => (0u8..16, any::<u32>()).prop_map(|(k, v)| Op::Set(k, v)),
            3 => (0u8..16).prop_map(Op::Get),
            1 => (0u8..16).prop_map(Op::Has),
            2 => (0u16..2_000).prop_map(Op::Advance),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// The entry count never exceeds the item limit.
        #[test]
        fn prop_len_never_exceeds_item_limit(
            item_limit in 1usize..8,
            ops in prop::collection::vec(op_strategy(), 1..200)
        ) {
            let clock = Arc::new(ManualClock::new());
            let cache = LruTtlCache::with_clock(
                CacheConfig::new(Duration::from_secs(1), item_limit),
                clock.clone(),
            ).unwrap();

            for op in ops {
                match op {
                    Op::Set(k, v) => cache.set(k.to_string(), v),
                    Op::Get(k) => { cache.get(&k.to_string()); }
                    Op::Has(k) => { cache.has(&k.to_string()); }
                    Op::Advance(ms) => clock.advance(Duration::from_millis(ms as u64)),
                }
                prop_assert!(cache.len() <= item_limit);
            }
        }

        /// Nothing is returned once its age reaches the TTL, however often it was read.
        #[test]
        fn prop_ttl_is_anchored_to_last_set(
            reads in prop::collection::vec(0u64..999, 0..20),
        ) {
            let ttl = Duration::from_secs(1);
            let clock = Arc::new(ManualClock::new());
            let cache = LruTtlCache::with_clock(CacheConfig::new(ttl, 4), clock.clone()).unwrap();
            cache.set("k", 1u32);

            let mut elapsed = Duration::ZERO;
            for step in reads {
                let step = Duration::from_millis(step);
                if elapsed + step >= ttl {
                    break;
                }
                clock.advance(step);
                elapsed += step;
                prop_assert_eq!(cache.get("k"), Some(1));
            }

            clock.advance(ttl - elapsed);
            prop_assert_eq!(cache.get("k"), None);
            prop_assert!(!cache.has("k"));
        }

        /// A model LRU built on recency order agrees with the engine about which keys survive.
        #[test]
        fn prop_matches_reference_lru(
            ops in prop::collection::vec((0u8..6, any::<bool>()), 1..100)
        ) {
            let cache = LruTtlCache::new(CacheConfig::new(Duration::from_secs(3600), 3)).unwrap();
            let mut model: Vec<u8> = Vec::new();

            for (k, is_set) in ops {
                let key = k.to_string();
                if is_set {
                    if let Some(pos) = model.iter().position(|m| *m == k) {
                        model.remove(pos);
                    } else if model.len() >= 3 {
                        model.remove(0);
                    }
                    model.push(k);
                    cache.set(key, k);
                } else {
                    let hit = cache.get(&key).is_some();
                    let pos = model.iter().position(|m| *m == k);
                    prop_assert_eq!(hit, pos.is_some());
                    if let Some(pos) = pos {
                        model.remove(pos);
                        model.push(k);
                    }
                }
            }
        }
    }
}
