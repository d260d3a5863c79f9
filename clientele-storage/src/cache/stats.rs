//! Cache usage counters.

/// Statistics about cache usage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Number of live `has`/`get` lookups.
    pub hits: u64,
    /// Number of lookups that found nothing or an expired entry.
    pub misses: u64,
    /// Number of entries removed to respect the item limit.
    pub evictions: u64,
    /// Number of expired entries removed, lazily or by a sweep.
    pub expirations: u64,
    /// Number of entries currently stored, including expired ones not yet discovered.
    pub entry_count: u64,
}

impl CacheStats {
    /// Calculate the hit rate (0.0 to 1.0).
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }
}
