use std::time::{Duration, Instant};

/// A single cached value with its freshness and recency metadata.
///
/// Only the engine holds entries; callers see cloned values.
#[derive(Debug, Clone)]
pub(crate) struct CacheEntry<V> {
    pub(crate) value: V,
    /// Set on insert and on every overwrite. TTL is measured from here.
    pub(crate) created_at: Instant,
    /// Set on insert, overwrite, and every live `has`/`get`.
    pub(crate) last_accessed: Instant,
    /// Engine-wide counter value at the last touch. Orders entries whose
    /// `last_accessed` timestamps are equal.
    pub(crate) access_seq: u64,
}

impl<V> CacheEntry<V> {
    pub(crate) fn new(value: V, now: Instant, seq: u64) -> Self {
        Self {
            value,
            created_at: now,
            last_accessed: now,
            access_seq: seq,
        }
    }

    pub(crate) fn is_expired_at(&self, now: Instant, ttl: Duration) -> bool {
        now.saturating_duration_since(self.created_at) >= ttl
    }

    pub(crate) fn touch_at(&mut self, now: Instant, seq: u64) {
        self.last_accessed = now;
        self.access_seq = seq;
    }

    /// Reset both timestamps, making the entry indistinguishable from a fresh insert.
    pub(crate) fn renew_at(&mut self, now: Instant, seq: u64) {
        self.created_at = now;
        self.touch_at(now, seq);
    }

    /// LRU ordering key: older access first, then lower sequence.
    pub(crate) fn recency(&self) -> (Instant, u64) {
        (self.last_accessed, self.access_seq)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_expiry_boundary_is_inclusive() {
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);
        let entry = CacheEntry::new("v", t0, 0);

        assert!(!entry.is_expired_at(t0, ttl));
        assert!(!entry.is_expired_at(t0 + Duration::from_millis(9_999), ttl));
        assert!(entry.is_expired_at(t0 + ttl, ttl));
    }

    #[test]
    fn test_touch_does_not_extend_ttl() {
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);
        let mut entry = CacheEntry::new("v", t0, 0);

        entry.touch_at(t0 + Duration::from_secs(9), 1);
        assert_eq!(entry.created_at, t0);
        assert!(entry.is_expired_at(t0 + ttl, ttl));
    }

    #[test]
    fn test_renew_resets_created_at() {
        let t0 = Instant::now();
        let ttl = Duration::from_secs(10);
        let mut entry = CacheEntry::new("v", t0, 0);

        let later = t0 + Duration::from_secs(6);
        entry.renew_at(later, 7);
        assert_eq!(entry.created_at, later);
        assert_eq!(entry.recency(), (later, 7));
        assert!(!entry.is_expired_at(t0 + ttl, ttl));
    }
}
