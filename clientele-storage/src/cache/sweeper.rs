//! Optional background expiry sweep.
//!
//! Lazy expiry already guarantees that expired entries are never returned.
//! The sweeper only reclaims the memory of entries nobody asks for again.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use super::lru::LruTtlCache;

/// Shortest tick period; `interval` panics on zero.
const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(1);

/// A cache whose expired entries can be reclaimed proactively.
pub trait ExpirySweep: Send + Sync {
    /// Remove expired entries, returning how many were removed.
    fn purge_expired(&self) -> usize;
}

impl<V: Send> ExpirySweep for LruTtlCache<V> {
    fn purge_expired(&self) -> usize {
        LruTtlCache::purge_expired(self)
    }
}

/// Spawn a task that purges every cache in `caches` once per `period`.
///
/// The task runs until `shutdown` is set to `true` (or its sender is dropped)
/// and returns the total number of entries it purged. A `period` below
/// one millisecond is clamped up to it.
pub fn spawn_sweeper(
    caches: Vec<Arc<dyn ExpirySweep>>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<u64> {
    let period = period.max(MIN_SWEEP_PERIOD);
    tokio::spawn(async move {
        let mut ticker = interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            period_ms = period.as_millis() as u64,
            caches = caches.len(),
            "Cache sweeper started"
        );

        let mut total: u64 = 0;
        loop {
            tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    let purged: usize = caches.iter().map(|cache| cache.purge_expired()).sum();
                    if purged > 0 {
                        tracing::debug!(purged, "Cache sweep removed expired entries");
                    }
                    total += purged as u64;
                }
            }
        }

        tracing::info!(total_purged = total, "Cache sweeper shutting down");
        total
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::{CacheConfig, ManualClock};

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_purges_until_shutdown() {
        let clock = Arc::new(ManualClock::new());
        let records = Arc::new(
            LruTtlCache::with_clock(CacheConfig::new(Duration::from_secs(1), 10), clock.clone())
                .unwrap(),
        );
        let collections = Arc::new(
            LruTtlCache::with_clock(CacheConfig::new(Duration::from_secs(1), 2), clock.clone())
                .unwrap(),
        );
        records.set("a", 1u32);
        records.set("b", 2u32);
        collections.set("all", vec![1u32, 2]);
        clock.advance(Duration::from_secs(2));

        let (tx, rx) = watch::channel(false);
        let caches: Vec<Arc<dyn ExpirySweep>> = vec![
            records.clone() as Arc<dyn ExpirySweep>,
            collections.clone() as Arc<dyn ExpirySweep>,
        ];
        let handle = spawn_sweeper(caches, Duration::from_millis(10), rx);

        tokio::time::sleep(Duration::from_millis(25)).await;
        assert!(records.is_empty());
        assert!(collections.is_empty());

        tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_sweeper_stops_when_sender_dropped() {
        let cache: Arc<LruTtlCache<u32>> =
            Arc::new(LruTtlCache::new(CacheConfig::new(Duration::from_secs(60), 4)).unwrap());
        cache.set("live", 1);

        let (tx, rx) = watch::channel(false);
        let handle = spawn_sweeper(
            vec![cache.clone() as Arc<dyn ExpirySweep>],
            Duration::from_millis(10),
            rx,
        );
        tokio::time::sleep(Duration::from_millis(15)).await;
        drop(tx);

        assert_eq!(handle.await.unwrap(), 0);
        assert!(cache.has("live"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_zero_period_is_clamped_and_still_sweeps() {
        let clock = Arc::new(ManualClock::new());
        let cache = Arc::new(
            LruTtlCache::with_clock(CacheConfig::new(Duration::from_secs(1), 4), clock.clone())
                .unwrap(),
        );
        cache.set("stale", 1u32);
        clock.advance(Duration::from_secs(1));

        let (tx, rx) = watch::channel(false);
        let handle = spawn_sweeper(
            vec![cache.clone() as Arc<dyn ExpirySweep>],
            Duration::ZERO,
            rx,
        );
        tokio::time::sleep(MIN_SWEEP_PERIOD * 3).await;
        assert!(cache.is_empty());

        tx.send(true).unwrap();
        assert_eq!(handle.await.unwrap(), 1);
    }
}
