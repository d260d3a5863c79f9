//! Expiring, count-bounded LRU cache engine.
//!
//! [`LruTtlCache`] is a generic string-keyed store with two bounds:
//!
//! - **Count**: at most `item_limit` entries. Inserting a new key into a full
//!   cache evicts the least recently touched entry first.
//! - **Time**: an entry older than `ttl` (measured from its last `set`, not its
//!   last read) is never returned. Expired entries are removed lazily when they
//!   are next looked up, or proactively by [`LruTtlCache::purge_expired`].
//!
//! The engine knows nothing about entities; see
//! [`crate::entity_cache`] for the read-through layer built on top of it.
//!
//! # Example
//!
//! ```
//! use std::time::Duration;
//! use clientele_storage::cache::{CacheConfig, LruTtlCache};
//!
//! let cache = LruTtlCache::new(CacheConfig::new(Duration::from_secs(60), 2)).unwrap();
//! cache.set("a", 1);
//! cache.set("b", 2);
//! assert_eq!(cache.get("a"), Some(1));
//!
//! // "b" is now the least recently used entry and makes room for "c".
//! cache.set("c", 3);
//! assert!(!cache.has("b"));
//! ```

pub mod clock;
mod entry;
pub mod lru;
pub mod stats;
pub mod sweeper;

pub use clock::{Clock, ManualClock, SystemClock};
pub use lru::{CacheConfig, LruTtlCache};
pub use stats::CacheStats;
pub use sweeper::{spawn_sweeper, ExpirySweep};
