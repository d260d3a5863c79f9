//! Clientele Storage - Cache Engine, Entity Caches and Stores
//!
//! Defines the expiring LRU engine, the read-through [`EntityCache`] built on
//! it, the [`EntityStore`] contract the caches consume, and two stores: the
//! JSON document store used by the demo binary and an in-memory mock for
//! tests.

pub mod cache;
pub mod entity_cache;
pub mod json_store;
pub mod store;

pub use cache::{
    spawn_sweeper, CacheConfig, CacheStats, Clock, ExpirySweep, LruTtlCache, ManualClock,
    SystemClock,
};
pub use entity_cache::{CacheableEntity, ClientCache, EntityCache, UserCache};
pub use json_store::{DatabaseSchema, JsonFileStore};
pub use store::EntityStore;

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use clientele_core::{ClienteleError, ClienteleResult, StorageError};
use parking_lot::RwLock;

// ============================================================================
// MOCK STORE
// ============================================================================

/// Number of calls each [`EntityStore`] operation has received.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreCalls {
    pub find_by_id: u64,
    pub find_by_alternate_key: u64,
    pub find_all: u64,
    pub create: u64,
    pub update: u64,
}

#[derive(Debug, Default)]
struct CallCounters {
    find_by_id: AtomicU64,
    find_by_alternate_key: AtomicU64,
    find_all: AtomicU64,
    create: AtomicU64,
    update: AtomicU64,
}

impl CallCounters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> StoreCalls {
        StoreCalls {
            find_by_id: self.find_by_id.load(Ordering::Relaxed),
            find_by_alternate_key: self.find_by_alternate_key.load(Ordering::Relaxed),
            find_all: self.find_all.load(Ordering::Relaxed),
            create: self.create.load(Ordering::Relaxed),
            update: self.update.load(Ordering::Relaxed),
        }
    }
}

/// In-memory mock store for testing.
///
/// Records keep insertion order. Every trait call is counted so tests can
/// assert when the cache did or did not reach the store.
#[derive(Debug)]
pub struct MockStore<E> {
    records: RwLock<Vec<E>>,
    calls: CallCounters,
    fail_writes: AtomicBool,
}

impl<E> Default for MockStore<E> {
    fn default() -> Self {
        Self {
            records: RwLock::new(Vec::new()),
            calls: CallCounters::default(),
            fail_writes: AtomicBool::new(false),
        }
    }
}

impl<E: CacheableEntity> MockStore<E> {
    /// Create an empty mock store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a mock store seeded with `records`.
    pub fn with_records(records: Vec<E>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Seed a record directly, bypassing the call counters and the cache.
    pub fn insert(&self, entity: E) {
        self.records.write().push(entity);
    }

    /// Get count of stored records.
    pub fn len(&self) -> usize {
        self.records.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.read().is_empty()
    }

    /// Clear all stored records. Call counters are kept.
    pub fn clear(&self) {
        self.records.write().clear();
    }

    /// Snapshot of the call counters.
    pub fn calls(&self) -> StoreCalls {
        self.calls.snapshot()
    }

    /// Make every subsequent `create` and `update` fail with
    /// [`StorageError::WriteFailed`].
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::Relaxed);
    }

    fn check_writable(&self) -> ClienteleResult<()> {
        if self.fail_writes.load(Ordering::Relaxed) {
            return Err(ClienteleError::Storage(StorageError::WriteFailed {
                entity_type: E::entity_type(),
                reason: "writes disabled".to_string(),
            }));
        }
        Ok(())
    }
}

#[async_trait]
impl<E: CacheableEntity> EntityStore<E> for MockStore<E> {
    async fn find_by_id(&self, id: &E::Id) -> ClienteleResult<Option<E>> {
        CallCounters::bump(&self.calls.find_by_id);
        let records = self.records.read();
        Ok(records.iter().find(|e| e.entity_id() == *id).cloned())
    }

    async fn find_by_alternate_key(&self, key: &str) -> ClienteleResult<Option<E>> {
        CallCounters::bump(&self.calls.find_by_alternate_key);
        let normalized = E::normalize_alternate_key(key);
        let records = self.records.read();
        Ok(records
            .iter()
            .find(|e| e.alternate_key().as_deref() == Some(normalized.as_str()))
            .cloned())
    }

    async fn find_all(&self) -> ClienteleResult<Vec<E>> {
        CallCounters::bump(&self.calls.find_all);
        Ok(self.records.read().clone())
    }

    async fn create(&self, entity: E) -> ClienteleResult<E> {
        CallCounters::bump(&self.calls.create);
        self.check_writable()?;

        let mut records = self.records.write();
        let id = entity.entity_id();
        if records.iter().any(|e| e.entity_id() == id) {
            return Err(ClienteleError::Storage(StorageError::InsertFailed {
                entity_type: E::entity_type(),
                reason: format!("{} already exists", id),
            }));
        }
        records.push(entity.clone());
        Ok(entity)
    }

    async fn update(&self, entity: E) -> ClienteleResult<Option<E>> {
        CallCounters::bump(&self.calls.update);
        self.check_writable()?;

        let mut records = self.records.write();
        let id = entity.entity_id();
        match records.iter_mut().find(|e| e.entity_id() == id) {
            Some(slot) => {
                *slot = entity.clone();
                Ok(Some(entity))
            }
            None => Ok(None),
        }
    }
}


#[cfg(test)]
mod prop_tests {
    use super::*;
    use clientele_core::{Client, ClientId, EntityIdType};
    use proptest::prelude::*;

    fn block_on<F: std::future::Future>(fut: F) -> F::Output {
        tokio::runtime::Builder::new_current_thread()
            .build()
            .expect("runtime")
            .block_on(fut)
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(100))]

        /// Every successfully created record is listed exactly once, in
        /// creation order, no matter how many duplicates were attempted.
        #[test]
        fn prop_find_all_lists_each_created_record_once(
            names in prop::collection::vec("[a-z]{1,8}", 1..20),
            duplicate_every in 1usize..5,
        ) {
            let store: MockStore<Client> = MockStore::new();
            let mut expected = Vec::new();

            block_on(async {
                for (i, name) in names.iter().enumerate() {
                    let client = Client { id: ClientId::now_v7(), name: name.clone() };
                    store.create(client.clone()).await.unwrap();
                    if i % duplicate_every == 0 {
                        prop_assert!(store.create(client.clone()).await.is_err());
                    }
                    expected.push(client);
                }
                prop_assert_eq!(store.find_all().await.unwrap(), expected.clone());
                Ok(())
            })?;
        }

        /// A lookup for an unknown id returns Ok(None), never an error.
        #[test]
        fn prop_unknown_id_is_none(seed in 0usize..10) {
            let store = MockStore::with_records(
                (0..seed)
                    .map(|i| Client { id: ClientId::now_v7(), name: format!("c{i}") })
                    .collect(),
            );
            let found = block_on(store.find_by_id(&ClientId::now_v7())).unwrap();
            prop_assert!(found.is_none());
        }
    }
}
