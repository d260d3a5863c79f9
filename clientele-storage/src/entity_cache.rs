//! Read-through, write-populating cache in front of an [`EntityStore`].
//!
//! Each entity type gets its own [`EntityCache`], backed by two engines:
//! one for individual records and one for the "all records" snapshot. Keys
//! are namespaced by the entity's prefix:
//!
//! | Lookup            | Key                      | Engine      |
//! |-------------------|--------------------------|-------------|
//! | by id             | `user:<id>`              | records     |
//! | by alternate key  | `user:alt:<normalized>`  | records     |
//! | all records       | `user:all`               | collections |
//!
//! The id and alternate-key entries hold the same value but are independent
//! cache entries. The collection entry is only kept in step with individual
//! writes made through this cache; other divergence lasts at most one TTL.

use std::fmt;
use std::sync::Arc;

use clientele_core::{CacheSettings, Client, ClientId, ClienteleResult, EntityType, User, UserId};

use crate::cache::{CacheConfig, CacheStats, LruTtlCache};
use crate::store::EntityStore;

/// Types that can be cached by an [`EntityCache`].
pub trait CacheableEntity: Clone + Send + Sync + 'static {
    /// Primary id type.
    type Id: fmt::Display + PartialEq + Send + Sync;

    /// Get the entity type, which also names the key namespace.
    fn entity_type() -> EntityType;

    /// Get the unique identifier for this entity.
    fn entity_id(&self) -> Self::Id;

    /// Get the normalized alternate key, if this type has one.
    fn alternate_key(&self) -> Option<String> {
        None
    }

    /// Normalize a caller-supplied alternate key.
    fn normalize_alternate_key(raw: &str) -> String {
        raw.trim().to_lowercase()
    }
}

impl CacheableEntity for User {
    type Id = UserId;

    fn entity_type() -> EntityType {
        EntityType::User
    }

    fn entity_id(&self) -> UserId {
        self.id
    }

    fn alternate_key(&self) -> Option<String> {
        Some(Self::normalize_alternate_key(&self.email))
    }
}

impl CacheableEntity for Client {
    type Id = ClientId;

    fn entity_type() -> EntityType {
        EntityType::Client
    }

    fn entity_id(&self) -> ClientId {
        self.id
    }
}

/// Cache key for an entity id.
pub fn id_key<E: CacheableEntity>(id: &E::Id) -> String {
    format!("{}:{}", E::entity_type().as_str(), id)
}

/// Cache key for an already-normalized alternate key.
pub fn alternate_key<E: CacheableEntity>(normalized: &str) -> String {
    format!("{}:alt:{}", E::entity_type().as_str(), normalized)
}

/// Cache key of the "all records" snapshot.
pub fn all_key<E: CacheableEntity>() -> String {
    format!("{}:all", E::entity_type().as_str())
}

/// Read-through cache for one entity type.
///
/// Reads are served from cache when possible and fall back to the store on a
/// miss; found records are cached under every lookup key. Writes go to the
/// store first and are pushed into the cache only once the store accepts them.
/// Misses are never cached.
pub struct EntityCache<E, S>
where
    E: CacheableEntity,
    S: EntityStore<E>,
{
    store: Arc<S>,
    records: Arc<LruTtlCache<E>>,
    collections: Arc<LruTtlCache<Vec<E>>>,
}

/// Entity cache for users, keyed by id and normalized email.
pub type UserCache<S> = EntityCache<User, S>;

/// Entity cache for clients, keyed by id only.
pub type ClientCache<S> = EntityCache<Client, S>;

impl<E, S> Clone for EntityCache<E, S>
where
    E: CacheableEntity,
    S: EntityStore<E>,
{
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            records: Arc::clone(&self.records),
            collections: Arc::clone(&self.collections),
        }
    }
}

impl<E, S> EntityCache<E, S>
where
    E: CacheableEntity,
    S: EntityStore<E>,
{
    /// Create an entity cache over explicitly constructed engines.
    pub fn new(
        store: Arc<S>,
        records: Arc<LruTtlCache<E>>,
        collections: Arc<LruTtlCache<Vec<E>>>,
    ) -> Self {
        Self {
            store,
            records,
            collections,
        }
    }

    /// Create an entity cache with fresh engines sized from `settings`.
    pub fn from_settings(store: Arc<S>, settings: &CacheSettings) -> ClienteleResult<Self> {
        let records = LruTtlCache::new(CacheConfig::records(settings))?;
        let collections = LruTtlCache::new(CacheConfig::collections(settings))?;
        Ok(Self::new(store, Arc::new(records), Arc::new(collections)))
    }

    /// Get a reference to the underlying store.
    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Get the individual-record engine.
    pub fn records(&self) -> &Arc<LruTtlCache<E>> {
        &self.records
    }

    /// Get the collection engine.
    pub fn collections(&self) -> &Arc<LruTtlCache<Vec<E>>> {
        &self.collections
    }

    /// Usage counters of the individual-record engine.
    pub fn record_stats(&self) -> CacheStats {
        self.records.stats()
    }

    /// Usage counters of the collection engine.
    pub fn collection_stats(&self) -> CacheStats {
        self.collections.stats()
    }

    /// Get an entity by id, checking the cache first.
    pub async fn find_by_id(&self, id: &E::Id) -> ClienteleResult<Option<E>> {
        let key = id_key::<E>(id);
        if let Some(entity) = self.records.get(&key) {
            tracing::debug!(%key, "cache hit");
            return Ok(Some(entity));
        }

        tracing::debug!(%key, "cache miss");
        let found = self.store.find_by_id(id).await?;
        if let Some(entity) = &found {
            self.populate(entity);
        }
        Ok(found)
    }

    /// Get an entity by alternate key, checking the cache first.
    ///
    /// `raw` is normalized before use, so lookups are case-insensitive for
    /// types using the default normalization.
    pub async fn find_by_alternate_key(&self, raw: &str) -> ClienteleResult<Option<E>> {
        let normalized = E::normalize_alternate_key(raw);
        let key = alternate_key::<E>(&normalized);
        if let Some(entity) = self.records.get(&key) {
            tracing::debug!(%key, "cache hit");
            return Ok(Some(entity));
        }

        tracing::debug!(%key, "cache miss");
        let found = self.store.find_by_alternate_key(&normalized).await?;
        if let Some(entity) = &found {
            self.populate(entity);
        }
        Ok(found)
    }

    /// List all entities, serving the cached snapshot when one is live.
    pub async fn find_all(&self) -> ClienteleResult<Vec<E>> {
        let key = all_key::<E>();
        if let Some(all) = self.collections.get(&key) {
            tracing::debug!(%key, count = all.len(), "cache hit");
            return Ok(all);
        }

        tracing::debug!(%key, "cache miss");
        let all = self.store.find_all().await?;
        self.collections.set(key, all.clone());
        Ok(all)
    }

    /// Create an entity in the store, then cache it.
    ///
    /// A store error is returned before the cache is touched. A live "all
    /// records" snapshot gets the new entity appended; a missing one is left
    /// for the next [`find_all`](Self::find_all) to rebuild.
    pub async fn create(&self, entity: E) -> ClienteleResult<E> {
        let created = self.store.create(entity).await?;
        self.populate(&created);

        let appended = self.collections.update_live(&all_key::<E>(), |all| {
            all.push(created.clone());
        });
        tracing::debug!(
            entity_type = ?E::entity_type(),
            id = %created.entity_id(),
            collection_patched = appended,
            "cached created entity"
        );
        Ok(created)
    }

    /// Update an entity in the store, then refresh its cache entries.
    ///
    /// `Ok(None)` (not found) and store errors leave the cache untouched. A
    /// live "all records" snapshot has the matching record replaced in place.
    /// If the cached previous version had a different alternate key, that
    /// key's entry is dropped so it no longer resolves to this entity.
    pub async fn update(&self, entity: E) -> ClienteleResult<Option<E>> {
        let Some(updated) = self.store.update(entity).await? else {
            return Ok(None);
        };
        self.drop_replaced_alternate_key(&updated);
        self.populate(&updated);

        let id = updated.entity_id();
        let patched = self.collections.update_live(&all_key::<E>(), |all| {
            for slot in all.iter_mut().filter(|e| e.entity_id() == id) {
                *slot = updated.clone();
            }
        });
        tracing::debug!(
            entity_type = ?E::entity_type(),
            id = %id,
            collection_patched = patched,
            "cached updated entity"
        );
        Ok(Some(updated))
    }

    /// Drop every cached view of `entity`, including the collection snapshot.
    ///
    /// For callers that prefer invalidation over write-population.
    pub fn invalidate(&self, entity: &E) {
        self.records.remove(&id_key::<E>(&entity.entity_id()));
        if let Some(alt) = entity.alternate_key() {
            self.records.remove(&alternate_key::<E>(&alt));
        }
        self.collections.remove(&all_key::<E>());
    }

    /// The id entry is taken out without touching hit counters; `populate`
    /// puts it back.
    fn drop_replaced_alternate_key(&self, updated: &E) {
        let Some(previous) = self.records.remove(&id_key::<E>(&updated.entity_id())) else {
            return;
        };
        if let Some(old) = previous.alternate_key() {
            if updated.alternate_key().as_deref() != Some(old.as_str()) {
                tracing::debug!(alternate_key = %old, "dropping replaced alternate key");
                self.records.remove(&alternate_key::<E>(&old));
            }
        }
    }

    /// Cache `entity` under its id key and, if it has one, its alternate key.
    fn populate(&self, entity: &E) {
        self.records
            .set(id_key::<E>(&entity.entity_id()), entity.clone());
        if let Some(alt) = entity.alternate_key() {
            self.records.set(alternate_key::<E>(&alt), entity.clone());
        }
    }
}
