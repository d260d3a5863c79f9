//! Persisted store contract consumed by the entity caches.
//!
//! The store is the source of truth. The cache layer calls it on every miss
//! and before every cache mutation caused by a write.

use async_trait::async_trait;
use clientele_core::ClienteleResult;

use crate::entity_cache::CacheableEntity;

/// Authoritative storage for one entity type.
#[async_trait]
pub trait EntityStore<E: CacheableEntity>: Send + Sync {
    /// Get an entity by primary id.
    async fn find_by_id(&self, id: &E::Id) -> ClienteleResult<Option<E>>;

    /// Get an entity by its normalized alternate key.
    ///
    /// Entity types without an alternate key return `Ok(None)`.
    async fn find_by_alternate_key(&self, key: &str) -> ClienteleResult<Option<E>>;

    /// List every entity, in storage order.
    async fn find_all(&self) -> ClienteleResult<Vec<E>>;

    /// Persist a new entity. Fails if the write fails.
    async fn create(&self, entity: E) -> ClienteleResult<E>;

    /// Replace an existing entity.
    ///
    /// `Ok(None)` means no entity has that id; it is not an error.
    async fn update(&self, entity: E) -> ClienteleResult<Option<E>>;
}
