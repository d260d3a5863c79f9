//! Clientele Core - Entity Types
//!
//! Data structures, errors and configuration shared by every Clientele crate.
//! This crate contains no caching or persistence logic.

pub mod config;
pub mod entities;
pub mod error;
pub mod identity;

pub use config::{
    CacheSettings, ClienteleConfig, DEFAULT_CACHE_ITEM_LIMIT, DEFAULT_CACHE_TTL_SECS,
    DEFAULT_COLLECTION_ITEM_LIMIT, DEFAULT_DB_PATH,
};
pub use entities::{Client, CreditDetails, User};
pub use error::{ClienteleError, ClienteleResult, ConfigError, DomainError, StorageError};
pub use identity::{ClientId, EntityIdType, UserId};

use serde::{Deserialize, Serialize};

/// Entity type discriminator used in errors and log fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityType {
    User,
    Client,
}

impl EntityType {
    /// Lowercase name, used as the cache key prefix.
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityType::User => "user",
            EntityType::Client => "client",
        }
    }
}
