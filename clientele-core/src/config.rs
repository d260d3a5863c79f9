//! Configuration types
//!
//! Values are loaded from environment variables with defaults suitable for
//! local development.

use crate::{ClienteleResult, ConfigError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Default time-to-live for cached records (5 minutes).
pub const DEFAULT_CACHE_TTL_SECS: u64 = 300;
/// Default number of individual records held per entity cache.
pub const DEFAULT_CACHE_ITEM_LIMIT: usize = 100;
/// Default number of collection snapshots held per entity cache.
pub const DEFAULT_COLLECTION_ITEM_LIMIT: usize = 10;
/// Default location of the JSON document store.
pub const DEFAULT_DB_PATH: &str = "db.json";

/// Sizing and expiry settings shared by the entity caches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheSettings {
    /// Entries older than this are treated as absent.
    pub ttl: Duration,
    /// Maximum live individual records before eviction triggers.
    pub item_limit: usize,
    /// Maximum live collection snapshots. Collections are few but large.
    pub collection_item_limit: usize,
    /// Interval of the optional background expiry sweep. `None` disables it.
    pub sweep_interval: Option<Duration>,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            item_limit: DEFAULT_CACHE_ITEM_LIMIT,
            collection_item_limit: DEFAULT_COLLECTION_ITEM_LIMIT,
            sweep_interval: None,
        }
    }
}

/// Master configuration struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClienteleConfig {
    pub cache: CacheSettings,
    /// Path of the JSON document holding users and clients.
    pub db_path: PathBuf,
}

impl Default for ClienteleConfig {
    fn default() -> Self {
        Self {
            cache: CacheSettings::default(),
            db_path: PathBuf::from(DEFAULT_DB_PATH),
        }
    }
}

impl ClienteleConfig {
    /// Create a config from environment variables.
    ///
    /// Environment variables:
    /// - `CLIENTELE_CACHE_TTL_SECS`: record time-to-live (default: 300)
    /// - `CLIENTELE_CACHE_ITEM_LIMIT`: individual records per cache (default: 100)
    /// - `CLIENTELE_COLLECTION_ITEM_LIMIT`: collection snapshots per cache (default: 10)
    /// - `CLIENTELE_SWEEP_INTERVAL_SECS`: background expiry sweep interval (default: disabled)
    /// - `CLIENTELE_DB_PATH`: JSON document path (default: `db.json`)
    ///
    /// Unparseable values fall back to their defaults.
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build a config from an arbitrary variable lookup.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let parse_u64 = |name: &str| lookup(name).and_then(|s| s.trim().parse::<u64>().ok());
        let parse_usize = |name: &str| lookup(name).and_then(|s| s.trim().parse::<usize>().ok());

        let ttl = parse_u64("CLIENTELE_CACHE_TTL_SECS")
            .map(Duration::from_secs)
            .unwrap_or(Duration::from_secs(DEFAULT_CACHE_TTL_SECS));

        let item_limit = parse_usize("CLIENTELE_CACHE_ITEM_LIMIT").unwrap_or(DEFAULT_CACHE_ITEM_LIMIT);

        let collection_item_limit =
            parse_usize("CLIENTELE_COLLECTION_ITEM_LIMIT").unwrap_or(DEFAULT_COLLECTION_ITEM_LIMIT);

        let sweep_interval = parse_u64("CLIENTELE_SWEEP_INTERVAL_SECS").map(Duration::from_secs);

        let db_path = lookup("CLIENTELE_DB_PATH")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DB_PATH));

        Self {
            cache: CacheSettings {
                ttl,
                item_limit,
                collection_item_limit,
                sweep_interval,
            },
            db_path,
        }
    }

    /// Reject settings the cache engine cannot honour.
    pub fn validate(&self) -> ClienteleResult<()> {
        let cache = &self.cache;
        if cache.ttl.is_zero() {
            return Err(invalid("cache.ttl", "0s", "must be greater than zero"));
        }
        if cache.item_limit == 0 {
            return Err(invalid("cache.item_limit", "0", "must be greater than zero"));
        }
        if cache.collection_item_limit == 0 {
            return Err(invalid(
                "cache.collection_item_limit",
                "0",
                "must be greater than zero",
            ));
        }
        if cache.sweep_interval.is_some_and(|d| d.is_zero()) {
            return Err(invalid("cache.sweep_interval", "0s", "must be greater than zero"));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: &str, reason: &str) -> crate::ClienteleError {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
    .into()
}
