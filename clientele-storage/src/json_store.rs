//! JSON document store.
//!
//! All users and clients live in a single JSON document:
//!
//! ```json
//! { "users": [ ... ], "clients": [ ... ] }
//! ```
//!
//! The document is read lazily on first access (a missing file is an empty
//! document) and rewritten in full after every successful write. Writes go to
//! a sibling temp file which is then renamed over the original.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use clientele_core::{Client, ClienteleError, ClienteleResult, StorageError, User};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::sync::{OnceCell, RwLock};

use crate::entity_cache::CacheableEntity;
use crate::store::EntityStore;

/// On-disk document layout.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DatabaseSchema {
    #[serde(default)]
    pub users: Vec<User>,
    #[serde(default)]
    pub clients: Vec<Client>,
}

/// Selects the list inside [`DatabaseSchema`] holding an entity type.
pub trait JsonTable: CacheableEntity + Serialize + DeserializeOwned {
    fn table(db: &DatabaseSchema) -> &Vec<Self>;
    fn table_mut(db: &mut DatabaseSchema) -> &mut Vec<Self>;
}

impl JsonTable for User {
    fn table(db: &DatabaseSchema) -> &Vec<Self> {
        &db.users
    }

    fn table_mut(db: &mut DatabaseSchema) -> &mut Vec<Self> {
        &mut db.users
    }
}

impl JsonTable for Client {
    fn table(db: &DatabaseSchema) -> &Vec<Self> {
        &db.clients
    }

    fn table_mut(db: &mut DatabaseSchema) -> &mut Vec<Self> {
        &mut db.clients
    }
}

/// [`EntityStore`] backed by one JSON file, shared by every entity type.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    db: OnceCell<RwLock<DatabaseSchema>>,
}

impl JsonFileStore {
    /// Create a store for `path`. Nothing is read until first use.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            db: OnceCell::new(),
        }
    }

    /// Get the document path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn db(&self) -> ClienteleResult<&RwLock<DatabaseSchema>> {
        self.db
            .get_or_try_init(|| async {
                let schema = self.load().await?;
                Ok::<_, ClienteleError>(RwLock::new(schema))
            })
            .await
    }

    async fn load(&self) -> ClienteleResult<DatabaseSchema> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No database file, starting empty");
                return Ok(DatabaseSchema::default());
            }
            Err(err) => return Err(self.io_error(err).into()),
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(DatabaseSchema::default());
        }

        let schema: DatabaseSchema =
            serde_json::from_slice(&bytes).map_err(|e| StorageError::Serialization {
                reason: format!("{}: {}", self.path.display(), e),
            })?;
        tracing::debug!(
            path = %self.path.display(),
            users = schema.users.len(),
            clients = schema.clients.len(),
            "Loaded database"
        );
        Ok(schema)
    }

    async fn persist(&self, schema: &DatabaseSchema) -> ClienteleResult<()> {
        let bytes = serde_json::to_vec_pretty(schema).map_err(|e| StorageError::Serialization {
            reason: e.to_string(),
        })?;

        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        tokio::fs::write(&tmp, &bytes)
            .await
            .map_err(|e| self.io_error(e))?;
        tokio::fs::rename(&tmp, &self.path)
            .await
            .map_err(|e| self.io_error(e))?;
        Ok(())
    }

    fn io_error(&self, err: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.display().to_string(),
            reason: err.to_string(),
        }
    }

    /// Apply `change` to a copy of the document, persist it, then publish it.
    ///
    /// The in-memory document is only replaced once the file write succeeds.
    async fn write_with<R, F>(&self, change: F) -> ClienteleResult<R>
    where
        F: FnOnce(&mut DatabaseSchema) -> ClienteleResult<R>,
    {
        let lock = self.db().await?;
        let mut current = lock.write().await;
        let mut next = current.clone();
        let result = change(&mut next)?;
        self.persist(&next).await?;
        *current = next;
        Ok(result)
    }
}

#[async_trait]
impl<E: JsonTable> EntityStore<E> for JsonFileStore {
    async fn find_by_id(&self, id: &E::Id) -> ClienteleResult<Option<E>> {
        let db = self.db().await?.read().await;
        Ok(E::table(&db).iter().find(|e| e.entity_id() == *id).cloned())
    }

    async fn find_by_alternate_key(&self, key: &str) -> ClienteleResult<Option<E>> {
        let wanted = E::normalize_alternate_key(key);
        let db = self.db().await?.read().await;
        Ok(E::table(&db)
            .iter()
            .find(|e| e.alternate_key().as_deref() == Some(wanted.as_str()))
            .cloned())
    }

    async fn find_all(&self) -> ClienteleResult<Vec<E>> {
        let db = self.db().await?.read().await;
        Ok(E::table(&db).clone())
    }

    async fn create(&self, entity: E) -> ClienteleResult<E> {
        self.write_with(|db| {
            let table = E::table_mut(db);
            let id = entity.entity_id();
            if table.iter().any(|e| e.entity_id() == id) {
                return Err(StorageError::InsertFailed {
                    entity_type: E::entity_type(),
                    reason: format!("{} already exists", id),
                }
                .into());
            }
            table.push(entity.clone());
            Ok(entity)
        })
        .await
    }

    async fn update(&self, entity: E) -> ClienteleResult<Option<E>> {
        let id = entity.entity_id();
        {
            let db = self.db().await?.read().await;
            if !E::table(&db).iter().any(|e| e.entity_id() == id) {
                return Ok(None);
            }
        }

        self.write_with(|db| {
            match E::table_mut(db).iter_mut().find(|e| e.entity_id() == id) {
                Some(slot) => {
                    *slot = entity.clone();
                    Ok(Some(entity))
                }
                None => Ok(None),
            }
        })
        .await
    }
}
