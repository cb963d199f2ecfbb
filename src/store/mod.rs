//! Workspace persistence
//!
//! The engine is specified against a whole-value key-value boundary:
//! `get(key)` returns an entire collection blob and `set(key, value)`
//! replaces it. [`KvStore`] is that boundary; [`Workspace`] layers typed
//! list/map access and the per-collection write locks that close the
//! lost-update race inherent in read-modify-write cycles over whole blobs.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::types::{EngineError, Result};

/// Collection keys within a workspace blob namespace
pub mod collections {
    /// Profile cache, keyed by the identifier each profile was requested under
    pub const USERS: &str = "users";
    /// Sent invitations, append order
    pub const INVITATIONS: &str = "invitations_sent";
    pub const CHATS: &str = "chats";
    pub const MESSAGES: &str = "messages";
    /// Locally authored posts (flat list)
    pub const POSTS: &str = "posts";
    /// Per-user cached post lists, keyed by user identifier
    pub const CACHED_POSTS: &str = "cached_posts";
    pub const REACTIONS: &str = "reactions";
    pub const COMMENTS: &str = "comments";
    /// Marker set once the seed dataset has been written
    pub const INITIALIZED: &str = "initialized";
}

/// Whole-value store boundary. No partial updates, no queries; every read
/// and write moves an entire collection blob.
#[async_trait]
pub trait KvStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>>;
    async fn set(&self, key: &str, value: Value) -> Result<()>;
    async fn delete(&self, key: &str) -> Result<()>;
    async fn keys(&self) -> Result<Vec<String>>;
}

/// One async mutex per collection. Multi-collection operations must take
/// the locks they need in field declaration order; holding them across the
/// read-modify-write makes each mutation, and the user-delete cascade,
/// atomic with respect to every other engine caller.
#[derive(Default)]
pub struct CollectionLocks {
    pub users: Mutex<()>,
    pub invitations: Mutex<()>,
    pub chats: Mutex<()>,
    pub messages: Mutex<()>,
    pub posts: Mutex<()>,
    pub cached_posts: Mutex<()>,
    pub reactions: Mutex<()>,
    pub comments: Mutex<()>,
}

/// A single workspace: one store namespace plus its collection locks
pub struct Workspace {
    store: Arc<dyn KvStore>,
    pub locks: CollectionLocks,
}

impl Workspace {
    pub fn new(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            locks: CollectionLocks::default(),
        }
    }

    /// Read a list collection; an absent key is an empty list
    pub async fn list(&self, key: &str) -> Result<Vec<Value>> {
        match self.store.get(key).await? {
            None => Ok(Vec::new()),
            Some(Value::Array(items)) => Ok(items),
            Some(_) => Err(EngineError::Store(format!(
                "collection '{}' is not a list",
                key
            ))),
        }
    }

    pub async fn put_list(&self, key: &str, items: Vec<Value>) -> Result<()> {
        self.store.set(key, Value::Array(items)).await
    }

    /// Read a map collection; an absent key is an empty map
    pub async fn map(&self, key: &str) -> Result<Map<String, Value>> {
        match self.store.get(key).await? {
            None => Ok(Map::new()),
            Some(Value::Object(map)) => Ok(map),
            Some(_) => Err(EngineError::Store(format!(
                "collection '{}' is not a map",
                key
            ))),
        }
    }

    pub async fn put_map(&self, key: &str, map: Map<String, Value>) -> Result<()> {
        self.store.set(key, Value::Object(map)).await
    }

    /// Read a list collection into typed entities
    pub async fn typed_list<T: DeserializeOwned>(&self, key: &str) -> Result<Vec<T>> {
        self.list(key)
            .await?
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(EngineError::from))
            .collect()
    }

    pub async fn put_typed_list<T: Serialize>(&self, key: &str, items: &[T]) -> Result<()> {
        let raw = items
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        self.put_list(key, raw).await
    }

    pub async fn flag(&self, key: &str) -> Result<bool> {
        Ok(self
            .store
            .get(key)
            .await?
            .and_then(|v| v.as_bool())
            .unwrap_or(false))
    }

    pub async fn set_flag(&self, key: &str, value: bool) -> Result<()> {
        self.store.set(key, Value::Bool(value)).await
    }
}
