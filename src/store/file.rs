//! File-backed workspace store
//!
//! One JSON document per workspace holds every collection blob under its
//! key. The document is loaded once at open and rewritten in full on every
//! set/delete, which matches the whole-value contract of [`KvStore`]: the
//! durability unit is the workspace, not the key.

use async_trait::async_trait;
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::debug;

use super::KvStore;
use crate::types::{EngineError, Result};

pub struct FileStore {
    path: PathBuf,
    state: RwLock<Map<String, Value>>,
}

impl FileStore {
    /// Open or create the workspace file, creating parent directories as
    /// needed. An empty or missing file starts an empty workspace.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let state = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().any(|b| !b.is_ascii_whitespace()) => {
                match serde_json::from_slice::<Value>(&bytes)? {
                    Value::Object(map) => map,
                    _ => {
                        return Err(EngineError::Store(format!(
                            "{} is not a JSON object",
                            path.display()
                        )))
                    }
                }
            }
            Ok(_) => Map::new(),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(path = %path.display(), keys = state.len(), "workspace file loaded");
        Ok(Self {
            path,
            state: RwLock::new(state),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self, state: &Map<String, Value>) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl KvStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Value>> {
        let state = self.state.read().await;
        Ok(state.get(key).cloned())
    }

    async fn set(&self, key: &str, value: Value) -> Result<()> {
        let mut state = self.state.write().await;
        state.insert(key.to_string(), value);
        self.persist(&state).await
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let mut state = self.state.write().await;
        if state.remove(key).is_some() {
            self.persist(&state).await?;
        }
        Ok(())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        let state = self.state.read().await;
        Ok(state.keys().cloned().collect())
    }
}
