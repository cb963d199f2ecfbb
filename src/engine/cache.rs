//! Cache-through store
//!
//! Generic get-or-fetch over the per-kind cache blobs. A hit returns
//! immediately and never revalidates; a miss runs the supplied fetch and
//! writes the result back exactly once. Upstream failure is not an error
//! here: it degrades to "nothing cached, nothing found".
//!
//! The kind's collection lock is held across the whole miss path, so two
//! concurrent misses on the same kind cannot both fetch and both write.

use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::ids;
use crate::store::{collections, CollectionLocks, Workspace};
use crate::types::Result;

/// The two cached entity kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheKind {
    /// Profiles, keyed by requested identifier
    Profiles,
    /// Per-user post lists (`{"items": [...]}`), keyed by user identifier
    Posts,
}

impl CacheKind {
    pub fn key(&self) -> &'static str {
        match self {
            CacheKind::Profiles => collections::USERS,
            CacheKind::Posts => collections::CACHED_POSTS,
        }
    }

    fn lock<'a>(&self, locks: &'a CollectionLocks) -> &'a Mutex<()> {
        match self {
            CacheKind::Profiles => &locks.users,
            CacheKind::Posts => &locks.cached_posts,
        }
    }
}

pub struct CacheThrough {
    ws: Arc<Workspace>,
}

impl CacheThrough {
    pub fn new(ws: Arc<Workspace>) -> Self {
        Self { ws }
    }

    /// Get-or-fetch for one cache entry. The fetch closure is only invoked
    /// on a miss; its failure, and a fetch that finds nothing, both come
    /// back as `Ok(None)`. Object results are stamped with `fetched_at`
    /// before being written back.
    pub async fn get_or_fetch<F, Fut>(
        &self,
        kind: CacheKind,
        key: &str,
        fetch: F,
    ) -> Result<Option<Value>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<Option<Value>>>,
    {
        let _guard = kind.lock(&self.ws.locks).lock().await;

        let mut entries = self.ws.map(kind.key()).await?;
        if let Some(hit) = entries.get(key) {
            debug!(kind = ?kind, key, "cache hit");
            return Ok(Some(hit.clone()));
        }

        let fetched = match fetch().await {
            Ok(Some(value)) => value,
            Ok(None) => {
                debug!(kind = ?kind, key, "cache miss, upstream had nothing");
                return Ok(None);
            }
            Err(e) => {
                warn!(kind = ?kind, key, error = %e, "fetch failed, treating as miss");
                return Ok(None);
            }
        };

        let entry = stamp(fetched);
        entries.insert(key.to_string(), entry.clone());
        self.ws.put_map(kind.key(), entries).await?;
        debug!(kind = ?kind, key, "cache filled from fetch");
        Ok(Some(entry))
    }

    /// Insert a locally synthesized entry, stamped like a fetched one
    pub async fn insert(&self, kind: CacheKind, key: &str, value: Value) -> Result<Value> {
        let _guard = kind.lock(&self.ws.locks).lock().await;

        let entry = stamp(value);
        let mut entries = self.ws.map(kind.key()).await?;
        entries.insert(key.to_string(), entry.clone());
        self.ws.put_map(kind.key(), entries).await?;
        Ok(entry)
    }
}

fn stamp(mut value: Value) -> Value {
    if let Some(obj) = value.as_object_mut() {
        obj.insert("fetched_at".to_string(), Value::String(ids::now_iso()));
    }
    value
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn cache() -> CacheThrough {
        CacheThrough::new(Arc::new(Workspace::new(Arc::new(MemoryStore::new()))))
    }

    #[tokio::test]
    async fn test_hit_never_refetches() {
        let cache = cache();
        let calls = Arc::new(AtomicUsize::new(0));

        for _ in 0..2 {
            let calls = Arc::clone(&calls);
            let got = cache
                .get_or_fetch(CacheKind::Profiles, "u1", move || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok(Some(json!({"first_name": "Ada"})))
                })
                .await
                .unwrap();
            assert_eq!(got.unwrap()["first_name"], json!("Ada"));
        }

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fetch_failure_degrades_to_miss() {
        let cache = cache();

        let got = cache
            .get_or_fetch(CacheKind::Profiles, "u1", || async {
                Err(crate::types::EngineError::Upstream("socket closed".into()))
            })
            .await
            .unwrap();
        assert!(got.is_none());

        // nothing was written; the next call fetches again
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        cache
            .get_or_fetch(CacheKind::Profiles, "u1", move || async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_filled_entry_is_stamped() {
        let cache = cache();

        let got = cache
            .get_or_fetch(CacheKind::Posts, "u1", || async {
                Ok(Some(json!({"items": [{"id": "1"}]})))
            })
            .await
            .unwrap()
            .unwrap();

        let stamp = got["fetched_at"].as_str().unwrap();
        assert!(chrono::DateTime::parse_from_rfc3339(stamp).is_ok());
    }

    #[tokio::test]
    async fn test_insert_behaves_like_a_fill() {
        let cache = cache();
        cache
            .insert(CacheKind::Profiles, "u2", json!({"first_name": "Grace"}))
            .await
            .unwrap();

        let got = cache
            .get_or_fetch(CacheKind::Profiles, "u2", || async {
                panic!("must not fetch after insert")
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got["first_name"], json!("Grace"));
        assert!(got.get("fetched_at").is_some());
    }
}
