//! Engagement store
//!
//! Posts authored through the engine live in the flat `posts` list; posts
//! fetched from upstream land in per-user cached blobs. A post can exist in
//! both places at once, so every intercepted reaction or comment walks both
//! and bumps the display counter on each copy the identifier reconciler can
//! match. Counters only move up; deleting an intercepted record leaves them
//! where they are, since they mirror what the upstream would report rather
//! than tallying local records.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::cache::{CacheKind, CacheThrough};
use crate::engine::ident;
use crate::model::{Comment, Post, Reaction};
use crate::store::{collections, Workspace};
use crate::types::{EngineError, Result};
use crate::upstream::UpstreamClient;

pub struct EngagementStore {
    ws: Arc<Workspace>,
    cache: Arc<CacheThrough>,
    upstream: Option<Arc<UpstreamClient>>,
}

impl EngagementStore {
    pub fn new(
        ws: Arc<Workspace>,
        cache: Arc<CacheThrough>,
        upstream: Option<Arc<UpstreamClient>>,
    ) -> Self {
        Self { ws, cache, upstream }
    }

    pub async fn create_post(&self, author_id: &str, text: &str) -> Result<Post> {
        if text.trim().is_empty() {
            return Err(EngineError::invalid("Post text is required"));
        }

        let _posts_guard = self.ws.locks.posts.lock().await;
        let mut posts: Vec<Post> = self.ws.typed_list(collections::POSTS).await?;
        let post = Post::new(author_id, text);
        posts.push(post.clone());
        self.ws.put_typed_list(collections::POSTS, &posts).await?;

        info!(post = %post.id, author = %post.author_id, "post created");
        Ok(post)
    }

    pub async fn local_posts(&self) -> Result<Vec<Post>> {
        self.ws.typed_list(collections::POSTS).await
    }

    /// Resolve one locally authored post by its raw id
    pub async fn local_post(&self, post_id: &str) -> Result<Option<Post>> {
        let posts: Vec<Post> = self.ws.typed_list(collections::POSTS).await?;
        Ok(posts.into_iter().find(|p| p.id == post_id))
    }

    /// Record a reaction and bump `reaction_counter` on every stored copy
    /// of the post. Zero matches is fine; the record is kept either way.
    pub async fn react(
        &self,
        post_id: &str,
        account_id: &str,
        reaction_type: &str,
    ) -> Result<Reaction> {
        if post_id.trim().is_empty() {
            return Err(EngineError::invalid("Post id is required"));
        }

        let _posts_guard = self.ws.locks.posts.lock().await;
        let _cached_guard = self.ws.locks.cached_posts.lock().await;
        let _reactions_guard = self.ws.locks.reactions.lock().await;

        let reaction = Reaction::new(post_id, account_id, reaction_type);
        let mut reactions: Vec<Reaction> = self.ws.typed_list(collections::REACTIONS).await?;
        reactions.push(reaction.clone());
        self.ws.put_typed_list(collections::REACTIONS, &reactions).await?;

        let touched = self.bump_counters(post_id, "reaction_counter").await?;
        debug!(post = %post_id, locations = touched, "reaction counters bumped");
        info!(reaction = %reaction.id, post = %post_id, "reaction recorded");
        Ok(reaction)
    }

    /// Symmetric to [`react`](Self::react), bumping `comment_counter`
    pub async fn comment(&self, post_id: &str, account_id: &str, text: &str) -> Result<Comment> {
        if post_id.trim().is_empty() {
            return Err(EngineError::invalid("Post id is required"));
        }
        if text.trim().is_empty() {
            return Err(EngineError::invalid("Comment text is required"));
        }

        let _posts_guard = self.ws.locks.posts.lock().await;
        let _cached_guard = self.ws.locks.cached_posts.lock().await;
        let _comments_guard = self.ws.locks.comments.lock().await;

        let comment = Comment::new(post_id, account_id, text);
        let mut comments: Vec<Comment> = self.ws.typed_list(collections::COMMENTS).await?;
        comments.push(comment.clone());
        self.ws.put_typed_list(collections::COMMENTS, &comments).await?;

        let touched = self.bump_counters(post_id, "comment_counter").await?;
        debug!(post = %post_id, locations = touched, "comment counters bumped");
        info!(comment = %comment.id, post = %post_id, "comment recorded");
        Ok(comment)
    }

    /// Remove an intercepted reaction by id; absent ids are a quiet no-op
    pub async fn delete_reaction(&self, reaction_id: &str) -> Result<bool> {
        let _guard = self.ws.locks.reactions.lock().await;
        let mut reactions: Vec<Reaction> = self.ws.typed_list(collections::REACTIONS).await?;
        let before = reactions.len();
        reactions.retain(|r| r.id != reaction_id);
        let removed = reactions.len() != before;
        if removed {
            self.ws.put_typed_list(collections::REACTIONS, &reactions).await?;
            info!(reaction = %reaction_id, "reaction deleted");
        }
        Ok(removed)
    }

    pub async fn delete_comment(&self, comment_id: &str) -> Result<bool> {
        let _guard = self.ws.locks.comments.lock().await;
        let mut comments: Vec<Comment> = self.ws.typed_list(collections::COMMENTS).await?;
        let before = comments.len();
        comments.retain(|c| c.id != comment_id);
        let removed = comments.len() != before;
        if removed {
            self.ws.put_typed_list(collections::COMMENTS, &comments).await?;
            info!(comment = %comment_id, "comment deleted");
        }
        Ok(removed)
    }

    pub async fn reactions(&self) -> Result<Vec<Reaction>> {
        self.ws.typed_list(collections::REACTIONS).await
    }

    pub async fn comments(&self) -> Result<Vec<Comment>> {
        self.ws.typed_list(collections::COMMENTS).await
    }

    /// Posts of one user, cache-through. A cached blob under the requested
    /// identifier wins; a miss goes upstream when configured; when neither
    /// has an entry, the flat list is filtered by authorship instead.
    pub async fn posts_for(&self, identifier: &str) -> Result<Vec<Value>> {
        let upstream = self.upstream.clone();
        let key = identifier.to_string();
        let fetched = self
            .cache
            .get_or_fetch(CacheKind::Posts, identifier, || async move {
                match upstream {
                    Some(client) => client.fetch_user_posts(&key).await,
                    None => Ok(None),
                }
            })
            .await?;

        match fetched {
            Some(entry) => Ok(blob_items(&entry).to_vec()),
            None => {
                let posts: Vec<Post> = self.ws.typed_list(collections::POSTS).await?;
                posts
                    .iter()
                    .filter(|p| p.author_id == identifier)
                    .map(|p| serde_json::to_value(p).map_err(EngineError::from))
                    .collect()
            }
        }
    }

    /// Caller holds the posts and cached_posts locks
    async fn bump_counters(&self, candidate: &str, field: &str) -> Result<usize> {
        let mut touched = 0;

        let mut posts = self.ws.list(collections::POSTS).await?;
        let mut changed = false;
        for post in posts.iter_mut() {
            if ident::matches_post(candidate, post) {
                bump_field(post, field);
                touched += 1;
                changed = true;
            }
        }
        if changed {
            self.ws.put_list(collections::POSTS, posts).await?;
        }

        let mut cached = self.ws.map(collections::CACHED_POSTS).await?;
        let mut changed = false;
        for entry in cached.values_mut() {
            if let Some(items) = blob_items_mut(entry) {
                for item in items.iter_mut() {
                    if ident::matches_post(candidate, item) {
                        bump_field(item, field);
                        touched += 1;
                        changed = true;
                    }
                }
            }
        }
        if changed {
            self.ws.put_map(collections::CACHED_POSTS, cached).await?;
        }

        Ok(touched)
    }
}

/// Items of a cached post-list entry, tolerating both the `{items: [...]}`
/// layout this engine writes and a bare array from an older workspace file
pub(crate) fn blob_items(entry: &Value) -> &[Value] {
    match entry {
        Value::Array(items) => items,
        Value::Object(map) => map
            .get("items")
            .and_then(|v| v.as_array())
            .map(Vec::as_slice)
            .unwrap_or(&[]),
        _ => &[],
    }
}

fn blob_items_mut(entry: &mut Value) -> Option<&mut Vec<Value>> {
    match entry {
        Value::Array(items) => Some(items),
        Value::Object(map) => map.get_mut("items").and_then(|v| v.as_array_mut()),
        _ => None,
    }
}

fn bump_field(post: &mut Value, field: &str) {
    if let Some(obj) = post.as_object_mut() {
        let next = obj.get(field).and_then(|v| v.as_u64()).unwrap_or(0) + 1;
        obj.insert(field.to_string(), Value::from(next));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde_json::json;

    fn fixtures() -> (Arc<Workspace>, EngagementStore) {
        let ws = Arc::new(Workspace::new(Arc::new(MemoryStore::new())));
        let cache = Arc::new(CacheThrough::new(ws.clone()));
        let store = EngagementStore::new(ws.clone(), cache, None);
        (ws, store)
    }

    #[tokio::test]
    async fn test_create_post_rejects_empty_text() {
        let (_, store) = fixtures();
        assert!(store.create_post("self", "   ").await.is_err());
        assert!(store.local_posts().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_counters_bump_in_both_locations() {
        let (ws, store) = fixtures();
        let post = store.create_post("self", "hello world").await.unwrap();

        // plant the same post inside a cached blob for another identifier
        let mut cached = serde_json::Map::new();
        cached.insert(
            "jane-smith-456".to_string(),
            json!({ "items": [serde_json::to_value(&post).unwrap()] }),
        );
        ws.put_map(collections::CACHED_POSTS, cached).await.unwrap();

        store.react(&post.id, "acct-2", "LIKE").await.unwrap();
        store.react(&post.social_id, "acct-3", "PRAISE").await.unwrap();

        let local = &store.local_posts().await.unwrap()[0];
        assert_eq!(local.reaction_counter, 2);

        let cached = ws.map(collections::CACHED_POSTS).await.unwrap();
        let item = &blob_items(&cached["jane-smith-456"])[0];
        assert_eq!(item["reaction_counter"], json!(2));

        assert_eq!(store.reactions().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_react_on_unknown_post_still_records() {
        let (_, store) = fixtures();
        store.react("999", "acct-1", "LIKE").await.unwrap();
        assert_eq!(store.reactions().await.unwrap().len(), 1);
        assert!(store.local_post("999").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_comment_bumps_comment_counter_only() {
        let (_, store) = fixtures();
        let post = store.create_post("self", "first post").await.unwrap();
        store.comment(&post.id, "acct-2", "nice one").await.unwrap();

        let local = &store.local_posts().await.unwrap()[0];
        assert_eq!(local.comment_counter, 1);
        assert_eq!(local.reaction_counter, 0);

        assert!(store.comment(&post.id, "acct-2", " ").await.is_err());
    }

    #[tokio::test]
    async fn test_delete_leaves_counters_alone() {
        let (_, store) = fixtures();
        let post = store.create_post("self", "hello").await.unwrap();
        let reaction = store.react(&post.id, "acct-2", "LIKE").await.unwrap();

        assert!(store.delete_reaction(&reaction.id).await.unwrap());
        assert!(store.reactions().await.unwrap().is_empty());
        assert_eq!(store.local_posts().await.unwrap()[0].reaction_counter, 1);

        // second delete is a no-op, not an error
        assert!(!store.delete_reaction(&reaction.id).await.unwrap());
    }

    #[tokio::test]
    async fn test_posts_for_prefers_cached_blob() {
        let (ws, store) = fixtures();
        store.create_post("jane-smith-456", "local post").await.unwrap();

        let mut cached = serde_json::Map::new();
        cached.insert(
            "jane-smith-456".to_string(),
            json!({ "items": [{ "id": "111", "text": "cached post" }] }),
        );
        ws.put_map(collections::CACHED_POSTS, cached).await.unwrap();

        let items = store.posts_for("jane-smith-456").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["text"], json!("cached post"));
    }

    #[tokio::test]
    async fn test_posts_for_falls_back_to_authored_posts() {
        let (_, store) = fixtures();
        store.create_post("john-doe-123", "mine").await.unwrap();
        store.create_post("someone-else", "theirs").await.unwrap();

        let items = store.posts_for("john-doe-123").await.unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0]["text"], json!("mine"));
    }

    #[tokio::test]
    async fn test_local_post_matches_raw_id_only() {
        let (_, store) = fixtures();
        let post = store.create_post("self", "hello").await.unwrap();
        assert!(store.local_post(&post.id).await.unwrap().is_some());
        assert!(store.local_post(&post.social_id).await.unwrap().is_none());
    }
}
