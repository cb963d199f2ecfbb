//! Lifecycle manager
//!
//! Cascading removal of one user's local footprint, plus the bulk clear
//! operations the dashboards expose. The whole cascade runs under the
//! collection locks, acquired in declaration order, and every affected
//! collection is written back before the locks release; no other engine
//! caller can observe a half-applied cascade.

use serde::Serialize;
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::engine::engagement::blob_items;
use crate::engine::ident;
use crate::model::{self, Chat, Comment, Invitation, Message, Reaction};
use crate::store::{collections, Workspace};
use crate::types::{EngineError, Result};

/// Per-kind removal counts returned for caller confirmation. `cached_posts`
/// counts post items inside the removed cache entry, not entries.
#[derive(Debug, Default, Clone, Serialize)]
pub struct CascadeCounts {
    pub invitations: usize,
    pub chats: usize,
    pub messages: usize,
    pub cached_posts: usize,
    pub reactions: usize,
    pub comments: usize,
    pub profile: usize,
}

pub struct LifecycleManager {
    ws: Arc<Workspace>,
}

impl LifecycleManager {
    pub fn new(ws: Arc<Workspace>) -> Self {
        Self { ws }
    }

    /// Remove a user's invitations, chats and messages. With `full`, also
    /// drop the cached profile and the user's cached posts, which takes
    /// every reaction and comment reconciling to one of those posts along.
    pub async fn delete_user(&self, external_id: &str, full: bool) -> Result<CascadeCounts> {
        if external_id.trim().is_empty() {
            return Err(EngineError::invalid("User identifier is required"));
        }

        let _users_guard = self.ws.locks.users.lock().await;
        let _invitations_guard = self.ws.locks.invitations.lock().await;
        let _chats_guard = self.ws.locks.chats.lock().await;
        let _messages_guard = self.ws.locks.messages.lock().await;
        let _cached_guard = self.ws.locks.cached_posts.lock().await;
        let _reactions_guard = self.ws.locks.reactions.lock().await;
        let _comments_guard = self.ws.locks.comments.lock().await;

        let mut counts = CascadeCounts::default();

        let mut invitations: Vec<Invitation> = self.ws.typed_list(collections::INVITATIONS).await?;
        let before = invitations.len();
        invitations.retain(|i| i.recipient_id != external_id);
        counts.invitations = before - invitations.len();

        let mut chats: Vec<Chat> = self.ws.typed_list(collections::CHATS).await?;
        let chat_ids: HashSet<String> = chats
            .iter()
            .filter(|c| c.attendee_id == external_id)
            .map(|c| c.id.clone())
            .collect();
        chats.retain(|c| !chat_ids.contains(&c.id));
        counts.chats = chat_ids.len();

        let mut messages: Vec<Message> = self.ws.typed_list(collections::MESSAGES).await?;
        let before = messages.len();
        messages.retain(|m| !chat_ids.contains(&m.chat_id));
        counts.messages = before - messages.len();

        self.ws.put_typed_list(collections::INVITATIONS, &invitations).await?;
        self.ws.put_typed_list(collections::CHATS, &chats).await?;
        self.ws.put_typed_list(collections::MESSAGES, &messages).await?;

        if full {
            let mut cached = self.ws.map(collections::CACHED_POSTS).await?;
            let mut reactions: Vec<Reaction> = self.ws.typed_list(collections::REACTIONS).await?;
            let mut comments: Vec<Comment> = self.ws.typed_list(collections::COMMENTS).await?;

            if let Some(entry) = cached.remove(external_id) {
                let post_ids: Vec<(Option<String>, Option<String>)> = blob_items(&entry)
                    .iter()
                    .map(|post| {
                        let (raw, social) = model::post_ids(post);
                        (raw.map(str::to_string), social.map(str::to_string))
                    })
                    .collect();
                counts.cached_posts = post_ids.len();

                let matches_any = |candidate: &str| {
                    post_ids.iter().any(|(raw, social)| {
                        ident::matches_ids(candidate, raw.as_deref(), social.as_deref())
                    })
                };

                let before = reactions.len();
                reactions.retain(|r| !matches_any(&r.post_id));
                counts.reactions = before - reactions.len();

                let before = comments.len();
                comments.retain(|c| !matches_any(&c.post_id));
                counts.comments = before - comments.len();
            }

            let mut profiles = self.ws.map(collections::USERS).await?;
            let profile_keys: Vec<String> = profiles
                .iter()
                .filter(|(key, profile)| {
                    key.as_str() == external_id
                        || model::profile_provider_id(profile) == Some(external_id)
                })
                .map(|(key, _)| key.clone())
                .collect();
            counts.profile = profile_keys.len();
            for key in &profile_keys {
                profiles.remove(key);
            }

            self.ws.put_map(collections::CACHED_POSTS, cached).await?;
            self.ws.put_typed_list(collections::REACTIONS, &reactions).await?;
            self.ws.put_typed_list(collections::COMMENTS, &comments).await?;
            self.ws.put_map(collections::USERS, profiles).await?;
        }

        info!(
            user = %external_id,
            full,
            invitations = counts.invitations,
            chats = counts.chats,
            messages = counts.messages,
            profile = counts.profile,
            "user data deleted"
        );
        Ok(counts)
    }

    /// Drop every cached post list and every intercepted reaction and
    /// comment. Locally authored posts stay.
    pub async fn clear_posts_data(&self) -> Result<Value> {
        let _cached_guard = self.ws.locks.cached_posts.lock().await;
        let _reactions_guard = self.ws.locks.reactions.lock().await;
        let _comments_guard = self.ws.locks.comments.lock().await;

        let cached = self.ws.map(collections::CACHED_POSTS).await?;
        let reactions = self.ws.list(collections::REACTIONS).await?;
        let comments = self.ws.list(collections::COMMENTS).await?;
        let cleared = json!({
            "cached_posts": cached.len(),
            "reactions": reactions.len(),
            "comments": comments.len(),
        });

        self.ws.put_map(collections::CACHED_POSTS, serde_json::Map::new()).await?;
        self.ws.put_list(collections::REACTIONS, Vec::new()).await?;
        self.ws.put_list(collections::COMMENTS, Vec::new()).await?;

        info!("posts data cleared");
        Ok(cleared)
    }

    /// Drop the profile cache and every cached post list
    pub async fn clear_caches(&self) -> Result<Value> {
        let _users_guard = self.ws.locks.users.lock().await;
        let _cached_guard = self.ws.locks.cached_posts.lock().await;

        let profiles = self.ws.map(collections::USERS).await?;
        let cached = self.ws.map(collections::CACHED_POSTS).await?;
        let cleared = json!({
            "profiles": profiles.len(),
            "cached_posts": cached.len(),
        });

        self.ws.put_map(collections::USERS, serde_json::Map::new()).await?;
        self.ws.put_map(collections::CACHED_POSTS, serde_json::Map::new()).await?;

        info!("caches cleared");
        Ok(cleared)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::cache::CacheThrough;
    use crate::engine::conversations::ConversationStore;
    use crate::engine::engagement::EngagementStore;
    use crate::engine::relations::RelationshipEngine;
    use crate::model::MessageSender;
    use crate::store::MemoryStore;

    struct Fixture {
        ws: Arc<Workspace>,
        relations: RelationshipEngine,
        conversations: ConversationStore,
        engagement: EngagementStore,
        lifecycle: LifecycleManager,
    }

    fn fixture() -> Fixture {
        let ws = Arc::new(Workspace::new(Arc::new(MemoryStore::new())));
        let cache = Arc::new(CacheThrough::new(ws.clone()));
        Fixture {
            relations: RelationshipEngine::new(ws.clone()),
            conversations: ConversationStore::new(ws.clone()),
            engagement: EngagementStore::new(ws.clone(), cache, None),
            lifecycle: LifecycleManager::new(ws.clone()),
            ws,
        }
    }

    async fn seed_user_footprint(fx: &Fixture, id: &str) {
        let mut profiles = serde_json::Map::new();
        profiles.insert(
            id.to_string(),
            json!({ "provider_id": "ACoAAAjane", "public_identifier": id }),
        );
        fx.ws.put_map(collections::USERS, profiles).await.unwrap();

        fx.relations.send(id, "self", "hello").await.unwrap();
        let (chat, _) = fx
            .conversations
            .ensure_chat("self", id, None, Some("hi"))
            .await
            .unwrap();
        fx.conversations
            .append(&chat.id, MessageSender::Other, "hi back")
            .await
            .unwrap();

        let mut cached = serde_json::Map::new();
        cached.insert(
            id.to_string(),
            json!({ "items": [{ "id": "111", "social_id": "urn:li:ugcPost:111" }] }),
        );
        fx.ws.put_map(collections::CACHED_POSTS, cached).await.unwrap();

        fx.engagement
            .react("urn:li:ugcPost:111", "acct-2", "LIKE")
            .await
            .unwrap();
        fx.engagement.comment("111", "acct-2", "nice").await.unwrap();
    }

    #[tokio::test]
    async fn test_full_cascade_leaves_no_trace() {
        let fx = fixture();
        seed_user_footprint(&fx, "jane-smith-456").await;

        let counts = fx.lifecycle.delete_user("jane-smith-456", true).await.unwrap();
        assert_eq!(counts.invitations, 1);
        assert_eq!(counts.chats, 1);
        assert_eq!(counts.messages, 2);
        assert_eq!(counts.cached_posts, 1);
        assert_eq!(counts.reactions, 1);
        assert_eq!(counts.comments, 1);
        assert_eq!(counts.profile, 1);

        assert!(fx.ws.list(collections::INVITATIONS).await.unwrap().is_empty());
        assert!(fx.ws.list(collections::CHATS).await.unwrap().is_empty());
        assert!(fx.ws.list(collections::MESSAGES).await.unwrap().is_empty());
        assert!(fx.ws.map(collections::CACHED_POSTS).await.unwrap().is_empty());
        assert!(fx.ws.list(collections::REACTIONS).await.unwrap().is_empty());
        assert!(fx.ws.list(collections::COMMENTS).await.unwrap().is_empty());
        assert!(fx.ws.map(collections::USERS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_plain_delete_keeps_caches() {
        let fx = fixture();
        seed_user_footprint(&fx, "jane-smith-456").await;

        let counts = fx.lifecycle.delete_user("jane-smith-456", false).await.unwrap();
        assert_eq!(counts.invitations, 1);
        assert_eq!(counts.chats, 1);
        assert_eq!(counts.messages, 2);
        assert_eq!(counts.cached_posts, 0);
        assert_eq!(counts.profile, 0);

        assert!(fx.ws.list(collections::INVITATIONS).await.unwrap().is_empty());
        assert_eq!(fx.ws.map(collections::USERS).await.unwrap().len(), 1);
        assert_eq!(fx.ws.map(collections::CACHED_POSTS).await.unwrap().len(), 1);
        assert_eq!(fx.ws.list(collections::REACTIONS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_profile_removed_by_provider_id_scan() {
        let fx = fixture();
        let mut profiles = serde_json::Map::new();
        profiles.insert(
            "jane-smith-456".to_string(),
            json!({ "provider_id": "ACoAAAjane" }),
        );
        fx.ws.put_map(collections::USERS, profiles).await.unwrap();

        let counts = fx.lifecycle.delete_user("ACoAAAjane", true).await.unwrap();
        assert_eq!(counts.profile, 1);
        assert!(fx.ws.map(collections::USERS).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_identifier_rejected() {
        let fx = fixture();
        assert!(fx.lifecycle.delete_user("  ", true).await.is_err());
    }

    #[tokio::test]
    async fn test_clear_posts_data_keeps_local_posts() {
        let fx = fixture();
        seed_user_footprint(&fx, "jane-smith-456").await;
        fx.engagement.create_post("self", "mine").await.unwrap();

        let cleared = fx.lifecycle.clear_posts_data().await.unwrap();
        assert_eq!(cleared["cached_posts"], json!(1));
        assert_eq!(cleared["reactions"], json!(1));
        assert_eq!(cleared["comments"], json!(1));

        assert!(fx.ws.map(collections::CACHED_POSTS).await.unwrap().is_empty());
        assert!(fx.ws.list(collections::REACTIONS).await.unwrap().is_empty());
        assert_eq!(fx.ws.list(collections::POSTS).await.unwrap().len(), 1);
        // profile cache untouched
        assert_eq!(fx.ws.map(collections::USERS).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_clear_caches_scope() {
        let fx = fixture();
        seed_user_footprint(&fx, "jane-smith-456").await;

        let cleared = fx.lifecycle.clear_caches().await.unwrap();
        assert_eq!(cleared["profiles"], json!(1));
        assert_eq!(cleared["cached_posts"], json!(1));

        assert!(fx.ws.map(collections::USERS).await.unwrap().is_empty());
        assert!(fx.ws.map(collections::CACHED_POSTS).await.unwrap().is_empty());
        // interaction history survives a cache clear
        assert_eq!(fx.ws.list(collections::INVITATIONS).await.unwrap().len(), 1);
        assert_eq!(fx.ws.list(collections::MESSAGES).await.unwrap().len(), 2);
    }
}
