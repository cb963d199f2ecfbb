//! Workspace rollups for the dashboards
//!
//! Two read-only aggregations over every collection at once. Both take the
//! collection locks in the canonical order so they never observe half of a
//! cascade, and both keep the display counters and the intercepted record
//! lists separate fields on each post.

use serde_json::{json, Map, Value};
use std::collections::HashSet;
use std::sync::Arc;

use crate::engine::engagement::blob_items;
use crate::engine::ident;
use crate::engine::relations;
use crate::model::{self, Chat, Comment, Invitation, InvitationStatus, Message, Reaction};
use crate::store::{collections, Workspace};
use crate::types::Result;

pub struct Aggregator {
    ws: Arc<Workspace>,
}

impl Aggregator {
    pub fn new(ws: Arc<Workspace>) -> Self {
        Self { ws }
    }

    /// Every cached profile enriched with its recomputed distance and its
    /// posts, plus the raw collections and workspace-wide totals
    pub async fn user_rollup(&self) -> Result<Value> {
        let _users_guard = self.ws.locks.users.lock().await;
        let _invitations_guard = self.ws.locks.invitations.lock().await;
        let _chats_guard = self.ws.locks.chats.lock().await;
        let _messages_guard = self.ws.locks.messages.lock().await;
        let _posts_guard = self.ws.locks.posts.lock().await;
        let _cached_guard = self.ws.locks.cached_posts.lock().await;
        let _reactions_guard = self.ws.locks.reactions.lock().await;
        let _comments_guard = self.ws.locks.comments.lock().await;

        let profiles = self.ws.map(collections::USERS).await?;
        let invitations: Vec<Invitation> = self.ws.typed_list(collections::INVITATIONS).await?;
        let chats: Vec<Chat> = self.ws.typed_list(collections::CHATS).await?;
        let messages: Vec<Message> = self.ws.typed_list(collections::MESSAGES).await?;
        let local_posts = self.ws.list(collections::POSTS).await?;
        let cached_posts = self.ws.map(collections::CACHED_POSTS).await?;
        let reactions: Vec<Reaction> = self.ws.typed_list(collections::REACTIONS).await?;
        let comments: Vec<Comment> = self.ws.typed_list(collections::COMMENTS).await?;

        let mut users = Vec::with_capacity(profiles.len());
        for (key, profile) in profiles.iter() {
            let mut enriched = profile.clone();
            let candidates = candidate_ids(key, profile);
            let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
            let distance = relations::derive_distance_any(&invitations, &refs);
            model::set_network_distance(&mut enriched, distance);

            let posts = posts_of(&candidates, &cached_posts, &local_posts)
                .into_iter()
                .map(|p| enrich_post(p, &reactions, &comments))
                .collect::<Result<Vec<_>>>()?;
            if let Some(obj) = enriched.as_object_mut() {
                obj.insert("posts".to_string(), Value::Array(posts));
            }
            users.push(enriched);
        }

        let connections = invitations
            .iter()
            .filter(|i| i.status == InvitationStatus::Accepted)
            .count();
        let pending = invitations
            .iter()
            .filter(|i| i.status == InvitationStatus::Pending)
            .count();

        Ok(json!({
            "users": users,
            "invitations": invitations,
            "chats": chats,
            "messages": messages,
            "reactions": reactions,
            "comments": comments,
            "stats": {
                "total_users": users.len(),
                "connections": connections,
                "pending_invites": pending,
                "total_messages": messages.len(),
                "total_reactions": reactions.len(),
                "total_comments": comments.len(),
            },
        }))
    }

    /// Every post the workspace knows about, merged and de-duplicated,
    /// with authorship and intercepted engagement attached
    pub async fn post_rollup(&self) -> Result<Value> {
        let _users_guard = self.ws.locks.users.lock().await;
        let _posts_guard = self.ws.locks.posts.lock().await;
        let _cached_guard = self.ws.locks.cached_posts.lock().await;
        let _reactions_guard = self.ws.locks.reactions.lock().await;
        let _comments_guard = self.ws.locks.comments.lock().await;

        let profiles = self.ws.map(collections::USERS).await?;
        let local_posts = self.ws.list(collections::POSTS).await?;
        let cached_posts = self.ws.map(collections::CACHED_POSTS).await?;
        let reactions: Vec<Reaction> = self.ws.typed_list(collections::REACTIONS).await?;
        let comments: Vec<Comment> = self.ws.typed_list(collections::COMMENTS).await?;

        // cached copies first so they win the de-duplication
        let mut merged: Vec<Value> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();
        for entry in cached_posts.values() {
            for item in blob_items(entry) {
                push_unique(&mut merged, &mut seen, item.clone());
            }
        }
        for post in &local_posts {
            push_unique(&mut merged, &mut seen, post.clone());
        }

        let mut posts = Vec::with_capacity(merged.len());
        for post in merged {
            let post = attach_author(post, &profiles);
            posts.push(enrich_post(post, &reactions, &comments)?);
        }

        posts.sort_by(|a, b| {
            let ta = model::timestamp_or_epoch(a.get("created_at").and_then(|v| v.as_str()));
            let tb = model::timestamp_or_epoch(b.get("created_at").and_then(|v| v.as_str()));
            tb.cmp(&ta)
        });

        let with_activity = posts
            .iter()
            .filter(|p| {
                counter(p, "intercepted_reaction_count") > 0
                    || counter(p, "intercepted_comment_count") > 0
            })
            .count();

        Ok(json!({
            "posts": posts,
            "reactions": reactions,
            "comments": comments,
            "stats": {
                "total_posts": posts.len(),
                "total_reactions": reactions.len(),
                "total_comments": comments.len(),
                "posts_with_activity": with_activity,
            },
        }))
    }
}

/// Identifiers one cached profile answers to: its cache key, provider id
/// and public identifier, de-duplicated
pub(crate) fn candidate_ids(key: &str, profile: &Value) -> Vec<String> {
    let mut ids = vec![key.to_string()];
    for field in ["provider_id", "public_identifier"] {
        if let Some(value) = profile.get(field).and_then(|v| v.as_str()) {
            if !value.is_empty() && !ids.iter().any(|known| known == value) {
                ids.push(value.to_string());
            }
        }
    }
    ids
}

/// Posts for one profile: the cached entry under any of its identifiers
/// wins; otherwise locally authored posts. Local reads only, no fetching.
fn posts_of(
    candidates: &[String],
    cached: &Map<String, Value>,
    local: &[Value],
) -> Vec<Value> {
    for id in candidates {
        if let Some(entry) = cached.get(id) {
            return blob_items(entry).to_vec();
        }
    }

    local
        .iter()
        .filter(|post| {
            post.get("author_id")
                .and_then(|v| v.as_str())
                .map(|author| candidates.iter().any(|c| c == author))
                .unwrap_or(false)
        })
        .cloned()
        .collect()
}

fn push_unique(merged: &mut Vec<Value>, seen: &mut HashSet<(String, String)>, post: Value) {
    let (raw, social) = model::post_ids(&post);
    let key = (
        raw.unwrap_or_default().to_string(),
        social.unwrap_or_default().to_string(),
    );
    if seen.insert(key) {
        merged.push(post);
    }
}

/// Reverse profile lookup by author id; name and headline are only set
/// when some cached profile answers
fn attach_author(mut post: Value, profiles: &Map<String, Value>) -> Value {
    let author = post
        .get("author_id")
        .and_then(|v| v.as_str())
        .map(str::to_string);

    if let Some(author_id) = author {
        let profile = profiles
            .iter()
            .find(|(key, p)| **key == author_id || model::profile_matches(p, &author_id))
            .map(|(_, p)| p);
        if let (Some(profile), Some(obj)) = (profile, post.as_object_mut()) {
            obj.insert(
                "author_name".to_string(),
                Value::String(model::profile_display_name(profile)),
            );
            if let Some(headline) = model::profile_headline(profile) {
                obj.insert(
                    "author_headline".to_string(),
                    Value::String(headline.to_string()),
                );
            }
        }
    }
    post
}

fn enrich_post(mut post: Value, reactions: &[Reaction], comments: &[Comment]) -> Result<Value> {
    let (raw, social) = {
        let (r, s) = model::post_ids(&post);
        (r.map(str::to_string), s.map(str::to_string))
    };

    let matched_reactions: Vec<&Reaction> = reactions
        .iter()
        .filter(|r| ident::matches_ids(&r.post_id, raw.as_deref(), social.as_deref()))
        .collect();
    let matched_comments: Vec<&Comment> = comments
        .iter()
        .filter(|c| ident::matches_ids(&c.post_id, raw.as_deref(), social.as_deref()))
        .collect();

    if let Some(obj) = post.as_object_mut() {
        obj.insert(
            "intercepted_reaction_count".to_string(),
            Value::from(matched_reactions.len()),
        );
        obj.insert(
            "intercepted_comment_count".to_string(),
            Value::from(matched_comments.len()),
        );
        obj.insert(
            "intercepted_reactions".to_string(),
            serde_json::to_value(&matched_reactions)?,
        );
        obj.insert(
            "intercepted_comments".to_string(),
            serde_json::to_value(&matched_comments)?,
        );
    }
    Ok(post)
}

fn counter(post: &Value, field: &str) -> u64 {
    post.get(field).and_then(|v| v.as_u64()).unwrap_or(0)
}
