//! The emulation engine
//!
//! One [`Engine`] per workspace, constructed once and shared behind an
//! `Arc`. It owns the component stores (relationships, conversations,
//! engagement, rollups, lifecycle) over a single [`Workspace`] and carries
//! the cache-through profile path, including the synthetic fallback for
//! identifiers nobody has ever heard of.

pub mod actions;
pub mod cache;
pub mod conversations;
pub mod engagement;
pub mod ident;
pub mod lifecycle;
pub mod relations;
pub mod rollup;

use rand::Rng;
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info};

use crate::engine::cache::{CacheKind, CacheThrough};
use crate::engine::conversations::ConversationStore;
use crate::engine::engagement::EngagementStore;
use crate::engine::lifecycle::LifecycleManager;
use crate::engine::relations::RelationshipEngine;
use crate::engine::rollup::Aggregator;
use crate::ids;
use crate::model;
use crate::store::{collections, Workspace};
use crate::types::{EngineError, Result};
use crate::upstream::UpstreamClient;

pub struct Engine {
    ws: Arc<Workspace>,
    cache: Arc<CacheThrough>,
    upstream: Option<Arc<UpstreamClient>>,
    account_id: String,
    pub relations: RelationshipEngine,
    pub conversations: ConversationStore,
    pub engagement: EngagementStore,
    pub aggregator: Aggregator,
    pub lifecycle: LifecycleManager,
}

impl Engine {
    pub fn new(
        ws: Arc<Workspace>,
        upstream: Option<Arc<UpstreamClient>>,
        account_id: &str,
    ) -> Self {
        let cache = Arc::new(CacheThrough::new(ws.clone()));
        Self {
            relations: RelationshipEngine::new(ws.clone()),
            conversations: ConversationStore::new(ws.clone()),
            engagement: EngagementStore::new(ws.clone(), cache.clone(), upstream.clone()),
            aggregator: Aggregator::new(ws.clone()),
            lifecycle: LifecycleManager::new(ws.clone()),
            cache,
            upstream,
            account_id: account_id.to_string(),
            ws,
        }
    }

    pub fn account_id(&self) -> &str {
        &self.account_id
    }

    /// Cache-through profile fetch. Any cached profile answering to the
    /// identifier, whatever key it was stored under, is a hit. A miss goes
    /// upstream when configured; a total miss synthesizes a profile and
    /// caches it so the identifier stays stable across calls. The served
    /// `network_distance` is always recomputed from invitation history,
    /// never trusted from the payload.
    pub async fn profile_for(&self, identifier: &str) -> Result<Value> {
        if identifier.trim().is_empty() {
            return Err(EngineError::invalid("User identifier is required"));
        }

        let cached = {
            let profiles = self.ws.map(collections::USERS).await?;
            profiles.get(identifier).cloned().or_else(|| {
                profiles
                    .values()
                    .find(|p| model::profile_matches(p, identifier))
                    .cloned()
            })
        };

        let mut profile = match cached {
            Some(hit) => hit,
            None => {
                let upstream = self.upstream.clone();
                let key = identifier.to_string();
                let fetched = self
                    .cache
                    .get_or_fetch(CacheKind::Profiles, identifier, || async move {
                        match upstream {
                            Some(client) => client.fetch_profile(&key).await,
                            None => Ok(None),
                        }
                    })
                    .await?;
                match fetched {
                    Some(found) => found,
                    None => {
                        let synthetic = synthetic_profile(identifier);
                        let stored = self
                            .cache
                            .insert(CacheKind::Profiles, identifier, synthetic)
                            .await?;
                        debug!(identifier = %identifier, "profile synthesized");
                        stored
                    }
                }
            }
        };

        let invitations = self.relations.list().await?;
        let candidates = rollup::candidate_ids(identifier, &profile);
        let refs: Vec<&str> = candidates.iter().map(String::as_str).collect();
        let distance = relations::derive_distance_any(&invitations, &refs);
        model::set_network_distance(&mut profile, distance);
        Ok(profile)
    }

    /// The workspace account's own profile, synthesized fresh on every call
    pub fn own_profile(&self) -> Value {
        json!({
            "object": "UserProfile",
            "provider": "LINKEDIN",
            "provider_id": ids::member_id(),
            "public_identifier": "mock-user",
            "first_name": "Mock",
            "last_name": "User",
            "headline": "Understudy Test User",
            "location": "Test City",
            "follower_count": 100,
            "connections_count": 50,
        })
    }

    /// Write the demo dataset once per workspace; later calls are no-ops
    pub async fn seed_demo_data(&self) -> Result<bool> {
        let _guard = self.ws.locks.users.lock().await;
        if self.ws.flag(collections::INITIALIZED).await? {
            return Ok(false);
        }

        let mut profiles = self.ws.map(collections::USERS).await?;
        profiles.insert(
            "john-doe-123".to_string(),
            json!({
                "object": "UserProfile",
                "provider": "LINKEDIN",
                "provider_id": ids::member_id(),
                "public_identifier": "john-doe-123",
                "first_name": "John",
                "last_name": "Doe",
                "headline": "Software Engineer at TechCorp",
                "location": "San Francisco, CA",
                "follower_count": 1250,
                "connections_count": 890,
                "profile_picture_url": "https://via.placeholder.com/100x100",
            }),
        );
        profiles.insert(
            "jane-smith-456".to_string(),
            json!({
                "object": "UserProfile",
                "provider": "LINKEDIN",
                "provider_id": ids::member_id(),
                "public_identifier": "jane-smith-456",
                "first_name": "Jane",
                "last_name": "Smith",
                "headline": "Product Manager | AI Enthusiast",
                "location": "New York, NY",
                "follower_count": 3200,
                "connections_count": 1500,
                "profile_picture_url": "https://via.placeholder.com/100x100",
            }),
        );
        self.ws.put_map(collections::USERS, profiles).await?;
        self.ws.set_flag(collections::INITIALIZED, true).await?;

        info!("demo dataset seeded");
        Ok(true)
    }
}

/// Plausible profile for an identifier nothing knows about. Member-id
/// style identifiers keep their id and get a derived public handle;
/// anything else is treated as the public identifier.
fn synthetic_profile(identifier: &str) -> Value {
    let (provider_id, public_identifier) = if identifier.starts_with(ids::MEMBER_ID_PREFIX) {
        let head: String = identifier.chars().take(8).collect();
        (identifier.to_string(), format!("user-{}", head))
    } else {
        (ids::member_id(), identifier.to_string())
    };

    let mut rng = rand::thread_rng();
    json!({
        "object": "UserProfile",
        "provider": "LINKEDIN",
        "provider_id": provider_id,
        "public_identifier": public_identifier,
        "first_name": "Unknown",
        "last_name": "User",
        "headline": "LinkedIn Member",
        "location": "Unknown",
        "follower_count": rng.gen_range(0..1000),
        "connections_count": rng.gen_range(0..500),
    })
}
