//! Entity model for the emulated network
//!
//! Engine-authored entities (invitations, chats, messages, posts, reactions,
//! comments) are typed structs; field names are the wire format the
//! dashboards consume, so serde attributes here are normative. Profiles and
//! cached post lists come from upstream (or are synthesized to look like
//! they did) and stay as raw `serde_json::Value`, with accessor helpers
//! below instead of a struct that would drop unknown fields.

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::ids;

/// Three-bucket connection closeness, derived from invitation history.
/// Never read from an upstream payload; always recomputed locally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NetworkDistance {
    FirstDegree,
    SecondDegree,
    ThirdDegree,
}

impl NetworkDistance {
    pub fn as_str(&self) -> &'static str {
        match self {
            NetworkDistance::FirstDegree => "FIRST_DEGREE",
            NetworkDistance::SecondDegree => "SECOND_DEGREE",
            NetworkDistance::ThirdDegree => "THIRD_DEGREE",
        }
    }
}

impl fmt::Display for NetworkDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Invitation state machine: `pending -> {accepted, declined}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvitationStatus {
    Pending,
    Accepted,
    Declined,
}

impl InvitationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvitationStatus::Pending => "pending",
            InvitationStatus::Accepted => "accepted",
            InvitationStatus::Declined => "declined",
        }
    }
}

impl fmt::Display for InvitationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A connection invitation sent from the workspace account
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Invitation {
    pub id: String,
    pub recipient_id: String,
    pub account_id: String,
    #[serde(default)]
    pub message: String,
    pub status: InvitationStatus,
    pub sent_at: String,
    /// Stamped when the invitation is accepted or declined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl Invitation {
    pub fn new(recipient_id: &str, account_id: &str, message: &str) -> Self {
        Self {
            id: ids::prefixed_id("inv"),
            recipient_id: recipient_id.to_string(),
            account_id: account_id.to_string(),
            message: message.to_string(),
            status: InvitationStatus::Pending,
            sent_at: ids::now_iso(),
            updated_at: None,
        }
    }
}

/// Which side of a chat authored a message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageSender {
    #[serde(rename = "self")]
    Myself,
    #[serde(rename = "other")]
    Other,
}

impl MessageSender {
    pub fn is_self(&self) -> bool {
        matches!(self, MessageSender::Myself)
    }
}

/// A direct-message thread with one attendee
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Chat {
    pub id: String,
    pub account_id: String,
    pub attendee_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    pub timestamp: String,
}

impl Chat {
    pub fn new(account_id: &str, attendee_id: &str, name: Option<&str>) -> Self {
        Self {
            id: ids::token(),
            account_id: account_id.to_string(),
            attendee_id: attendee_id.to_string(),
            name: name.map(str::to_string),
            timestamp: ids::now_iso(),
        }
    }
}

/// An append-only chat message. `is_sender` is the numeric flag the
/// dashboards read (1 when sent by the workspace account).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub id: String,
    pub chat_id: String,
    pub sender: MessageSender,
    pub text: String,
    pub timestamp: String,
    pub is_sender: u8,
}

impl Message {
    pub fn new(chat_id: &str, sender: MessageSender, text: &str) -> Self {
        Self {
            id: ids::token(),
            chat_id: chat_id.to_string(),
            sender,
            text: text.to_string(),
            timestamp: ids::now_iso(),
            is_sender: if sender.is_self() { 1 } else { 0 },
        }
    }
}

/// A locally authored post. The two `*_counter` fields mirror what the
/// upstream would report for the post and are bumped when engagement is
/// intercepted; they are distinct from the intercepted reaction/comment
/// lists themselves.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Post {
    pub object: String,
    pub provider: String,
    pub id: String,
    pub social_id: String,
    pub author_id: String,
    pub text: String,
    pub created_at: String,
    #[serde(default)]
    pub reaction_counter: u64,
    #[serde(default)]
    pub comment_counter: u64,
    #[serde(default)]
    pub repost_counter: u64,
}

impl Post {
    pub fn new(author_id: &str, text: &str) -> Self {
        let id = ids::post_id();
        let social_id = ids::post_social_id(&id);
        Self {
            object: "Post".to_string(),
            provider: "LINKEDIN".to_string(),
            id,
            social_id,
            author_id: author_id.to_string(),
            text: text.to_string(),
            created_at: ids::now_iso(),
            reaction_counter: 0,
            comment_counter: 0,
            repost_counter: 0,
        }
    }
}

/// An intercepted reaction. `post_id` may arrive in raw or URN form and is
/// matched through the identifier reconciler, never by string equality.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reaction {
    pub id: String,
    pub post_id: String,
    pub account_id: String,
    pub reaction_type: String,
    pub created_at: String,
}

impl Reaction {
    pub fn new(post_id: &str, account_id: &str, reaction_type: &str) -> Self {
        Self {
            id: ids::prefixed_id("reaction"),
            post_id: post_id.to_string(),
            account_id: account_id.to_string(),
            reaction_type: reaction_type.to_string(),
            created_at: ids::now_iso(),
        }
    }
}

/// An intercepted comment, same reconciliation rules as [`Reaction`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Comment {
    pub id: String,
    pub post_id: String,
    pub account_id: String,
    pub text: String,
    pub created_at: String,
}

impl Comment {
    pub fn new(post_id: &str, account_id: &str, text: &str) -> Self {
        Self {
            id: ids::prefixed_id("comment"),
            post_id: post_id.to_string(),
            account_id: account_id.to_string(),
            text: text.to_string(),
            created_at: ids::now_iso(),
        }
    }
}

// ============================================================================
// Raw-profile and raw-post accessors
// ============================================================================

/// True when a cached profile answers to the given identifier, by public
/// identifier or provider id
pub fn profile_matches(profile: &Value, identifier: &str) -> bool {
    let public = profile.get("public_identifier").and_then(|v| v.as_str());
    let provider = profile.get("provider_id").and_then(|v| v.as_str());
    public == Some(identifier) || provider == Some(identifier)
}

/// Provider member id carried by a cached profile, when present
pub fn profile_provider_id(profile: &Value) -> Option<&str> {
    profile.get("provider_id").and_then(|v| v.as_str())
}

/// Display name assembled from a cached profile payload
pub fn profile_display_name(profile: &Value) -> String {
    let first = profile.get("first_name").and_then(|v| v.as_str()).unwrap_or("");
    let last = profile.get("last_name").and_then(|v| v.as_str()).unwrap_or("");
    let name = format!("{} {}", first, last);
    let name = name.trim();
    if name.is_empty() {
        "Unknown".to_string()
    } else {
        name.to_string()
    }
}

pub fn profile_headline(profile: &Value) -> Option<&str> {
    profile.get("headline").and_then(|v| v.as_str())
}

/// Overwrite the derived distance on a profile payload about to be served.
/// This is a read-time transform; the cached copy keeps whatever it had.
pub fn set_network_distance(profile: &mut Value, distance: NetworkDistance) {
    if let Some(obj) = profile.as_object_mut() {
        obj.insert(
            "network_distance".to_string(),
            Value::String(distance.as_str().to_string()),
        );
    }
}

/// Raw id and social id of a post in blob form
pub fn post_ids(post: &Value) -> (Option<&str>, Option<&str>) {
    let raw = post.get("id").and_then(|v| v.as_str());
    let social = post.get("social_id").and_then(|v| v.as_str());
    (raw, social)
}

/// Parse an entity timestamp for ordering. Missing or unparsable values
/// sort as the epoch so they land last in a descending sort.
pub fn timestamp_or_epoch(value: Option<&str>) -> DateTime<Utc> {
    value
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|| Utc.timestamp_opt(0, 0).unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_distance_serializes_screaming_snake() {
        let v = serde_json::to_value(NetworkDistance::FirstDegree).unwrap();
        assert_eq!(v, json!("FIRST_DEGREE"));
    }

    #[test]
    fn test_invitation_status_wire_format() {
        let inv = Invitation::new("user-42", "acct-1", "hi");
        let v = serde_json::to_value(&inv).unwrap();
        assert_eq!(v["status"], json!("pending"));
        assert!(v.get("updated_at").is_none());
    }

    #[test]
    fn test_message_sender_flag() {
        let own = Message::new("chat-1", MessageSender::Myself, "hello");
        assert_eq!(own.is_sender, 1);
        assert_eq!(serde_json::to_value(&own).unwrap()["sender"], json!("self"));

        let theirs = Message::new("chat-1", MessageSender::Other, "hey");
        assert_eq!(theirs.is_sender, 0);
        assert_eq!(serde_json::to_value(&theirs).unwrap()["sender"], json!("other"));
    }

    #[test]
    fn test_new_post_shape() {
        let post = Post::new("self", "hello world");
        assert_eq!(post.social_id, format!("urn:li:ugcPost:{}", post.id));
        assert_eq!(post.reaction_counter, 0);
        assert_eq!(post.comment_counter, 0);
    }

    #[test]
    fn test_profile_matches_either_identifier() {
        let profile = json!({
            "provider_id": "ACoAAAxyz",
            "public_identifier": "john-doe-123",
        });
        assert!(profile_matches(&profile, "john-doe-123"));
        assert!(profile_matches(&profile, "ACoAAAxyz"));
        assert!(!profile_matches(&profile, "someone-else"));
    }

    #[test]
    fn test_display_name_fallback() {
        assert_eq!(profile_display_name(&json!({})), "Unknown");
        assert_eq!(
            profile_display_name(&json!({"first_name": "Jane", "last_name": "Smith"})),
            "Jane Smith"
        );
    }

    #[test]
    fn test_timestamp_or_epoch_fallback() {
        assert_eq!(timestamp_or_epoch(Some("not a date")).timestamp(), 0);
        assert_eq!(timestamp_or_epoch(None).timestamp(), 0);
        let parsed = timestamp_or_epoch(Some("2024-05-01T00:00:00+00:00"));
        assert_eq!(parsed.timestamp(), 1714521600);
    }
}
