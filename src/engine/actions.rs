//! UI action channel
//!
//! A closed vocabulary dispatched through one enum; an unhandled name can
//! only be a parse miss, answered with the uniform unknown-action envelope.
//! Known actions that fail fold the error into `{success:false, message}`
//! instead of surfacing an HTTP error, because the dashboards treat the
//! envelope as the protocol.

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::warn;

use crate::engine::Engine;
use crate::model::{InvitationStatus, MessageSender};
use crate::types::{EngineError, Result};

/// Wire shape of an inbound action request
#[derive(Debug, Deserialize)]
pub struct ActionRequest {
    pub action: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    LoadUserData,
    LoadPostsData,
    AcceptInvite,
    DeclineInvite,
    WithdrawInvite,
    SendMessage,
    SimulateReply,
    DeleteReaction,
    DeleteComment,
    DeleteUserData,
    ClearPostsData,
    ClearCaches,
}

impl Action {
    pub fn parse(name: &str) -> Option<Self> {
        Some(match name {
            "load_user_data" => Self::LoadUserData,
            "load_posts_data" => Self::LoadPostsData,
            "accept_invite" => Self::AcceptInvite,
            "decline_invite" => Self::DeclineInvite,
            "withdraw_invite" => Self::WithdrawInvite,
            "send_message" => Self::SendMessage,
            "simulate_reply" => Self::SimulateReply,
            "delete_reaction" => Self::DeleteReaction,
            "delete_comment" => Self::DeleteComment,
            "delete_user_data" => Self::DeleteUserData,
            // older dashboard builds send the *_cache spellings
            "clear_posts_data" | "clear_posts_cache" => Self::ClearPostsData,
            "clear_caches" | "clear_cache" => Self::ClearCaches,
            _ => return None,
        })
    }
}

/// Run one UI action against the engine, always producing an envelope
pub async fn dispatch(engine: &Engine, request: &ActionRequest) -> Value {
    let Some(action) = Action::parse(&request.action) else {
        warn!(action = %request.action, "unknown action");
        return json!({ "success": false, "message": "Unknown action" });
    };

    let target = request.id.as_deref().unwrap_or("");
    let payload = request.data.clone().unwrap_or(Value::Null);

    match run(engine, action, target, &payload).await {
        Ok(result) => result,
        Err(err) => json!({ "success": false, "message": err.to_string() }),
    }
}

async fn run(engine: &Engine, action: Action, target: &str, payload: &Value) -> Result<Value> {
    Ok(match action {
        Action::LoadUserData => {
            let data = engine.aggregator.user_rollup().await?;
            json!({ "success": true, "data": data })
        }
        Action::LoadPostsData => {
            let data = engine.aggregator.post_rollup().await?;
            json!({ "success": true, "data": data })
        }
        Action::AcceptInvite => {
            let invitation = engine
                .relations
                .resolve(target, InvitationStatus::Accepted)
                .await?;
            json!({
                "success": true,
                "message": "Invitation accepted",
                "data": { "invitation": invitation },
            })
        }
        Action::DeclineInvite => {
            let invitation = engine
                .relations
                .resolve(target, InvitationStatus::Declined)
                .await?;
            json!({
                "success": true,
                "message": "Invitation declined",
                "data": { "invitation": invitation },
            })
        }
        Action::WithdrawInvite => {
            engine.relations.remove(target).await?;
            json!({
                "success": true,
                "message": "Invitation withdrawn",
                "data": { "removed": true },
            })
        }
        Action::SendMessage => {
            // text is checked first so a bad request cannot leave an empty chat
            let text = text_field(payload)?;
            let (chat, _) = engine
                .conversations
                .ensure_chat(engine.account_id(), target, None, None)
                .await?;
            let message = engine
                .conversations
                .append(&chat.id, MessageSender::Myself, &text)
                .await?;
            json!({
                "success": true,
                "message": "Message sent",
                "data": { "chat_id": chat.id, "message_id": message.id },
            })
        }
        Action::SimulateReply => {
            let text = text_field(payload)?;
            let message = engine
                .conversations
                .append(target, MessageSender::Other, &text)
                .await?;
            json!({
                "success": true,
                "message": "Reply recorded",
                "data": { "message_id": message.id },
            })
        }
        Action::DeleteReaction => {
            let deleted = engine.engagement.delete_reaction(target).await?;
            json!({
                "success": true,
                "message": "Reaction deleted",
                "data": { "deleted": deleted },
            })
        }
        Action::DeleteComment => {
            let deleted = engine.engagement.delete_comment(target).await?;
            json!({
                "success": true,
                "message": "Comment deleted",
                "data": { "deleted": deleted },
            })
        }
        Action::DeleteUserData => {
            let full = payload
                .get("fullDelete")
                .and_then(|v| v.as_bool())
                .unwrap_or(false);
            let counts = engine.lifecycle.delete_user(target, full).await?;
            json!({
                "success": true,
                "message": "User data deleted",
                "deleted": counts,
            })
        }
        Action::ClearPostsData => {
            let cleared = engine.lifecycle.clear_posts_data().await?;
            json!({ "success": true, "message": "Posts data cleared", "data": cleared })
        }
        Action::ClearCaches => {
            let cleared = engine.lifecycle.clear_caches().await?;
            json!({ "success": true, "message": "Caches cleared", "data": cleared })
        }
    })
}

fn text_field(payload: &Value) -> Result<String> {
    payload
        .get("text")
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_string)
        .ok_or_else(|| EngineError::invalid("Message text is required"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, Workspace};
    use std::sync::Arc;

    fn engine() -> Engine {
        Engine::new(
            Arc::new(Workspace::new(Arc::new(MemoryStore::new()))),
            None,
            "self",
        )
    }

    fn request(action: &str, id: &str, data: Value) -> ActionRequest {
        ActionRequest {
            action: action.to_string(),
            id: if id.is_empty() { None } else { Some(id.to_string()) },
            data: if data.is_null() { None } else { Some(data) },
        }
    }

    #[tokio::test]
    async fn test_unknown_action_envelope() {
        let engine = engine();
        let result = dispatch(&engine, &request("frobnicate", "", Value::Null)).await;
        assert_eq!(
            result,
            json!({ "success": false, "message": "Unknown action" })
        );
    }

    #[test]
    fn test_legacy_cache_spellings_parse() {
        assert_eq!(Action::parse("clear_posts_cache"), Some(Action::ClearPostsData));
        assert_eq!(Action::parse("clear_cache"), Some(Action::ClearCaches));
    }

    #[tokio::test]
    async fn test_invite_accept_flow() {
        let engine = engine();
        let sent = engine.relations.send("user-42", "self", "hi").await.unwrap();

        let result = dispatch(&engine, &request("accept_invite", &sent.id, Value::Null)).await;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["data"]["invitation"]["status"], json!("accepted"));

        let missing = dispatch(&engine, &request("accept_invite", "inv_gone", Value::Null)).await;
        assert_eq!(missing["success"], json!(false));
        assert_eq!(missing["message"], json!("Invitation not found"));
    }

    #[tokio::test]
    async fn test_send_message_creates_chat_on_demand() {
        let engine = engine();
        let result = dispatch(
            &engine,
            &request("send_message", "user-42", json!({ "text": "hello" })),
        )
        .await;
        assert_eq!(result["success"], json!(true));
        let chat_id = result["data"]["chat_id"].as_str().unwrap().to_string();

        // a second message lands in the same chat
        let again = dispatch(
            &engine,
            &request("send_message", "user-42", json!({ "text": "again" })),
        )
        .await;
        assert_eq!(again["data"]["chat_id"], json!(chat_id));
        assert_eq!(engine.conversations.list_chats().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_text_leaves_no_chat_behind() {
        let engine = engine();
        let result = dispatch(&engine, &request("send_message", "user-42", json!({}))).await;
        assert_eq!(result["success"], json!(false));
        assert_eq!(result["message"], json!("Message text is required"));
        assert!(engine.conversations.list_chats().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_simulate_reply_flags_other_sender() {
        let engine = engine();
        let (chat, _) = engine
            .conversations
            .ensure_chat("self", "user-7", None, None)
            .await
            .unwrap();

        let result = dispatch(
            &engine,
            &request("simulate_reply", &chat.id, json!({ "text": "pong" })),
        )
        .await;
        assert_eq!(result["success"], json!(true));

        let messages = engine.conversations.messages_for(&chat.id).await.unwrap();
        assert_eq!(messages[0].is_sender, 0);

        let missing = dispatch(
            &engine,
            &request("simulate_reply", "gone", json!({ "text": "x" })),
        )
        .await;
        assert_eq!(missing["message"], json!("Chat not found"));
    }

    #[tokio::test]
    async fn test_delete_user_data_reports_counts() {
        let engine = engine();
        engine.relations.send("user-9", "self", "").await.unwrap();

        let result = dispatch(
            &engine,
            &request("delete_user_data", "user-9", json!({ "fullDelete": false })),
        )
        .await;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["deleted"]["invitations"], json!(1));
        assert_eq!(result["deleted"]["profile"], json!(0));
    }

    #[tokio::test]
    async fn test_clear_actions_round_trip() {
        let engine = engine();
        engine.seed_demo_data().await.unwrap();

        let result = dispatch(&engine, &request("clear_caches", "", Value::Null)).await;
        assert_eq!(result["success"], json!(true));
        assert_eq!(result["data"]["profiles"], json!(2));

        let rollup = dispatch(&engine, &request("load_user_data", "all", Value::Null)).await;
        assert_eq!(rollup["data"]["stats"]["total_users"], json!(0));
    }
}
