//! Chat and message routes
//!
//! List ordering is a presentation concern: the per-chat and global message
//! endpoints serve most-recent-first, while the engine stores append order.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response};
use serde_json::json;

use crate::engine::Engine;
use crate::model::MessageSender;
use crate::routes::respond::{engine_error, json_created, json_ok, read_json, required_str};

/// POST /api/v1/chats
///
/// Accepts `attendee_id` or the list form `attendees_ids` (first entry
/// wins). An optional `text` becomes the opening message; `message_id` is
/// present in the response only when that message was actually created.
pub async fn handle_create_chat<B>(engine: &Engine, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let body = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let attendee = body
        .get("attendee_id")
        .and_then(|v| v.as_str())
        .or_else(|| {
            body.get("attendees_ids")
                .and_then(|v| v.as_array())
                .and_then(|ids| ids.first())
                .and_then(|v| v.as_str())
        })
        .unwrap_or("");
    let text = body.get("text").and_then(|v| v.as_str());

    match engine
        .conversations
        .ensure_chat(engine.account_id(), attendee, None, text)
        .await
    {
        Ok((chat, seeded)) => {
            let mut payload = json!({ "object": "ChatStarted", "chat_id": chat.id });
            if let Some(message) = seeded {
                payload["message_id"] = json!(message.id);
            }
            json_created(&payload)
        }
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/chats
pub async fn handle_list_chats(engine: &Engine) -> Response<Full<Bytes>> {
    match engine.conversations.list_chats().await {
        Ok(chats) => json_ok(&json!({ "object": "ChatList", "items": chats })),
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/chats/{id}
pub async fn handle_get_chat(engine: &Engine, chat_id: &str) -> Response<Full<Bytes>> {
    match engine.conversations.get_chat(chat_id).await {
        Ok(chat) => json_ok(&json!(chat)),
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/chats/{id}/messages
pub async fn handle_chat_messages(engine: &Engine, chat_id: &str) -> Response<Full<Bytes>> {
    match engine.conversations.messages_for(chat_id).await {
        Ok(mut items) => {
            items.reverse();
            json_ok(&json!({ "object": "MessageList", "items": items }))
        }
        Err(err) => engine_error(&err),
    }
}

/// POST /api/v1/messages
pub async fn handle_send_message<B>(engine: &Engine, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let body = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let chat_id = match required_str(&body, "chat_id", "Chat id is required") {
        Ok(chat_id) => chat_id,
        Err(resp) => return resp,
    };
    let text = body.get("text").and_then(|v| v.as_str()).unwrap_or("");

    match engine
        .conversations
        .append(chat_id, MessageSender::Myself, text)
        .await
    {
        Ok(message) => json_created(&json!({
            "object": "MessageSent",
            "message_id": message.id,
            "chat_id": message.chat_id,
        })),
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/messages
///
/// Serves the last page of the global message history, fixed page size.
pub async fn handle_recent_messages(engine: &Engine, page_size: usize) -> Response<Full<Bytes>> {
    match engine.conversations.all_messages().await {
        Ok(mut items) => {
            if items.len() > page_size {
                items = items.split_off(items.len() - page_size);
            }
            items.reverse();
            json_ok(&json!({ "object": "MessageList", "items": items }))
        }
        Err(err) => engine_error(&err),
    }
}

/// DELETE /api/v1/chats/{id}
pub async fn handle_delete_chat(engine: &Engine, chat_id: &str) -> Response<Full<Bytes>> {
    match engine.conversations.delete_chat(chat_id).await {
        Ok(_) => json_ok(&json!({ "object": "ChatDeleted", "chat_id": chat_id })),
        Err(err) => engine_error(&err),
    }
}
