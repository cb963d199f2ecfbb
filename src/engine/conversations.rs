//! Conversation store
//!
//! Chats are created on demand (one per attendee by linear scan, not by
//! enforced uniqueness) and messages are append-only. Reply simulation is
//! just an append with `sender: other`. Chat deletion removes the chat and
//! its messages under both collection locks, so no later read can see one
//! without the other.

use std::sync::Arc;
use tracing::info;

use crate::model::{Chat, Message, MessageSender};
use crate::store::{collections, Workspace};
use crate::types::{EngineError, Result};

pub struct ConversationStore {
    ws: Arc<Workspace>,
}

impl ConversationStore {
    pub fn new(ws: Arc<Workspace>) -> Self {
        Self { ws }
    }

    /// Find the chat with this attendee or create one. An optional seed
    /// text becomes the first message of a newly found-or-created chat.
    pub async fn ensure_chat(
        &self,
        account_id: &str,
        attendee_id: &str,
        name: Option<&str>,
        seed_text: Option<&str>,
    ) -> Result<(Chat, Option<Message>)> {
        if attendee_id.trim().is_empty() {
            return Err(EngineError::invalid("Attendee identifier is required"));
        }

        let _chats_guard = self.ws.locks.chats.lock().await;
        let mut chats: Vec<Chat> = self.ws.typed_list(collections::CHATS).await?;

        let chat = match chats.iter().find(|c| c.attendee_id == attendee_id) {
            Some(existing) => existing.clone(),
            None => {
                let created = Chat::new(account_id, attendee_id, name);
                chats.push(created.clone());
                self.ws.put_typed_list(collections::CHATS, &chats).await?;
                info!(chat = %created.id, attendee = %created.attendee_id, "chat created");
                created
            }
        };

        let seeded = match seed_text {
            Some(text) if !text.trim().is_empty() => {
                let _messages_guard = self.ws.locks.messages.lock().await;
                let message = Message::new(&chat.id, MessageSender::Myself, text);
                self.push_message(&message).await?;
                Some(message)
            }
            _ => None,
        };

        Ok((chat, seeded))
    }

    /// Append a message to an existing chat
    pub async fn append(
        &self,
        chat_id: &str,
        sender: MessageSender,
        text: &str,
    ) -> Result<Message> {
        if text.trim().is_empty() {
            return Err(EngineError::invalid("Message text is required"));
        }

        // chats lock keeps the existence check stable against delete_chat
        let _chats_guard = self.ws.locks.chats.lock().await;
        let chats: Vec<Chat> = self.ws.typed_list(collections::CHATS).await?;
        if !chats.iter().any(|c| c.id == chat_id) {
            return Err(EngineError::not_found("Chat"));
        }

        let _messages_guard = self.ws.locks.messages.lock().await;
        let message = Message::new(chat_id, sender, text);
        self.push_message(&message).await?;

        info!(message = %message.id, chat = %chat_id, "message appended");
        Ok(message)
    }

    pub async fn get_chat(&self, chat_id: &str) -> Result<Chat> {
        let chats: Vec<Chat> = self.ws.typed_list(collections::CHATS).await?;
        chats
            .into_iter()
            .find(|c| c.id == chat_id)
            .ok_or_else(|| EngineError::not_found("Chat"))
    }

    pub async fn list_chats(&self) -> Result<Vec<Chat>> {
        self.ws.typed_list(collections::CHATS).await
    }

    /// Messages of one chat in append order; callers choose presentation
    /// order per endpoint
    pub async fn messages_for(&self, chat_id: &str) -> Result<Vec<Message>> {
        let messages: Vec<Message> = self.ws.typed_list(collections::MESSAGES).await?;
        Ok(messages.into_iter().filter(|m| m.chat_id == chat_id).collect())
    }

    pub async fn all_messages(&self) -> Result<Vec<Message>> {
        self.ws.typed_list(collections::MESSAGES).await
    }

    /// Remove a chat and every message in it. Both locks are taken before
    /// anything is read, so the two writes land together.
    pub async fn delete_chat(&self, chat_id: &str) -> Result<usize> {
        let _chats_guard = self.ws.locks.chats.lock().await;
        let _messages_guard = self.ws.locks.messages.lock().await;

        let mut chats: Vec<Chat> = self.ws.typed_list(collections::CHATS).await?;
        let position = chats
            .iter()
            .position(|c| c.id == chat_id)
            .ok_or_else(|| EngineError::not_found("Chat"))?;
        chats.remove(position);

        let mut messages: Vec<Message> = self.ws.typed_list(collections::MESSAGES).await?;
        let before = messages.len();
        messages.retain(|m| m.chat_id != chat_id);
        let removed = before - messages.len();

        self.ws.put_typed_list(collections::CHATS, &chats).await?;
        self.ws.put_typed_list(collections::MESSAGES, &messages).await?;

        info!(chat = %chat_id, messages = removed, "chat deleted");
        Ok(removed)
    }

    async fn push_message(&self, message: &Message) -> Result<()> {
        let mut messages: Vec<Message> = self.ws.typed_list(collections::MESSAGES).await?;
        messages.push(message.clone());
        self.ws.put_typed_list(collections::MESSAGES, &messages).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn conversations() -> ConversationStore {
        ConversationStore::new(Arc::new(Workspace::new(Arc::new(MemoryStore::new()))))
    }

    #[tokio::test]
    async fn test_chat_round_trip_scenario() {
        let store = conversations();

        let (first, _) = store.ensure_chat("acct-1", "user-42", None, None).await.unwrap();
        let (second, _) = store.ensure_chat("acct-1", "user-42", None, None).await.unwrap();
        assert_eq!(first.id, second.id);

        store
            .append(&first.id, MessageSender::Myself, "hello there")
            .await
            .unwrap();
        let messages = store.messages_for(&first.id).await.unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].text, "hello there");
        assert_eq!(messages[0].is_sender, 1);
    }

    #[tokio::test]
    async fn test_seed_message_lands_in_new_chat() {
        let store = conversations();

        let (chat, seeded) = store
            .ensure_chat("acct-1", "user-7", Some("Jane"), Some("intro"))
            .await
            .unwrap();
        let message = seeded.unwrap();
        assert_eq!(message.chat_id, chat.id);
        assert_eq!(store.messages_for(&chat.id).await.unwrap().len(), 1);

        // blank seed text is skipped, not an error
        let (_, none) = store
            .ensure_chat("acct-1", "user-8", None, Some("  "))
            .await
            .unwrap();
        assert!(none.is_none());
    }

    #[tokio::test]
    async fn test_append_to_unknown_chat() {
        let store = conversations();
        let err = store
            .append("missing", MessageSender::Myself, "hi")
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Chat not found");
        assert!(store.all_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_text_rejected_before_mutation() {
        let store = conversations();
        let (chat, _) = store.ensure_chat("acct-1", "user-1", None, None).await.unwrap();

        assert!(store.append(&chat.id, MessageSender::Other, "  ").await.is_err());
        assert!(store.all_messages().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_reply_simulation_flags_other_party() {
        let store = conversations();
        let (chat, _) = store.ensure_chat("acct-1", "user-2", None, None).await.unwrap();

        let reply = store
            .append(&chat.id, MessageSender::Other, "got it")
            .await
            .unwrap();
        assert_eq!(reply.is_sender, 0);
    }

    #[tokio::test]
    async fn test_delete_chat_takes_messages_with_it() {
        let store = conversations();
        let (chat, _) = store
            .ensure_chat("acct-1", "user-3", None, Some("first"))
            .await
            .unwrap();
        store.append(&chat.id, MessageSender::Other, "second").await.unwrap();

        let removed = store.delete_chat(&chat.id).await.unwrap();
        assert_eq!(removed, 2);
        assert!(store.list_chats().await.unwrap().is_empty());
        assert!(store.all_messages().await.unwrap().is_empty());

        let err = store.delete_chat(&chat.id).await.unwrap_err();
        assert_eq!(err.to_string(), "Chat not found");
    }
}
