//! HTTP routes for the emulation engine

pub mod accounts;
pub mod actions;
pub mod chats;
pub mod health;
pub mod posts;
pub mod proxy;
pub mod respond;
pub mod users;

pub use accounts::handle_accounts;
pub use actions::handle_action_request;
pub use chats::{
    handle_chat_messages, handle_create_chat, handle_delete_chat, handle_get_chat,
    handle_list_chats, handle_recent_messages, handle_send_message,
};
pub use health::{health_check, version_info};
pub use posts::{handle_comment, handle_create_post, handle_get_post, handle_react};
pub use proxy::handle_passthrough;
pub use users::{
    handle_own_profile, handle_received_invitations, handle_send_invitation,
    handle_sent_invitations, handle_user_posts, handle_user_profile,
};
