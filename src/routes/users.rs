//! Invitation and profile routes

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response};
use serde_json::json;

use crate::engine::Engine;
use crate::routes::respond::{engine_error, json_created, json_ok, read_json};

/// POST /api/v1/users/invite (aliases: /api/v1/users/invitation[s])
pub async fn handle_send_invitation<B>(engine: &Engine, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let body = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    // clients use either field name for the recipient
    let recipient = body
        .get("identifier")
        .or_else(|| body.get("to"))
        .and_then(|v| v.as_str())
        .unwrap_or("");
    let message = body.get("message").and_then(|v| v.as_str()).unwrap_or("");

    match engine
        .relations
        .send(recipient, engine.account_id(), message)
        .await
    {
        Ok(invitation) => json_created(&json!({
            "object": "UserInvitationSent",
            "invitation_id": invitation.id,
        })),
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/users/invitations/received
///
/// The emulation only records invitations the account itself sends, so
/// this list is permanently empty; the route exists for clients that poll
/// both directions.
pub fn handle_received_invitations() -> Response<Full<Bytes>> {
    json_ok(&json!({ "object": "InvitationList", "items": [] }))
}

/// GET /api/v1/users/invitations/sent
pub async fn handle_sent_invitations(engine: &Engine) -> Response<Full<Bytes>> {
    match engine.relations.list().await {
        Ok(sent) => {
            let items: Vec<_> = sent
                .iter()
                .map(|inv| {
                    json!({
                        "object": "Invitation",
                        "id": inv.id,
                        "recipient_id": inv.recipient_id,
                        "message": inv.message,
                        "status": inv.status,
                        "sent_at": inv.sent_at,
                    })
                })
                .collect();
            json_ok(&json!({ "object": "InvitationList", "items": items }))
        }
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/users/profile
pub fn handle_own_profile(engine: &Engine) -> Response<Full<Bytes>> {
    json_ok(&engine.own_profile())
}

/// GET /api/v1/users/{identifier} and /api/v1/users/{identifier}/profile
///
/// Never 404s: unknown identifiers come back as a synthesized profile.
pub async fn handle_user_profile(engine: &Engine, identifier: &str) -> Response<Full<Bytes>> {
    match engine.profile_for(identifier).await {
        Ok(profile) => json_ok(&profile),
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/users/{identifier}/posts
pub async fn handle_user_posts(engine: &Engine, identifier: &str) -> Response<Full<Bytes>> {
    match engine.engagement.posts_for(identifier).await {
        Ok(items) => {
            let page_count = items.len();
            json_ok(&json!({
                "object": "PostList",
                "items": items,
                "cursor": null,
                "paging": { "page_count": page_count },
            }))
        }
        Err(err) => engine_error(&err),
    }
}
