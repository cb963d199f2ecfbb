//! Post and engagement routes

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde_json::json;

use crate::engine::Engine;
use crate::routes::respond::{
    engine_error, error_response, json_created, json_ok, read_json, required_str,
};

/// POST /api/v1/posts
pub async fn handle_create_post<B>(engine: &Engine, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let body = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let text = match required_str(&body, "text", "Post text is required") {
        Ok(text) => text,
        Err(resp) => return resp,
    };

    match engine.engagement.create_post(engine.account_id(), text).await {
        Ok(post) => json_created(&json!({ "object": "PostCreated", "post_id": post.id })),
        Err(err) => engine_error(&err),
    }
}

/// GET /api/v1/posts/{id}
///
/// Serves locally authored posts by raw id only; cached upstream posts are
/// reachable through the per-user listing instead.
pub async fn handle_get_post(engine: &Engine, post_id: &str) -> Response<Full<Bytes>> {
    match engine.engagement.local_post(post_id).await {
        Ok(Some(post)) => json_ok(&json!(post)),
        Ok(None) => error_response(StatusCode::NOT_FOUND, "Post not found"),
        Err(err) => engine_error(&err),
    }
}

/// POST /api/v1/posts/{id}/reaction
pub async fn handle_react<B>(engine: &Engine, post_id: &str, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let body = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let reaction_type = body
        .get("reaction_type")
        .and_then(|v| v.as_str())
        .unwrap_or("LIKE");

    match engine
        .engagement
        .react(post_id, engine.account_id(), reaction_type)
        .await
    {
        Ok(reaction) => json_created(&json!({
            "object": "ReactionCreated",
            "reaction_id": reaction.id,
        })),
        Err(err) => engine_error(&err),
    }
}

/// POST /api/v1/posts/{id}/comment
pub async fn handle_comment<B>(engine: &Engine, post_id: &str, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let body = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let text = match required_str(&body, "text", "Comment text is required") {
        Ok(text) => text,
        Err(resp) => return resp,
    };

    match engine
        .engagement
        .comment(post_id, engine.account_id(), text)
        .await
    {
        Ok(comment) => json_created(&json!({
            "object": "CommentCreated",
            "comment_id": comment.id,
        })),
        Err(err) => engine_error(&err),
    }
}
