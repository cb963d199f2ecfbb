//! Upstream passthrough for unhandled API routes
//!
//! Anything under the API prefix that no local handler claims is forwarded
//! to the configured upstream with the service prefix already stripped, and
//! its answer is relayed verbatim. Without an upstream this answers a fixed
//! not-implemented JSON rather than a 404, so clients can tell "the mock
//! does not emulate this" apart from "the path is wrong".

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use tracing::{debug, warn};

use crate::routes::respond::{error_response, json_response};
use crate::upstream::UpstreamClient;

/// Fixed answer for passthrough without a configured upstream
pub fn not_implemented(path: &str) -> Response<Full<Bytes>> {
    json_response(
        StatusCode::NOT_IMPLEMENTED,
        &serde_json::json!({
            "error": "Not implemented",
            "message": "No upstream configured for passthrough",
            "path": path,
        }),
    )
}

pub async fn handle_passthrough<B>(
    upstream: Option<&UpstreamClient>,
    req: Request<B>,
    path: &str,
) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let Some(upstream) = upstream else {
        debug!(path = %path, "passthrough without upstream");
        return not_implemented(path);
    };

    let method = req.method().clone();
    let path_and_query = match req.uri().query() {
        Some(query) => format!("{}?{}", path, query),
        None => path.to_string(),
    };
    let content_type = req
        .headers()
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Failed to read request body"),
    };

    match upstream
        .relay(&method, &path_and_query, content_type.as_deref(), body)
        .await
    {
        Ok(relayed) => {
            let status = StatusCode::from_u16(relayed.status).unwrap_or(StatusCode::BAD_GATEWAY);
            let mut builder = Response::builder()
                .status(status)
                .header("Access-Control-Allow-Origin", "*");
            if let Some(ct) = relayed.content_type {
                builder = builder.header("Content-Type", ct);
            }
            builder.body(Full::new(relayed.body)).unwrap()
        }
        Err(err) => {
            warn!(path = %path, error = %err, "passthrough relay failed");
            json_response(
                StatusCode::BAD_GATEWAY,
                &serde_json::json!({ "error": "Bad gateway", "message": err.to_string() }),
            )
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_implemented_is_501() {
        let resp = not_implemented("/api/v1/linkedin/search");
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }

    #[tokio::test]
    async fn test_passthrough_without_upstream() {
        let req = Request::builder()
            .method(hyper::Method::GET)
            .uri("/api/v1/webhooks")
            .body(Full::new(Bytes::new()))
            .unwrap();
        let resp = handle_passthrough(None, req, "/api/v1/webhooks").await;
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);
    }
}
