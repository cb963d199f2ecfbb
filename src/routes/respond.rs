//! Shared JSON response builders for the route handlers

use bytes::Bytes;
use http_body_util::{BodyExt, Full};
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};
use serde_json::Value;

use crate::types::EngineError;

/// Build a JSON response with the given status
pub fn json_response(status: StatusCode, body: &Value) -> Response<Full<Bytes>> {
    Response::builder()
        .status(status)
        .header("Content-Type", "application/json")
        .header("Access-Control-Allow-Origin", "*")
        .body(Full::new(Bytes::from(body.to_string())))
        .unwrap()
}

pub fn json_ok(body: &Value) -> Response<Full<Bytes>> {
    json_response(StatusCode::OK, body)
}

pub fn json_created(body: &Value) -> Response<Full<Bytes>> {
    json_response(StatusCode::CREATED, body)
}

/// `{error: message}` with the given status
pub fn error_response(status: StatusCode, message: &str) -> Response<Full<Bytes>> {
    json_response(status, &serde_json::json!({ "error": message }))
}

/// Map an engine error onto the HTTP surface
pub fn engine_error(err: &EngineError) -> Response<Full<Bytes>> {
    let status = match err {
        EngineError::NotFound(_) => StatusCode::NOT_FOUND,
        EngineError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        EngineError::NotConfigured(_) => StatusCode::NOT_IMPLEMENTED,
        EngineError::Upstream(_) => StatusCode::BAD_GATEWAY,
        EngineError::Store(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    error_response(status, &err.to_string())
}

/// Collect and parse a JSON request body. Handlers get either the parsed
/// value or a ready-made 400 to return as-is; no mutation happens on the
/// error path.
pub async fn read_json<B>(req: Request<B>) -> Result<Value, Response<Full<Bytes>>>
where
    B: Body<Data = Bytes>,
{
    let body = match req.collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(_) => {
            return Err(error_response(
                StatusCode::BAD_REQUEST,
                "Failed to read request body",
            ))
        }
    };
    if body.is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_slice(&body)
        .map_err(|_| error_response(StatusCode::BAD_REQUEST, "Invalid JSON body"))
}

/// Pull a required non-empty string field out of a JSON body
pub fn required_str<'a>(
    body: &'a Value,
    field: &str,
    message: &str,
) -> Result<&'a str, Response<Full<Bytes>>> {
    body.get(field)
        .and_then(|v| v.as_str())
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| error_response(StatusCode::BAD_REQUEST, message))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_engine_error_status_mapping() {
        let resp = engine_error(&EngineError::not_found("Chat"));
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);

        let resp = engine_error(&EngineError::invalid("Message text is required"));
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let resp = engine_error(&EngineError::NotConfigured("upstream"));
        assert_eq!(resp.status(), StatusCode::NOT_IMPLEMENTED);

        let resp = engine_error(&EngineError::Upstream("connection refused".into()));
        assert_eq!(resp.status(), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_required_str_rejects_blank() {
        let body = json!({ "text": "  " });
        assert!(required_str(&body, "text", "Message text is required").is_err());
        assert!(required_str(&body, "missing", "Message text is required").is_err());

        let body = json!({ "text": "hello" });
        assert_eq!(
            required_str(&body, "text", "Message text is required").unwrap(),
            "hello"
        );
    }
}
