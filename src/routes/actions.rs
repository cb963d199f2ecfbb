//! Dashboard action route
//!
//! POST /actions carries `{action, id?, data?}`. The response is always the
//! action envelope with HTTP 200; only an unreadable body gets an HTTP
//! error, since the dashboards key off `success` rather than status codes.

use bytes::Bytes;
use http_body_util::Full;
use hyper::body::Body;
use hyper::{Request, Response, StatusCode};

use crate::engine::actions::{self, ActionRequest};
use crate::engine::Engine;
use crate::routes::respond::{error_response, json_ok, read_json};

/// POST /actions
pub async fn handle_action_request<B>(engine: &Engine, req: Request<B>) -> Response<Full<Bytes>>
where
    B: Body<Data = Bytes>,
{
    let body = match read_json(req).await {
        Ok(body) => body,
        Err(resp) => return resp,
    };
    let request: ActionRequest = match serde_json::from_value(body) {
        Ok(request) => request,
        Err(_) => return error_response(StatusCode::BAD_REQUEST, "Invalid action request"),
    };

    let result = actions::dispatch(engine, &request).await;
    json_ok(&result)
}
