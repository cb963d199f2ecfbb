//! Account listing route
//!
//! The emulation owns exactly one connected account; clients that enumerate
//! accounts before talking to the API get this fixed answer.

use bytes::Bytes;
use http_body_util::Full;
use hyper::Response;
use serde_json::json;

use crate::routes::respond::json_ok;

/// GET /api/v1/accounts
pub fn handle_accounts() -> Response<Full<Bytes>> {
    json_ok(&json!({
        "object": "AccountList",
        "items": [{
            "object": "Account",
            "id": "mock_account_001",
            "provider": "LINKEDIN",
            "status": "connected",
            "name": "Mock LinkedIn Account",
        }],
    }))
}
