//! Streamable HTTP transport handler for MCP
//!
//! Both authenticated routes end here. The auth middleware in front of each
//! route resolves the caller and stores the [`Identity`] in the request
//! extensions; from this point the two transports behave identically.
//!
//! # URL Structure
//!
//! - `POST /mcp` - API-key route
//! - `POST /oauth/mcp` - bearer-token route
//! - `OPTIONS` on either - CORS preflight
//!
//! # Usage
//!
//! ```http
//! POST /mcp
//! Content-Type: application/json
//! X-API-Key: sk-...
//!
//! {"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}
//! ```
//!
//! Response:
//! ```http
//! HTTP/1.1 200 OK
//! Content-Type: application/json
//!
//! {"jsonrpc":"2.0","id":1,"result":{...}}
//! ```
//!
//! Notifications are acknowledged with `202 Accepted` and an empty body.

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Extension,
};

use crate::auth::Identity;
use crate::AppState;

/// POST /mcp, POST /oauth/mcp - Streamable HTTP transport
///
/// Handles a single MCP JSON-RPC message. Protocol failures, including
/// malformed JSON, are returned as JSON-RPC error objects with status 200.
///
/// # Returns
///
/// * `200 OK` with a JSON-RPC response
/// * `202 Accepted` for notifications
/// * `500 Internal Server Error` if the response cannot be serialized
pub async fn handle_streamable_http(
    State(state): State<AppState>,
    Extension(identity): Extension<Identity>,
    body: Bytes,
) -> Result<Response, StatusCode> {
    tracing::debug!(
        identity = %identity.key,
        source = ?identity.source,
        bytes = body.len(),
        "Received HTTP transport request"
    );

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static("*"),
    );

    let Some(response) = state.dispatcher.dispatch_message(&body, &identity).await else {
        return Ok((StatusCode::ACCEPTED, headers).into_response());
    };

    let body = Body::from(serde_json::to_string(&response).map_err(|e| {
        tracing::error!(error = %e, "Failed to serialize JSON-RPC response");
        StatusCode::INTERNAL_SERVER_ERROR
    })?);

    headers.insert(
        header::CONTENT_TYPE,
        header::HeaderValue::from_static("application/json"),
    );

    Ok((StatusCode::OK, headers, body).into_response())
}

/// OPTIONS /mcp, OPTIONS /oauth/mcp - CORS preflight handler
///
/// # Returns
///
/// `204 No Content` with appropriate CORS headers
pub async fn handle_streamable_http_options() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::HeaderValue::from_static("POST, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::HeaderValue::from_static(
            "Content-Type, Authorization, X-API-Key, mcp-protocol-version",
        ),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        header::HeaderValue::from_static("3600"),
    );

    (StatusCode::NO_CONTENT, headers).into_response()
}
