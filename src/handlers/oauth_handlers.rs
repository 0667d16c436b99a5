use crate::middleware::mcp_auth::compute_resource_urls;
use crate::AppState;
use axum::http::{header, HeaderMap, StatusCode};
use axum::{
    extract::State,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;

/// GET /.well-known/oauth-protected-resource
///
/// RFC 9728 metadata for the bearer-token route. Public so clients can
/// discover where to obtain a token after a 401 challenge.
///
/// ## Response (200 OK)
/// ```json
/// {
///   "resource": "https://scenes.example.com/oauth/mcp",
///   "authorization_servers": ["https://auth.example.com"],
///   "bearer_methods_supported": ["header"],
///   "resource_name": "scenemcp"
/// }
/// ```
///
/// ## Errors
/// - 404 Not Found: the OAuth route is not configured
pub async fn oauth_protected_resource_metadata(
    State(state): State<AppState>,
) -> Result<Response, StatusCode> {
    if state.oauth.is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    let (resource, _) = compute_resource_urls(&state.base_url);
    let metadata = OAuthProtectedResourceMetadata {
        resource,
        authorization_servers: state.authorization_server.iter().cloned().collect(),
        bearer_methods_supported: vec!["header"],
        resource_name: "scenemcp",
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::HeaderValue::from_static("Authorization, Content-Type, mcp-protocol-version"),
    );

    Ok((StatusCode::OK, headers, Json(metadata)).into_response())
}

/// OPTIONS handler for CORS preflight requests
pub async fn options_handler() -> Response {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_ORIGIN,
        header::HeaderValue::from_static("*"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        header::HeaderValue::from_static("GET, OPTIONS"),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        header::HeaderValue::from_static("Authorization, Content-Type, mcp-protocol-version"),
    );
    headers.insert(
        header::ACCESS_CONTROL_MAX_AGE,
        header::HeaderValue::from_static("3600"),
    );

    (StatusCode::NO_CONTENT, headers).into_response()
}

/// OAuth 2.0 Protected Resource Metadata (RFC 9728)
#[derive(Debug, Serialize)]
pub struct OAuthProtectedResourceMetadata {
    pub resource: String,
    pub authorization_servers: Vec<String>,
    pub bearer_methods_supported: Vec<&'static str>,
    pub resource_name: &'static str,
}
