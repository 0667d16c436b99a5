use crate::{auth::IdentityResolver, error::McpAuthError, AppState};
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::borrow::Cow;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Extract the API key from the `X-API-Key` header
pub fn extract_api_key(headers: &HeaderMap) -> Result<String, McpAuthError> {
    let value = headers
        .get(API_KEY_HEADER)
        .ok_or(McpAuthError::MissingCredential)?
        .to_str()
        .map_err(|_| McpAuthError::InvalidApiKey)?
        .trim();

    if value.is_empty() {
        return Err(McpAuthError::MissingCredential);
    }

    Ok(value.to_string())
}

/// Extract Bearer token from Authorization header
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, McpAuthError> {
    let auth_header = headers
        .get(header::AUTHORIZATION)
        .ok_or(McpAuthError::MissingCredential)?
        .to_str()
        .map_err(|_| McpAuthError::InvalidAuthorizationFormat)?;

    let token = auth_header
        .strip_prefix("Bearer ")
        .ok_or(McpAuthError::InvalidAuthorizationFormat)?
        .trim();

    if token.is_empty() {
        return Err(McpAuthError::InvalidAuthorizationFormat);
    }

    Ok(token.to_string())
}

/// Authenticates the API-key route
///
/// Resolves `X-API-Key` to an identity and attaches it to the request. No
/// MCP instance is touched when authentication fails.
pub async fn api_key_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, McpAuthError> {
    let key = extract_api_key(&headers)?;
    let identity = state.api_keys.resolve(&key).await.map_err(|err| {
        tracing::debug!(error = %err, "API key rejected");
        err
    })?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

/// Authenticates the OAuth route
///
/// Failures the client can fix are answered with a `WWW-Authenticate`
/// challenge pointing at the protected-resource metadata.
pub async fn oauth_auth_middleware(
    State(state): State<AppState>,
    headers: HeaderMap,
    mut request: Request,
    next: Next,
) -> Result<Response, McpAuthError> {
    let Some(resolver) = state.oauth.as_ref() else {
        return Err(McpAuthError::NotConfigured);
    };

    let token = match extract_bearer_token(&headers) {
        Ok(token) => token,
        Err(err) => return handle_auth_error(err, &state.base_url),
    };

    let identity = match resolver.resolve(&token).await {
        Ok(identity) => identity,
        Err(err) => {
            tracing::debug!(error = %err, "Bearer token rejected");
            return handle_auth_error(err, &state.base_url);
        }
    };

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn handle_auth_error(err: McpAuthError, base_url: &str) -> Result<Response, McpAuthError> {
    match err {
        McpAuthError::MissingCredential
        | McpAuthError::InvalidAuthorizationFormat
        | McpAuthError::InvalidToken => Ok(respond_with_bearer_challenge(err, base_url)),
        other => Err(other),
    }
}

fn respond_with_bearer_challenge(error: McpAuthError, base_url: &str) -> Response {
    let (status, error_code, description) = error.describe();
    let mut response = error.into_response();

    if status == StatusCode::UNAUTHORIZED {
        let (resource, resource_metadata) = compute_resource_urls(base_url);
        let description = sanitize_header_value(description);
        let header_value = format!(
            r#"Bearer realm="{}", error="{}", error_description="{}", resource="{}", resource_metadata="{}""#,
            AUTH_REALM, error_code, description, resource, resource_metadata
        );

        if let Ok(value) = HeaderValue::from_str(&header_value) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
    }

    response
}

pub fn compute_resource_urls(base_url: &str) -> (String, String) {
    let base = canonical_base_url(base_url);
    let resource = format!("{}/oauth/mcp", base);
    let metadata = format!("{}/.well-known/oauth-protected-resource", base);
    (resource, metadata)
}

/// Trims trailing slashes and upgrades non-local `http` bases to `https`
pub fn canonical_base_url(raw: &str) -> String {
    let trimmed = raw.trim_end_matches('/').to_string();

    if let Some(host) = trimmed.strip_prefix("http://") {
        if host.starts_with("localhost") || host.starts_with("127.0.0.1") {
            trimmed
        } else {
            format!("https://{}", host)
        }
    } else {
        trimmed
    }
}

fn sanitize_header_value(input: &str) -> Cow<'_, str> {
    if input.contains('"') {
        Cow::Owned(input.replace('"', "'"))
    } else {
        Cow::Borrowed(input)
    }
}

const AUTH_REALM: &str = "scenemcp";
