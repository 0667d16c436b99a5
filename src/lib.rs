pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod mcp;
pub mod middleware;
pub mod services;

// Make test_utils available for both unit tests and integration tests
pub mod test_utils;

use axum::{
    middleware::from_fn_with_state,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::auth::IdentityResolver;
use crate::mcp::RequestDispatcher;

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: RequestDispatcher,
    pub api_keys: Arc<dyn IdentityResolver>,
    /// `None` disables the bearer-token route
    pub oauth: Option<Arc<dyn IdentityResolver>>,
    pub authorization_server: Option<String>,
    pub base_url: String,
}

/// Builds the HTTP router
///
/// CORS preflight is answered without credentials; every other MCP request
/// passes through the route's auth middleware first.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route(
            "/mcp",
            post(mcp::handle_streamable_http)
                .route_layer(from_fn_with_state(
                    state.clone(),
                    middleware::api_key_auth_middleware,
                ))
                .options(mcp::handle_streamable_http_options),
        )
        .route(
            "/oauth/mcp",
            post(mcp::handle_streamable_http)
                .route_layer(from_fn_with_state(
                    state.clone(),
                    middleware::oauth_auth_middleware,
                ))
                .options(mcp::handle_streamable_http_options),
        )
        .route(
            "/.well-known/oauth-protected-resource",
            get(handlers::oauth_protected_resource_metadata).options(handlers::options_handler),
        )
        .route("/health", get(mcp::health_handler))
        .with_state(state)
}
