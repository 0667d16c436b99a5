pub mod mcp_auth;

pub use mcp_auth::{
    api_key_auth_middleware, extract_api_key, extract_bearer_token, oauth_auth_middleware,
    API_KEY_HEADER,
};
