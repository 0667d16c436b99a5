//! Caller identity and the resolvers that produce it
//!
//! Both transports turn a credential into an [`Identity`] before dispatch.
//! The identity key selects the cached MCP server instance; the display
//! attributes are only used for attribution in logs.

pub mod api_key;
pub mod introspection;

pub use api_key::ApiKeyResolver;
pub use introspection::IntrospectionResolver;

use crate::error::McpAuthError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable key identifying one caller
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdentityKey(String);

impl IdentityKey {
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for IdentityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for IdentityKey {
    fn from(key: &str) -> Self {
        Self::new(key)
    }
}

/// Which transport authenticated the caller
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdentitySource {
    ApiKey,
    OAuth,
}

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub key: IdentityKey,
    pub display_name: Option<String>,
    pub email: Option<String>,
    pub source: IdentitySource,
}

impl Identity {
    pub fn new(key: impl Into<String>, source: IdentitySource) -> Self {
        Self {
            key: IdentityKey::new(key),
            display_name: None,
            email: None,
            source,
        }
    }

    pub fn with_display_name(mut self, name: impl Into<String>) -> Self {
        self.display_name = Some(name.into());
        self
    }

    pub fn with_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self
    }

    /// Name used for attribution: display name, then email, then key
    pub fn label(&self) -> &str {
        self.display_name
            .as_deref()
            .or(self.email.as_deref())
            .unwrap_or_else(|| self.key.as_str())
    }
}

/// Turns a raw credential into an [`Identity`]
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IdentityResolver: Send + Sync {
    async fn resolve(&self, credential: &str) -> Result<Identity, McpAuthError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_prefers_display_name() {
        let identity = Identity::new("user-1", IdentitySource::ApiKey)
            .with_email("ada@example.com")
            .with_display_name("Ada");
        assert_eq!(identity.label(), "Ada");
    }

    #[test]
    fn test_label_falls_back_to_email_then_key() {
        let identity = Identity::new("user-1", IdentitySource::OAuth).with_email("ada@example.com");
        assert_eq!(identity.label(), "ada@example.com");

        let identity = Identity::new("user-1", IdentitySource::OAuth);
        assert_eq!(identity.label(), "user-1");
    }

    #[test]
    fn test_identity_key_serializes_as_string() {
        let key = IdentityKey::new("user-1");
        assert_eq!(serde_json::to_value(&key).unwrap(), serde_json::json!("user-1"));
    }
}
