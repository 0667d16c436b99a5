//! OAuth bearer-token resolver backed by RFC 7662 token introspection
//!
//! The authorization server owns token issuance and exchange; this resolver
//! only asks it whether a presented token is active and who it belongs to.

use super::{Identity, IdentityResolver, IdentitySource};
use crate::error::McpAuthError;
use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use std::time::Duration;

/// Introspection endpoint response (RFC 7662 section 2.2)
#[derive(Debug, Deserialize)]
pub struct IntrospectionResponse {
    pub active: bool,
    pub sub: Option<String>,
    pub username: Option<String>,
    pub email: Option<String>,
    pub exp: Option<i64>,
    pub scope: Option<String>,
}

#[derive(Clone)]
pub struct IntrospectionResolver {
    client: reqwest::Client,
    endpoint: String,
    client_id: Option<String>,
    client_secret: Option<String>,
}

impl IntrospectionResolver {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            client_id: None,
            client_secret: None,
        })
    }

    /// Authenticates introspection calls with HTTP Basic client credentials
    pub fn with_client_credentials(
        mut self,
        client_id: impl Into<String>,
        client_secret: impl Into<String>,
    ) -> Self {
        self.client_id = Some(client_id.into());
        self.client_secret = Some(client_secret.into());
        self
    }

    async fn introspect(&self, token: &str) -> Result<IntrospectionResponse, McpAuthError> {
        let mut request = self
            .client
            .post(&self.endpoint)
            .form(&[("token", token), ("token_type_hint", "access_token")]);

        if let Some(client_id) = &self.client_id {
            request = request.basic_auth(client_id, self.client_secret.as_deref());
        }

        let response = request.send().await.map_err(|e| {
            tracing::error!(error = %e, "Token introspection request failed");
            McpAuthError::ServiceError(e.into())
        })?;

        if !response.status().is_success() {
            tracing::warn!(status = %response.status(), "Token introspection rejected");
            return Err(McpAuthError::InvalidToken);
        }

        response
            .json::<IntrospectionResponse>()
            .await
            .map_err(|e| McpAuthError::ServiceError(e.into()))
    }
}

#[async_trait]
impl IdentityResolver for IntrospectionResolver {
    async fn resolve(&self, credential: &str) -> Result<Identity, McpAuthError> {
        let introspected = self.introspect(credential).await?;

        if !introspected.active {
            return Err(McpAuthError::InvalidToken);
        }

        if let Some(exp) = introspected.exp {
            if exp < Utc::now().timestamp() {
                return Err(McpAuthError::InvalidToken);
            }
        }

        let subject = introspected.sub.ok_or(McpAuthError::InvalidToken)?;

        let mut identity = Identity::new(subject, IdentitySource::OAuth);
        identity.display_name = introspected.username;
        identity.email = introspected.email;
        Ok(identity)
    }
}
