//! Static API-key table for the credential-header transport
//!
//! Keys are configured as a comma-separated list of
//! `key=identity[:display name]` entries. Only the SHA-256 digest of each key
//! is kept in memory.

use super::{Identity, IdentityResolver, IdentitySource};
use crate::error::{ConfigError, McpAuthError};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::collections::HashMap;

#[derive(Debug, Clone)]
struct ApiKeyOwner {
    identity_key: String,
    display_name: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ApiKeyResolver {
    owners: HashMap<String, ApiKeyOwner>,
}

impl ApiKeyResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a `key=identity[:display name],...` list
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidApiKey` - an entry has an empty key or identity
    pub fn from_list(list: &str) -> Result<Self, ConfigError> {
        let mut resolver = Self::new();

        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            let (key, owner) = entry
                .split_once('=')
                .ok_or_else(|| ConfigError::InvalidApiKey(redact(entry)))?;

            let (identity_key, display_name) = match owner.split_once(':') {
                Some((id, name)) => (id.trim(), Some(name.trim())),
                None => (owner.trim(), None),
            };

            if key.trim().is_empty() || identity_key.is_empty() {
                return Err(ConfigError::InvalidApiKey(redact(entry)));
            }

            resolver.insert(key.trim(), identity_key, display_name.filter(|n| !n.is_empty()));
        }

        Ok(resolver)
    }

    /// Registers `key` as a credential for `identity_key`
    pub fn insert(&mut self, key: &str, identity_key: &str, display_name: Option<&str>) {
        self.owners.insert(
            hash_key(key),
            ApiKeyOwner {
                identity_key: identity_key.to_string(),
                display_name: display_name.map(str::to_string),
            },
        );
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }
}

#[async_trait]
impl IdentityResolver for ApiKeyResolver {
    async fn resolve(&self, credential: &str) -> Result<Identity, McpAuthError> {
        let owner = self
            .owners
            .get(&hash_key(credential))
            .ok_or(McpAuthError::InvalidApiKey)?;

        let mut identity = Identity::new(owner.identity_key.clone(), IdentitySource::ApiKey);
        identity.display_name = owner.display_name.clone();
        Ok(identity)
    }
}

fn hash_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hex::encode(hasher.finalize())
}

/// Keeps the identity part of an entry for error messages, never the key
fn redact(entry: &str) -> String {
    match entry.split_once('=') {
        Some((_, owner)) => format!("***={}", owner),
        None => "***".to_string(),
    }
}
