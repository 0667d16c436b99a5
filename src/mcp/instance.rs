//! MCP server instance management
//!
//! Each [`McpServerInstance`] wraps the MCP service for one caller identity.
//! [`InstanceFactory`] builds them; every instance exposes the same
//! capability surface and differs only in the identity it is bound to.

use crate::auth::Identity;
use crate::mcp::capabilities::CapabilityRegistry;
use crate::mcp::service::SceneMcpService;
use crate::services::Collaborators;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// Individual MCP server instance
///
/// # Fields
///
/// * `instance_id` - Unique id, used to tell instances apart in logs
/// * `identity` - Caller this instance serves
/// * `created_at` - Construction time
/// * `service` - MCP protocol handler
pub struct McpServerInstance {
    pub instance_id: Uuid,
    pub identity: Identity,
    pub created_at: DateTime<Utc>,
    service: SceneMcpService,
}

impl McpServerInstance {
    /// Returns the MCP service
    pub fn service(&self) -> &SceneMcpService {
        &self.service
    }

    /// Names of the tools this instance exposes, in listing order
    pub fn tool_names(&self) -> Vec<&'static str> {
        self.service.capabilities().tool_names()
    }
}

impl std::fmt::Debug for McpServerInstance {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServerInstance")
            .field("instance_id", &self.instance_id)
            .field("identity", &self.identity.key)
            .field("created_at", &self.created_at)
            .finish()
    }
}

/// Builds fresh instances around the shared capability registry
#[derive(Clone)]
pub struct InstanceFactory {
    capabilities: Arc<CapabilityRegistry>,
    collaborators: Collaborators,
}

impl InstanceFactory {
    pub fn new(capabilities: Arc<CapabilityRegistry>, collaborators: Collaborators) -> Self {
        Self {
            capabilities,
            collaborators,
        }
    }

    /// Creates a new instance bound to `identity`. Performs no I/O.
    pub fn create(&self, identity: &Identity) -> McpServerInstance {
        let instance_id = Uuid::new_v4();

        tracing::debug!(
            identity = %identity.key,
            instance_id = %instance_id,
            "Creating MCP server instance"
        );

        McpServerInstance {
            instance_id,
            identity: identity.clone(),
            created_at: Utc::now(),
            service: SceneMcpService::new(
                instance_id,
                identity.clone(),
                Arc::clone(&self.capabilities),
                self.collaborators.clone(),
            ),
        }
    }
}
