//! MCP ServerHandler implementation for scenemcp
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────┐
//! │  SceneMcpService (one per identity) │
//! │  - Bound Identity                   │
//! │  - Routes JSON-RPC methods          │
//! │  - Implements ServerHandler         │
//! └──────────────┬──────────────────────┘
//!                │
//!                ├─> CapabilityRegistry (shared, Arc)
//!                │   └─> tools / resources / prompts
//!                │
//!                └─> Collaborators (shared, Arc)
//!                    ├─> ArtifactGenerator
//!                    └─> AssetLoader
//! ```
//!
//! # Supported Methods
//!
//! * `initialize` - server info and capabilities
//! * `ping` - empty result
//! * `notifications/initialized` - acknowledged, empty result
//! * `tools/list`, `tools/call`
//! * `resources/list`, `resources/read`
//! * `prompts/list`, `prompts/get`
//!
//! The service holds no mutable state, so one instance can serve concurrent
//! requests for its identity.

use crate::auth::Identity;
use crate::error::{CollaboratorError, McpServiceError};
use crate::mcp::capabilities::{CapabilityRegistry, ToolContext};
use crate::mcp::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::mcp::tools::{scene_prompt, DEFAULT_INTENSITY, DEFAULT_SIZE};
use crate::services::Collaborators;
use rmcp::handler::server::ServerHandler;
use rmcp::model::{Implementation, ProtocolVersion, ServerCapabilities, ServerInfo};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
struct CallToolParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Debug, Deserialize)]
struct ReadResourceParams {
    uri: String,
}

#[derive(Debug, Deserialize)]
struct GetPromptParams {
    name: String,
    #[serde(default)]
    arguments: Option<Map<String, Value>>,
}

#[derive(Clone)]
pub struct SceneMcpService {
    instance_id: Uuid,
    identity: Identity,
    capabilities: Arc<CapabilityRegistry>,
    collaborators: Collaborators,
}

impl SceneMcpService {
    pub fn new(
        instance_id: Uuid,
        identity: Identity,
        capabilities: Arc<CapabilityRegistry>,
        collaborators: Collaborators,
    ) -> Self {
        Self {
            instance_id,
            identity,
            capabilities,
            collaborators,
        }
    }

    pub fn identity(&self) -> &Identity {
        &self.identity
    }

    pub fn capabilities(&self) -> &CapabilityRegistry {
        &self.capabilities
    }

    /// Handle a validated JSON-RPC request
    ///
    /// Always produces a response carrying the request's id. Errors from
    /// routing are encoded as JSON-RPC error objects.
    pub async fn handle_request(&self, request: &JsonRpcRequest) -> JsonRpcResponse {
        let id = request.response_id();

        match self.route(&request.method, request.params.as_ref()).await {
            Ok(result) => JsonRpcResponse::success(id, result),
            Err(e) => {
                tracing::debug!(
                    identity = %self.identity.key,
                    instance_id = %self.instance_id,
                    method = %request.method,
                    error = %e,
                    "Request failed"
                );
                JsonRpcResponse::failure(id, e)
            }
        }
    }

    async fn route(&self, method: &str, params: Option<&Value>) -> Result<Value, McpServiceError> {
        match method {
            "initialize" => Ok(serde_json::to_value(self.get_info())?),

            "ping" | "notifications/initialized" => Ok(json!({})),

            "tools/list" => Ok(json!({
                "tools": self.capabilities.list_methods(),
            })),

            "tools/call" => {
                let params: CallToolParams = parse_params(params)?;
                let ctx = ToolContext {
                    identity: &self.identity,
                    collaborators: &self.collaborators,
                };
                let result = self
                    .capabilities
                    .invoke(&params.name, params.arguments.as_ref(), &ctx)
                    .await?;
                Ok(serde_json::to_value(&result)?)
            }

            "resources/list" => Ok(json!({
                "resources": self.capabilities.resources(),
            })),

            "resources/read" => {
                let params: ReadResourceParams = parse_params(params)?;
                self.read_resource(&params.uri).await
            }

            "prompts/list" => Ok(json!({
                "prompts": self.capabilities.prompts(),
            })),

            "prompts/get" => {
                let params: GetPromptParams = parse_params(params)?;
                self.get_prompt(&params.name, params.arguments.as_ref())
            }

            _ => Err(McpServiceError::MethodNotFound(method.to_string())),
        }
    }

    async fn read_resource(&self, uri: &str) -> Result<Value, McpServiceError> {
        let resource = self
            .capabilities
            .resource(uri)
            .ok_or_else(|| McpServiceError::ResourceNotFound(uri.to_string()))?;

        let text = self
            .collaborators
            .assets
            .load(resource.asset_path)
            .await
            .map_err(|e| match e {
                CollaboratorError::NotFound(_) => McpServiceError::ResourceNotFound(uri.to_string()),
                other => McpServiceError::Internal(other.to_string()),
            })?;

        Ok(json!({
            "contents": [{
                "uri": resource.uri,
                "mimeType": resource.mime_type,
                "text": text,
            }]
        }))
    }

    fn get_prompt(
        &self,
        name: &str,
        arguments: Option<&Map<String, Value>>,
    ) -> Result<Value, McpServiceError> {
        if self.capabilities.prompt(name).is_none() {
            return Err(McpServiceError::PromptNotFound(name.to_string()));
        }

        let subject = arguments
            .and_then(|a| a.get("subject"))
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| McpServiceError::Validation("Missing required argument 'subject'".into()))?;

        // Prompt arguments arrive as strings per the MCP prompt model.
        let intensity = match arguments.and_then(|a| a.get("intensity")) {
            None | Some(Value::Null) => DEFAULT_INTENSITY,
            Some(value) => value
                .as_str()
                .map(str::to_string)
                .unwrap_or_else(|| value.to_string())
                .parse::<u8>()
                .ok()
                .filter(|n| (1..=10).contains(n))
                .ok_or_else(|| {
                    McpServiceError::Validation("'intensity' must be between 1 and 10".into())
                })?,
        };

        Ok(json!({
            "description": format!("Scene about {}", subject),
            "messages": [{
                "role": "user",
                "content": {
                    "type": "text",
                    "text": scene_prompt(subject, intensity, DEFAULT_SIZE),
                }
            }]
        }))
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<&Value>) -> Result<T, McpServiceError> {
    let params = params.cloned().unwrap_or_else(|| json!({}));
    serde_json::from_value(params).map_err(|e| McpServiceError::Validation(e.to_string()))
}

impl ServerHandler for SceneMcpService {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities::builder()
                .enable_prompts()
                .enable_resources()
                .enable_tools()
                .build(),
            server_info: Implementation {
                name: "scenemcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Scene MCP".to_string()),
                website_url: None,
                icons: None,
            },
            instructions: Some(format!(
                "Generates animated p5.js scenes. Serving {}.",
                self.identity.label()
            )),
        }
    }
}
