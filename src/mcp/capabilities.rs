//! Fixed capability surface bound into every MCP server instance
//!
//! The [`CapabilityRegistry`] is an ordered table of tools (name, input
//! schema, handler) plus the resource and prompt descriptors. It is built
//! once at startup and shared by all instances through an `Arc`, so every
//! caller sees the same names in the same order. Identity-specific state
//! reaches handlers only through the per-call [`ToolContext`].

use crate::auth::Identity;
use crate::error::McpServiceError;
use crate::mcp::schema::{FieldSpec, InputSchema};
use crate::mcp::{docs, tools};
use crate::services::Collaborators;
use async_trait::async_trait;
use rmcp::model::CallToolResult;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Per-call context handed to tool handlers
pub struct ToolContext<'a> {
    pub identity: &'a Identity,
    pub collaborators: &'a Collaborators,
}

/// Body of a tool. Receives arguments already validated against its schema.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    async fn call(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<CallToolResult, McpServiceError>;
}

#[derive(Clone)]
pub struct ToolEntry {
    pub name: &'static str,
    pub title: &'static str,
    pub description: &'static str,
    pub schema: InputSchema,
    pub handler: Arc<dyn ToolHandler>,
}

impl ToolEntry {
    fn descriptor(&self) -> rmcp::model::Tool {
        rmcp::model::Tool {
            name: self.name.into(),
            description: Some(self.description.into()),
            input_schema: Arc::new(self.schema.to_json_schema()),
            annotations: None,
            title: Some(self.title.to_string()),
            icons: None,
            output_schema: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDescriptor {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    pub mime_type: &'static str,
    /// Asset path handed to the asset loader
    #[serde(skip)]
    pub asset_path: &'static str,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptArgumentDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub required: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PromptDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub arguments: Vec<PromptArgumentDescriptor>,
}

#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    tools: Vec<ToolEntry>,
    resources: Vec<ResourceDescriptor>,
    prompts: Vec<PromptDescriptor>,
}

pub const SCENE_VIEWER_URI: &str = "ui://widget/scene-viewer.html";
pub const GENERATE_SCENE: &str = "generate_scene";
pub const GET_DOCS: &str = "get_docs";
pub const SCENE_PROMPT: &str = "scene";

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The capability surface served by scenemcp
    pub fn builtin() -> Self {
        Self::new()
            .with_tool(ToolEntry {
                name: GENERATE_SCENE,
                title: "Generate scene",
                description: "Generate an animated p5.js scene for a subject. \
                              Returns the sketch source code.",
                schema: InputSchema::new()
                    .field(
                        FieldSpec::string("subject", "What the scene should depict")
                            .required()
                            .non_empty(),
                    )
                    .field(
                        FieldSpec::integer("intensity", "1 = calm, 10 = energetic")
                            .range(Some(1), Some(10))
                            .default_value(json!(tools::DEFAULT_INTENSITY)),
                    )
                    .field(
                        FieldSpec::integer("size", "Canvas edge in pixels")
                            .range(Some(1), Some(i64::from(tools::MAX_SIZE)))
                            .default_value(json!(tools::DEFAULT_SIZE)),
                    ),
                handler: Arc::new(tools::GenerateSceneTool),
            })
            .with_tool(ToolEntry {
                name: GET_DOCS,
                title: "Scene documentation",
                description: "Look up the conventions generated scenes follow.",
                schema: InputSchema::new().field(
                    FieldSpec::one_of("topic", "Section to return", docs::TOPICS)
                        .default_value(json!("all")),
                ),
                handler: Arc::new(tools::DocsTool),
            })
            .with_resource(ResourceDescriptor {
                uri: SCENE_VIEWER_URI,
                name: "scene-viewer",
                description: "HTML widget that renders generated scenes",
                mime_type: "text/html",
                asset_path: "widgets/scene-viewer.html",
            })
            .with_prompt(PromptDescriptor {
                name: SCENE_PROMPT,
                description: "Ask for a scene about a subject",
                arguments: vec![
                    PromptArgumentDescriptor {
                        name: "subject",
                        description: "What the scene should depict",
                        required: true,
                    },
                    PromptArgumentDescriptor {
                        name: "intensity",
                        description: "1 = calm, 10 = energetic",
                        required: false,
                    },
                ],
            })
    }

    /// Appends a tool. A tool with the same name is replaced in place.
    pub fn with_tool(mut self, entry: ToolEntry) -> Self {
        match self.tools.iter_mut().find(|t| t.name == entry.name) {
            Some(existing) => {
                tracing::warn!(tool = entry.name, "Replacing already registered tool");
                *existing = entry;
            }
            None => self.tools.push(entry),
        }
        self
    }

    pub fn with_resource(mut self, resource: ResourceDescriptor) -> Self {
        self.resources.push(resource);
        self
    }

    pub fn with_prompt(mut self, prompt: PromptDescriptor) -> Self {
        self.prompts.push(prompt);
        self
    }

    /// Tool descriptors in registration order
    pub fn list_methods(&self) -> Vec<rmcp::model::Tool> {
        self.tools.iter().map(ToolEntry::descriptor).collect()
    }

    pub fn tool_names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }

    pub fn resources(&self) -> &[ResourceDescriptor] {
        &self.resources
    }

    pub fn resource(&self, uri: &str) -> Option<&ResourceDescriptor> {
        self.resources.iter().find(|r| r.uri == uri)
    }

    pub fn prompts(&self) -> &[PromptDescriptor] {
        &self.prompts
    }

    pub fn prompt(&self, name: &str) -> Option<&PromptDescriptor> {
        self.prompts.iter().find(|p| p.name == name)
    }

    /// Validates `args` against the tool's schema, then runs the handler
    ///
    /// # Errors
    ///
    /// * `McpServiceError::ToolNotFound` - no tool named `name`
    /// * `McpServiceError::Validation` - arguments violate the schema; the
    ///   handler is not called
    pub async fn invoke(
        &self,
        name: &str,
        args: Option<&Map<String, Value>>,
        ctx: &ToolContext<'_>,
    ) -> Result<CallToolResult, McpServiceError> {
        let entry = self
            .tools
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| McpServiceError::ToolNotFound(name.to_string()))?;

        let validated = entry.schema.validate(args)?;
        entry.handler.call(validated, ctx).await
    }
}
