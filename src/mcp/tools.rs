//! Tool handlers for the scene capability surface
//!
//! # Tools
//!
//! * `generate_scene` - asks the generation collaborator for sketch code and
//!   relays it unchanged as `{ code, subject, size }`
//! * `get_docs` - returns the reference text for one topic
//!
//! Collaborator failures become error-flagged tool results. They are not
//! protocol errors and are never retried here.

use crate::error::McpServiceError;
use crate::mcp::capabilities::{ToolContext, ToolHandler};
use crate::mcp::docs;
use crate::services::GenerationParams;
use async_trait::async_trait;
use rmcp::model::{CallToolResult, Content};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

pub const DEFAULT_INTENSITY: u8 = 5;
pub const DEFAULT_SIZE: u32 = 600;
pub const MAX_SIZE: u32 = u32::MAX;

#[derive(Debug, Clone, Deserialize)]
pub struct SceneRequest {
    pub subject: String,
    pub intensity: u8,
    pub size: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SceneArtifact {
    pub code: String,
    pub subject: String,
    pub size: u32,
}

/// Builds the instruction sent to the generation model
pub fn scene_prompt(subject: &str, intensity: u8, size: u32) -> String {
    let mood = match intensity {
        0..=3 => "calm and slow",
        4..=7 => "steady and flowing",
        _ => "energetic and fast",
    };

    format!(
        "Create an animated p5.js scene depicting: {subject}.\n\
         Intensity {intensity}/10, so the motion should feel {mood}.\n\
         Call createCanvas({size}, {size}) in setup() and animate in draw().\n\
         Use only p5.js built-ins; do not load external assets.\n\
         Return only the JavaScript source."
    )
}

/// Parses handler arguments that have already passed schema validation
fn parse_args<T: serde::de::DeserializeOwned>(args: Map<String, Value>) -> Result<T, McpServiceError> {
    serde_json::from_value(Value::Object(args))
        .map_err(|e| McpServiceError::Validation(e.to_string()))
}

fn structured(text: String, structured_content: Value) -> CallToolResult {
    let mut result = CallToolResult::success(vec![Content::text(text)]);
    result.structured_content = Some(structured_content);
    result
}

pub struct GenerateSceneTool;

#[async_trait]
impl ToolHandler for GenerateSceneTool {
    async fn call(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<CallToolResult, McpServiceError> {
        let request: SceneRequest = parse_args(args)?;
        let params = GenerationParams {
            intensity: request.intensity,
            size: request.size,
        };
        let prompt = scene_prompt(&request.subject, request.intensity, request.size);

        tracing::info!(
            identity = %ctx.identity.key,
            user = ctx.identity.label(),
            subject = %request.subject,
            intensity = request.intensity,
            size = request.size,
            "Generating scene"
        );

        match ctx.collaborators.generator.generate(&prompt, &params).await {
            Ok(code) => {
                let artifact = SceneArtifact {
                    code: code.clone(),
                    subject: request.subject,
                    size: request.size,
                };
                Ok(structured(code, serde_json::to_value(&artifact)?))
            }
            Err(e) => {
                tracing::warn!(
                    identity = %ctx.identity.key,
                    error = %e,
                    "Scene generation failed"
                );
                Ok(CallToolResult::error(vec![Content::text(format!(
                    "Scene generation failed: {}",
                    e
                ))]))
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct DocsRequest {
    topic: String,
}

pub struct DocsTool;

#[async_trait]
impl ToolHandler for DocsTool {
    async fn call(
        &self,
        args: Map<String, Value>,
        ctx: &ToolContext<'_>,
    ) -> Result<CallToolResult, McpServiceError> {
        let request: DocsRequest = parse_args(args)?;
        let text = docs::lookup(&request.topic).ok_or_else(|| {
            McpServiceError::Validation(format!("Unknown topic '{}'", request.topic))
        })?;

        tracing::debug!(identity = %ctx.identity.key, topic = %request.topic, "Docs lookup");

        Ok(structured(text.clone(), json!({ "text": text })))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{Identity, IdentitySource};
    use crate::error::CollaboratorError;
    use crate::services::generator::MockArtifactGenerator;
    use crate::services::{Collaborators, asset_loader::MockAssetLoader};
    use std::sync::Arc;

    fn args(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_scene_prompt_mentions_inputs() {
        let prompt = scene_prompt("fireflies", 2, 400);
        assert!(prompt.contains("fireflies"));
        assert!(prompt.contains("createCanvas(400, 400)"));
        assert!(prompt.contains("calm"));
        assert!(scene_prompt("storm", 9, 600).contains("energetic"));
    }

    #[tokio::test]
    async fn test_generate_scene_relays_code() {
        let mut generator = MockArtifactGenerator::new();
        generator
            .expect_generate()
            .withf(|prompt, params| {
                prompt.contains("calm") && params.intensity == 3 && params.size == 600
            })
            .times(1)
            .returning(|_, _| Ok("X".to_string()));

        let collaborators = Collaborators::new(Arc::new(generator), Arc::new(MockAssetLoader::new()));
        let identity = Identity::new("user-1", IdentitySource::ApiKey);
        let ctx = ToolContext {
            identity: &identity,
            collaborators: &collaborators,
        };

        let result = GenerateSceneTool
            .call(args(json!({ "subject": "calm", "intensity": 3, "size": 600 })), &ctx)
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(false));
        assert_eq!(
            result.structured_content,
            Some(json!({ "code": "X", "subject": "calm", "size": 600 }))
        );
    }

    #[tokio::test]
    async fn test_generate_scene_failure_is_tool_error() {
        let mut generator = MockArtifactGenerator::new();
        generator
            .expect_generate()
            .times(1)
            .returning(|_, _| Err(CollaboratorError::Generation("model offline".to_string())));

        let collaborators = Collaborators::new(Arc::new(generator), Arc::new(MockAssetLoader::new()));
        let identity = Identity::new("user-1", IdentitySource::ApiKey);
        let ctx = ToolContext {
            identity: &identity,
            collaborators: &collaborators,
        };

        let result = GenerateSceneTool
            .call(args(json!({ "subject": "rain", "intensity": 5, "size": 600 })), &ctx)
            .await
            .unwrap();

        assert_eq!(result.is_error, Some(true));
        assert!(result.structured_content.is_none());
    }

    #[tokio::test]
    async fn test_docs_tool_returns_topic_text() {
        let collaborators = Collaborators::new(
            Arc::new(MockArtifactGenerator::new()),
            Arc::new(MockAssetLoader::new()),
        );
        let identity = Identity::new("user-1", IdentitySource::OAuth);
        let ctx = ToolContext {
            identity: &identity,
            collaborators: &collaborators,
        };

        let result = DocsTool
            .call(args(json!({ "topic": "color" })), &ctx)
            .await
            .unwrap();

        let structured = result.structured_content.unwrap();
        assert!(structured["text"].as_str().unwrap().contains("## Color"));
    }
}
