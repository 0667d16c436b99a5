//! Scene code generation collaborator
//!
//! [`ArtifactGenerator`] is the seam to the text-generation model that turns a
//! scene prompt into sketch source code. The code is treated as an opaque
//! string; nothing in this crate evaluates it.
//!
//! [`ChatCompletionsGenerator`] talks to any OpenAI-compatible
//! `/chat/completions` endpoint.

use crate::error::CollaboratorError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// Knobs forwarded alongside the prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GenerationParams {
    /// 1 (calm) to 10 (energetic)
    pub intensity: u8,
    /// Square canvas edge in pixels
    pub size: u32,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ArtifactGenerator: Send + Sync {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, CollaboratorError>;
}

const SYSTEM_PROMPT: &str = "You write self-contained p5.js sketches in global mode. \
Reply with JavaScript source only, no explanations.";

#[derive(Clone)]
pub struct ChatCompletionsGenerator {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

#[derive(Debug, Deserialize)]
struct CompletionResponse {
    choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct CompletionChoice {
    message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
struct CompletionMessage {
    content: Option<String>,
}

impl ChatCompletionsGenerator {
    /// Creates a generator for `base_url` (without the `/chat/completions` suffix)
    ///
    /// The timeout bounds every generation call.
    pub fn new(
        base_url: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, CollaboratorError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: None,
            model: model.into(),
        })
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    fn temperature(params: &GenerationParams) -> f32 {
        0.5 + f32::from(params.intensity.clamp(1, 10)) * 0.05
    }
}

#[async_trait]
impl ArtifactGenerator for ChatCompletionsGenerator {
    async fn generate(
        &self,
        prompt: &str,
        params: &GenerationParams,
    ) -> Result<String, CollaboratorError> {
        let body = json!({
            "model": self.model,
            "temperature": Self::temperature(params),
            "messages": [
                { "role": "system", "content": SYSTEM_PROMPT },
                { "role": "user", "content": prompt },
            ],
        });

        let mut request = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .json(&body);

        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request.send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(CollaboratorError::Generation(format!(
                "model endpoint returned {}: {}",
                status, detail
            )));
        }

        let completion: CompletionResponse = response.json().await?;
        let content = completion
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| CollaboratorError::Generation("empty completion".to_string()))?;

        let code = strip_code_fence(&content);
        if code.is_empty() {
            return Err(CollaboratorError::Generation("empty completion".to_string()));
        }

        Ok(code.to_string())
    }
}

/// Removes one surrounding Markdown code fence, if present
pub fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };

    // Drop the info string (e.g. "javascript") on the opening line.
    let body = match rest.find('\n') {
        Some(newline) => &rest[newline + 1..],
        None => rest,
    };

    body.strip_suffix("```").unwrap_or(body).trim()
}
