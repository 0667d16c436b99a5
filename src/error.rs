use axum::{
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde_json::json;
use thiserror::Error;

/// Error types for MCP request handling
///
/// Every variant is caught at the dispatch boundary and turned into a
/// JSON-RPC error object; none of them abort the process.
///
/// # Error Conversion
///
/// All McpServiceError variants are converted to rmcp::ErrorData with the
/// matching JSON-RPC error code via the `From<McpServiceError>` implementation.
#[derive(Debug, Error)]
pub enum McpServiceError {
    /// Request body is not valid JSON
    #[error("Parse error: {0}")]
    Parse(String),

    /// Envelope is JSON but not a valid JSON-RPC 2.0 request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Protocol method is not part of the capability surface
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// `tools/call` named a tool that is not registered
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// `resources/read` named an unknown resource, or its asset is missing
    #[error("Resource not found: {0}")]
    ResourceNotFound(String),

    /// `prompts/get` named an unknown prompt
    #[error("Prompt not found: {0}")]
    PromptNotFound(String),

    /// Arguments do not satisfy the declared input schema
    #[error("Invalid params: {0}")]
    Validation(String),

    /// Unexpected failure inside the service
    #[error("Internal error: {0}")]
    Internal(String),
}

impl McpServiceError {
    /// JSON-RPC error code for this error
    pub fn code(&self) -> rmcp::model::ErrorCode {
        use rmcp::model::ErrorCode;

        match self {
            McpServiceError::Parse(_) => ErrorCode::PARSE_ERROR,
            McpServiceError::InvalidRequest(_) => ErrorCode::INVALID_REQUEST,
            McpServiceError::MethodNotFound(_) => ErrorCode::METHOD_NOT_FOUND,
            McpServiceError::ToolNotFound(_) => ErrorCode::METHOD_NOT_FOUND,
            McpServiceError::ResourceNotFound(_) => ErrorCode::RESOURCE_NOT_FOUND,
            McpServiceError::PromptNotFound(_) => ErrorCode::INVALID_PARAMS,
            McpServiceError::Validation(_) => ErrorCode::INVALID_PARAMS,
            McpServiceError::Internal(_) => ErrorCode::INTERNAL_ERROR,
        }
    }
}

impl From<serde_json::Error> for McpServiceError {
    fn from(err: serde_json::Error) -> Self {
        McpServiceError::Internal(format!("Serialization failed: {}", err))
    }
}

/// Convert McpServiceError to rmcp::ErrorData for MCP protocol responses
///
/// | McpServiceError Variant | MCP Error Code      |
/// |-------------------------|---------------------|
/// | Parse                   | PARSE_ERROR         |
/// | InvalidRequest          | INVALID_REQUEST     |
/// | MethodNotFound          | METHOD_NOT_FOUND    |
/// | ToolNotFound            | METHOD_NOT_FOUND    |
/// | ResourceNotFound        | RESOURCE_NOT_FOUND  |
/// | PromptNotFound          | INVALID_PARAMS      |
/// | Validation              | INVALID_PARAMS      |
/// | Internal                | INTERNAL_ERROR      |
impl From<McpServiceError> for rmcp::ErrorData {
    fn from(err: McpServiceError) -> Self {
        rmcp::ErrorData {
            code: err.code(),
            message: err.to_string().into(),
            data: None,
        }
    }
}

/// Failures reported by the external collaborators (generation model, asset
/// store). Tool handlers turn these into error-flagged tool results.
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Startup configuration errors. These are the only fatal errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Instance cache capacity must be greater than zero, got {0}")]
    InvalidCapacity(usize),

    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },

    #[error("Invalid API key entry: {0}")]
    InvalidApiKey(String),
}

/// MCP authentication errors
#[derive(Debug)]
pub enum McpAuthError {
    MissingCredential,
    InvalidAuthorizationFormat,
    InvalidApiKey,
    InvalidToken,
    NotConfigured,
    ServiceError(anyhow::Error),
}

impl McpAuthError {
    /// Status, OAuth error code and description for this error
    pub fn describe(&self) -> (StatusCode, &'static str, &'static str) {
        match self {
            McpAuthError::MissingCredential => (
                StatusCode::UNAUTHORIZED,
                "missing_token",
                "A credential is required",
            ),
            McpAuthError::InvalidAuthorizationFormat => (
                StatusCode::UNAUTHORIZED,
                "invalid_request",
                "Authorization header must be 'Bearer <token>'",
            ),
            McpAuthError::InvalidApiKey => (
                StatusCode::UNAUTHORIZED,
                "invalid_api_key",
                "The API key is invalid",
            ),
            McpAuthError::InvalidToken => (
                StatusCode::UNAUTHORIZED,
                "invalid_token",
                "The access token is invalid or expired",
            ),
            McpAuthError::NotConfigured => (
                StatusCode::NOT_FOUND,
                "not_configured",
                "OAuth access is not configured on this server",
            ),
            McpAuthError::ServiceError(_) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "internal_error",
                "An internal error occurred",
            ),
        }
    }
}

impl std::fmt::Display for McpAuthError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            McpAuthError::MissingCredential => write!(f, "Credential is required"),
            McpAuthError::InvalidAuthorizationFormat => {
                write!(f, "Authorization header must be 'Bearer <token>'")
            }
            McpAuthError::InvalidApiKey => write!(f, "Invalid API key"),
            McpAuthError::InvalidToken => write!(f, "Invalid access token"),
            McpAuthError::NotConfigured => write!(f, "OAuth is not configured"),
            McpAuthError::ServiceError(e) => write!(f, "Service error: {}", e),
        }
    }
}

impl std::error::Error for McpAuthError {}

impl IntoResponse for McpAuthError {
    fn into_response(self) -> Response {
        let (status, error_code, description) = self.describe();

        let body = json!({
            "error": error_code,
            "error_description": description,
        });

        (status, Json(body)).into_response()
    }
}

impl From<anyhow::Error> for McpAuthError {
    fn from(err: anyhow::Error) -> Self {
        McpAuthError::ServiceError(err)
    }
}
