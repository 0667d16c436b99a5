//! JSON-RPC 2.0 envelope types for the MCP endpoint
//!
//! Requests are parsed in two steps: bytes to [`serde_json::Value`], then the
//! value to a [`JsonRpcRequest`]. Keeping the intermediate value lets error
//! responses echo the caller's `id` even when the rest of the envelope is
//! malformed.

use crate::error::McpServiceError;
use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    pub jsonrpc: String,
    /// Absent for notifications; an explicit `null` is kept as `Some(Value::Null)`
    #[serde(
        default,
        deserialize_with = "present_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

fn present_id<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

impl JsonRpcRequest {
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Response id; `null` when the request carried none
    pub fn response_id(&self) -> Value {
        self.id.clone().unwrap_or(Value::Null)
    }

    /// Validates an already decoded JSON value as a request envelope
    ///
    /// # Errors
    ///
    /// * `McpServiceError::InvalidRequest` - not an object, wrong or missing
    ///   `jsonrpc` marker, missing or non-string `method`, or an `id` that is
    ///   neither string, number nor null
    pub fn from_value(value: Value) -> Result<Self, McpServiceError> {
        let object = value
            .as_object()
            .ok_or_else(|| McpServiceError::InvalidRequest("Request must be an object".into()))?;

        match object.get("jsonrpc").and_then(Value::as_str) {
            Some(JSONRPC_VERSION) => {}
            Some(other) => {
                return Err(McpServiceError::InvalidRequest(format!(
                    "Unsupported jsonrpc version '{}'",
                    other
                )))
            }
            None => {
                return Err(McpServiceError::InvalidRequest(
                    "Missing jsonrpc version".into(),
                ))
            }
        }

        if !object.get("method").is_some_and(Value::is_string) {
            return Err(McpServiceError::InvalidRequest(
                "Missing method field".into(),
            ));
        }

        if let Some(id) = object.get("id") {
            if !(id.is_string() || id.is_number() || id.is_null()) {
                return Err(McpServiceError::InvalidRequest(
                    "id must be a string or a number".into(),
                ));
            }
        }

        serde_json::from_value(value).map_err(|e| McpServiceError::InvalidRequest(e.to_string()))
    }
}

/// Best-effort id extraction from a value that failed envelope validation
pub fn salvage_id(value: &Value) -> Value {
    match value.get("id") {
        Some(id) if id.is_string() || id.is_number() => id.clone(),
        _ => Value::Null,
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl From<McpServiceError> for JsonRpcError {
    fn from(err: McpServiceError) -> Self {
        let data: rmcp::ErrorData = err.into();
        Self {
            code: data.code.0,
            message: data.message.into_owned(),
            data: data.data,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn failure(id: Value, error: impl Into<JsonRpcError>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error.into()),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}
