//! Entry point shared by every MCP transport
//!
//! A request moves through `Received -> Validated -> Resolved -> Routed ->
//! Executed -> Responded`. Malformed input is rejected during validation,
//! before the instance registry is consulted. Every other outcome produces a
//! JSON-RPC response carrying the request's id.

use crate::auth::Identity;
use crate::error::McpServiceError;
use crate::mcp::protocol::{salvage_id, JsonRpcRequest, JsonRpcResponse};
use crate::mcp::registry::SharedRegistry;
use serde_json::Value;

#[derive(Clone)]
pub struct RequestDispatcher {
    registry: SharedRegistry,
}

impl RequestDispatcher {
    pub fn new(registry: SharedRegistry) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &SharedRegistry {
        &self.registry
    }

    /// Dispatches a raw message body, always producing a response
    ///
    /// Bodies that are not valid JSON yield a parse error with a `null` id.
    pub async fn dispatch(&self, raw: &[u8], identity: &Identity) -> JsonRpcResponse {
        match serde_json::from_slice::<Value>(raw) {
            Ok(value) => self.dispatch_value(value, identity).await,
            Err(e) => {
                tracing::debug!(identity = %identity.key, error = %e, "Rejected unparseable body");
                JsonRpcResponse::failure(Value::Null, McpServiceError::Parse(e.to_string()))
            }
        }
    }

    /// Dispatches an already decoded message, always producing a response
    pub async fn dispatch_value(&self, value: Value, identity: &Identity) -> JsonRpcResponse {
        match self.validate(value, identity) {
            Ok(request) => self.execute(&request, identity).await,
            Err(rejected) => rejected,
        }
    }

    /// Like [`dispatch`](Self::dispatch), but returns `None` for a valid
    /// notification so the transport can acknowledge it without a body
    ///
    /// The notification is still executed.
    pub async fn dispatch_message(&self, raw: &[u8], identity: &Identity) -> Option<JsonRpcResponse> {
        let value = match serde_json::from_slice::<Value>(raw) {
            Ok(value) => value,
            Err(e) => {
                return Some(JsonRpcResponse::failure(
                    Value::Null,
                    McpServiceError::Parse(e.to_string()),
                ))
            }
        };

        let request = match self.validate(value, identity) {
            Ok(request) => request,
            Err(rejected) => return Some(rejected),
        };

        let response = self.execute(&request, identity).await;
        if request.is_notification() {
            if response.is_error() {
                tracing::debug!(
                    identity = %identity.key,
                    method = %request.method,
                    "Notification failed; no response sent"
                );
            }
            None
        } else {
            Some(response)
        }
    }

    fn validate(&self, value: Value, identity: &Identity) -> Result<JsonRpcRequest, JsonRpcResponse> {
        let id = salvage_id(&value);
        JsonRpcRequest::from_value(value).map_err(|e| {
            tracing::debug!(identity = %identity.key, error = %e, "Rejected malformed envelope");
            JsonRpcResponse::failure(id, e)
        })
    }

    async fn execute(&self, request: &JsonRpcRequest, identity: &Identity) -> JsonRpcResponse {
        let instance = self.registry.get_or_create(identity);

        tracing::debug!(
            identity = %identity.key,
            instance_id = %instance.instance_id,
            method = %request.method,
            "Dispatching MCP request"
        );

        instance.service().handle_request(request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::IdentitySource;
    use crate::test_utils::stubs::{self, StubGenerator};
    use serde_json::json;
    use std::sync::Arc;

    fn dispatcher_with(generator: Arc<StubGenerator>) -> RequestDispatcher {
        stubs::dispatcher(4, stubs::collaborators_with(generator))
    }

    fn user() -> Identity {
        Identity::new("user-1", IdentitySource::ApiKey)
    }

    fn body(value: Value) -> Vec<u8> {
        serde_json::to_vec(&value).unwrap()
    }

    #[tokio::test]
    async fn test_parse_error_has_null_id() {
        let dispatcher = dispatcher_with(StubGenerator::fixed("X"));
        let response = dispatcher.dispatch(b"{not json", &user()).await;

        assert_eq!(response.error.unwrap().code, -32700);
        assert_eq!(response.id, Value::Null);
        assert!(dispatcher.registry().is_empty());
    }

    #[tokio::test]
    async fn test_invalid_envelope_never_touches_registry() {
        let dispatcher = dispatcher_with(StubGenerator::fixed("X"));

        let response = dispatcher
            .dispatch(&body(json!({ "id": 9, "method": "tools/list" })), &user())
            .await;
        assert_eq!(response.error.unwrap().code, -32600);
        assert_eq!(response.id, json!(9));

        let response = dispatcher
            .dispatch(&body(json!({ "jsonrpc": "2.0", "id": "a" })), &user())
            .await;
        assert_eq!(response.error.unwrap().code, -32600);
        assert_eq!(response.id, json!("a"));

        let stats = dispatcher.registry().stats();
        assert_eq!(stats.len, 0);
        assert_eq!(stats.hits + stats.misses, 0);
    }

    #[tokio::test]
    async fn test_tools_list_creates_instance_once() {
        let dispatcher = dispatcher_with(StubGenerator::fixed("X"));
        let request = body(json!({ "jsonrpc": "2.0", "id": 1, "method": "tools/list" }));

        let first = dispatcher.dispatch(&request, &user()).await;
        let second = dispatcher.dispatch(&request, &user()).await;

        let tools = first.result.unwrap()["tools"].as_array().unwrap().clone();
        let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
        assert_eq!(names, vec!["generate_scene", "get_docs"]);
        assert!(second.result.is_some());

        let stats = dispatcher.registry().stats();
        assert_eq!(stats.len, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.hits, 1);
    }

    #[tokio::test]
    async fn test_generate_scene_scenario() {
        let generator = StubGenerator::fixed("X");
        let dispatcher = dispatcher_with(generator.clone());

        let response = dispatcher
            .dispatch(
                &body(json!({
                    "jsonrpc": "2.0",
                    "id": 3,
                    "method": "tools/call",
                    "params": { "name": "generate_scene", "arguments": { "subject": "calm", "intensity": 3 } }
                })),
                &user(),
            )
            .await;

        assert_eq!(response.id, json!(3));
        let result = response.result.unwrap();
        assert_eq!(
            result["structuredContent"],
            json!({ "code": "X", "subject": "calm", "size": 600 })
        );
        assert_eq!(generator.calls(), 1);
    }

    #[tokio::test]
    async fn test_empty_subject_never_reaches_generator() {
        let generator = StubGenerator::fixed("X");
        let dispatcher = dispatcher_with(generator.clone());

        let response = dispatcher
            .dispatch(
                &body(json!({
                    "jsonrpc": "2.0",
                    "id": 4,
                    "method": "tools/call",
                    "params": { "name": "generate_scene", "arguments": { "subject": "" } }
                })),
                &user(),
            )
            .await;

        assert_eq!(response.error.unwrap().code, -32602);
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_intensity_out_of_range_rejected() {
        let generator = StubGenerator::fixed("X");
        let dispatcher = dispatcher_with(generator.clone());

        for intensity in [0, 11] {
            let response = dispatcher
                .dispatch(
                    &body(json!({
                        "jsonrpc": "2.0",
                        "id": 5,
                        "method": "tools/call",
                        "params": { "name": "generate_scene", "arguments": { "subject": "sea", "intensity": intensity } }
                    })),
                    &user(),
                )
                .await;
            assert_eq!(response.error.unwrap().code, -32602);
        }
        assert_eq!(generator.calls(), 0);
    }

    #[tokio::test]
    async fn test_collaborator_failure_is_successful_dispatch() {
        let dispatcher = stubs::dispatcher(4, stubs::failing_collaborators());

        let response = dispatcher
            .dispatch(
                &body(json!({
                    "jsonrpc": "2.0",
                    "id": 6,
                    "method": "tools/call",
                    "params": { "name": "generate_scene", "arguments": { "subject": "fog" } }
                })),
                &user(),
            )
            .await;

        assert!(response.error.is_none());
        assert_eq!(response.result.unwrap()["isError"], json!(true));
    }

    #[tokio::test]
    async fn test_unknown_method_echoes_id() {
        let dispatcher = dispatcher_with(StubGenerator::fixed("X"));
        let response = dispatcher
            .dispatch(
                &body(json!({ "jsonrpc": "2.0", "id": "req-7", "method": "sampling/create" })),
                &user(),
            )
            .await;

        assert_eq!(response.id, json!("req-7"));
        assert_eq!(response.error.unwrap().code, -32601);
    }

    #[tokio::test]
    async fn test_notification_yields_no_response() {
        let dispatcher = dispatcher_with(StubGenerator::fixed("X"));

        let response = dispatcher
            .dispatch_message(
                &body(json!({ "jsonrpc": "2.0", "method": "notifications/initialized" })),
                &user(),
            )
            .await;
        assert!(response.is_none());

        let response = dispatcher
            .dispatch_message(&body(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" })), &user())
            .await;
        assert_eq!(response.unwrap().result, Some(json!({})));
    }

    #[tokio::test]
    async fn test_null_id_request_still_gets_response() {
        let dispatcher = dispatcher_with(StubGenerator::fixed("X"));

        let response = dispatcher
            .dispatch_message(
                &body(json!({ "jsonrpc": "2.0", "id": null, "method": "tools/list" })),
                &user(),
            )
            .await
            .expect("explicit null id is a request");

        assert_eq!(response.id, Value::Null);
        assert!(response.result.unwrap()["tools"].is_array());
    }

    #[tokio::test]
    async fn test_identities_get_separate_instances() {
        let dispatcher = dispatcher_with(StubGenerator::fixed("X"));
        let request = body(json!({ "jsonrpc": "2.0", "id": 1, "method": "ping" }));

        dispatcher.dispatch(&request, &user()).await;
        dispatcher
            .dispatch(&request, &Identity::new("user-2", IdentitySource::OAuth))
            .await;

        assert_eq!(dispatcher.registry().len(), 2);
    }
}
