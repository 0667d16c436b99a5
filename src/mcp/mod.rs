//! Per-identity MCP server instances and the request path that reaches them
//!
//! # Architecture
//!
//! - [`BoundedCache`] - LRU map with an injectable clock
//! - [`McpInstanceRegistry`] - identity to instance pool built on the cache
//! - [`InstanceFactory`] / [`McpServerInstance`] - instance construction
//! - [`CapabilityRegistry`] - tools, resources and prompts bound into each instance
//! - [`SceneMcpService`] - JSON-RPC method routing for one instance
//! - [`RequestDispatcher`] - validation and dispatch shared by all transports
//!
//! # Example
//!
//! ```rust,no_run
//! use scenemcp::auth::{Identity, IdentitySource};
//! use scenemcp::mcp::{CapabilityRegistry, InstanceFactory, McpInstanceRegistry, RequestDispatcher};
//! use scenemcp::services::Collaborators;
//! use std::sync::Arc;
//!
//! # async fn example(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
//! let factory = InstanceFactory::new(Arc::new(CapabilityRegistry::builtin()), collaborators);
//! let registry = Arc::new(McpInstanceRegistry::new(100, factory)?);
//! let dispatcher = RequestDispatcher::new(registry);
//!
//! let identity = Identity::new("user-1", IdentitySource::ApiKey);
//! let response = dispatcher
//!     .dispatch(br#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#, &identity)
//!     .await;
//! # Ok(())
//! # }
//! ```

pub mod cache;
pub mod capabilities;
pub mod dispatcher;
pub mod docs;
pub mod handlers;
pub mod http_transport;
pub mod instance;
pub mod protocol;
pub mod registry;
pub mod schema;
pub mod service;
pub mod tools;

pub use cache::{BoundedCache, CacheStats, Clock, ManualClock, SystemClock};
pub use capabilities::CapabilityRegistry;
pub use dispatcher::RequestDispatcher;
pub use handlers::health_handler;
pub use http_transport::{handle_streamable_http, handle_streamable_http_options};
pub use instance::{InstanceFactory, McpServerInstance};
pub use registry::{McpInstanceRegistry, SharedRegistry};
pub use service::SceneMcpService;
