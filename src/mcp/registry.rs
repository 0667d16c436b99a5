//! Thread-safe pool of per-identity MCP server instances
//!
//! [`McpInstanceRegistry`] pairs a [`BoundedCache`] with an
//! [`InstanceFactory`]. Instances are created lazily on an identity's first
//! request and evicted least-recently-used once the pool is full.
//!
//! # Cold starts
//!
//! The cache lock is never held while an instance is built. Two concurrent
//! first requests for the same identity may therefore both build one; the
//! publish step is an atomic insert-if-absent, so exactly one instance is
//! stored and both callers receive it. The other is dropped unused.

use crate::auth::{Identity, IdentityKey};
use crate::error::ConfigError;
use crate::mcp::cache::{BoundedCache, CacheStats, Clock, SystemClock};
use crate::mcp::instance::{InstanceFactory, McpServerInstance};
use std::sync::Arc;

/// Registry of MCP server instances keyed by caller identity
///
/// # Thread Safety
///
/// All methods take `&self`; share it as [`SharedRegistry`].
///
/// # Examples
///
/// ```rust,no_run
/// use scenemcp::auth::{Identity, IdentitySource};
/// use scenemcp::mcp::capabilities::CapabilityRegistry;
/// use scenemcp::mcp::instance::InstanceFactory;
/// use scenemcp::mcp::registry::McpInstanceRegistry;
/// use scenemcp::services::Collaborators;
/// use std::sync::Arc;
///
/// # fn example(collaborators: Collaborators) -> Result<(), Box<dyn std::error::Error>> {
/// let factory = InstanceFactory::new(Arc::new(CapabilityRegistry::builtin()), collaborators);
/// let registry = McpInstanceRegistry::new(100, factory)?;
///
/// let identity = Identity::new("user-1", IdentitySource::ApiKey);
/// let instance = registry.get_or_create(&identity);
/// # Ok(())
/// # }
/// ```
pub struct McpInstanceRegistry {
    cache: BoundedCache<IdentityKey, Arc<McpServerInstance>>,
    factory: InstanceFactory,
}

pub type SharedRegistry = Arc<McpInstanceRegistry>;

impl McpInstanceRegistry {
    /// Creates an empty registry holding at most `capacity` instances
    ///
    /// # Errors
    ///
    /// * `ConfigError::InvalidCapacity` - `capacity` is zero
    pub fn new(capacity: usize, factory: InstanceFactory) -> Result<Self, ConfigError> {
        Self::with_clock(capacity, factory, Arc::new(SystemClock))
    }

    pub fn with_clock(
        capacity: usize,
        factory: InstanceFactory,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, ConfigError> {
        Ok(Self {
            cache: BoundedCache::with_clock(capacity, clock)?,
            factory,
        })
    }

    /// Returns the instance for `identity`, creating it on first use
    pub fn get_or_create(&self, identity: &Identity) -> Arc<McpServerInstance> {
        if let Some(instance) = self.cache.get(&identity.key) {
            tracing::trace!(identity = %identity.key, "Instance cache hit");
            return instance;
        }

        let candidate = Arc::new(self.factory.create(identity));
        let (instance, inserted) = self.cache.insert_if_absent(identity.key.clone(), candidate);

        if inserted {
            tracing::info!(
                identity = %identity.key,
                user = identity.label(),
                instance_id = %instance.instance_id,
                cached = self.cache.len(),
                "Created MCP server instance"
            );
        } else {
            tracing::debug!(
                identity = %identity.key,
                "Concurrent cold start; using the instance published first"
            );
        }

        instance
    }

    /// Returns the cached instance without creating one
    pub fn get_instance(&self, key: &IdentityKey) -> Option<Arc<McpServerInstance>> {
        self.cache.get(key)
    }

    /// Membership check that leaves recency untouched
    pub fn contains(&self, key: &IdentityKey) -> bool {
        self.cache.contains(key)
    }

    pub fn len(&self) -> usize {
        self.cache.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cache.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.cache.capacity()
    }

    pub fn stats(&self) -> CacheStats {
        self.cache.stats()
    }
}
