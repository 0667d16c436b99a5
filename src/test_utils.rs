pub mod stubs {
    //! Hand-written collaborator stubs shared by unit and integration tests

    use crate::auth::{Identity, IdentityResolver, IdentitySource};
    use crate::error::{CollaboratorError, McpAuthError};
    use crate::mcp::capabilities::CapabilityRegistry;
    use crate::mcp::dispatcher::RequestDispatcher;
    use crate::mcp::instance::InstanceFactory;
    use crate::mcp::registry::McpInstanceRegistry;
    use crate::services::{ArtifactGenerator, AssetLoader, Collaborators, GenerationParams};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    pub const SCENE_VIEWER_HTML: &str =
        "<!doctype html><html><body><div id=\"scene-viewer\"></div></body></html>";

    /// Returns fixed code and counts how often it was asked
    pub struct StubGenerator {
        code: String,
        calls: AtomicUsize,
    }

    impl StubGenerator {
        pub fn fixed(code: &str) -> Arc<Self> {
            Arc::new(Self {
                code: code.to_string(),
                calls: AtomicUsize::new(0),
            })
        }

        pub fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl ArtifactGenerator for StubGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, CollaboratorError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.code.clone())
        }
    }

    pub struct FailingGenerator;

    #[async_trait]
    impl ArtifactGenerator for FailingGenerator {
        async fn generate(
            &self,
            _prompt: &str,
            _params: &GenerationParams,
        ) -> Result<String, CollaboratorError> {
            Err(CollaboratorError::Generation("generator unavailable".to_string()))
        }
    }

    /// In-memory asset store keyed by relative path
    pub struct MemoryAssetLoader {
        files: HashMap<String, String>,
    }

    impl MemoryAssetLoader {
        pub fn empty() -> Self {
            Self {
                files: HashMap::new(),
            }
        }

        pub fn with_file(mut self, path: &str, contents: &str) -> Self {
            self.files.insert(path.to_string(), contents.to_string());
            self
        }
    }

    impl Default for MemoryAssetLoader {
        fn default() -> Self {
            Self::empty().with_file("widgets/scene-viewer.html", SCENE_VIEWER_HTML)
        }
    }

    #[async_trait]
    impl AssetLoader for MemoryAssetLoader {
        async fn load(&self, path: &str) -> Result<String, CollaboratorError> {
            self.files
                .get(path)
                .cloned()
                .ok_or_else(|| CollaboratorError::NotFound(path.to_string()))
        }
    }

    /// Resolves a fixed set of credentials without any I/O
    #[derive(Default)]
    pub struct StaticResolver {
        identities: HashMap<String, Identity>,
    }

    impl StaticResolver {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with(mut self, credential: &str, key: &str, source: IdentitySource) -> Self {
            self.identities
                .insert(credential.to_string(), Identity::new(key, source));
            self
        }
    }

    #[async_trait]
    impl IdentityResolver for StaticResolver {
        async fn resolve(&self, credential: &str) -> Result<Identity, McpAuthError> {
            self.identities
                .get(credential)
                .cloned()
                .ok_or(McpAuthError::InvalidToken)
        }
    }

    pub fn collaborators(code: &str) -> Collaborators {
        collaborators_with(StubGenerator::fixed(code))
    }

    pub fn collaborators_with(generator: Arc<StubGenerator>) -> Collaborators {
        Collaborators::new(generator, Arc::new(MemoryAssetLoader::default()))
    }

    pub fn failing_collaborators() -> Collaborators {
        Collaborators::new(Arc::new(FailingGenerator), Arc::new(MemoryAssetLoader::default()))
    }

    /// Registry over the built-in capabilities
    ///
    /// Panics on a zero capacity; test-only.
    pub fn registry(capacity: usize, collaborators: Collaborators) -> Arc<McpInstanceRegistry> {
        let factory = InstanceFactory::new(Arc::new(CapabilityRegistry::builtin()), collaborators);
        match McpInstanceRegistry::new(capacity, factory) {
            Ok(registry) => Arc::new(registry),
            Err(e) => panic!("Failed to create test registry: {}", e),
        }
    }

    pub fn dispatcher(capacity: usize, collaborators: Collaborators) -> RequestDispatcher {
        RequestDispatcher::new(registry(capacity, collaborators))
    }
}
