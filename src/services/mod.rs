pub mod asset_loader;
pub mod generator;

pub use asset_loader::{AssetLoader, FsAssetLoader};
pub use generator::{ArtifactGenerator, ChatCompletionsGenerator, GenerationParams};

use std::sync::Arc;

/// External services shared by every MCP server instance
#[derive(Clone)]
pub struct Collaborators {
    pub generator: Arc<dyn ArtifactGenerator>,
    pub assets: Arc<dyn AssetLoader>,
}

impl Collaborators {
    pub fn new(generator: Arc<dyn ArtifactGenerator>, assets: Arc<dyn AssetLoader>) -> Self {
        Self { generator, assets }
    }
}
