//! Static asset collaborator used to serve the scene viewer widget

use crate::error::CollaboratorError;
use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AssetLoader: Send + Sync {
    async fn load(&self, path: &str) -> Result<String, CollaboratorError>;
}

/// Reads UTF-8 assets from below a root directory
#[derive(Debug, Clone)]
pub struct FsAssetLoader {
    root: PathBuf,
}

impl FsAssetLoader {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Joins `path` onto the root, refusing anything that could escape it
    fn resolve(&self, path: &str) -> Option<PathBuf> {
        let relative = Path::new(path);
        let escapes = relative
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir));

        if path.is_empty() || escapes {
            return None;
        }

        Some(self.root.join(relative))
    }
}

#[async_trait]
impl AssetLoader for FsAssetLoader {
    async fn load(&self, path: &str) -> Result<String, CollaboratorError> {
        let full_path = self
            .resolve(path)
            .ok_or_else(|| CollaboratorError::NotFound(path.to_string()))?;

        match tokio::fs::read_to_string(&full_path).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(CollaboratorError::NotFound(path.to_string()))
            }
            Err(e) => Err(CollaboratorError::Io(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_loads_file_below_root() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("widgets")).unwrap();
        std::fs::write(dir.path().join("widgets/viewer.html"), "<div id=\"scene\"></div>").unwrap();

        let loader = FsAssetLoader::new(dir.path());
        let html = loader.load("widgets/viewer.html").await.unwrap();
        assert_eq!(html, "<div id=\"scene\"></div>");
    }

    #[tokio::test]
    async fn test_missing_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsAssetLoader::new(dir.path());

        let err = loader.load("nope.html").await.unwrap_err();
        assert!(matches!(err, CollaboratorError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_traversal_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let loader = FsAssetLoader::new(dir.path().join("assets"));

        for path in ["../secret.txt", "/etc/passwd", "widgets/../../x", ""] {
            let err = loader.load(path).await.unwrap_err();
            assert!(
                matches!(err, CollaboratorError::NotFound(_)),
                "{} should be refused",
                path
            );
        }
    }
}
