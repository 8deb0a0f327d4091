use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use modelrun_core::ModelArtifact;

/// A model file already on disk.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LocalModel {
    path: PathBuf,
}

impl LocalModel {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// A hosted model, identified by name and fetched by a [`ModelManager`].
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct RemoteModel {
    name: String,
}

impl RemoteModel {
    pub fn new(name: impl Into<String>) -> Self {
        Self { name: name.into() }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

#[derive(Clone, Debug)]
pub enum ModelSource {
    Local(LocalModel),
    Remote(RemoteModel),
}

impl ModelSource {
    pub fn display_name(&self) -> String {
        match self {
            ModelSource::Local(m) => m.path.display().to_string(),
            ModelSource::Remote(m) => m.name.clone(),
        }
    }
}

/// Supplies the cached bytes of downloaded remote models.
pub trait ModelManager: Send + Sync + 'static {
    fn artifact_for(&self, model: &RemoteModel) -> Option<ModelArtifact>;

    fn is_downloaded(&self, model: &RemoteModel) -> bool {
        self.artifact_for(model).is_some()
    }
}

/// Knows no remote models.
#[derive(Clone, Copy, Debug, Default)]
pub struct OfflineModelManager;

impl ModelManager for OfflineModelManager {
    fn artifact_for(&self, _model: &RemoteModel) -> Option<ModelArtifact> {
        None
    }
}

/// Downloaded models live at `<root>/<name>/model.onnx`.
#[derive(Clone, Debug)]
pub struct DirectoryModelManager {
    root: PathBuf,
}

impl DirectoryModelManager {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn model_path(&self, model: &RemoteModel) -> PathBuf {
        self.root.join(&model.name).join("model.onnx")
    }

    /// Called by the downloader once a model's bytes are complete.
    pub fn store(&self, model: &RemoteModel, bytes: &[u8]) -> Result<PathBuf> {
        let path = self.model_path(model);
        if let Some(dir) = path.parent() {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }
        std::fs::write(&path, bytes)
            .with_context(|| format!("failed to write {}", path.display()))?;
        Ok(path)
    }
}

impl ModelManager for DirectoryModelManager {
    fn artifact_for(&self, model: &RemoteModel) -> Option<ModelArtifact> {
        let path = self.model_path(model);
        path.is_file().then_some(ModelArtifact::OnnxPath(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn directory_manager_sees_stored_models() {
        let root = std::env::temp_dir().join(format!("modelrun-cache-{}", std::process::id()));
        let manager = DirectoryModelManager::new(&root);
        let model = RemoteModel::new("digits");

        assert!(!manager.is_downloaded(&model));
        let path = manager.store(&model, b"onnx").unwrap();
        assert!(manager.is_downloaded(&model));
        assert!(matches!(
            manager.artifact_for(&model),
            Some(ModelArtifact::OnnxPath(p)) if p == path
        ));
        let _ = std::fs::remove_dir_all(&root);
    }
}
