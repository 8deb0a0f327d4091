use std::sync::{Arc, Mutex};

use modelrun_core::{
    Backend, BackendModel, BoundInputs, Device, IoSpec, InterpreterError, ModelArtifact,
    ModelSpec, Result, Tensor, TensorSpecRegistry,
};
use tokio::sync::OnceCell;
use tracing::{debug, error, info};

use crate::{ModelManager, ModelSource};

/// Object-safe view of a [`Backend`].
pub trait ModelLoader: Send + Sync + 'static {
    fn backend_name(&self) -> &'static str;
    fn load_model(
        &self,
        artifact: &ModelArtifact,
        device: Device,
    ) -> anyhow::Result<Box<dyn BackendModel>>;
}

impl<B: Backend> ModelLoader for B {
    fn backend_name(&self) -> &'static str {
        Backend::name(self)
    }

    fn load_model(
        &self,
        artifact: &ModelArtifact,
        device: Device,
    ) -> anyhow::Result<Box<dyn BackendModel>> {
        let model = Backend::load(self, artifact, device)?;
        Ok(Box::new(model) as Box<dyn BackendModel>)
    }
}

pub struct LoadedModel {
    spec: ModelSpec,
    registry: TensorSpecRegistry<IoSpec>,
    model: Mutex<Box<dyn BackendModel>>,
}

impl LoadedModel {
    pub fn new(model: Box<dyn BackendModel>) -> Self {
        let spec = model.spec().clone();
        let registry = TensorSpecRegistry::from_graph(&spec);
        Self {
            spec,
            registry,
            model: Mutex::new(model),
        }
    }

    pub fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    pub fn registry(&self) -> &TensorSpecRegistry<IoSpec> {
        &self.registry
    }

    /// Runs the engine. Blocks; call from the blocking pool.
    pub fn infer(&self, inputs: BoundInputs) -> Result<Vec<Tensor>> {
        let mut model = self
            .model
            .lock()
            .map_err(|_| InterpreterError::internal("model lock poisoned by an earlier panic"))?;
        model.infer(inputs).map_err(|err| {
            error!(error = ?err, "model inference failed");
            InterpreterError::unknown(format!("model inference failed: {err:#}"))
        })
    }
}

/// A model source plus the engine model loaded from it on first use.
///
/// Failed loads are not cached, so a remote model downloaded later is picked
/// up by the next call.
pub struct ModelHandle {
    source: ModelSource,
    loader: Arc<dyn ModelLoader>,
    manager: Arc<dyn ModelManager>,
    device: Device,
    loaded: OnceCell<Arc<LoadedModel>>,
}

impl ModelHandle {
    pub fn new(
        source: ModelSource,
        loader: Arc<dyn ModelLoader>,
        manager: Arc<dyn ModelManager>,
        device: Device,
    ) -> Self {
        Self {
            source,
            loader,
            manager,
            device,
            loaded: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &ModelSource {
        &self.source
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    pub async fn get(&self) -> Result<Arc<LoadedModel>> {
        self.loaded
            .get_or_try_init(|| self.load())
            .await
            .cloned()
    }

    fn artifact(&self) -> Result<ModelArtifact> {
        match &self.source {
            ModelSource::Local(local) => Ok(ModelArtifact::OnnxPath(local.path().to_path_buf())),
            ModelSource::Remote(remote) => self.manager.artifact_for(remote).ok_or_else(|| {
                InterpreterError::unknown(format!(
                    "remote model `{}` is not downloaded",
                    remote.name()
                ))
            }),
        }
    }

    async fn load(&self) -> Result<Arc<LoadedModel>> {
        let artifact = self.artifact()?;
        let loader = self.loader.clone();
        let device = self.device.clone();
        let name = self.source.display_name();
        debug!(model = %name, artifact = %artifact.describe(), "loading model");

        let model = tokio::task::spawn_blocking(move || loader.load_model(&artifact, device))
            .await
            .map_err(|e| InterpreterError::internal(format!("model loading task failed: {e}")))?
            .map_err(|err| {
                error!(model = %name, error = ?err, "failed to load model");
                InterpreterError::unknown(format!("failed to load model `{name}`: {err:#}"))
            })?;

        let loaded = LoadedModel::new(model);
        info!(
            model = %name,
            backend = self.loader.backend_name(),
            inputs = loaded.spec().input_count(),
            outputs = loaded.spec().output_count(),
            "model loaded"
        );
        Ok(Arc::new(loaded))
    }
}
