use anyhow::Result;

use crate::{BoundInputs, Device, ModelArtifact, ModelSpec, Tensor};

#[derive(Clone, Copy, Debug)]
pub struct BackendCapabilities {
    pub supports_dynamic_shapes: bool,
    pub supports_in_memory_models: bool,
}

pub trait Backend: Send + Sync + 'static {
    type Model: BackendModel;

    fn name(&self) -> &'static str;
    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model>;
    fn capabilities(&self) -> BackendCapabilities;
}

pub trait BackendModel: Send + 'static {
    /// The graph as the engine sees it.
    fn spec(&self) -> &ModelSpec;

    /// Inputs are validated against `spec()` before this is called.
    /// Outputs are positioned by graph output index.
    fn infer(&mut self, inputs: BoundInputs) -> Result<Vec<Tensor>>;
}
