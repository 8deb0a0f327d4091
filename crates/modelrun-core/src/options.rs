use crate::{DType, IOName, Shape, TensorSpec, TensorSpecRegistry};

/// Input and output data formats for one `run` call.
///
/// Setting the same index twice replaces the earlier format. Emptiness is
/// checked when the options are bound, not here.
#[derive(Clone, Debug, Default)]
pub struct ModelInputOutputOptions {
    registry: TensorSpecRegistry<TensorSpec>,
}

impl ModelInputOutputOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_input_format(
        &mut self,
        index: usize,
        dtype: DType,
        dims: impl Into<Shape>,
    ) -> &mut Self {
        self.registry.upsert_input(TensorSpec::new(index, dtype, dims));
        self
    }

    pub fn set_named_input_format(
        &mut self,
        index: usize,
        name: impl Into<IOName>,
        dtype: DType,
        dims: impl Into<Shape>,
    ) -> &mut Self {
        self.registry
            .upsert_input(TensorSpec::new(index, dtype, dims).with_name(name));
        self
    }

    pub fn set_output_format(
        &mut self,
        index: usize,
        dtype: DType,
        dims: impl Into<Shape>,
    ) -> &mut Self {
        self.registry.upsert_output(TensorSpec::new(index, dtype, dims));
        self
    }

    pub fn set_named_output_format(
        &mut self,
        index: usize,
        name: impl Into<IOName>,
        dtype: DType,
        dims: impl Into<Shape>,
    ) -> &mut Self {
        self.registry
            .upsert_output(TensorSpec::new(index, dtype, dims).with_name(name));
        self
    }

    pub fn inputs(&self) -> &[TensorSpec] {
        self.registry.inputs()
    }

    pub fn outputs(&self) -> &[TensorSpec] {
        self.registry.outputs()
    }

    pub fn registry(&self) -> &TensorSpecRegistry<TensorSpec> {
        &self.registry
    }
}
