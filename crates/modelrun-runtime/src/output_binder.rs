use modelrun_core::{
    InterpreterError, ModelInputOutputOptions, ModelOutputs, ModelSpec, OutputTensor, Result,
    Tensor,
};

/// Output formats must name tensors the graph actually produces.
pub fn check_indices(options: &ModelInputOutputOptions, graph: &ModelSpec) -> Result<()> {
    for spec in options.outputs() {
        if spec.index >= graph.output_count() {
            return Err(InterpreterError::out_of_range(format!(
                "output index {} is out of range, the model has {} outputs",
                spec.index,
                graph.output_count()
            )));
        }
        if graph.output(spec.index).is_none() {
            return Err(InterpreterError::internal(format!(
                "output tensor {} cannot be located in the model",
                spec.index
            )));
        }
    }
    Ok(())
}

/// Matches raw engine results against the declared output formats.
pub fn bind(raw: &[Tensor], options: &ModelInputOutputOptions) -> Result<ModelOutputs> {
    let mut outputs = Vec::with_capacity(options.outputs().len());
    for spec in options.outputs() {
        let idx = spec.index;
        let Some(tensor) = raw.get(idx) else {
            return Err(InterpreterError::unknown(format!(
                "no tensors matching output index {idx} ({} produced)",
                raw.len()
            )));
        };
        if tensor.dtype != spec.dtype {
            return Err(InterpreterError::invalid_argument(format!(
                "output {idx} element type is {}, options declare {}",
                tensor.dtype, spec.dtype
            )));
        }
        if tensor.shape.rank() != spec.shape.rank() {
            return Err(InterpreterError::invalid_argument(format!(
                "output {idx} has {} dimensions, options declare {}",
                tensor.shape.rank(),
                spec.shape.rank()
            )));
        }
        if tensor.shape != spec.shape {
            return Err(InterpreterError::invalid_argument(format!(
                "output {idx} shape is {}, options declare {}",
                tensor.shape, spec.shape
            )));
        }
        let Some(byte_size) = spec.byte_size else {
            return Err(InterpreterError::invalid_argument(format!(
                "output {idx} format shape {} is too large",
                spec.shape
            )));
        };
        if tensor.byte_len() != byte_size {
            return Err(InterpreterError::invalid_argument(format!(
                "output {idx} holds {} bytes, options declare {byte_size}",
                tensor.byte_len()
            )));
        }
        outputs.push(OutputTensor::from_tensor(idx, tensor.clone()));
    }
    Ok(ModelOutputs::new(outputs))
}
