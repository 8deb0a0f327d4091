use anyhow::{bail, ensure, Context, Result};
use bytes::Bytes;
use modelrun_core::{
    Backend, BackendCapabilities, BackendModel, BoundInputs, DType, Device, IOName, IoSpec,
    ModelArtifact, ModelSpec, Shape, Tensor,
};
use ort::{
    session::{builder::SessionBuilder, Session, SessionInputValue},
    tensor::TensorElementType,
    value::{DynValue, ValueType},
};
use tracing::debug;

pub struct OrtBackend;

impl OrtBackend {
    pub fn new() -> Self {
        Self
    }
}

impl Default for OrtBackend {
    fn default() -> Self {
        Self::new()
    }
}

pub struct OrtModel {
    spec: ModelSpec,
    session: Session,
}

impl Backend for OrtBackend {
    type Model = OrtModel;

    fn name(&self) -> &'static str {
        "onnxruntime"
    }

    fn load(&self, artifact: &ModelArtifact, device: Device) -> Result<Self::Model> {
        let builder = Session::builder()
            .context("failed to create ORT session builder")?
            .with_optimization_level(ort::session::builder::GraphOptimizationLevel::Level3)
            .context("failed to configure ORT session builder")?;

        let builder = configure_session_builder(builder, &device)?;

        let session = match artifact {
            ModelArtifact::OnnxPath(path) => builder
                .commit_from_file(path)
                .with_context(|| format!("failed to load ONNX model {}", path.display()))?,
            ModelArtifact::OnnxBytes(bytes) => builder
                .commit_from_memory(bytes)
                .context("failed to load in-memory ONNX model")?,
        };

        let spec = build_model_spec(&session)?;
        debug!(
            artifact = %artifact.describe(),
            inputs = spec.inputs.len(),
            outputs = spec.outputs.len(),
            "ORT session ready"
        );

        Ok(OrtModel { spec, session })
    }

    fn capabilities(&self) -> BackendCapabilities {
        BackendCapabilities {
            supports_dynamic_shapes: true,
            supports_in_memory_models: true,
        }
    }
}

impl BackendModel for OrtModel {
    fn spec(&self) -> &ModelSpec {
        &self.spec
    }

    fn infer(&mut self, inputs: BoundInputs) -> Result<Vec<Tensor>> {
        let mut ort_inputs = Vec::with_capacity(inputs.len());
        for (index, tensor) in inputs.tensors {
            let io = self
                .spec
                .input(index)
                .with_context(|| format!("model has no input {index}"))?;
            let value = tensor_to_ort_value(tensor)?;
            ort_inputs.push((io.name.0.clone(), SessionInputValue::from(value)));
        }

        let outputs = self.session.run(ort_inputs)?;
        let mut out_tensors = Vec::with_capacity(outputs.len());
        for (_, value) in outputs.iter() {
            out_tensors.push(ort_value_to_tensor(&value)?);
        }

        Ok(out_tensors)
    }
}

fn build_model_spec(session: &Session) -> Result<ModelSpec> {
    let inputs = session
        .inputs
        .iter()
        .enumerate()
        .map(|(index, input)| io_spec_from_value_type(index, &input.name, &input.input_type))
        .collect::<Result<Vec<_>>>()?;

    let outputs = session
        .outputs
        .iter()
        .enumerate()
        .map(|(index, output)| io_spec_from_value_type(index, &output.name, &output.output_type))
        .collect::<Result<Vec<_>>>()?;

    Ok(ModelSpec { inputs, outputs })
}

fn configure_session_builder(builder: SessionBuilder, device: &Device) -> Result<SessionBuilder> {
    match device {
        Device::Cpu => Ok(builder),
        Device::Cuda { device_id } => configure_cuda(builder, *device_id),
    }
}

fn configure_cuda(builder: SessionBuilder, device_id: u32) -> Result<SessionBuilder> {
    #[cfg(feature = "cuda")]
    {
        use ort::execution_providers::cuda::CUDAExecutionProvider;
        let ep = CUDAExecutionProvider::default()
            .with_device_id(device_id as i32)
            .build();
        builder
            .with_execution_providers([ep])
            .context("failed to enable ORT CUDA execution provider")
    }
    #[cfg(not(feature = "cuda"))]
    {
        let _ = (builder, device_id);
        bail!("CUDA requested but modelrun-backend-ort was built without the `cuda` feature")
    }
}

fn io_spec_from_value_type(index: usize, name: &str, value_type: &ValueType) -> Result<IoSpec> {
    let ValueType::Tensor { ty, shape, .. } = value_type else {
        bail!("unsupported non-tensor IO value type for `{name}`");
    };

    let dtype = ort_tensor_element_to_dtype(*ty)?;
    let dims = shape
        .iter()
        .map(|d| if *d < 0 { None } else { Some(*d as usize) })
        .collect::<Vec<_>>();

    Ok(IoSpec {
        index,
        name: IOName(name.to_string()),
        dtype,
        dims,
    })
}

fn ort_tensor_element_to_dtype(ty: TensorElementType) -> Result<DType> {
    match ty {
        TensorElementType::Float32 => Ok(DType::F32),
        TensorElementType::Int64 => Ok(DType::I64),
        TensorElementType::Int32 => Ok(DType::I32),
        TensorElementType::Int16 => Ok(DType::I16),
        TensorElementType::Uint8 => Ok(DType::U8),
        _ => bail!("unsupported tensor element type: {ty}"),
    }
}

fn tensor_to_ort_value(tensor: Tensor) -> Result<DynValue> {
    let shape: Vec<usize> = tensor.shape.dims().to_vec();
    let expected = tensor
        .expected_byte_len()
        .context("input shape is too large to address")?;
    ensure!(
        tensor.byte_len() == expected,
        "input byte size mismatch: got {}, expected {expected}",
        tensor.byte_len()
    );

    let bytes = &tensor.data;
    let value = match tensor.dtype {
        DType::F32 => {
            let data = decode_le::<f32, 4>(bytes, f32::from_le_bytes);
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::I64 => {
            let data = decode_le::<i64, 8>(bytes, i64::from_le_bytes);
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::I32 => {
            let data = decode_le::<i32, 4>(bytes, i32::from_le_bytes);
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::I16 => {
            let data = decode_le::<i16, 2>(bytes, i16::from_le_bytes);
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
        DType::U8 => {
            let data = bytes.to_vec();
            ort::value::Tensor::from_array((shape, data))?.into_dyn()
        }
    };

    Ok(value)
}

fn ort_value_to_tensor(value: &ort::value::ValueRef<'_>) -> Result<Tensor> {
    let ValueType::Tensor { ty, shape, .. } = value.dtype() else {
        bail!("non-tensor outputs are not supported");
    };

    let dims: Vec<usize> = shape.iter().map(|d| *d as usize).collect();
    let kernel_shape = Shape::from_slice(&dims);

    macro_rules! extract {
        ($t:ty, $dtype:expr) => {{
            let array = value.try_extract_array::<$t>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_cpu_bytes(
                $dtype,
                kernel_shape,
                modelrun_core::bytes_from_elements(slice),
            ))
        }};
    }

    match *ty {
        TensorElementType::Float32 => extract!(f32, DType::F32),
        TensorElementType::Int64 => extract!(i64, DType::I64),
        TensorElementType::Int32 => extract!(i32, DType::I32),
        TensorElementType::Int16 => extract!(i16, DType::I16),
        TensorElementType::Uint8 => {
            let array = value.try_extract_array::<u8>()?;
            let slice = array.as_slice().context("non-contiguous output tensor")?;
            Ok(Tensor::from_cpu_bytes(
                DType::U8,
                kernel_shape,
                Bytes::copy_from_slice(slice),
            ))
        }
        _ => bail!("unsupported output tensor element type: {ty}"),
    }
}

fn decode_le<T, const N: usize>(bytes: &[u8], from: fn([u8; N]) -> T) -> Vec<T> {
    bytes
        .chunks_exact(N)
        .map(|b| {
            let mut raw = [0u8; N];
            raw.copy_from_slice(b);
            from(raw)
        })
        .collect()
}
