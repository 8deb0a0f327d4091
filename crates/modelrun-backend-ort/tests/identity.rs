use std::path::PathBuf;

use anyhow::{ensure, Context, Result};
use modelrun_backend_ort::OrtBackend;
use modelrun_core::{
    bytes_from_elements, Backend, BackendModel, BoundInputs, DType, Device, ModelArtifact, Shape,
    Tensor,
};

fn model_path() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("../../models/identity.onnx")
}

#[test]
#[ignore = "needs models/identity.onnx and an ONNX Runtime library"]
fn ort_identity_cpu() -> Result<()> {
    let backend = OrtBackend::new();
    let mut model = backend.load(&ModelArtifact::OnnxPath(model_path()), Device::Cpu)?;
    let spec = model.spec();

    let input_spec = spec.inputs.first().context("missing model input spec")?;
    ensure!(input_spec.dtype == DType::F32, "expected f32 identity model");
    ensure!(input_spec.index == 0, "first input should carry index 0");

    let mut shape = input_spec
        .dims
        .iter()
        .map(|d| d.unwrap_or(3))
        .collect::<Vec<_>>();
    if shape.is_empty() {
        shape.push(3);
    }

    let numel = shape.iter().product::<usize>().max(1);
    let data: Vec<f32> = (0..numel).map(|i| i as f32).collect();
    let input = Tensor::from_cpu_bytes(
        DType::F32,
        Shape::from_slice(&shape),
        bytes_from_elements(&data),
    );

    let outputs = model.infer(BoundInputs {
        tensors: vec![(0, input)],
    })?;
    let out = outputs.first().context("missing model output")?;
    ensure!(out.dtype == DType::F32, "expected f32 output");
    assert_eq!(out.shape, Shape::from_slice(&shape));
    assert_eq!(out.data, bytes_from_elements(&data));

    Ok(())
}

#[test]
fn missing_model_file_fails_to_load() {
    let backend = OrtBackend::new();
    let artifact = ModelArtifact::OnnxPath(PathBuf::from("does/not/exist.onnx"));
    assert!(backend.load(&artifact, Device::Cpu).is_err());
}

#[test]
fn reports_backend_name() {
    let backend = OrtBackend::default();
    assert_eq!(backend.name(), "onnxruntime");
    assert!(backend.capabilities().supports_dynamic_shapes);
}
