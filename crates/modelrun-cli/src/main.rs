mod cli;

use anyhow::{bail, Context, Result};
use bytes::Bytes;
use clap::Parser;
use cli::{Cli, Command};
use modelrun_backend_ort::OrtBackend;
use modelrun_core::{Backend, DType, Device, ModelArtifact, ModelInputOutputOptions, ModelInputs};
use modelrun_runtime::{AppContext, LocalModel, ModelInterpreter};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(&cli.log).context("invalid --log filter")?)
        .init();

    let device = parse_device(&cli.device)?;
    match cli.command {
        Command::Inspect { model } => inspect(&model, device).await,
        Command::Run {
            model,
            inputs,
            input_formats,
            output_formats,
            no_stats,
        } => run(&model, device, inputs, input_formats, output_formats, no_stats).await,
    }
}

async fn inspect(model: &str, device: Device) -> Result<()> {
    let artifact = ModelArtifact::OnnxPath(model.into());
    let loaded = tokio::task::spawn_blocking(move || OrtBackend::new().load(&artifact, device))
        .await
        .context("model loading task failed")??;

    let spec = modelrun_core::BackendModel::spec(&loaded);
    for (kind, specs) in [("input", &spec.inputs), ("output", &spec.outputs)] {
        for io in specs {
            let dims: Vec<String> = io
                .dims
                .iter()
                .map(|d| d.map_or_else(|| "?".to_string(), |d| d.to_string()))
                .collect();
            println!("{kind} {} `{}` {} [{}]", io.index, io.name, io.dtype, dims.join(", "));
        }
    }
    Ok(())
}

async fn run(
    model: &str,
    device: Device,
    inputs: Vec<String>,
    input_formats: Vec<String>,
    output_formats: Vec<String>,
    no_stats: bool,
) -> Result<()> {
    let app = AppContext::builder("modelrun-cli")
        .backend(OrtBackend::new())
        .device(device)
        .configure()?;
    let interpreter = ModelInterpreter::for_local_model(&app, LocalModel::new(model));
    if no_stats {
        interpreter.set_stats_collection_enabled(false);
    }

    let mut options = ModelInputOutputOptions::new();
    for (index, raw) in input_formats.iter().enumerate() {
        let (dtype, dims) = parse_format(raw)?;
        options.set_input_format(index, dtype, dims);
    }
    for (index, raw) in output_formats.iter().enumerate() {
        let (dtype, dims) = parse_format(raw)?;
        options.set_output_format(index, dtype, dims);
    }

    let mut model_inputs = ModelInputs::new();
    for path in &inputs {
        let data = std::fs::read(path).with_context(|| format!("failed to read input {path}"))?;
        model_inputs.add_input(Bytes::from(data));
    }

    let outputs = interpreter.run_async(model_inputs, options).await?;
    for out in outputs.iter() {
        println!("output {} {} {}: {:?}", out.index, out.dtype, out.shape, out.to_value());
    }
    Ok(())
}

/// Parses `dtype:d0xd1x...`; a bare dtype is a scalar.
fn parse_format(raw: &str) -> Result<(DType, Vec<usize>)> {
    let (dtype, dims) = raw.split_once(':').unwrap_or((raw, ""));
    let Some(dtype) = DType::parse(dtype) else {
        bail!("unsupported element type in format `{raw}`");
    };
    let dims = dims
        .split('x')
        .filter(|d| !d.is_empty())
        .map(|d| d.parse::<usize>().with_context(|| format!("invalid dimension `{d}` in `{raw}`")))
        .collect::<Result<Vec<_>>>()?;
    Ok((dtype, dims))
}

fn parse_device(raw: &str) -> Result<Device> {
    if raw.eq_ignore_ascii_case("cpu") {
        return Ok(Device::Cpu);
    }

    if let Some(rest) = raw.strip_prefix("cuda:") {
        let device_id: u32 = rest.parse().context("invalid cuda device id")?;
        return Ok(Device::Cuda { device_id });
    }

    bail!("unsupported device: {raw} (expected cpu or cuda:N)");
}
