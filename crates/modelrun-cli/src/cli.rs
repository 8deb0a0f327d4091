use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "modelrun", version, about = "Run custom models through the modelrun interpreter")]
pub struct Cli {
    /// Log level (RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log: String,

    /// Device for inference (cpu or cuda:N)
    #[arg(long, global = true, default_value = "cpu")]
    pub device: String,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the model graph's inputs and outputs
    Inspect {
        /// Path to ONNX model file
        #[arg(long)]
        model: String,
    },
    /// Run one inference from raw little-endian input files
    Run {
        /// Path to ONNX model file
        #[arg(long)]
        model: String,

        /// Raw input file, one per input format, in order
        #[arg(long = "input", required = true)]
        inputs: Vec<String>,

        /// Input format as dtype:dims, e.g. f32:1x4 (index follows flag order)
        #[arg(long = "input-format", required = true)]
        input_formats: Vec<String>,

        /// Output format as dtype:dims, e.g. f32:1x2 (index follows flag order)
        #[arg(long = "output-format", required = true)]
        output_formats: Vec<String>,

        /// Disable usage stats for this app
        #[arg(long)]
        no_stats: bool,
    },
}
