use std::path::PathBuf;

use clap::{Parser, Subcommand};
use onnxserve_backend_ort::{Device, Optimization};

#[derive(Parser, Debug)]
#[command(name = "onnxserve", version, about = "ONNX model inference server")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Start the inference server
    Serve {
        /// Path to ONNX model
        #[arg(long, value_parser = existing_file)]
        model_path: PathBuf,

        /// The base server address
        #[arg(long, default_value = "0.0.0.0")]
        address: String,

        /// gRPC port to listen to requests
        #[arg(long, default_value_t = 50051)]
        grpc_port: u16,

        /// Number of worker threads (0 = one per CPU)
        #[arg(long, default_value_t = 0)]
        num_threads: usize,

        /// Log level (RUST_LOG syntax)
        #[arg(long, default_value = "info")]
        log: String,

        /// Device for inference (cpu or cuda:N)
        #[arg(long, default_value = "cpu")]
        device: Device,

        /// Graph optimization level (disable, basic, extended, all)
        #[arg(long, default_value = "basic")]
        optimization: Optimization,

        /// onnxruntime intra-op threads (0 = runtime default)
        #[arg(long, default_value_t = 0)]
        intra_op_threads: usize,

        /// Pending requests allowed per worker
        #[arg(long, default_value_t = 64)]
        queue_depth: usize,
    },
}

fn existing_file(raw: &str) -> Result<PathBuf, String> {
    if raw.is_empty() {
        return Err("option is required but missing".to_string());
    }
    let path = PathBuf::from(raw);
    if !path.is_file() {
        return Err(format!("File at '{raw}' does not exist"));
    }
    Ok(path)
}
