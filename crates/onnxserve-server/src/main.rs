mod cli;
mod config;
mod grpc;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Command};
use onnxserve_backend_ort::{OrtModel, OrtOptions};
use onnxserve_core::{Dispatcher, ModelHandle};
use onnxserve_proto::inference::runtime_server::RuntimeServer;
use onnxserve_runtime::{PoolConfig, WorkerPool};
use tonic_health::pb::health_server::HealthServer;
use tonic_health::server::HealthReporter;
use tonic_reflection::server::Builder as ReflectionBuilder;
use tracing_subscriber::EnvFilter;

use config::ServerConfig;
use grpc::RuntimeSvc;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            model_path,
            address,
            grpc_port,
            num_threads,
            log,
            device,
            optimization,
            intra_op_threads,
            queue_depth,
        } => {
            let config = ServerConfig::new(
                &address,
                grpc_port,
                model_path,
                PoolConfig {
                    workers: num_threads,
                    queue_depth,
                },
                OrtOptions {
                    device,
                    optimization,
                    intra_op_threads,
                },
            )?;
            serve(config, &log).await
        }
    }
}

async fn serve(config: ServerConfig, log: &str) -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_new(log).context("invalid log filter")?)
        .init();

    tracing::info!(?config, "starting onnxserve");

    let model = OrtModel::load(&config.model_path, &config.ort).context("failed to load model")?;
    for slot in model.input_slots() {
        tracing::info!(name = %slot.name, elements = slot.expected_element_count, "input slot");
    }
    for slot in model.output_slots() {
        tracing::info!(name = %slot.name, elements = slot.expected_element_count, "output slot");
    }

    let dispatcher = Dispatcher::new(Arc::new(model));
    let pool = WorkerPool::spawn(Arc::new(dispatcher), config.pool)?;
    let svc = RuntimeSvc::new(pool.handle());

    let (health_reporter, health) = grpc::health_service().await;

    let reflection = ReflectionBuilder::configure()
        .register_encoded_file_descriptor_set(onnxserve_proto::FILE_DESCRIPTOR_SET)
        .build_v1()
        .map_err(|e| anyhow::anyhow!("reflection build failed: {e}"))?;

    tracing::info!(
        addr = %config.addr,
        workers = pool.handle().workers(),
        "onnxserve gRPC listening"
    );

    tonic::transport::Server::builder()
        .add_service(RuntimeServer::new(svc))
        .add_service(HealthServer::new(health))
        .add_service(reflection)
        .serve_with_shutdown(config.addr, shutdown_signal(health_reporter))
        .await?;

    tokio::task::spawn_blocking(move || pool.join())
        .await
        .context("worker pool did not shut down cleanly")?;
    tracing::info!("onnxserve stopped");
    Ok(())
}

async fn shutdown_signal(health_reporter: HealthReporter) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = ?e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
    health_reporter
        .set_not_serving::<RuntimeServer<RuntimeSvc>>()
        .await;
}
