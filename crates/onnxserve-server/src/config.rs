use std::net::{SocketAddr, ToSocketAddrs};
use std::path::PathBuf;

use anyhow::{Context, Result};
use onnxserve_backend_ort::OrtOptions;
use onnxserve_runtime::PoolConfig;

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub addr: SocketAddr,
    pub model_path: PathBuf,
    pub pool: PoolConfig,
    pub ort: OrtOptions,
}

impl ServerConfig {
    pub fn new(
        address: &str,
        port: u16,
        model_path: PathBuf,
        pool: PoolConfig,
        ort: OrtOptions,
    ) -> Result<Self> {
        let addr = resolve_addr(address, port)?;
        Ok(Self {
            addr,
            model_path,
            pool,
            ort,
        })
    }
}

fn resolve_addr(address: &str, port: u16) -> Result<SocketAddr> {
    (address, port)
        .to_socket_addrs()
        .with_context(|| format!("invalid server address '{address}'"))?
        .next()
        .with_context(|| format!("server address '{address}' did not resolve"))
}
