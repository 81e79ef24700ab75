//! Stub HTTP server for test harnesses.
//!
//! Reads the canned-response document from stdin, then answers POSTs on
//! `0.0.0.0:$TEST_SERVER_PORT` (default 7986) until interrupted.

use anyhow::{Context, Result};
use canned_core::{ConfigurationStore, Dispatcher, Server, ServerConfig};
use tracing_subscriber::EnvFilter;

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn setup_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn main() -> Result<()> {
    setup_logging();

    let store = ConfigurationStore::from_reader(std::io::stdin().lock())
        .context("Failed to load configuration from stdin")?;
    tracing::info!(entries = store.len(), ids = ?store.identifiers(), "configuration loaded");

    let config = ServerConfig::from_env().context("Failed to read server configuration")?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .worker_threads(config.workers)
        .enable_all()
        .build()
        .context("Failed to start runtime")?;

    runtime.block_on(async move {
        let server = Server::bind(&config, Dispatcher::new(store))
            .with_context(|| format!("Failed to bind {}", config.socket_addr()))?;
        tracing::info!(addr = %server.local_addr()?, "stub server listening");

        server
            .run_until(async {
                if let Err(err) = tokio::signal::ctrl_c().await {
                    tracing::error!(error = %err, "failed to listen for ctrl-c");
                    std::future::pending::<()>().await;
                }
            })
            .await?;

        tracing::info!("stub server stopped");
        Ok::<(), anyhow::Error>(())
    })
}
