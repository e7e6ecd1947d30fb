//! offcache server entry point.
//!
//! Loads configuration, opens the cache, precaches the configured resources,
//! then serves MCP on stdio. Logging goes to stderr to avoid interfering with
//! the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use offcache_core::AppConfig;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use tracing_subscriber::EnvFilter;

mod handler;
mod state;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    let state = Arc::new(state::AppState::open(&config).await?);

    let report = state.install(&config.precache).await;
    if !report.is_complete() {
        tracing::warn!(failed = report.failed.len(), "some resources could not be precached");
    }

    tracing::info!("Starting offcache server on stdio transport");

    let handler = handler::OffcacheServer::new(state);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
