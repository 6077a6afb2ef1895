//! sw-proxy server entry point.
//!
//! Boots the caching proxy worker, registers it (install, then activate),
//! and serves its lifecycle and fetch events as MCP tools on stdio.
//! Logging goes to stderr to avoid interfering with the JSON-RPC protocol on stdout.

use std::sync::Arc;

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use swproxy_client::{FetchClient, FetchConfig};
use swproxy_core::{AppConfig, CacheDb, CacheProxy, Registration};
use tracing_subscriber::EnvFilter;

mod error;
mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load()?;
    tracing::info!(cache = %config.cache_name, origin = %config.origin, "starting sw-proxy on stdio transport");

    let db = CacheDb::open(&config.db_path).await?;
    let network = FetchClient::new(FetchConfig::from(&config))?;
    tracing::debug!(
        user_agent = %network.config().user_agent,
        timeout = ?network.config().timeout,
        max_bytes = network.config().max_bytes,
        "network client ready"
    );
    let proxy = CacheProxy::new(config.proxy_config()?, db, network);
    let registration = Arc::new(Registration::new(proxy));

    match registration.update().await {
        Ok(report) => tracing::info!(
            precached = report.install.precached.len(),
            active = report.activation.is_some(),
            "worker registered"
        ),
        Err(e) => tracing::warn!("worker registration failed, requests bypass the cache: {e}"),
    }

    let handler = handler::ProxyServer::new(registration);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
