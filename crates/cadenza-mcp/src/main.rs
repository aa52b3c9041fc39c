//! Cadenza MCP server binary
//!
//! Speaks MCP over stdio. stdout carries the protocol, so all logging
//! goes to stderr.

use std::sync::Arc;

use anyhow::Result;
use cadenza_core::{AssetCache, FetchConfig, HttpFetcher, SourceResolver};
use cadenza_mcp::AudioAnalysisServer;
use rmcp::{transport::stdio, ServiceExt};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    let cache_dir = AssetCache::default_dir();
    let cache = Arc::new(AssetCache::new(&cache_dir)?);
    let fetcher = Arc::new(HttpFetcher::new(FetchConfig::default()));
    let resolver = SourceResolver::new(cache, fetcher);

    info!(
        version = cadenza_core::VERSION,
        cache_dir = %cache_dir.display(),
        "Starting cadenza MCP server"
    );

    let service = AudioAnalysisServer::new(resolver)
        .serve(stdio())
        .await
        .inspect_err(|e| tracing::error!("Failed to start server: {e}"))?;
    service.waiting().await?;
    Ok(())
}
