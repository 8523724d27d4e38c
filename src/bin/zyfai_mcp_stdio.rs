//! Zyfai MCP server over stdio

use anyhow::Result;
use rmcp::{transport::stdio, ServiceExt};
use tracing::info;

use zyfai_mcp_gateway::{build_dispatcher, config::Config, install_panic_hook, stdio::StdioServer};

#[tokio::main]
async fn main() -> Result<()> {
    // Logs go to stderr, stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,zyfai_mcp_gateway=debug".into()),
        )
        .with_writer(std::io::stderr)
        .with_ansi(false)
        .init();

    install_panic_hook();

    info!("Starting Zyfai MCP server (stdio)");

    let config = Config::from_env()?;
    info!("Upstream API: {}", config.zyfai.base_url);

    let server = StdioServer::new(build_dispatcher(&config));
    let service = server.serve(stdio()).await?;
    let quit_reason = service.waiting().await?;

    info!("Server stopped: {:?}", quit_reason);

    Ok(())
}
