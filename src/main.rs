use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use zyfai_mcp_gateway::{config::Config, install_panic_hook, jobs::session_sweeper, routes, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,zyfai_mcp_gateway=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    install_panic_hook();

    // Load configuration (reads .env when present)
    let config = Config::from_env()?;
    tracing::info!(
        upstream = %config.zyfai.base_url,
        default_api_key = config.zyfai.api_key.is_some(),
        "Configuration loaded"
    );
    if config.zyfai.api_key.is_none() {
        tracing::warn!("ZYFAI_API_KEY not set; clients must send X-Zyfai-Api-Key");
    }

    let bind_addr = config.bind_addr();
    let idle_timeout = config.sessions.idle_timeout;
    let sweep_interval = config.sessions.sweep_interval;

    let state = AppState::new(config);
    let sessions = state.sessions.clone();

    // Start background jobs
    session_sweeper::start_session_sweeper_job(sessions.clone(), idle_timeout, sweep_interval).await;

    let app = routes::build_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    tracing::info!("Server listening on {}", listener.local_addr()?);
    tracing::info!("MCP endpoint: POST/GET/DELETE /mcp");

    // Open SSE streams only end once their sessions are closed
    let shutdown = async move {
        shutdown_signal().await;
        tracing::info!(sessions = sessions.len(), "Closing MCP sessions");
        sessions.close_all().await;
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .context("server failure")?;

    tracing::info!("Server stopped");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutdown signal received");
}
