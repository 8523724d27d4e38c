// src/lib.rs

use std::sync::Arc;

use config::Config;
use services::{
    mcp_dispatch::McpDispatcher, payment_gate::PaymentGate, session_registry::SessionRegistry,
    upstream::Upstream,
};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub dispatcher: McpDispatcher,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let dispatcher = build_dispatcher(&config);
        Self {
            config: Arc::new(config),
            dispatcher,
            sessions: SessionRegistry::new(),
        }
    }
}

/// Tool catalog, upstream access and payment gate shared by both transports
pub fn build_dispatcher(config: &Config) -> McpDispatcher {
    let catalog = Arc::new(tools::build_catalog());
    tracing::info!(tools = catalog.len(), "Tool catalog ready");

    McpDispatcher::new(
        catalog,
        Upstream::new(&config.zyfai),
        PaymentGate::new(&config.x402),
    )
}

/// Make every panic fatal, including ones inside handlers and spawned
/// tasks: log it, then exit with status 1. Restarts are left to the
/// process supervisor.
pub fn install_panic_hook() {
    std::panic::set_hook(Box::new(|info| {
        tracing::error!(panic = %describe_panic(info), "Unrecoverable failure, exiting");
        std::process::exit(1);
    }));
}

pub fn describe_panic(info: &std::panic::PanicHookInfo<'_>) -> String {
    let payload = info.payload();
    let message = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "non-string panic payload".to_string());

    match info.location() {
        Some(location) => format!(
            "{} at {}:{}:{}",
            message,
            location.file(),
            location.line(),
            location.column()
        ),
        None => message,
    }
}

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod stdio;
pub mod tools;

pub mod services {
    pub mod client_pool;
    pub mod facilitator;
    pub mod mcp_dispatch;
    pub mod payment_gate;
    pub mod session_registry;
    pub mod tool_catalog;
    pub mod upstream;
    pub mod zyfai_api;
}

pub mod handlers {
    pub mod health;
    pub mod legacy;
    pub mod mcp;
    pub mod pricing;
}

pub mod jobs {
    pub mod session_sweeper;
}
