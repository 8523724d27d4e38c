use axum::{extract::State, Json};
use chrono::Utc;
use serde_json::{json, Value};

use crate::models::http::{HealthResponse, PaymentGateStatus, ToolSummary};
use crate::services::mcp_dispatch::{SERVER_NAME, SERVER_VERSION};
use crate::AppState;

/// GET /health
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let gate = state.dispatcher.gate();
    let catalog = state.dispatcher.catalog();

    let categories = catalog
        .categories()
        .into_iter()
        .map(|(category, tools)| (category.to_string(), tools.len()))
        .collect();

    Json(HealthResponse {
        status: "healthy".to_string(),
        service: SERVER_NAME.to_string(),
        version: SERVER_VERSION.to_string(),
        timestamp: Utc::now().to_rfc3339(),
        transport: "streamable-http".to_string(),
        active_sessions: state.sessions.len(),
        payment_gate: PaymentGateStatus {
            enabled: gate.is_enabled(),
            priced_tools: if gate.is_enabled() {
                gate.priced_tools()
            } else {
                Vec::new()
            },
        },
        tools: ToolSummary {
            total: catalog.len(),
            categories,
        },
    })
}

/// GET /
pub async fn service_info(State(state): State<AppState>) -> Json<Value> {
    let catalog = state.dispatcher.catalog();

    Json(json!({
        "name": SERVER_NAME,
        "version": SERVER_VERSION,
        "description": "MCP server for Zyfai DeFi portfolio, yield opportunity and rebalancing data",
        "transport": "streamable-http",
        "endpoints": {
            "mcp": "/mcp",
            "health": "/health",
            "pricing": "/pricing",
        },
        "toolCategories": catalog.categories(),
        "totalTools": catalog.len(),
    }))
}
