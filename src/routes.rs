//! HTTP router for the gateway binary

use axum::{
    http::{header::HeaderName, HeaderValue, Method, StatusCode, Uri},
    routing::{get, post, put},
    Json, Router,
};
use serde_json::{json, Value};
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    trace::TraceLayer,
};

use crate::handlers::{health, legacy, mcp, pricing};
use crate::AppState;

pub fn build_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state.config.allowed_origins);

    Router::new()
        .route("/", get(health::service_info))
        .route("/health", get(health::health))
        .route(
            "/mcp",
            post(mcp::handle_post)
                .get(mcp::handle_get)
                .delete(mcp::handle_delete)
                .fallback(mcp::method_not_allowed),
        )
        .route("/sse", get(legacy::gone))
        .route("/message", post(legacy::gone))
        .route("/messages", post(legacy::gone))
        .route("/pricing", get(pricing::list_pricing))
        .route(
            "/admin/pricing/{tool}",
            put(pricing::update_pricing).delete(pricing::delete_pricing),
        )
        .fallback(not_found)
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers(Any)
        .expose_headers([HeaderName::from_static(mcp::MCP_SESSION_ID_HEADER)]);

    if allowed_origins.is_empty() || allowed_origins.iter().any(|o| o == "*") {
        return cors.allow_origin(Any);
    }

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|o| match HeaderValue::from_str(o) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %o, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    cors.allow_origin(AllowOrigin::list(origins))
}

async fn not_found(uri: Uri) -> (StatusCode, Json<Value>) {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "Not found", "path": uri.path() })),
    )
}
