//! Retired SSE-era endpoints

use axum::http::{StatusCode, Uri};
use axum::Json;
use serde_json::{json, Value};

/// GET /sse, POST /message, POST /messages
pub async fn gone(uri: Uri) -> (StatusCode, Json<Value>) {
    tracing::debug!(path = %uri.path(), "Request to retired SSE endpoint");

    (
        StatusCode::GONE,
        Json(json!({
            "error": "Gone",
            "message": "The SSE transport has been replaced by Streamable HTTP. Use POST/GET/DELETE /mcp instead.",
            "endpoint": "/mcp",
            "path": uri.path(),
        })),
    )
}
