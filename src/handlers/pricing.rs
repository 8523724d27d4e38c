use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{error, info, warn};

use crate::models::http::{ErrorResponse, PricingResponse, PricingUpdateResponse};
use crate::models::payment::{PricingEntry, PricingTerms};
use crate::AppState;

type HandlerError = (StatusCode, Json<ErrorResponse>);

/// GET /pricing
pub async fn list_pricing(State(state): State<AppState>) -> Json<PricingResponse> {
    let gate = state.dispatcher.gate();
    let pricing = gate
        .all_pricing()
        .iter()
        .map(|(tool, entry)| (tool.clone(), PricingTerms::from(entry)))
        .collect();

    Json(PricingResponse {
        enabled: gate.is_enabled(),
        facilitator: gate.facilitator_url().to_string(),
        pricing,
    })
}

/// PUT /admin/pricing/{tool}
pub async fn update_pricing(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    headers: HeaderMap,
    payload: Result<Json<PricingEntry>, JsonRejection>,
) -> Result<Json<PricingUpdateResponse>, HandlerError> {
    check_admin_auth(&state, &headers)?;
    ensure_known_tool(&state, &tool_name)?;

    let Json(entry) = payload.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                format!("Invalid pricing entry: {}", e.body_text()),
                "INVALID_PRICING",
            )),
        )
    })?;

    if !entry.is_valid() {
        return Err((
            StatusCode::BAD_REQUEST,
            Json(ErrorResponse::new(
                "amount must be a non-negative integer in base units; token and network are required",
                "INVALID_PRICING",
            )),
        ));
    }

    let previous = state.dispatcher.gate().update_pricing(&tool_name, entry.clone());
    info!(tool = %tool_name, replaced = previous.is_some(), "Pricing updated via admin API");

    Ok(Json(PricingUpdateResponse {
        tool_name,
        pricing: Some(PricingTerms::from(&entry)),
        previous: previous.as_ref().map(PricingTerms::from),
    }))
}

/// DELETE /admin/pricing/{tool}
pub async fn delete_pricing(
    State(state): State<AppState>,
    Path(tool_name): Path<String>,
    headers: HeaderMap,
) -> Result<Json<PricingUpdateResponse>, HandlerError> {
    check_admin_auth(&state, &headers)?;
    ensure_known_tool(&state, &tool_name)?;

    let previous = state.dispatcher.gate().remove_pricing(&tool_name);

    Ok(Json(PricingUpdateResponse {
        tool_name,
        pricing: None,
        previous: previous.as_ref().map(PricingTerms::from),
    }))
}

fn ensure_known_tool(state: &AppState, tool_name: &str) -> Result<(), HandlerError> {
    if state.dispatcher.catalog().contains(tool_name) {
        return Ok(());
    }
    Err((
        StatusCode::NOT_FOUND,
        Json(ErrorResponse::new(
            format!("Unknown tool: {}", tool_name),
            "TOOL_NOT_FOUND",
        )),
    ))
}

/// Compare `X-API-Key` with the configured admin key
fn check_admin_auth(state: &AppState, headers: &HeaderMap) -> Result<(), HandlerError> {
    let Some(admin_key) = state.config.admin_api_key.as_deref() else {
        error!("ADMIN_API_KEY not configured");
        return Err((
            StatusCode::SERVICE_UNAVAILABLE,
            Json(ErrorResponse::new(
                "Admin API is not configured",
                "ADMIN_DISABLED",
            )),
        ));
    };

    let provided_key = headers
        .get("x-api-key")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if provided_key != admin_key {
        warn!("Invalid or missing admin API key");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse::new(
                "Invalid or missing API key",
                "UNAUTHORIZED",
            )),
        ));
    }

    Ok(())
}
