//! Streamable HTTP transport on `/mcp`
//!
//! POST carries client messages, GET opens the session's standalone SSE
//! stream, DELETE terminates the session.

use std::convert::Infallible;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::State;
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::Json;
use futures_util::stream::{self, Stream, StreamExt};
use serde_json::{json, Value};
use tokio_stream::wrappers::ReceiverStream;

use crate::error::{McpHttpError, SessionError};
use crate::models::jsonrpc::{IncomingMessage, JsonRpcResponse, Payload};
use crate::models::payment::PaymentProof;
use crate::AppState;

pub const MCP_SESSION_ID_HEADER: &str = "mcp-session-id";
pub const ZYFAI_API_KEY_HEADER: &str = "x-zyfai-api-key";

const SSE_KEEP_ALIVE: Duration = Duration::from_secs(15);

fn session_id_header(headers: &HeaderMap) -> Result<Option<String>, McpHttpError> {
    match headers.get(MCP_SESSION_ID_HEADER) {
        None => Ok(None),
        Some(value) => {
            let value = value
                .to_str()
                .map_err(|_| McpHttpError::invalid_request("Mcp-Session-Id header must be valid UTF-8"))?
                .trim();
            Ok((!value.is_empty()).then(|| value.to_string()))
        }
    }
}

fn require_session_id(headers: &HeaderMap) -> Result<String, McpHttpError> {
    session_id_header(headers)?.ok_or_else(|| SessionError::MissingSessionId.into())
}

fn api_key_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(ZYFAI_API_KEY_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// SSE is used for POST responses only when the client cannot take JSON
fn wants_event_stream(headers: &HeaderMap) -> bool {
    let Some(accept) = headers.get(header::ACCEPT).and_then(|v| v.to_str().ok()) else {
        return false;
    };
    let mut saw_sse = false;
    for part in accept.split(',').map(|p| p.trim()) {
        if part.starts_with("application/json") || part.starts_with("*/*") {
            return false;
        }
        if part.starts_with("text/event-stream") {
            saw_sse = true;
        }
    }
    saw_sse
}

fn message_event(value: &impl serde::Serialize) -> Event {
    Event::default()
        .event("message")
        .data(serde_json::to_string(value).unwrap_or_else(|_| "{}".to_string()))
}

fn reply(
    responses: Vec<JsonRpcResponse>,
    batch: bool,
    session_id: Option<&str>,
    as_event_stream: bool,
) -> Response {
    let mut response = if as_event_stream {
        let events: Vec<Result<Event, Infallible>> =
            responses.iter().map(|r| Ok(message_event(r))).collect();
        Sse::new(stream::iter(events)).into_response()
    } else if batch {
        Json(responses).into_response()
    } else {
        match responses.into_iter().next() {
            Some(single) => Json(single).into_response(),
            None => StatusCode::ACCEPTED.into_response(),
        }
    };

    if let Some(id) = session_id.and_then(|id| HeaderValue::from_str(id).ok()) {
        response.headers_mut().insert(MCP_SESSION_ID_HEADER, id);
    }
    response
}

/// POST /mcp
pub async fn handle_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, McpHttpError> {
    let payload = Payload::parse(&body);
    let session_header = session_id_header(&headers)?;
    let api_key = api_key_header(&headers);
    let as_event_stream = wants_event_stream(&headers);

    if let Ok(payload) = &payload {
        let init_count = payload.initialize_count();
        if init_count > 0 {
            if init_count > 1 || payload.messages().len() > 1 {
                tracing::warn!("Rejected batch mixing initialize with other messages");
                return Err(SessionError::MixedInitializeBatch.into());
            }
            return initialize(&state, payload, session_header, api_key, as_event_stream);
        }
    }

    let session_id = session_header.ok_or(SessionError::MissingSessionId)?;
    let session = state.sessions.lookup(&session_id)?;
    let route = session.begin_route().await?;
    if let Some(key) = api_key {
        route.session().bind_api_key(key);
    }

    let payload = payload.map_err(McpHttpError::parse_error)?;
    if payload.messages().is_empty() {
        return Err(McpHttpError::invalid_request("Empty batch"));
    }

    let payment = PaymentProof::from_headers(&headers);
    let batch = payload.is_batch();
    let mut responses = Vec::new();

    // Messages of one POST are processed in arrival order
    for raw in payload.into_messages() {
        match IncomingMessage::from_value(raw) {
            Ok(message) => {
                if let Some(response) = state
                    .dispatcher
                    .handle_message(route.session(), message, &payment)
                    .await
                {
                    responses.push(response);
                }
            }
            Err((id, error)) => responses.push(JsonRpcResponse::error(id, error)),
        }
    }
    drop(route);

    if responses.is_empty() {
        return Ok(StatusCode::ACCEPTED.into_response());
    }
    Ok(reply(responses, batch, None, as_event_stream))
}

fn initialize(
    state: &AppState,
    payload: &Payload,
    session_header: Option<String>,
    api_key: Option<String>,
    as_event_stream: bool,
) -> Result<Response, McpHttpError> {
    if let Some(existing) = session_header {
        if state.sessions.contains(&existing) {
            return Err(SessionError::AlreadyInitialized(existing).into());
        }
        tracing::debug!(stale_session_id = %existing, "Initialize with unknown session id, creating a new session");
    }

    let raw = payload
        .messages()
        .first()
        .cloned()
        .unwrap_or(Value::Null);
    let (id, params) = match IncomingMessage::from_value(raw) {
        Ok(IncomingMessage::Request { id, params, .. }) => (id, params),
        Ok(_) => return Err(McpHttpError::invalid_request("initialize must be a request")),
        Err((id, error)) => {
            let mut err = McpHttpError::invalid_request(error.message);
            err.id = id;
            return Err(err);
        }
    };

    let session = state.sessions.create_session();
    if let Some(key) = api_key {
        session.bind_api_key(key);
    }

    let result = state.dispatcher.initialize_result(&params);
    Ok(reply(
        vec![JsonRpcResponse::success(id, result)],
        payload.is_batch(),
        Some(session.id()),
        as_event_stream,
    ))
}

/// GET /mcp: standalone server-to-client stream
pub async fn handle_get(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, McpHttpError> {
    let session_id = require_session_id(&headers)?;
    let session = state.sessions.lookup(&session_id)?;
    if let Some(key) = api_key_header(&headers) {
        session.bind_api_key(key);
    }

    let (stream_id, rx) = session.open_stream()?;
    let guard = state.sessions.stream_guard(session, stream_id);
    tracing::info!(session_id = %session_id, "Standalone SSE stream opened");

    let stream = ReceiverStream::new(rx).map(move |message: Value| {
        let _guard = &guard;
        Ok(message_event(&message))
    });

    Ok(Sse::new(stream).keep_alive(KeepAlive::new().interval(SSE_KEEP_ALIVE)))
}

/// DELETE /mcp
pub async fn handle_delete(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Response, McpHttpError> {
    let session_id = require_session_id(&headers)?;
    state.sessions.destroy(&session_id).await?;

    Ok((
        StatusCode::OK,
        Json(json!({ "status": "terminated", "sessionId": session_id })),
    )
        .into_response())
}

/// Fallback for methods the MCP endpoint does not serve
pub async fn method_not_allowed() -> Response {
    Response::builder()
        .status(StatusCode::METHOD_NOT_ALLOWED)
        .header(header::ALLOW, "GET, POST, DELETE")
        .body(Body::empty())
        .unwrap_or_else(|_| StatusCode::METHOD_NOT_ALLOWED.into_response())
}
