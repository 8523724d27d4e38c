//! Transport, session and facilitator error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::{json, Value};
use thiserror::Error;

use crate::models::jsonrpc::{error_codes, JSONRPC_VERSION};

/// Session registry failures, surfaced to HTTP clients before any tool runs
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SessionError {
    #[error("Bad Request: Mcp-Session-Id header is required")]
    MissingSessionId,

    #[error("Session not found: {0}")]
    SessionNotFound(String),

    #[error("Bad Request: session {0} is already initialized")]
    AlreadyInitialized(String),

    #[error("Invalid Request: mixed initialization batch")]
    MixedInitializeBatch,

    #[error("Conflict: only one SSE stream is allowed per session")]
    StreamConflict,
}

impl SessionError {
    pub fn status(&self) -> StatusCode {
        match self {
            SessionError::MissingSessionId
            | SessionError::AlreadyInitialized(_)
            | SessionError::MixedInitializeBatch => StatusCode::BAD_REQUEST,
            SessionError::SessionNotFound(_) => StatusCode::NOT_FOUND,
            SessionError::StreamConflict => StatusCode::CONFLICT,
        }
    }

    pub fn code(&self) -> i64 {
        match self {
            SessionError::MissingSessionId => error_codes::MISSING_SESSION_ID,
            SessionError::SessionNotFound(_) => error_codes::SESSION_NOT_FOUND,
            SessionError::AlreadyInitialized(_) | SessionError::MixedInitializeBatch => {
                error_codes::INVALID_REQUEST
            }
            SessionError::StreamConflict => error_codes::STREAM_CONFLICT,
        }
    }
}

/// Error returned by the MCP HTTP handlers, rendered as a JSON-RPC error
/// envelope with a matching HTTP status
#[derive(Debug)]
pub struct McpHttpError {
    pub status: StatusCode,
    pub code: i64,
    pub message: String,
    pub id: Value,
}

impl McpHttpError {
    pub fn new(status: StatusCode, code: i64, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
            id: Value::Null,
        }
    }

    pub fn parse_error(detail: impl std::fmt::Display) -> Self {
        Self::new(
            StatusCode::BAD_REQUEST,
            error_codes::PARSE_ERROR,
            format!("Parse error: {}", detail),
        )
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, error_codes::INVALID_REQUEST, message)
    }
}

impl From<SessionError> for McpHttpError {
    fn from(err: SessionError) -> Self {
        Self::new(err.status(), err.code(), err.to_string())
    }
}

impl IntoResponse for McpHttpError {
    fn into_response(self) -> Response {
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "error": {
                "code": self.code,
                "message": self.message,
            },
            "id": self.id,
        });
        (self.status, Json(body)).into_response()
    }
}

/// Failures talking to the x402 facilitator
#[derive(Debug, Error)]
pub enum FacilitatorError {
    #[error("HTTP error: {context}: {source}")]
    Http {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("Unexpected HTTP status {status}: {context}: {body}")]
    HttpStatus {
        context: &'static str,
        status: reqwest::StatusCode,
        body: String,
    },

    #[error("Failed to deserialize JSON: {context}: {source}")]
    JsonDeserialization {
        context: &'static str,
        #[source]
        source: reqwest::Error,
    },
}
