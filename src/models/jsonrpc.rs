//! MCP JSON-RPC message models
//!
//! Wire shapes shared by the HTTP transport and the session dispatcher.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const JSONRPC_VERSION: &str = "2.0";

/// Standard MCP methods handled by the gateway
pub mod methods {
    pub const INITIALIZE: &str = "initialize";
    pub const INITIALIZED: &str = "notifications/initialized";
    pub const PING: &str = "ping";
    pub const LIST_TOOLS: &str = "tools/list";
    pub const CALL_TOOL: &str = "tools/call";
    pub const PROGRESS: &str = "notifications/progress";
    pub const LOG_MESSAGE: &str = "notifications/message";
}

/// JSON-RPC and transport error codes
pub mod error_codes {
    pub const PARSE_ERROR: i64 = -32700;
    pub const INVALID_REQUEST: i64 = -32600;
    pub const METHOD_NOT_FOUND: i64 = -32601;
    pub const INVALID_PARAMS: i64 = -32602;
    pub const INTERNAL_ERROR: i64 = -32603;
    /// Non-initialization request without Mcp-Session-Id
    pub const MISSING_SESSION_ID: i64 = -32000;
    /// Mcp-Session-Id that is not (or no longer) registered
    pub const SESSION_NOT_FOUND: i64 = -32001;
    /// Second standalone stream requested for a session
    pub const STREAM_CONFLICT: i64 = -32002;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i64,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcError {
    pub fn new(code: i64, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn method_not_found(method: &str) -> Self {
        Self::new(
            error_codes::METHOD_NOT_FOUND,
            format!("Method not found: {}", method),
        )
    }

    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_PARAMS, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(error_codes::INVALID_REQUEST, message)
    }
}

/// JSON-RPC response sent back to the client
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl JsonRpcResponse {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: JsonRpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            id,
            result: None,
            error: Some(error),
        }
    }
}

/// Server-initiated notification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcNotification {
    pub jsonrpc: String,
    pub method: String,
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub params: Value,
}

impl JsonRpcNotification {
    pub fn new(method: impl Into<String>, params: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.to_string(),
            method: method.into(),
            params,
        }
    }
}

/// One decoded client-to-server message
#[derive(Debug, Clone, PartialEq)]
pub enum IncomingMessage {
    Request {
        id: Value,
        method: String,
        params: Value,
    },
    Notification {
        method: String,
        params: Value,
    },
    /// Reply to a server-initiated request; the gateway issues none, so these
    /// are acknowledged and dropped
    Response,
}

impl IncomingMessage {
    /// Classify a raw JSON value. On failure returns the id to answer with
    /// (null when it could not be recovered) and the error.
    pub fn from_value(value: Value) -> Result<Self, (Value, JsonRpcError)> {
        let Value::Object(mut obj) = value else {
            return Err((
                Value::Null,
                JsonRpcError::invalid_request("Message must be a JSON object"),
            ));
        };

        let id = obj.remove("id");

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err((
                id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request("jsonrpc must be \"2.0\""),
            ));
        }

        match obj.remove("method") {
            Some(Value::String(method)) => {
                let params = obj.remove("params").unwrap_or(Value::Null);
                Ok(match id {
                    Some(id) => IncomingMessage::Request { id, method, params },
                    None => IncomingMessage::Notification { method, params },
                })
            }
            Some(_) => Err((
                id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request("method must be a string"),
            )),
            None if id.is_some() && (obj.contains_key("result") || obj.contains_key("error")) => {
                Ok(IncomingMessage::Response)
            }
            None => Err((
                id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request("Missing method"),
            )),
        }
    }
}

/// Body of a POST to the MCP endpoint: one message or a batch
#[derive(Debug, Clone)]
pub enum Payload {
    Single(Value),
    Batch(Vec<Value>),
}

impl Payload {
    pub fn parse(body: &[u8]) -> Result<Self, serde_json::Error> {
        Ok(match serde_json::from_slice::<Value>(body)? {
            Value::Array(items) => Payload::Batch(items),
            other => Payload::Single(other),
        })
    }

    pub fn messages(&self) -> &[Value] {
        match self {
            Payload::Single(value) => std::slice::from_ref(value),
            Payload::Batch(items) => items,
        }
    }

    pub fn into_messages(self) -> Vec<Value> {
        match self {
            Payload::Single(value) => vec![value],
            Payload::Batch(items) => items,
        }
    }

    pub fn is_batch(&self) -> bool {
        matches!(self, Payload::Batch(_))
    }

    /// Number of `initialize` requests in the payload
    pub fn initialize_count(&self) -> usize {
        self.messages()
            .iter()
            .filter(|m| is_initialize_request(m))
            .count()
    }
}

pub fn is_initialize_request(message: &Value) -> bool {
    message.get("method").and_then(Value::as_str) == Some(methods::INITIALIZE)
        && message.get("id").is_some()
}
