//! MCP method dispatch
//!
//! Turns decoded JSON-RPC messages into responses: protocol handshake,
//! tool listing, and tool calls passing through the payment gate before
//! reaching the catalog.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::models::jsonrpc::{methods, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcResponse};
use crate::models::payment::PaymentProof;
use crate::models::tool::{CallToolParams, ToolResult};
use crate::services::payment_gate::{PaymentDecision, PaymentGate};
use crate::services::session_registry::{McpSession, Notifier};
use crate::services::tool_catalog::{ToolCatalog, ToolContext};
use crate::services::upstream::Upstream;

pub const SERVER_NAME: &str = "zyfai-rebalancing-mcp";
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const LATEST_PROTOCOL_VERSION: &str = "2025-03-26";
pub const SUPPORTED_PROTOCOL_VERSIONS: [&str; 3] = ["2025-06-18", "2025-03-26", "2024-11-05"];

pub const INSTRUCTIONS: &str = "Zyfai DeFi tools: portfolio balances, yield opportunities, \
rebalancing recommendations, analytics and earnings history for wallets on Base (8453), \
Arbitrum (42161) and Plasma (9745). Start with get-position-summary for a wallet overview. \
Some tools may require an x402 payment proof when the payment gate is enabled.";

/// Caller-side inputs to one tool call
#[derive(Clone, Default)]
pub struct CallScope {
    pub api_key: Option<String>,
    /// Payment evidence from transport headers, completed from `_meta`
    pub payment: PaymentProof,
    pub notifier: Option<Notifier>,
}

#[derive(Clone)]
pub struct McpDispatcher {
    catalog: Arc<ToolCatalog>,
    upstream: Upstream,
    gate: PaymentGate,
}

impl McpDispatcher {
    pub fn new(catalog: Arc<ToolCatalog>, upstream: Upstream, gate: PaymentGate) -> Self {
        Self {
            catalog,
            upstream,
            gate,
        }
    }

    pub fn catalog(&self) -> &Arc<ToolCatalog> {
        &self.catalog
    }

    pub fn gate(&self) -> &PaymentGate {
        &self.gate
    }

    pub fn upstream(&self) -> &Upstream {
        &self.upstream
    }

    /// Result of `initialize`, echoing the client's protocol version when
    /// it is one we speak
    pub fn initialize_result(&self, params: &Value) -> Value {
        let requested = params.get("protocolVersion").and_then(Value::as_str);
        let protocol_version = requested
            .filter(|v| SUPPORTED_PROTOCOL_VERSIONS.contains(v))
            .unwrap_or(LATEST_PROTOCOL_VERSION);

        json!({
            "protocolVersion": protocol_version,
            "capabilities": {
                "tools": { "listChanged": false },
                "logging": {},
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": SERVER_VERSION,
            },
            "instructions": INSTRUCTIONS,
        })
    }

    pub fn list_tools_result(&self) -> Value {
        json!({ "tools": self.catalog.definitions() })
    }

    /// Run one `tools/call`, applying the payment gate first
    pub async fn call_tool(
        &self,
        params: CallToolParams,
        scope: CallScope,
    ) -> Result<ToolResult, JsonRpcError> {
        if !self.catalog.contains(&params.name) {
            return Err(JsonRpcError::invalid_params(format!(
                "Unknown tool: {}",
                params.name
            )));
        }

        let proof = scope
            .payment
            .clone()
            .or(PaymentProof::from_meta(params.meta.as_ref()));

        match self.gate.authorize(&params.name, &proof).await {
            PaymentDecision::Free => {}
            PaymentDecision::Denied(body) => {
                tracing::info!(tool = %params.name, reason = %body.error, "Tool call denied by payment gate");
                return Ok(ToolResult::json_error(&body));
            }
            PaymentDecision::Verified {
                transaction_id,
                payer,
            } => match transaction_id {
                Some(transaction_id) => {
                    let notifier = scope.notifier.clone();
                    let tool = params.name.clone();
                    self.gate.settle(transaction_id.clone(), params.name.clone(), move || {
                        if let Some(notify) = notifier {
                            notify(JsonRpcNotification::new(
                                methods::LOG_MESSAGE,
                                json!({
                                    "level": "info",
                                    "logger": "x402",
                                    "data": {
                                        "event": "payment-settled",
                                        "toolName": tool,
                                        "transactionId": transaction_id,
                                        "payer": payer,
                                    },
                                }),
                            ));
                        }
                    });
                }
                None => {
                    tracing::warn!(tool = %params.name, "Verified payment has no transaction id, skipping settlement");
                }
            },
        }

        let ctx = ToolContext {
            upstream: self.upstream.clone(),
            api_key: scope.api_key,
            notifier: scope.notifier,
            progress_token: params.progress_token(),
        };
        self.catalog.call(&params.name, params.arguments, ctx).await
    }

    /// Handle one non-initialize message inside an active session. Returns
    /// `None` for notifications and client responses.
    pub async fn handle_message(
        &self,
        session: &Arc<McpSession>,
        message: IncomingMessage,
        payment: &PaymentProof,
    ) -> Option<JsonRpcResponse> {
        match message {
            IncomingMessage::Request { id, method, params } => {
                let result = self.handle_request(session, &method, params, payment).await;
                Some(match result {
                    Ok(value) => JsonRpcResponse::success(id, value),
                    Err(error) => JsonRpcResponse::error(id, error),
                })
            }
            IncomingMessage::Notification { method, .. } => {
                if method == methods::INITIALIZED {
                    session.mark_client_initialized();
                    tracing::debug!(session_id = %session.id(), "Client initialized");
                } else {
                    tracing::debug!(session_id = %session.id(), method = %method, "Ignoring notification");
                }
                None
            }
            IncomingMessage::Response => None,
        }
    }

    async fn handle_request(
        &self,
        session: &Arc<McpSession>,
        method: &str,
        params: Value,
        payment: &PaymentProof,
    ) -> Result<Value, JsonRpcError> {
        match method {
            methods::PING => Ok(json!({})),
            methods::LIST_TOOLS => Ok(self.list_tools_result()),
            methods::CALL_TOOL => {
                let params: CallToolParams = serde_json::from_value(params)
                    .map_err(|e| JsonRpcError::invalid_params(format!("Invalid tools/call params: {}", e)))?;

                tracing::info!(session_id = %session.id(), tool = %params.name, "Tool call");
                let scope = CallScope {
                    api_key: session.api_key(),
                    payment: payment.clone(),
                    notifier: Some(session.notifier()),
                };
                let result = self.call_tool(params, scope).await?;
                serde_json::to_value(result)
                    .map_err(|e| JsonRpcError::new(crate::models::jsonrpc::error_codes::INTERNAL_ERROR, e.to_string()))
            }
            methods::INITIALIZE => Err(JsonRpcError::invalid_request(
                "Session is already initialized",
            )),
            other => Err(JsonRpcError::method_not_found(other)),
        }
    }
}
