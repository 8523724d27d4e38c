//! MCP over stdin/stdout
//!
//! The `rmcp` SDK owns framing and the handshake; tool listing and calls
//! are served from the same dispatcher as the HTTP transport. There are no
//! transport headers here, so the credential is the server default and
//! payment evidence comes from the call's `_meta`.

use std::future::Future;
use std::sync::Arc;

use rmcp::{
    model::{ErrorData as McpError, *},
    service::RequestContext,
    RoleServer, ServerHandler,
};

use crate::models::jsonrpc::JsonRpcError;
use crate::models::tool::{CallToolParams, ToolContent, ToolResult};
use crate::services::mcp_dispatch::{CallScope, McpDispatcher, INSTRUCTIONS, SERVER_NAME, SERVER_VERSION};

#[derive(Clone)]
pub struct StdioServer {
    dispatcher: McpDispatcher,
}

impl StdioServer {
    pub fn new(dispatcher: McpDispatcher) -> Self {
        Self { dispatcher }
    }

    fn tools(&self) -> Vec<Tool> {
        self.dispatcher
            .catalog()
            .tools()
            .map(|tool| Tool::new(tool.name, tool.description, Arc::new(tool.input_schema.clone())))
            .collect()
    }
}

fn into_call_tool_result(result: ToolResult) -> CallToolResult {
    let content = result
        .content
        .into_iter()
        .map(|ToolContent::Text { text }| Content::text(text))
        .collect();

    if result.is_error {
        CallToolResult::error(content)
    } else {
        CallToolResult::success(content)
    }
}

fn into_mcp_error(error: JsonRpcError) -> McpError {
    McpError::new(ErrorCode(error.code as i32), error.message, error.data)
}

impl ServerHandler for StdioServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::V_2025_03_26,
            capabilities: ServerCapabilities::builder()
                .enable_tools()
                .enable_logging()
                .build(),
            server_info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
                ..Implementation::from_build_env()
            },
            instructions: Some(INSTRUCTIONS.to_string()),
        }
    }

    fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<ListToolsResult, McpError>> + Send + '_ {
        std::future::ready(Ok(ListToolsResult::with_all_items(self.tools())))
    }

    fn call_tool(
        &self,
        request: CallToolRequestParam,
        context: RequestContext<RoleServer>,
    ) -> impl Future<Output = Result<CallToolResult, McpError>> + Send + '_ {
        async move {
            let meta = serde_json::to_value(&context.meta)
                .ok()
                .filter(|m| m.as_object().is_some_and(|o| !o.is_empty()));

            let params = CallToolParams {
                name: request.name.to_string(),
                arguments: request.arguments,
                meta,
            };
            tracing::info!(tool = %params.name, "Tool call (stdio)");

            self.dispatcher
                .call_tool(params, CallScope::default())
                .await
                .map(into_call_tool_result)
                .map_err(into_mcp_error)
        }
    }
}
