//! Declarative tool registry
//!
//! A tool is a name, a description, an argument type (its JSON schema is
//! derived with `schemars`) and an async handler. Tools are registered once
//! at startup; the catalog is immutable afterwards and shared behind an `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use schemars::generate::SchemaSettings;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};

use crate::models::jsonrpc::{methods, JsonRpcError, JsonRpcNotification};
use crate::models::tool::{ToolDefinition, ToolResult};
use crate::models::zyfai::ApiError;
use crate::services::session_registry::Notifier;
use crate::services::upstream::Upstream;
use crate::services::zyfai_api::{ApiResult, ZyfaiClient};

type ToolFuture = Pin<Box<dyn Future<Output = ToolResult> + Send>>;
type ToolHandler = Arc<dyn Fn(ToolContext, Value) -> Result<ToolFuture, String> + Send + Sync>;

/// Everything a handler may use while serving one call
#[derive(Clone)]
pub struct ToolContext {
    pub upstream: Upstream,
    /// Credential bound to the calling session, if any
    pub api_key: Option<String>,
    pub notifier: Option<Notifier>,
    pub progress_token: Option<Value>,
}

impl ToolContext {
    pub fn new(upstream: Upstream) -> Self {
        Self {
            upstream,
            api_key: None,
            notifier: None,
            progress_token: None,
        }
    }

    pub fn client(&self) -> Result<ZyfaiClient, ApiError> {
        self.upstream.client(self.api_key.as_deref())
    }

    /// Emit `notifications/progress` when the caller asked for it
    pub fn report_progress(&self, progress: u32, total: u32, message: &str) {
        if let (Some(notifier), Some(token)) = (&self.notifier, &self.progress_token) {
            notifier(JsonRpcNotification::new(
                methods::PROGRESS,
                json!({
                    "progressToken": token,
                    "progress": progress,
                    "total": total,
                    "message": message,
                }),
            ));
        }
    }
}

/// Render an upstream result as tool output
pub fn respond(what: &str, result: ApiResult) -> ToolResult {
    match result {
        Ok(response) => ToolResult::json(&response),
        Err(e) => {
            tracing::warn!(code = %e.code, "Error fetching {}: {}", what, e.message);
            ToolResult::error(format!("Error fetching {}: {}", what, e))
        }
    }
}

pub struct ToolSpec {
    pub name: &'static str,
    pub category: &'static str,
    pub description: &'static str,
    pub input_schema: Map<String, Value>,
    handler: ToolHandler,
}

#[derive(Default)]
pub struct ToolCatalog {
    tools: Vec<ToolSpec>,
    index: HashMap<&'static str, usize>,
}

impl ToolCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool whose arguments deserialize into `P`.
    ///
    /// Panics if `name` is already registered.
    pub fn register<P, F, Fut>(
        &mut self,
        name: &'static str,
        category: &'static str,
        description: &'static str,
        handler: F,
    ) -> &mut Self
    where
        P: DeserializeOwned + JsonSchema + Send + 'static,
        F: Fn(ToolContext, P) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ToolResult> + Send + 'static,
    {
        assert!(
            !self.index.contains_key(name),
            "tool {} registered twice",
            name
        );

        let handler = Arc::new(handler);
        let erased: ToolHandler = Arc::new(move |ctx, arguments| {
            let params: P = serde_json::from_value(arguments).map_err(|e| e.to_string())?;
            let handler = handler.clone();
            Ok(Box::pin(async move { handler(ctx, params).await }) as ToolFuture)
        });

        self.index.insert(name, self.tools.len());
        self.tools.push(ToolSpec {
            name,
            category,
            description,
            input_schema: input_schema_for::<P>(),
            handler: erased,
        });
        self
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&ToolSpec> {
        self.index.get(name).map(|&i| &self.tools[i])
    }

    pub fn tools(&self) -> impl Iterator<Item = &ToolSpec> {
        self.tools.iter()
    }

    /// Definitions in registration order, as served by `tools/list`
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.tools
            .iter()
            .map(|t| ToolDefinition {
                name: t.name.to_string(),
                description: t.description.to_string(),
                input_schema: t.input_schema.clone(),
            })
            .collect()
    }

    /// Tool names grouped by category
    pub fn categories(&self) -> BTreeMap<&'static str, Vec<&'static str>> {
        let mut categories: BTreeMap<&'static str, Vec<&'static str>> = BTreeMap::new();
        for tool in &self.tools {
            categories.entry(tool.category).or_default().push(tool.name);
        }
        categories
    }

    /// Run a tool. Unknown names and arguments that do not fit the schema
    /// are protocol errors; everything else is a tool result.
    pub async fn call(
        &self,
        name: &str,
        arguments: Option<Map<String, Value>>,
        ctx: ToolContext,
    ) -> Result<ToolResult, JsonRpcError> {
        let tool = self
            .get(name)
            .ok_or_else(|| JsonRpcError::invalid_params(format!("Unknown tool: {}", name)))?;

        let arguments = Value::Object(arguments.unwrap_or_default());
        let future = (tool.handler)(ctx, arguments).map_err(|e| {
            JsonRpcError::invalid_params(format!("Invalid arguments for tool {}: {}", name, e))
        })?;

        tracing::debug!(tool = %name, "Calling tool");
        Ok(future.await)
    }
}

/// JSON schema object for a tool's argument type
fn input_schema_for<P: JsonSchema>() -> Map<String, Value> {
    let generator = SchemaSettings::draft07()
        .with(|s| {
            s.meta_schema = None;
            s.inline_subschemas = true;
        })
        .into_generator();
    let schema = generator.into_root_schema_for::<P>();

    let mut object = match serde_json::to_value(schema) {
        Ok(Value::Object(object)) => object,
        _ => Map::new(),
    };
    object.remove("title");
    object.remove("$schema");
    object
        .entry("type")
        .or_insert_with(|| Value::String("object".to_string()));
    object
        .entry("properties")
        .or_insert_with(|| Value::Object(Map::new()));
    object
}
