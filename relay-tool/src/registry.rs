//! Process-lifetime registry of callable tools.

use std::collections::HashMap;
use std::sync::Arc;

use relay_types::{ToolContext, ToolDefinition, ToolDyn, ToolResult};
use serde_json::Value;

use crate::middleware::{Next, ToolMiddleware};

/// Holds the immutable-per-turn tool set (§3), plus global and per-tool
/// middleware chains wrapped around every `execute`.
#[derive(Default)]
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn ToolDyn>>,
    global_middleware: Vec<Arc<dyn ToolMiddleware>>,
    tool_middleware: HashMap<String, Vec<Arc<dyn ToolMiddleware>>>,
}

impl ToolRegistry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool, keyed by its own `name()`.
    pub fn register(&mut self, tool: Arc<dyn ToolDyn>) {
        self.tools.insert(tool.name().to_string(), tool);
    }

    /// Look up a tool by name.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<dyn ToolDyn>> {
        self.tools.get(name)
    }

    /// All registered tools' definitions, sorted by name for stable wire output.
    #[must_use]
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        let mut defs: Vec<_> = self.tools.values().map(|t| t.definition()).collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }

    /// Add a middleware applied to every tool's execution, in registration order.
    pub fn add_middleware(&mut self, middleware: Arc<dyn ToolMiddleware>) {
        self.global_middleware.push(middleware);
    }

    /// Add a middleware applied only to `tool_name`'s execution, after the
    /// global chain.
    pub fn add_tool_middleware(&mut self, tool_name: impl Into<String>, middleware: Arc<dyn ToolMiddleware>) {
        self.tool_middleware.entry(tool_name.into()).or_default().push(middleware);
    }

    /// Run `name` through its middleware chain and return the result.
    /// Unknown tool names produce a synthetic failure rather than panicking,
    /// since a model may hallucinate a tool name.
    pub async fn execute(&self, name: &str, params: &Value, ctx: &ToolContext) -> ToolResult {
        let Some(tool) = self.get(name) else {
            return ToolResult::failure(format!("unknown tool '{name}'"));
        };
        let chain = self.chain_for(name);
        Next::new(&chain).run(tool.as_ref(), params, ctx).await
    }

    fn chain_for(&self, name: &str) -> Vec<Arc<dyn ToolMiddleware>> {
        let mut chain = self.global_middleware.clone();
        if let Some(specific) = self.tool_middleware.get(name) {
            chain.extend(specific.iter().cloned());
        }
        chain
    }
}
