pub mod tools;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use serde_json::Value as JsonValue;

use veda_engine::HybridOrchestrator;
use veda_llms::Provider;

pub use tools::{
    CheckCalculation, CheckCalculationArgs, CheckCalculationError, Curriculum, CurriculumArgs,
    CurriculumError, Diagram, DiagramArgs, DiagramError, GenerateQuestion, GenerateQuestionArgs,
    GenerateQuestionError, Tool, ToolResult,
};

pub struct ToolBus {
    tools: HashMap<String, Arc<dyn Tool>>,
}

impl ToolBus {
    /// Registry with the full production tool set.
    pub fn new(
        orchestrator: Arc<HybridOrchestrator>,
        provider: Arc<dyn Provider>,
        model: impl Into<String>,
    ) -> Self {
        let mut bus = Self {
            tools: HashMap::new(),
        };
        bus.register(GenerateQuestion::new(orchestrator));
        bus.register(CheckCalculation::new());
        bus.register(Curriculum::new());
        bus.register(Diagram::new(provider, model.into()));
        bus
    }

    /// An empty registry; register tools explicitly. Used by tests.
    pub fn empty() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Arc::new(tool));
    }

    pub async fn call(&self, tool_name: &str, args: JsonValue) -> Result<(JsonValue, u64)> {
        let tool = self
            .tools
            .get(tool_name)
            .ok_or_else(|| anyhow!("tool not found: {}", tool_name))?;

        tracing::debug!(tool = tool_name, args = %args, "tool call");

        let start = Instant::now();
        let result = tool.execute(args).await;
        let duration_ms = start.elapsed().as_millis() as u64;

        match &result {
            Ok(_) => {
                tracing::debug!(tool = tool_name, duration_ms, "tool done");
            }
            Err(e) => {
                tracing::debug!(tool = tool_name, duration_ms, error = %e, "tool failed");
            }
        }

        result.map(|r| (r, duration_ms))
    }

    pub fn has_tool(&self, tool_name: &str) -> bool {
        self.tools.contains_key(tool_name)
    }

    pub fn list_tools(&self) -> Vec<ToolInfo> {
        self.tools
            .values()
            .map(|t| ToolInfo {
                name: t.name().to_string(),
                description: t.description().to_string(),
                parameters: t.parameters_schema(),
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct ToolInfo {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}
