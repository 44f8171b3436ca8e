mod args;
mod error;

pub use args::DiagramArgs;
pub use error::DiagramError;

use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use veda_llms::{ChatMessage, GenerateRequest, Provider};

use crate::tools::{parse_tool_schema, Tool, ToolResult};

static SCHEMA: OnceLock<(&'static str, &'static str, JsonValue)> = OnceLock::new();

fn schema() -> &'static (&'static str, &'static str, JsonValue) {
    SCHEMA.get_or_init(|| parse_tool_schema(include_str!("schema.json")))
}

pub struct Diagram {
    provider: Arc<dyn Provider>,
    model: String,
}

impl Diagram {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
        }
    }
}

#[async_trait]
impl Tool for Diagram {
    fn name(&self) -> &'static str {
        schema().0
    }

    fn description(&self) -> &'static str {
        schema().1
    }

    fn parameters_schema(&self) -> JsonValue {
        schema().2.clone()
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let args: DiagramArgs =
            serde_json::from_value(args).map_err(|e| DiagramError::InvalidArgs(e.to_string()))?;

        let request = GenerateRequest::new(
            self.model.as_str(),
            vec![
                ChatMessage::system(
                    "You describe simple interactive geometry diagrams as short \
                     construction scripts, one primitive per line. No prose.",
                ),
                ChatMessage::user(format!(
                    "Concept: {}\nScenario: {}",
                    args.concept, args.scenario
                )),
            ],
        )
        .with_temperature(0.2);

        let response = self
            .provider
            .generate(request)
            .await
            .map_err(|e| DiagramError::Generation(e.to_string()))?;

        let code = response.text.trim().to_string();
        if code.is_empty() {
            return Err(DiagramError::Generation("empty diagram".to_string()).into());
        }

        Ok(serde_json::json!({ "diagram_code": code }))
    }
}
