pub mod check_calculation;
pub mod curriculum;
pub mod diagram;
pub mod generate_question;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

#[derive(Deserialize)]
pub(crate) struct ToolSchemaJson {
    pub name: String,
    pub description: String,
    pub parameters: JsonValue,
}

/// Parse a tool schema JSON (name, description, parameters) and leak
/// name/description to 'static. Each tool has its own `OnceLock` and calls
/// this with `include_str!("schema.json")`.
pub(crate) fn parse_tool_schema(json: &'static str) -> (&'static str, &'static str, JsonValue) {
    let raw: ToolSchemaJson =
        serde_json::from_str(json).expect("tool schema.json must be valid JSON");
    (
        Box::leak(raw.name.into_boxed_str()),
        Box::leak(raw.description.into_boxed_str()),
        raw.parameters,
    )
}

pub use check_calculation::{CheckCalculation, CheckCalculationArgs, CheckCalculationError};
pub use curriculum::{Curriculum, CurriculumArgs, CurriculumError};
pub use diagram::{Diagram, DiagramArgs, DiagramError};
pub use generate_question::{GenerateQuestion, GenerateQuestionArgs, GenerateQuestionError};

pub type ToolResult = anyhow::Result<JsonValue>;

#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &'static str;
    fn description(&self) -> &'static str;
    fn parameters_schema(&self) -> JsonValue;
    async fn execute(&self, args: JsonValue) -> ToolResult;
}
