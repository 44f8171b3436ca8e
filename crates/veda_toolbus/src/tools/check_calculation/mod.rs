mod args;
mod error;

pub use args::CheckCalculationArgs;
pub use error::CheckCalculationError;

use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use veda_sandbox::{Binding, Sandbox, Value};

use crate::tools::{parse_tool_schema, Tool, ToolResult};

static SCHEMA: OnceLock<(&'static str, &'static str, JsonValue)> = OnceLock::new();

fn schema() -> &'static (&'static str, &'static str, JsonValue) {
    SCHEMA.get_or_init(|| parse_tool_schema(include_str!("schema.json")))
}

pub struct CheckCalculation {
    sandbox: Sandbox,
}

impl Default for CheckCalculation {
    fn default() -> Self {
        Self::new()
    }
}

impl CheckCalculation {
    pub fn new() -> Self {
        Self {
            sandbox: Sandbox::new(),
        }
    }

    fn run(&self, args: &CheckCalculationArgs) -> Result<Value, CheckCalculationError> {
        let binding: Binding = args
            .variables
            .iter()
            .map(|(name, raw)| {
                let value = if raw.fract() == 0.0 && raw.abs() < 9.0e15 {
                    Value::Int(*raw as i64)
                } else {
                    Value::Float(*raw)
                };
                (name.clone(), value)
            })
            .collect();

        let value = if args.program {
            self.sandbox.eval_program(&args.expression, &binding)?
        } else {
            self.sandbox.eval_expression(&args.expression, &binding)?
        };
        Ok(value)
    }
}

#[async_trait]
impl Tool for CheckCalculation {
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
        let args: CheckCalculationArgs = serde_json::from_value(args)
            .map_err(|e| CheckCalculationError::InvalidArgs(e.to_string()))?;
        let value = self.run(&args)?;

        let numeric = value.as_f64().ok();
        Ok(serde_json::json!({
            "value": value.to_string(),
            "numeric": numeric,
        }))
    }
}
