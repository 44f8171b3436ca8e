mod args;
mod error;

pub use args::GenerateQuestionArgs;
pub use error::GenerateQuestionError;

use std::sync::Arc;
use std::sync::OnceLock;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use veda_core::QuestionSource;
use veda_engine::{GenerationHint, HybridOrchestrator};

use crate::tools::{parse_tool_schema, Tool, ToolResult};

static SCHEMA: OnceLock<(&'static str, &'static str, JsonValue)> = OnceLock::new();

fn schema() -> &'static (&'static str, &'static str, JsonValue) {
    SCHEMA.get_or_init(|| parse_tool_schema(include_str!("schema.json")))
}

pub struct GenerateQuestion {
    orchestrator: Arc<HybridOrchestrator>,
}

impl GenerateQuestion {
    pub fn new(orchestrator: Arc<HybridOrchestrator>) -> Self {
        Self { orchestrator }
    }
}

#[async_trait]
impl Tool for GenerateQuestion {
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
        let args: GenerateQuestionArgs = serde_json::from_value(args)
            .map_err(|e| GenerateQuestionError::InvalidArgs(e.to_string()))?;

        let force_source = match &args.force_source {
            None => None,
            Some(raw) => Some(
                raw.parse::<QuestionSource>()
                    .map_err(|_| GenerateQuestionError::UnknownSource(raw.clone()))?,
            ),
        };

        let hint = GenerationHint::default();
        let question = self
            .orchestrator
            .generate(
                &args.concept,
                args.marks,
                args.difficulty.clamp(0.0, 1.0),
                force_source,
                Some(&hint),
            )
            .await
            .map_err(GenerateQuestionError::Generation)?;

        Ok(serde_json::to_value(&question)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use veda_engine::{GenerativeEngine, PatternCatalog, PatternEngine};
    use veda_llms::{
        GenerateRequest, GenerateResponse, GenerateStream, Provider, Result as LlmResult,
    };

    struct DownProvider;

    #[async_trait]
    impl Provider for DownProvider {
        fn provider_id(&self) -> &str {
            "down"
        }

        async fn generate(&self, _request: GenerateRequest) -> LlmResult<GenerateResponse> {
            Err(veda_llms::Error::provider_error("down"))
        }

        async fn stream(&self, _request: GenerateRequest) -> LlmResult<GenerateStream> {
            Err(veda_llms::Error::provider_error("down"))
        }
    }

    fn tool() -> GenerateQuestion {
        let catalog = Arc::new(PatternCatalog::builtin().unwrap());
        let pattern = Arc::new(PatternEngine::with_seed(catalog, 21));
        let generative = Arc::new(GenerativeEngine::new(Arc::new(DownProvider), "m"));
        let orchestrator =
            Arc::new(HybridOrchestrator::new(pattern, generative).with_seed(2));
        GenerateQuestion::new(orchestrator)
    }

    #[tokio::test]
    async fn test_generate_pattern_question() {
        let tool = tool();
        let result = tool
            .execute(serde_json::json!({
                "concept": "quadratic_nature_of_roots",
                "marks": 2,
                "difficulty": 0.4,
                "force_source": "pattern"
            }))
            .await
            .unwrap();
        assert_eq!(result["source"], "pattern");
        assert!(!result["final_answer"].as_str().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_defaults_applied() {
        let tool = tool();
        let result = tool
            .execute(serde_json::json!({"concept": "arithmetic_progressions"}))
            .await
            .unwrap();
        assert_eq!(result["marks"], 2);
    }

    #[tokio::test]
    async fn test_unknown_source_rejected() {
        let tool = tool();
        let err = tool
            .execute(serde_json::json!({
                "concept": "polynomials",
                "force_source": "oracle"
            }))
            .await
            .unwrap_err();
        assert!(err.to_string().contains("unknown source"));
    }

    #[test]
    fn test_schema_loads() {
        let tool = tool();
        assert_eq!(tool.name(), "generate_question");
        assert!(tool.description().contains("practice question"));
    }
}
