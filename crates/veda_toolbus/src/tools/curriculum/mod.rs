mod args;
mod error;

pub use args::CurriculumArgs;
pub use error::CurriculumError;

use std::sync::OnceLock;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::tools::{Tool, ToolResult};

/// Schema and catalog live in one file; the chapter list is static data
/// loaded once per process.
const CURRICULUM_JSON: &str = include_str!("curriculum.json");

#[derive(Debug, Deserialize)]
struct CurriculumFile {
    name: String,
    description: String,
    parameters: JsonValue,
    chapters: Vec<Chapter>,
}

#[derive(Debug, Clone, Deserialize, serde::Serialize)]
pub struct Chapter {
    pub chapter: String,
    pub weight_marks: u32,
    pub topics: Vec<String>,
}

struct Loaded {
    name: &'static str,
    description: &'static str,
    parameters: JsonValue,
    chapters: Vec<Chapter>,
}

static LOADED: OnceLock<Loaded> = OnceLock::new();

fn loaded() -> &'static Loaded {
    LOADED.get_or_init(|| {
        let raw: CurriculumFile =
            serde_json::from_str(CURRICULUM_JSON).expect("curriculum.json must be valid JSON");
        Loaded {
            name: Box::leak(raw.name.into_boxed_str()),
            description: Box::leak(raw.description.into_boxed_str()),
            parameters: raw.parameters,
            chapters: raw.chapters,
        }
    })
}

#[derive(Default)]
pub struct Curriculum;

impl Curriculum {
    pub fn new() -> Self {
        Self
    }

    /// Read-only view of the chapter catalog.
    pub fn chapters() -> &'static [Chapter] {
        &loaded().chapters
    }
}

#[async_trait]
impl Tool for Curriculum {
    fn name(&self) -> &'static str {
        loaded().name
    }

    fn description(&self) -> &'static str {
        loaded().description
    }

    fn parameters_schema(&self) -> JsonValue {
        loaded().parameters.clone()
    }

    async fn execute(&self, args: JsonValue) -> ToolResult {
        let args: CurriculumArgs = serde_json::from_value(args)
            .map_err(|e| CurriculumError::InvalidArgs(e.to_string()))?;

        let chapters = Self::chapters();
        let selected: Vec<&Chapter> = match &args.chapter {
            None => chapters.iter().collect(),
            Some(filter) => {
                let needle = filter.to_lowercase();
                let matched: Vec<&Chapter> = chapters
                    .iter()
                    .filter(|c| c.chapter.to_lowercase().contains(&needle))
                    .collect();
                if matched.is_empty() {
                    return Err(CurriculumError::NoMatch(filter.clone()).into());
                }
                matched
            }
        };

        Ok(serde_json::json!({
            "chapters": selected,
            "total_marks": selected.iter().map(|c| c.weight_marks).sum::<u32>(),
        }))
    }
}
