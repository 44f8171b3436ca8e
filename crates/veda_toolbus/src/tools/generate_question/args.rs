use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GenerateQuestionArgs {
    pub concept: String,

    #[serde(default = "default_marks")]
    pub marks: u32,

    #[serde(default = "default_difficulty")]
    pub difficulty: f64,

    #[serde(default)]
    pub force_source: Option<String>,
}

fn default_marks() -> u32 {
    2
}

fn default_difficulty() -> f64 {
    0.5
}

impl GenerateQuestionArgs {
    pub fn new(concept: impl Into<String>) -> Self {
        Self {
            concept: concept.into(),
            marks: default_marks(),
            difficulty: default_difficulty(),
            force_source: None,
        }
    }

    pub fn with_marks(mut self, marks: u32) -> Self {
        self.marks = marks;
        self
    }

    pub fn with_difficulty(mut self, difficulty: f64) -> Self {
        self.difficulty = difficulty;
        self
    }
}
