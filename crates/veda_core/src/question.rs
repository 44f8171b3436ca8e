use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionSource {
    Pattern,
    Ai,
}

impl QuestionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionSource::Pattern => "pattern",
            QuestionSource::Ai => "ai",
        }
    }
}

impl std::str::FromStr for QuestionSource {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pattern" => Ok(QuestionSource::Pattern),
            "ai" => Ok(QuestionSource::Ai),
            _ => Err(()),
        }
    }
}

/// A staged hint. Stages advance one step per wrong attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hint {
    pub stage: u32,
    pub text: String,
}

impl Hint {
    pub fn new(stage: u32, text: impl Into<String>) -> Self {
        Self {
            stage,
            text: text.into(),
        }
    }
}

/// A generated question. `final_answer` is always the text form of a
/// sandbox-computed value; the LLM never writes it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    pub question_id: String,
    pub concept: String,
    pub marks: u32,
    pub difficulty: f64,
    pub source: QuestionSource,
    pub text: String,
    pub solution_steps: Vec<String>,
    pub final_answer: String,
    pub hints: Vec<Hint>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub diagram_code: Option<String>,
    pub generated_at: DateTime<Utc>,
}

impl Question {
    pub fn new(concept: impl Into<String>, marks: u32, difficulty: f64, source: QuestionSource) -> Self {
        Self {
            question_id: uuid::Uuid::new_v4().to_string(),
            concept: concept.into(),
            marks,
            difficulty: difficulty.clamp(0.0, 1.0),
            source,
            text: String::new(),
            solution_steps: Vec::new(),
            final_answer: String::new(),
            hints: Vec::new(),
            diagram_code: None,
            generated_at: Utc::now(),
        }
    }

    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    pub fn with_solution_steps(mut self, steps: Vec<String>) -> Self {
        self.solution_steps = steps;
        self
    }

    pub fn with_final_answer(mut self, answer: impl Into<String>) -> Self {
        self.final_answer = answer.into();
        self
    }

    pub fn with_hints(mut self, hints: Vec<Hint>) -> Self {
        self.hints = hints;
        self
    }

    pub fn with_diagram_code(mut self, code: impl Into<String>) -> Self {
        self.diagram_code = Some(code.into());
        self
    }

    /// Hint for the given wrong-attempt count, saturating at the last stage.
    pub fn hint_for_attempt(&self, wrong_attempts: u32) -> Option<&Hint> {
        if self.hints.is_empty() {
            return None;
        }
        let idx = (wrong_attempts as usize).min(self.hints.len() - 1);
        self.hints.get(idx)
    }
}
