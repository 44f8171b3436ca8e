//! LLM-backed question generation. The model writes the scenario and picks
//! the numbers; every answer is computed by the sandbox.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use tracing::{debug, warn};

use veda_core::{Hint, Question, QuestionSource};
use veda_llms::{ChatMessage, GenerateRequest, Provider};
use veda_sandbox::{Binding, Sandbox, Value};

use crate::error::{EngineError, Result};
use crate::pattern::PatternEngine;
use crate::solver::{solver_for, ConceptSolver};

/// Retries after the first rejected variable set.
const MAX_VARIABLE_RETRIES: usize = 2;

/// Contextual signals threaded through from the conversation.
#[derive(Debug, Clone, Default)]
pub struct GenerationHint {
    pub language: Option<String>,
    pub prior_mistakes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct ScenarioPayload {
    scenario_text: String,
    variables: HashMap<String, f64>,
}

pub struct GenerativeEngine {
    provider: Arc<dyn Provider>,
    model: String,
    sandbox: Sandbox,
    /// Same-concept fallback when the model keeps proposing bad variables.
    fallback: Option<Arc<PatternEngine>>,
    llm_timeout: Duration,
}

impl GenerativeEngine {
    pub fn new(provider: Arc<dyn Provider>, model: impl Into<String>) -> Self {
        Self {
            provider,
            model: model.into(),
            sandbox: Sandbox::new(),
            fallback: None,
            llm_timeout: Duration::from_secs(30),
        }
    }

    pub fn with_fallback(mut self, pattern: Arc<PatternEngine>) -> Self {
        self.fallback = Some(pattern);
        self
    }

    pub fn with_llm_timeout(mut self, timeout: Duration) -> Self {
        self.llm_timeout = timeout;
        self
    }

    pub async fn generate(
        &self,
        concept: &str,
        marks: u32,
        difficulty: f64,
        hint: Option<&GenerationHint>,
    ) -> Result<Question> {
        let solver = solver_for(concept)
            .ok_or_else(|| EngineError::UnknownConcept(concept.to_string()))?;

        let (scenario_text, binding) = match self
            .acceptable_scenario(solver, marks, difficulty, hint)
            .await
        {
            Ok(found) => found,
            Err(e) => {
                if let Some(pattern) = &self.fallback {
                    warn!(concept, error = %e, "generative scenario rejected, falling back to pattern");
                    return pattern.generate_for_concept(concept, marks, difficulty);
                }
                return Err(e);
            }
        };

        // the authoritative answer, straight from the sandbox
        let answer_value = self.sandbox.eval_program(solver.solver, &binding)?;
        let final_answer = (solver.phrase)(&answer_value);

        let steps = self
            .solution_steps(solver, &scenario_text, &binding, &final_answer)
            .await;

        let diagram_code = if solver.wants_diagram {
            self.diagram_description(concept, &scenario_text).await
        } else {
            None
        };

        let mut question = Question::new(concept, marks, difficulty, QuestionSource::Ai)
            .with_text(scenario_text)
            .with_solution_steps(steps)
            .with_final_answer(final_answer)
            .with_hints(default_hints(solver));
        if let Some(code) = diagram_code {
            question = question.with_diagram_code(code);
        }
        Ok(question)
    }

    /// Ask for variables until they satisfy the concept's domain predicate,
    /// tightening the prompt after each rejection.
    async fn acceptable_scenario(
        &self,
        solver: &ConceptSolver,
        marks: u32,
        difficulty: f64,
        hint: Option<&GenerationHint>,
    ) -> Result<(String, Binding)> {
        let mut last_problem = String::new();
        for attempt in 0..=MAX_VARIABLE_RETRIES {
            let tightened = (attempt > 0).then_some(last_problem.as_str());
            let payload = match self
                .request_scenario(solver, marks, difficulty, hint, tightened)
                .await
            {
                Ok(p) => p,
                Err(e) => {
                    last_problem = e.to_string();
                    debug!(concept = solver.concept, attempt, error = %e, "scenario attempt failed");
                    continue;
                }
            };

            match self.check_domain(solver, &payload) {
                Ok(binding) => return Ok((payload.scenario_text, binding)),
                Err(problem) => {
                    debug!(concept = solver.concept, attempt, %problem, "variables outside domain");
                    last_problem = problem;
                }
            }
        }
        Err(EngineError::GenerationFailed(format!(
            "{}: {}",
            solver.concept, last_problem
        )))
    }

    async fn request_scenario(
        &self,
        solver: &ConceptSolver,
        marks: u32,
        difficulty: f64,
        hint: Option<&GenerationHint>,
        tightened: Option<&str>,
    ) -> Result<ScenarioPayload> {
        let variable_lines: String = solver
            .variables
            .iter()
            .map(|(name, description)| format!("- \"{}\": {}\n", name, description))
            .collect();

        let mut user_prompt = format!(
            "Write a short real-world scenario for a {}-mark question on {} \
             (difficulty {:.1} of 1). Respond with ONLY a JSON object:\n\
             {{\"scenario_text\": \"...\", \"variables\": {{...}}}}\n\
             The variables object must contain exactly these numeric fields:\n{}\
             Do not perform any calculation and do not state the answer.",
            marks, solver.concept, difficulty, variable_lines
        );
        if let Some(hint) = hint {
            if let Some(language) = &hint.language {
                user_prompt.push_str(&format!("\nWrite the scenario in {}.", language));
            }
            if !hint.prior_mistakes.is_empty() {
                user_prompt.push_str(&format!(
                    "\nThe student previously struggled with: {}.",
                    hint.prior_mistakes.join("; ")
                ));
            }
        }
        if let Some(problem) = tightened {
            user_prompt.push_str(&format!(
                "\nYour previous variables were rejected ({}). Choose simple values that satisfy: {}",
                problem, solver.domain
            ));
        }

        let request = GenerateRequest::new(
            self.model.as_str(),
            vec![
                ChatMessage::system(
                    "You write secondary-school mathematics scenarios. \
                     You only describe situations and pick input numbers; you never solve.",
                ),
                ChatMessage::user(user_prompt),
            ],
        )
        .with_temperature(0.8)
        .with_json_mode()
        .with_timeout(self.llm_timeout);

        let response = self
            .provider
            .generate(request)
            .await
            .map_err(|e| EngineError::Llm(e.to_string()))?;

        let json = extract_json_object(&response.text).ok_or_else(|| {
            EngineError::GenerationFailed("response carried no JSON object".to_string())
        })?;
        serde_json::from_str(json)
            .map_err(|e| EngineError::GenerationFailed(format!("bad scenario JSON: {}", e)))
    }

    /// All declared variables present and inside the concept's domain.
    fn check_domain(
        &self,
        solver: &ConceptSolver,
        payload: &ScenarioPayload,
    ) -> std::result::Result<Binding, String> {
        let mut binding = Binding::new();
        for (name, _) in solver.variables {
            let raw = payload
                .variables
                .get(*name)
                .ok_or_else(|| format!("missing variable {:?}", name))?;
            let value = if raw.fract() == 0.0 && raw.abs() < 9.0e15 {
                Value::Int(*raw as i64)
            } else {
                Value::Float(*raw)
            };
            binding.insert(name.to_string(), value);
        }

        match self.sandbox.eval_predicate(solver.domain, &binding) {
            Ok(true) => Ok(binding),
            Ok(false) => Err(format!("variables violate {:?}", solver.domain)),
            Err(e) => Err(e.to_string()),
        }
    }

    /// Second call: step-by-step narration around the known numbers. The
    /// computed answer is spliced in by us; the model's arithmetic is
    /// never trusted.
    async fn solution_steps(
        &self,
        solver: &ConceptSolver,
        scenario: &str,
        binding: &Binding,
        final_answer: &str,
    ) -> Vec<String> {
        let mut given: Vec<String> = binding
            .iter()
            .map(|(k, v)| format!("{} = {}", k, v))
            .collect();
        given.sort();

        let request = GenerateRequest::new(
            self.model.as_str(),
            vec![
                ChatMessage::system(
                    "You explain school mathematics step by step. \
                     Use the given values and the given final answer verbatim; \
                     do not recompute or change any number. \
                     Respond with one step per line, no numbering.",
                ),
                ChatMessage::user(format!(
                    "Scenario: {}\nGiven: {}\nFinal answer: {}\nWrite 2-4 short solution steps.",
                    scenario,
                    given.join(", "),
                    final_answer
                )),
            ],
        )
        .with_temperature(0.3)
        .with_timeout(self.llm_timeout);

        let mut steps = match self.provider.generate(request).await {
            Ok(response) => response
                .text
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(String::from)
                .collect(),
            Err(e) => {
                warn!(concept = solver.concept, error = %e, "steps call failed, using fallback narration");
                vec![format!("Given: {}.", given.join(", "))]
            }
        };

        // the spliced, verified closing line
        steps.push(format!("Answer: {}", final_answer));
        steps
    }

    /// Optional third call: an interactive-diagram description string.
    async fn diagram_description(&self, concept: &str, scenario: &str) -> Option<String> {
        let request = GenerateRequest::new(
            self.model.as_str(),
            vec![
                ChatMessage::system(
                    "You describe simple interactive geometry diagrams as short \
                     construction scripts, one primitive per line.",
                ),
                ChatMessage::user(format!(
                    "Describe a diagram for this {} scenario: {}",
                    concept, scenario
                )),
            ],
        )
        .with_temperature(0.2)
        .with_timeout(self.llm_timeout);

        match self.provider.generate(request).await {
            Ok(response) if !response.text.trim().is_empty() => {
                Some(response.text.trim().to_string())
            }
            Ok(_) => None,
            Err(e) => {
                debug!(concept, error = %e, "diagram call failed, skipping");
                None
            }
        }
    }
}

fn default_hints(solver: &ConceptSolver) -> Vec<Hint> {
    let names: Vec<&str> = solver.variables.iter().map(|(n, _)| *n).collect();
    vec![
        Hint::new(1, format!("List what is given: {}.", names.join(", "))),
        Hint::new(
            2,
            format!("Apply the standard result for {}.", solver.concept.replace('_', " ")),
        ),
    ]
}

/// Tolerate code fences and prose around the JSON object.
fn extract_json_object(text: &str) -> Option<&str> {
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}
