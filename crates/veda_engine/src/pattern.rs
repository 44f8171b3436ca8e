//! Deterministic question generation from the template catalog.

use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::{Arc, Mutex};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

use veda_core::{Hint, Question, QuestionSource};
use veda_sandbox::{Binding, Sandbox, SandboxError, Value};

use crate::catalog::PatternCatalog;
use crate::error::{EngineError, Result};
use crate::template::{PatternTemplate, VarSpec};

/// Resample attempts before a pattern is declared unsatisfiable.
const MAX_SAMPLE_ATTEMPTS: usize = 16;
/// Recently served binding fingerprints remembered per pattern.
const RECENT_BINDINGS: usize = 32;

pub struct PatternEngine {
    catalog: Arc<PatternCatalog>,
    sandbox: Sandbox,
    rng: Mutex<StdRng>,
    recent: Mutex<HashMap<String, VecDeque<u64>>>,
}

impl PatternEngine {
    pub fn new(catalog: Arc<PatternCatalog>) -> Self {
        Self {
            catalog,
            sandbox: Sandbox::new(),
            rng: Mutex::new(StdRng::from_entropy()),
            recent: Mutex::new(HashMap::new()),
        }
    }

    /// Deterministic sampling for tests.
    pub fn with_seed(catalog: Arc<PatternCatalog>, seed: u64) -> Self {
        Self {
            catalog,
            sandbox: Sandbox::new(),
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            recent: Mutex::new(HashMap::new()),
        }
    }

    pub fn catalog(&self) -> &PatternCatalog {
        &self.catalog
    }

    pub fn list(&self, concept: Option<&str>) -> Vec<&PatternTemplate> {
        self.catalog.list(concept)
    }

    /// Generate a question for a concept, picking the nearest template.
    pub fn generate_for_concept(
        &self,
        concept: &str,
        marks: u32,
        difficulty: f64,
    ) -> Result<Question> {
        let template = self
            .catalog
            .best_for(concept, marks, difficulty)
            .ok_or_else(|| EngineError::UnknownConcept(concept.to_string()))?;
        self.generate_from(template)
    }

    /// Generate a question from a specific pattern id.
    pub fn generate(&self, pattern_id: &str) -> Result<Question> {
        let template = self
            .catalog
            .get(pattern_id)
            .ok_or_else(|| EngineError::UnknownPattern(pattern_id.to_string()))?;
        self.generate_from(template)
    }

    fn generate_from(&self, template: &PatternTemplate) -> Result<Question> {
        for attempt in 0..MAX_SAMPLE_ATTEMPTS {
            let binding = match self.sample_binding(template) {
                Ok(b) => b,
                // domain errors during sampling mean this draw was bad,
                // not that the template is broken
                Err(EngineError::Sandbox(SandboxError::DomainError(_))) => continue,
                Err(e) => return Err(e),
            };

            if !self.rules_hold(template, &binding)? {
                continue;
            }

            if self.recently_served(&template.pattern_id, &binding) {
                debug!(
                    pattern = %template.pattern_id,
                    attempt,
                    "binding collision, resampling"
                );
                continue;
            }

            return self.render_question(template, &binding);
        }

        Err(EngineError::PatternUnsatisfiable(
            template.pattern_id.clone(),
        ))
    }

    /// Sample every variable in schema order; `calculated` specs run in the
    /// sandbox against the binding built so far.
    fn sample_binding(&self, template: &PatternTemplate) -> Result<Binding> {
        let mut binding = Binding::new();
        for var in &template.variables {
            let value = match &var.spec {
                VarSpec::Int { min, max } => {
                    let mut rng = self.rng.lock().expect("rng mutex poisoned");
                    Value::Int(rng.gen_range(*min..=*max))
                }
                VarSpec::Real { min, max, precision } => {
                    let raw = {
                        let mut rng = self.rng.lock().expect("rng mutex poisoned");
                        rng.gen_range(*min..=*max)
                    };
                    let factor = 10f64.powi(*precision as i32);
                    Value::Float((raw * factor).round() / factor)
                }
                VarSpec::Choice { options } => {
                    let mut rng = self.rng.lock().expect("rng mutex poisoned");
                    let pick = options[rng.gen_range(0..options.len())];
                    if pick.fract() == 0.0 {
                        Value::Int(pick as i64)
                    } else {
                        Value::Float(pick)
                    }
                }
                VarSpec::Calculated { expression } => {
                    self.sandbox.eval_expression(expression, &binding)?
                }
            };
            binding.insert(var.name.clone(), value);
        }
        Ok(binding)
    }

    fn rules_hold(&self, template: &PatternTemplate, binding: &Binding) -> Result<bool> {
        for rule in &template.validation_rules {
            match self.sandbox.eval_predicate(rule, binding) {
                Ok(true) => {}
                Ok(false) => return Ok(false),
                Err(SandboxError::DomainError(_)) => return Ok(false),
                Err(e) => return Err(e.into()),
            }
        }
        Ok(true)
    }

    /// Uniqueness guarantee: remember recent binding fingerprints per
    /// pattern and resample on collision.
    fn recently_served(&self, pattern_id: &str, binding: &Binding) -> bool {
        let fingerprint = fingerprint(binding);
        let mut recent = self.recent.lock().expect("recent mutex poisoned");
        let entry = recent.entry(pattern_id.to_string()).or_default();
        if entry.contains(&fingerprint) {
            return true;
        }
        entry.push_back(fingerprint);
        if entry.len() > RECENT_BINDINGS {
            entry.pop_front();
        }
        false
    }

    fn render_question(&self, template: &PatternTemplate, binding: &Binding) -> Result<Question> {
        let text = template.render(&template.text_template, binding)?;
        let steps = template
            .solution_template
            .iter()
            .map(|s| template.render(s, binding))
            .collect::<Result<Vec<_>>>()?;

        let answer_value = template.render(&template.answer_template, binding)?;
        let final_answer = match &template.answer_text {
            Some(phrasing) => template.render(phrasing, binding)?,
            None => answer_value,
        };

        let hints = template
            .hints
            .iter()
            .enumerate()
            .map(|(i, h)| template.render(h, binding).map(|t| Hint::new(i as u32 + 1, t)))
            .collect::<Result<Vec<_>>>()?;

        Ok(Question::new(
            template.concept.as_str(),
            template.marks,
            template.difficulty,
            QuestionSource::Pattern,
        )
        .with_text(text)
        .with_solution_steps(steps)
        .with_final_answer(final_answer)
        .with_hints(hints))
    }
}

fn fingerprint(binding: &Binding) -> u64 {
    let mut entries: Vec<(&String, String)> =
        binding.iter().map(|(k, v)| (k, v.to_string())).collect();
    entries.sort();
    let mut hasher = DefaultHasher::new();
    entries.hash(&mut hasher);
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::template::TemplateVar;

    fn engine() -> PatternEngine {
        let catalog = Arc::new(PatternCatalog::builtin().unwrap());
        PatternEngine::with_seed(catalog, 42)
    }

    #[test]
    fn test_generate_known_pattern() {
        let engine = engine();
        let q = engine.generate("quad_nature_distinct_v1").unwrap();
        assert_eq!(q.source, QuestionSource::Pattern);
        assert_eq!(q.concept, "quadratic_nature_of_roots");
        assert!(q.final_answer.contains("real and distinct"));
        assert!(!q.question_id.is_empty());
        assert_eq!(q.hints.len(), 3);
        assert_eq!(q.hints[0].stage, 1);
    }

    #[test]
    fn test_unknown_pattern() {
        let err = engine().generate("does_not_exist").unwrap_err();
        assert!(matches!(err, EngineError::UnknownPattern(_)));
    }

    #[test]
    fn test_generate_for_concept() {
        let engine = engine();
        let q = engine
            .generate_for_concept("arithmetic_progressions", 2, 0.3)
            .unwrap();
        assert_eq!(q.concept, "arithmetic_progressions");
        assert!(!q.final_answer.is_empty());
    }

    #[test]
    fn test_unknown_concept() {
        let err = engine()
            .generate_for_concept("calculus", 2, 0.5)
            .unwrap_err();
        assert!(matches!(err, EngineError::UnknownConcept(_)));
    }

    #[test]
    fn test_answer_matches_sandbox_for_every_builtin_pattern() {
        // the core invariant: the rendered answer value equals a fresh
        // sandbox evaluation of the answer placeholder's variable
        let catalog = Arc::new(PatternCatalog::builtin().unwrap());
        let engine = PatternEngine::with_seed(Arc::clone(&catalog), 7);
        for template in catalog.list(None) {
            for _ in 0..5 {
                let binding = engine.sample_binding(template).unwrap();
                if !engine.rules_hold(template, &binding).unwrap() {
                    continue;
                }
                let rendered = template
                    .render(&template.answer_template, &binding)
                    .unwrap();
                // answer templates are a single placeholder; the rendered
                // text must be exactly the bound value
                let name = crate::template::placeholders(&template.answer_template)
                    .into_iter()
                    .next()
                    .expect("answer template has a placeholder");
                assert_eq!(rendered, binding[&name].to_string(), "{}", template.pattern_id);
            }
        }
    }

    #[test]
    fn test_discriminant_literal_values() {
        // (a, b, c) = (1, -3, 2) -> 1, never -7
        let sandbox = Sandbox::new();
        let mut binding = Binding::new();
        binding.insert("a".to_string(), Value::Int(1));
        binding.insert("b".to_string(), Value::Int(-3));
        binding.insert("c".to_string(), Value::Int(2));
        let d = sandbox
            .eval_expression("(b)**2 - 4*a*c", &binding)
            .unwrap();
        assert_eq!(d, Value::Int(1));

        // (a, b, c) = (1, 10, -7) -> 128, the "real and distinct" case
        binding.insert("b".to_string(), Value::Int(10));
        binding.insert("c".to_string(), Value::Int(-7));
        let d = sandbox
            .eval_expression("(b)**2 - 4*a*c", &binding)
            .unwrap();
        assert_eq!(d, Value::Int(128));

        let catalog = PatternCatalog::builtin().unwrap();
        let template = catalog.get("quad_nature_distinct_v1").unwrap();
        binding.insert("d".to_string(), d);
        let answer = template
            .render(template.answer_text.as_ref().unwrap(), &binding)
            .unwrap();
        assert_eq!(answer, "real and distinct (D = 128)");
    }

    #[test]
    fn test_consecutive_bindings_differ() {
        let engine = engine();
        let q1 = engine.generate("ap_nth_term_v1").unwrap();
        let q2 = engine.generate("ap_nth_term_v1").unwrap();
        // the recent-binding set forces a different draw
        assert_ne!(q1.text, q2.text);
    }

    #[test]
    fn test_unsatisfiable_pattern_fails_cleanly() {
        let template = PatternTemplate {
            pattern_id: "impossible".to_string(),
            concept: "test".to_string(),
            marks: 1,
            difficulty: 0.5,
            text_template: "{a}".to_string(),
            variables: vec![TemplateVar {
                name: "a".to_string(),
                spec: VarSpec::Int { min: 1, max: 10 },
            }],
            solution_template: vec![],
            answer_template: "{a}".to_string(),
            answer_text: None,
            validation_rules: vec!["a > 100".to_string()],
            hints: vec![],
        };
        let catalog = Arc::new(PatternCatalog::from_templates(vec![template]).unwrap());
        let engine = PatternEngine::with_seed(catalog, 1);
        let err = engine.generate("impossible").unwrap_err();
        assert!(matches!(err, EngineError::PatternUnsatisfiable(_)));
    }

    #[test]
    fn test_seeded_engines_agree() {
        let catalog = Arc::new(PatternCatalog::builtin().unwrap());
        let a = PatternEngine::with_seed(Arc::clone(&catalog), 99);
        let b = PatternEngine::with_seed(catalog, 99);
        let qa = a.generate("ap_sum_v1").unwrap();
        let qb = b.generate("ap_sum_v1").unwrap();
        assert_eq!(qa.text, qb.text);
        assert_eq!(qa.final_answer, qb.final_answer);
    }
}
