//! Source selection between the pattern and generative engines.

use std::collections::HashSet;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::Deserialize;
use tracing::{info, warn};

use veda_core::{Question, QuestionSource};

use crate::error::{EngineError, Result};
use crate::generative::{GenerationHint, GenerativeEngine};
use crate::pattern::PatternEngine;

const DEFAULT_PREFERENCES: &str = include_str!("data/source_preferences.json");

/// Formula-based concepts prefer templates; contextual word problems and
/// diagram-heavy geometry prefer the generative engine. A concept in both
/// lists (or neither) falls through to the configured ratio.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SourcePreferences {
    #[serde(default)]
    pattern: HashSet<String>,
    #[serde(default)]
    ai: HashSet<String>,
}

impl SourcePreferences {
    pub fn builtin() -> Self {
        serde_json::from_str(DEFAULT_PREFERENCES).unwrap_or_default()
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Catalog(format!("read {}: {}", path.display(), e)))?;
        serde_json::from_str(&raw).map_err(|e| EngineError::Catalog(e.to_string()))
    }

    /// The preferred source when the concept appears in exactly one list.
    pub fn preference(&self, concept: &str) -> Option<QuestionSource> {
        match (self.pattern.contains(concept), self.ai.contains(concept)) {
            (true, false) => Some(QuestionSource::Pattern),
            (false, true) => Some(QuestionSource::Ai),
            _ => None,
        }
    }
}

/// Cumulative counters; never persisted.
#[derive(Debug, Default)]
struct Counters {
    pattern_count: AtomicU64,
    ai_count: AtomicU64,
    failures: AtomicU64,
    last_latency_ms: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
pub struct EngineStats {
    pub pattern_count: u64,
    pub ai_count: u64,
    pub failures: u64,
    pub last_latency_ms: u64,
}

pub struct HybridOrchestrator {
    pattern: Arc<PatternEngine>,
    generative: Arc<GenerativeEngine>,
    preferences: SourcePreferences,
    ai_ratio: f64,
    rng: Mutex<StdRng>,
    counters: Counters,
}

impl HybridOrchestrator {
    pub fn new(pattern: Arc<PatternEngine>, generative: Arc<GenerativeEngine>) -> Self {
        Self {
            pattern,
            generative,
            preferences: SourcePreferences::builtin(),
            ai_ratio: 0.5,
            rng: Mutex::new(StdRng::from_entropy()),
            counters: Counters::default(),
        }
    }

    pub fn with_preferences(mut self, preferences: SourcePreferences) -> Self {
        self.preferences = preferences;
        self
    }

    pub fn with_ai_ratio(mut self, ai_ratio: f64) -> Self {
        self.ai_ratio = ai_ratio.clamp(0.0, 1.0);
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = Mutex::new(StdRng::seed_from_u64(seed));
        self
    }

    pub async fn generate(
        &self,
        concept: &str,
        marks: u32,
        difficulty: f64,
        force_source: Option<QuestionSource>,
        hint: Option<&GenerationHint>,
    ) -> Result<Question> {
        let start = Instant::now();
        let result = self
            .generate_inner(concept, marks, difficulty, force_source, hint)
            .await;
        self.counters
            .last_latency_ms
            .store(start.elapsed().as_millis() as u64, Ordering::Relaxed);

        match &result {
            Ok(question) => {
                let counter = match question.source {
                    QuestionSource::Pattern => &self.counters.pattern_count,
                    QuestionSource::Ai => &self.counters.ai_count,
                };
                counter.fetch_add(1, Ordering::Relaxed);
                info!(
                    concept,
                    source = question.source.as_str(),
                    latency_ms = start.elapsed().as_millis() as u64,
                    "question generated"
                );
            }
            Err(e) => {
                self.counters.failures.fetch_add(1, Ordering::Relaxed);
                warn!(concept, error = %e, "question generation failed");
            }
        }
        result
    }

    async fn generate_inner(
        &self,
        concept: &str,
        marks: u32,
        difficulty: f64,
        force_source: Option<QuestionSource>,
        hint: Option<&GenerationHint>,
    ) -> Result<Question> {
        // a forced source is honored without fallback
        if let Some(source) = force_source {
            return self.try_source(source, concept, marks, difficulty, hint).await;
        }

        let preferred = self
            .preferences
            .preference(concept)
            .unwrap_or_else(|| self.coin_flip());

        match self
            .try_source(preferred, concept, marks, difficulty, hint)
            .await
        {
            Ok(question) => Ok(question),
            Err(preferred_error) => {
                let other = match preferred {
                    QuestionSource::Pattern => QuestionSource::Ai,
                    QuestionSource::Ai => QuestionSource::Pattern,
                };
                warn!(concept, from = preferred.as_str(), to = other.as_str(),
                      error = %preferred_error, "source failed, trying the other");
                match self.try_source(other, concept, marks, difficulty, hint).await {
                    Ok(question) => Ok(question),
                    // both failed: report the preferred source's error
                    Err(_) => Err(preferred_error),
                }
            }
        }
    }

    async fn try_source(
        &self,
        source: QuestionSource,
        concept: &str,
        marks: u32,
        difficulty: f64,
        hint: Option<&GenerationHint>,
    ) -> Result<Question> {
        match source {
            QuestionSource::Pattern => self.pattern.generate_for_concept(concept, marks, difficulty),
            QuestionSource::Ai => {
                self.generative
                    .generate(concept, marks, difficulty, hint)
                    .await
            }
        }
    }

    fn coin_flip(&self) -> QuestionSource {
        let draw: f64 = self.rng.lock().expect("rng mutex poisoned").gen();
        if draw < self.ai_ratio {
            QuestionSource::Ai
        } else {
            QuestionSource::Pattern
        }
    }

    pub fn get_stats(&self) -> EngineStats {
        EngineStats {
            pattern_count: self.counters.pattern_count.load(Ordering::Relaxed),
            ai_count: self.counters.ai_count.load(Ordering::Relaxed),
            failures: self.counters.failures.load(Ordering::Relaxed),
            last_latency_ms: self.counters.last_latency_ms.load(Ordering::Relaxed),
        }
    }
}
