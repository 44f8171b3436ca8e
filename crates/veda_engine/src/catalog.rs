//! The read-only template catalog, loaded and validated once at startup.

use std::collections::HashMap;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::error::{EngineError, Result};
use crate::template::PatternTemplate;

/// Built-in template library.
const DEFAULT_PATTERNS: &str = include_str!("data/patterns.json");

#[derive(Debug, Deserialize)]
struct CatalogFile {
    patterns: Vec<PatternTemplate>,
}

#[derive(Debug)]
pub struct PatternCatalog {
    templates: Vec<PatternTemplate>,
    by_id: HashMap<String, usize>,
}

impl PatternCatalog {
    /// Load the embedded catalog.
    pub fn builtin() -> Result<Self> {
        Self::from_json(DEFAULT_PATTERNS)
    }

    /// Load a catalog from a JSON file on disk.
    pub fn from_path(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| EngineError::Catalog(format!("read {}: {}", path.display(), e)))?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self> {
        let file: CatalogFile =
            serde_json::from_str(raw).map_err(|e| EngineError::Catalog(e.to_string()))?;
        Self::from_templates(file.patterns)
    }

    /// Validate every template; any failure aborts the load.
    pub fn from_templates(templates: Vec<PatternTemplate>) -> Result<Self> {
        let mut by_id = HashMap::with_capacity(templates.len());
        for (idx, template) in templates.iter().enumerate() {
            template.validate()?;
            if by_id.insert(template.pattern_id.clone(), idx).is_some() {
                return Err(EngineError::Catalog(format!(
                    "duplicate pattern id {:?}",
                    template.pattern_id
                )));
            }
        }
        info!(count = templates.len(), "pattern catalog loaded");
        Ok(Self { templates, by_id })
    }

    pub fn get(&self, pattern_id: &str) -> Option<&PatternTemplate> {
        self.by_id.get(pattern_id).map(|&idx| &self.templates[idx])
    }

    /// All templates, optionally restricted to one concept.
    pub fn list(&self, concept: Option<&str>) -> Vec<&PatternTemplate> {
        self.templates
            .iter()
            .filter(|t| concept.is_none_or(|c| t.concept == c))
            .collect()
    }

    /// Concept lookup narrowed by marks and a difficulty band.
    pub fn list_filtered(
        &self,
        concept: &str,
        marks: Option<u32>,
        difficulty: Option<f64>,
    ) -> Vec<&PatternTemplate> {
        self.templates
            .iter()
            .filter(|t| t.concept == concept)
            .filter(|t| marks.is_none_or(|m| t.marks == m))
            .filter(|t| difficulty.is_none_or(|d| (t.difficulty - d).abs() <= 0.25))
            .collect()
    }

    /// The template closest in difficulty for a concept, used when callers
    /// ask by concept rather than by pattern id.
    pub fn best_for(&self, concept: &str, marks: u32, difficulty: f64) -> Option<&PatternTemplate> {
        let mut candidates = self.list_filtered(concept, Some(marks), None);
        if candidates.is_empty() {
            candidates = self.list(Some(concept));
        }
        candidates.into_iter().min_by(|a, b| {
            let da = (a.difficulty - difficulty).abs();
            let db = (b.difficulty - difficulty).abs();
            da.partial_cmp(&db).unwrap_or(std::cmp::Ordering::Equal)
        })
    }

    pub fn len(&self) -> usize {
        self.templates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn concepts(&self) -> Vec<&str> {
        let mut concepts: Vec<&str> = self.templates.iter().map(|t| t.concept.as_str()).collect();
        concepts.sort_unstable();
        concepts.dedup();
        concepts
    }
}
