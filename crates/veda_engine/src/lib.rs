//! veda-engine — hybrid question generation.
//!
//! Two generators behind one orchestrator:
//! - **PatternEngine** renders parameterized templates from a read-only
//!   catalog, sampling variables and deriving values in the sandbox.
//! - **GenerativeEngine** asks an LLM for a scenario and input numbers,
//!   then computes the answer in the sandbox. The model never does math.
//!
//! `HybridOrchestrator` splits traffic by per-concept preference and a
//! configured ratio, with cross-source fallback.

pub mod catalog;
pub mod error;
pub mod examples;
pub mod generative;
pub mod hybrid;
pub mod pattern;
pub mod solver;
pub mod template;

pub use catalog::PatternCatalog;
pub use error::{EngineError, Result};
pub use examples::{example_for, example_for_text, WorkedExample};
pub use generative::{GenerationHint, GenerativeEngine};
pub use hybrid::{EngineStats, HybridOrchestrator, SourcePreferences};
pub use pattern::PatternEngine;
pub use solver::{solver_for, supported_concepts, ConceptSolver};
pub use template::{PatternTemplate, TemplateVar, VarSpec};
