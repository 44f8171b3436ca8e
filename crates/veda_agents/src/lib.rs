//! veda-agents — the five role-specialized tutoring agents, the fixed
//! deterministic handlers, the supervisor that routes each turn, and
//! answer grading.
//!
//! Agents are configuration, not state: `{system_prompt, allowed_tools,
//! temperature, token_budget, persona}`. The runner owns the loop that
//! turns a config plus a `TurnState` into an LLM conversation.

pub mod config;
pub mod fixed;
pub mod grading;
pub mod supervisor;

pub use config::{roster, AgentConfig};
pub use fixed::{fixed_reply, is_closure, is_greeting, normalize};
pub use grading::{canonical_text, grade, grade_with_hint, Grade};
pub use supervisor::Supervisor;
