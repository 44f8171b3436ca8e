//! veda-llms — provider-agnostic AI completions SDK with streaming support.
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               ProviderRegistry               │
//! │   HashMap<String, Arc<dyn Provider>>         │
//! │                     │                        │
//! │          ┌──────────┴──────────┐             │
//! │          ▼                     ▼             │
//! │   ┌─────────────┐       ┌──────────┐         │
//! │   │   OpenAI-   │       │ (future) │         │
//! │   │ compatible  │       │          │         │
//! │   └─────────────┘       └──────────┘         │
//! └──────────────────────────────────────────────┘
//! ```
//!
//! Tests construct their own stub `Provider` implementations; nothing in
//! this crate talks to the network unless a real provider is registered.

pub mod error;
pub mod provider;
pub mod providers;
pub mod types;

// Re-export core abstractions
pub use error::{Error, Result};
pub use provider::{Provider, ProviderRegistry};

// Re-export provider implementations
pub use providers::{OpenAiConfig, OpenAiProvider};

// Re-export commonly used types
pub use types::{
    ChatMessage, FinishReason, GenerateRequest, GenerateResponse, GenerateStream, Role,
    StreamEvent, ToolCall, ToolSpec, Usage,
};
