use async_trait::async_trait;

use crate::error::Result;
use crate::types::{GenerateRequest, GenerateResponse, GenerateStream};

/// A text-completion backend. Implementations are shared behind `Arc` and
/// must be safe to call concurrently.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identifier, e.g. "openai".
    fn provider_id(&self) -> &str;

    /// One-shot completion.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Streaming completion.
    async fn stream(&self, request: GenerateRequest) -> Result<GenerateStream>;
}
