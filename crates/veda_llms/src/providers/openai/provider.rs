//! OpenAI-compatible provider implementation. Works against api.openai.com
//! and any server that speaks the same chat-completions protocol.

use async_trait::async_trait;
use reqwest::Client;
use reqwest_eventsource::EventSource;

use super::convert::{from_openai_response, to_openai_request};
use super::stream::create_stream;
use super::types::{OpenAiConfig, OpenAiResponse};
use crate::error::{Error, Result};
use crate::provider::Provider;
use crate::types::{GenerateRequest, GenerateResponse, GenerateStream};

#[derive(Debug)]
pub struct OpenAiProvider {
    config: OpenAiConfig,
    client: Client,
}

impl OpenAiProvider {
    /// Environment variable for the API key.
    pub const API_KEY_ENV: &'static str = "OPENAI_API_KEY";
    /// Optional base-URL override for self-hosted compatible servers.
    pub const BASE_URL_ENV: &'static str = "OPENAI_BASE_URL";

    pub fn new(config: OpenAiConfig) -> Result<Self> {
        if config.api_key.is_empty() {
            return Err(Error::MissingApiKey("openai".to_string()));
        }

        let client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(config.connect_timeout_secs))
            .build()?;
        Ok(Self { config, client })
    }

    pub fn from_env() -> Result<Self> {
        let api_key = std::env::var(Self::API_KEY_ENV)
            .map_err(|_| Error::MissingApiKey("openai".to_string()))?;

        let mut config = OpenAiConfig::new(api_key);
        if let Ok(base_url) = std::env::var(Self::BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }

        Self::new(config)
    }

    fn endpoint(&self) -> String {
        format!("{}chat/completions", self.config.base_url)
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
        let wire_request = to_openai_request(&request, false)?;

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&wire_request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Timeout
            } else {
                Error::from(e)
            }
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(Error::provider_error(format!(
                "API error {}: {}",
                status, error_text
            )));
        }

        let wire_response: OpenAiResponse = response.json().await?;
        from_openai_response(wire_response)
    }

    async fn stream(&self, request: GenerateRequest) -> Result<GenerateStream> {
        let wire_request = to_openai_request(&request, true)?;

        let mut builder = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&wire_request);
        if let Some(timeout) = request.timeout {
            builder = builder.timeout(timeout);
        }

        let event_source = EventSource::new(builder)
            .map_err(|e| Error::stream_error(format!("failed to create event source: {}", e)))?;

        create_stream(event_source).await
    }
}
