// src/providers/ollama.rs

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Instant;

use crate::config::OllamaConfig;
use crate::errors::{Result, ServiceError};
use crate::providers::{ExplanationRequest, LlmProvider};
use crate::stream;

/// A provider for interacting with local Ollama models over the streaming generate API.
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

#[derive(Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

impl OllamaProvider {
    /// Creates a new `OllamaProvider`.
    pub fn new(client: Client, config: OllamaConfig) -> Self {
        Self { client, config }
    }

    fn endpoint(&self) -> String {
        format!("{}/api/generate", self.config.api_base.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmProvider for OllamaProvider {
    /// Streams a generation from Ollama and returns the assembled text.
    async fn generate(&self, request: &ExplanationRequest) -> Result<String> {
        let url = self.endpoint();

        log::info!("Calling Ollama: {} with model: {}", url, request.model);

        let body = OllamaRequest {
            model: &request.model,
            prompt: &request.prompt,
            stream: true,
            options: OllamaOptions { temperature: request.temperature, num_predict: request.max_tokens },
        };

        let start = Instant::now();

        // reqwest applies this to the whole exchange, body included.
        let resp = self
            .client
            .post(&url)
            .timeout(request.timeout.unwrap_or(self.config.timeout))
            .json(&body)
            .send()
            .await?;
        let status = resp.status();

        log::debug!("Ollama response status: {} after {}ms", status, start.elapsed().as_millis());

        if !status.is_success() {
            let error_body = resp
                .text()
                .await
                .unwrap_or_else(|_| "Could not read error body".to_string());
            return Err(ServiceError::ApiError { status: status.as_u16(), body: error_body });
        }

        let text = stream::assemble(Box::pin(resp.bytes_stream())).await?;

        log::info!("Ollama generation finished ({} chars, {}ms)", text.len(), start.elapsed().as_millis());

        Ok(text)
    }
}
