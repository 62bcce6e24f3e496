//! Ollama provider implementation
//!
//! Talks to a local Ollama daemon through its non-streaming
//! `POST /api/generate` endpoint. The daemon is treated as an opaque
//! text-completion service; `ensure_model` probes `GET /api/tags` so callers
//! can fail fast when the requested model has not been pulled.

use crate::{
    CompletionRequest, CompletionResponse, FinishReason, LLMError, LLMProvider, Result, TokenUsage,
};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};

const DEFAULT_OLLAMA_URL: &str = "http://127.0.0.1:11434";
const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Configuration for the Ollama provider
#[derive(Debug, Clone)]
pub struct OllamaConfig {
    /// Daemon base URL (default: "http://127.0.0.1:11434")
    pub base_url: String,

    /// Generation timeout in seconds (default: 300)
    pub timeout_secs: u64,
}

impl OllamaConfig {
    /// Create a config pointing at the given daemon
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Set request timeout in seconds
    pub fn with_timeout(mut self, timeout_secs: u64) -> Self {
        self.timeout_secs = timeout_secs;
        self
    }
}

impl Default for OllamaConfig {
    fn default() -> Self {
        Self::new(DEFAULT_OLLAMA_URL)
    }
}

/// Local Ollama provider
pub struct OllamaProvider {
    client: Client,
    config: OllamaConfig,
}

impl OllamaProvider {
    /// Create a provider with custom configuration
    pub fn with_config(config: OllamaConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// Get the current configuration
    pub fn config(&self) -> &OllamaConfig {
        &self.config
    }

    /// Verify the daemon is reachable and serves `model`
    #[instrument(skip(self), fields(base_url = %self.config.base_url))]
    pub async fn ensure_model(&self, model: &str) -> Result<()> {
        let response = self
            .client
            .get(format!("{}/api/tags", self.config.base_url))
            .timeout(Duration::from_secs(10))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(LLMError::Api {
                status: response.status().as_u16(),
                body: "tags endpoint unavailable".to_string(),
            });
        }

        let tags: TagsResponse = response.json().await?;
        if tags.has_model(model) {
            debug!("Ollama model {} is available", model);
            Ok(())
        } else {
            Err(LLMError::ModelNotFound(model.to_string()))
        }
    }
}

#[async_trait]
impl LLMProvider for OllamaProvider {
    #[instrument(skip(self, request), fields(model = %request.model, base_url = %self.config.base_url))]
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = build_request(&request);
        debug!("Sending generate request ({} prompt chars)", body.prompt.len());

        let response = self
            .client
            .post(format!("{}/api/generate", self.config.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| LLMError::from_send(e, self.config.timeout_secs))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await?;
            return Err(LLMError::from_status(status.as_u16(), body, &request.model));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| LLMError::MalformedResponse(e.to_string()))?;

        Ok(parse_response(generated))
    }

    fn name(&self) -> &'static str {
        "ollama"
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    model: String,
    prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'static str>,
    options: GenerateOptions,
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    num_predict: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done_reason: Option<String>,
    #[serde(default)]
    prompt_eval_count: usize,
    #[serde(default)]
    eval_count: usize,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

impl TagsResponse {
    /// Untagged model names match their `:latest` variant
    fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| {
            m.name == model
                || (!model.contains(':') && m.name == format!("{model}:latest"))
        })
    }
}

fn build_request(request: &CompletionRequest) -> GenerateRequest {
    GenerateRequest {
        model: request.model.clone(),
        prompt: request.prompt.clone(),
        system: request.system.clone(),
        stream: false,
        format: request.json_mode.then_some("json"),
        options: GenerateOptions {
            num_predict: request.max_tokens,
            temperature: request.temperature,
        },
    }
}

fn parse_response(generated: GenerateResponse) -> CompletionResponse {
    CompletionResponse {
        finish: FinishReason::from_wire(generated.done_reason.as_deref()),
        text: generated.response,
        usage: TokenUsage {
            prompt_tokens: generated.prompt_eval_count,
            completion_tokens: generated.eval_count,
        },
    }
}
