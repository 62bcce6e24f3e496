//! Process-wide holder of heavy inference resources
//!
//! [`ModelManager`] loads the local generation model and the sentiment
//! classifier on first use. Each resource is initialised under its own
//! once-cell, so concurrent first accesses share a single load. A failed
//! load leaves the cell empty and is retried by the next caller.

use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use crate::sentiment::{HttpSentimentModel, LexiconSentimentModel, SentimentModel};
use async_trait::async_trait;
use edgar_llm::providers::{OllamaConfig, OllamaProvider};
use edgar_llm::{CompletionRequest, LLMProvider};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;
use tracing::{info, instrument, warn};

/// Sampling temperature for local generation
pub const LOCAL_TEMPERATURE: f32 = 0.3;

/// A loaded local generation model
pub struct LocalLlm {
    provider: Arc<dyn LLMProvider>,
    model: String,
    max_new_tokens: usize,
}

impl LocalLlm {
    /// Wrap a provider serving `model`
    pub fn new(provider: Arc<dyn LLMProvider>, model: impl Into<String>, max_new_tokens: usize) -> Self {
        Self {
            provider,
            model: model.into(),
            max_new_tokens,
        }
    }

    /// Model name
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Provider name
    pub fn provider_name(&self) -> &str {
        self.provider.name()
    }

    /// Generate a completion for a system and user prompt
    #[instrument(skip(self, system, prompt), fields(model = %self.model))]
    pub async fn generate(&self, system: &str, prompt: &str) -> Result<String> {
        let request = CompletionRequest::new(&self.model, prompt)
            .system(system)
            .max_tokens(self.max_new_tokens)
            .temperature(LOCAL_TEMPERATURE);
        let response = self.provider.complete(request).await?;
        if response.is_truncated() {
            warn!(model = %self.model, "Local generation stopped at the token limit");
        }
        Ok(response.text)
    }
}

/// Constructs inference resources
#[async_trait]
pub trait ModelLoader: Send + Sync {
    /// Load the local generation model
    async fn load_local_llm(&self) -> Result<LocalLlm>;

    /// Load the sentiment classifier
    async fn load_sentiment_model(&self) -> Result<Arc<dyn SentimentModel>>;
}

/// Loader backed by configuration: Ollama for generation, an HTTP endpoint
/// or the lexicon for sentiment
pub struct DefaultModelLoader {
    config: AnalystConfig,
}

impl DefaultModelLoader {
    /// Create a loader from configuration
    pub fn new(config: AnalystConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl ModelLoader for DefaultModelLoader {
    async fn load_local_llm(&self) -> Result<LocalLlm> {
        let model = self.config.local_model().to_string();
        let provider = OllamaProvider::with_config(
            OllamaConfig::new(&self.config.ollama_url)
                .with_timeout(self.config.local_timeout.as_secs()),
        )
        .map_err(|e| AnalystError::ModelLoad(e.to_string()))?;

        provider
            .ensure_model(&model)
            .await
            .map_err(|e| AnalystError::ModelLoad(format!("{model}: {e}")))?;

        info!("Loaded local model {} from {}", model, self.config.ollama_url);
        Ok(LocalLlm::new(
            Arc::new(provider),
            model,
            self.config.local_max_new_tokens,
        ))
    }

    async fn load_sentiment_model(&self) -> Result<Arc<dyn SentimentModel>> {
        match &self.config.sentiment_endpoint {
            Some(endpoint) => {
                info!("Using sentiment endpoint {}", endpoint);
                let model = HttpSentimentModel::new(endpoint.clone(), Duration::from_secs(60))?;
                Ok(Arc::new(model))
            }
            None => Ok(Arc::new(LexiconSentimentModel::new())),
        }
    }
}

/// Lazily initialised, shared inference resources
pub struct ModelManager {
    loader: Arc<dyn ModelLoader>,
    local_llm: OnceCell<Arc<LocalLlm>>,
    sentiment: OnceCell<Arc<dyn SentimentModel>>,
}

impl ModelManager {
    /// Create a manager; nothing is loaded until first access
    pub fn new(loader: Arc<dyn ModelLoader>) -> Self {
        Self {
            loader,
            local_llm: OnceCell::new(),
            sentiment: OnceCell::new(),
        }
    }

    /// Manager using [`DefaultModelLoader`]
    pub fn from_config(config: &AnalystConfig) -> Self {
        Self::new(Arc::new(DefaultModelLoader::new(config.clone())))
    }

    /// Local generation model, loading it on first use
    pub async fn get_local_llm(&self) -> Result<Arc<LocalLlm>> {
        self.local_llm
            .get_or_try_init(|| async { self.loader.load_local_llm().await.map(Arc::new) })
            .await
            .cloned()
    }

    /// Sentiment classifier, loading it on first use
    pub async fn get_sentiment_model(&self) -> Result<Arc<dyn SentimentModel>> {
        self.sentiment
            .get_or_try_init(|| self.loader.load_sentiment_model())
            .await
            .cloned()
    }
}
