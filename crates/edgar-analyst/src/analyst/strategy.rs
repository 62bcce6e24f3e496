//! Provider strategies tried in order by the orchestrator

use super::context::AnalysisContext;
use super::json::parse_json_object;
use super::report::{MIN_SUMMARY_CHARS, ReportSchema};
use crate::extract::truncate_chars;
use crate::models::ModelManager;
use crate::retry::RetryPolicy;
use async_trait::async_trait;
use edgar_llm::{CompletionRequest, LLMError, LLMProvider};
use edgar_prompt::PromptRegistry;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, instrument, warn};

/// Sampling temperature for cloud generation
pub const CLOUD_TEMPERATURE: f32 = 0.7;

/// Characters of raw model output carried in a failure
pub const RAW_OUTPUT_CHARS: usize = 500;

/// Which provider produced a report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderKind {
    Local,
    Cloud,
    RuleBased,
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Local => "local",
            Self::Cloud => "cloud",
            Self::RuleBased => "rule_based",
        })
    }
}

/// A provider could not produce a report
#[derive(Debug, Clone)]
pub struct ProviderFailure {
    pub provider: ProviderKind,
    pub message: String,
    /// Model output that could not be used, if generation ran
    pub raw_output: Option<String>,
    /// Stop the chain instead of trying the next provider
    pub terminal: bool,
}

impl ProviderFailure {
    fn recoverable(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self {
            provider,
            message: message.into(),
            raw_output: None,
            terminal: false,
        }
    }

    fn terminal(provider: ProviderKind, message: impl Into<String>) -> Self {
        Self {
            terminal: true,
            ..Self::recoverable(provider, message)
        }
    }
}

/// A report plus whatever degraded along the way
#[derive(Debug, Clone)]
pub struct StrategyOutput<R> {
    pub report: R,
    pub warnings: Vec<String>,
    pub raw_output: Option<String>,
}

impl<R> StrategyOutput<R> {
    fn clean(report: R) -> Self {
        Self {
            report,
            warnings: Vec::new(),
            raw_output: None,
        }
    }
}

/// One way of producing a report
#[async_trait]
pub trait ProviderStrategy<R: ReportSchema>: Send + Sync {
    fn kind(&self) -> ProviderKind;

    /// Model name reported alongside the result
    fn model(&self) -> Option<String> {
        None
    }

    async fn attempt(&self, ctx: &AnalysisContext) -> Result<StrategyOutput<R>, ProviderFailure>;
}

/// Local generation through the shared [`ModelManager`]
pub struct LocalLlmStrategy {
    models: Arc<ModelManager>,
    prompts: Arc<PromptRegistry>,
    model: String,
}

impl LocalLlmStrategy {
    pub fn new(models: Arc<ModelManager>, prompts: Arc<PromptRegistry>, model: impl Into<String>) -> Self {
        Self {
            models,
            prompts,
            model: model.into(),
        }
    }
}

#[async_trait]
impl<R: ReportSchema> ProviderStrategy<R> for LocalLlmStrategy {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn model(&self) -> Option<String> {
        Some(self.model.clone())
    }

    #[instrument(skip_all, fields(ticker = %ctx.ticker))]
    async fn attempt(&self, ctx: &AnalysisContext) -> Result<StrategyOutput<R>, ProviderFailure> {
        let failure = |message: String| ProviderFailure::recoverable(ProviderKind::Local, message);

        let vars = ctx.template_vars();
        let system = self
            .prompts
            .render_with_lang(R::SYSTEM_TEMPLATE, &ctx.language, &vars)
            .map_err(|e| failure(e.to_string()))?;
        let user = self
            .prompts
            .render_with_lang(R::USER_TEMPLATE, &ctx.language, &vars)
            .map_err(|e| failure(e.to_string()))?;

        let llm = self
            .models
            .get_local_llm()
            .await
            .map_err(|e| failure(e.to_string()))?;
        let raw = llm
            .generate(&system, &user)
            .await
            .map_err(|e| failure(format!("Generation failed: {e}")))?;
        let raw_output = Some(truncate_chars(&raw, RAW_OUTPUT_CHARS).to_string());

        match parse_json_object(&raw) {
            Some(value) => Ok(StrategyOutput {
                report: R::from_value(&value),
                warnings: Vec::new(),
                raw_output,
            }),
            None => Err(ProviderFailure {
                raw_output,
                ..failure("JSON Parsing Failed".to_string())
            }),
        }
    }
}

#[derive(Debug, Error)]
enum CloudError {
    #[error(transparent)]
    Llm(#[from] LLMError),

    #[error("invalid response: {0}")]
    Validation(String),
}

impl CloudError {
    fn is_retryable(&self) -> bool {
        match self {
            Self::Validation(_) => true,
            Self::Llm(e) => !e.is_permanent(),
        }
    }
}

/// Hosted chat-completion provider with validated, retried responses
pub struct CloudLlmStrategy {
    provider: Arc<dyn LLMProvider>,
    model: String,
    prompts: Arc<PromptRegistry>,
    retry: RetryPolicy,
}

impl CloudLlmStrategy {
    pub fn new(
        provider: Arc<dyn LLMProvider>,
        model: impl Into<String>,
        prompts: Arc<PromptRegistry>,
        retry: RetryPolicy,
    ) -> Self {
        Self {
            provider,
            model: model.into(),
            prompts,
            retry,
        }
    }

    async fn complete_once<R: ReportSchema>(
        &self,
        system: &str,
        user: &str,
    ) -> Result<StrategyOutput<R>, CloudError> {
        let request = CompletionRequest::new(&self.model, user)
            .system(system)
            .temperature(CLOUD_TEMPERATURE)
            .json_mode(true);
        let response = self.provider.complete(request).await?;
        let text = response.text.trim();
        if text.is_empty() {
            return Err(CloudError::Validation("empty response".to_string()));
        }

        let Some(value) = parse_json_object(text) else {
            warn!("Cloud response is not valid JSON, returning raw text");
            return Ok(StrategyOutput {
                report: R::degraded(text),
                warnings: vec!["AI response was not valid JSON; raw text returned as commentary".to_string()],
                raw_output: Some(truncate_chars(text, RAW_OUTPUT_CHARS).to_string()),
            });
        };

        let report = R::from_value(&value);
        if !report.has_valid_summary() {
            return Err(CloudError::Validation(format!(
                "executive_summary missing or shorter than {MIN_SUMMARY_CHARS} characters"
            )));
        }
        debug!("Cloud response accepted");
        Ok(StrategyOutput::clean(report))
    }
}

#[async_trait]
impl<R: ReportSchema> ProviderStrategy<R> for CloudLlmStrategy {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Cloud
    }

    fn model(&self) -> Option<String> {
        Some(self.model.clone())
    }

    #[instrument(skip_all, fields(ticker = %ctx.ticker, model = %self.model))]
    async fn attempt(&self, ctx: &AnalysisContext) -> Result<StrategyOutput<R>, ProviderFailure> {
        let vars = ctx.template_vars();
        let render = |name: &str| {
            self.prompts
                .render_with_lang(name, &ctx.language, &vars)
                .map_err(|e| ProviderFailure::terminal(ProviderKind::Cloud, e.to_string()))
        };
        let system = render(R::SYSTEM_TEMPLATE)?;
        let user = render(R::USER_TEMPLATE)?;

        let (this, system, user) = (self, system.as_str(), user.as_str());
        self.retry
            .execute("cloud_completion", CloudError::is_retryable, move || {
                this.complete_once::<R>(system, user)
            })
            .await
            .map_err(|e| {
                ProviderFailure::terminal(
                    ProviderKind::Cloud,
                    format!("Cloud AI request failed: {e}"),
                )
            })
    }
}

/// Deterministic prose built from computed data
#[derive(Debug, Clone, Copy, Default)]
pub struct RuleBasedStrategy;

#[async_trait]
impl<R: ReportSchema> ProviderStrategy<R> for RuleBasedStrategy {
    fn kind(&self) -> ProviderKind {
        ProviderKind::RuleBased
    }

    async fn attempt(&self, ctx: &AnalysisContext) -> Result<StrategyOutput<R>, ProviderFailure> {
        Ok(StrategyOutput::clean(R::rule_based(ctx)))
    }
}
