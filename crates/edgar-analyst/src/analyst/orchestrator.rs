//! Provider chain evaluation
//!
//! The chain is rebuilt per request from [`ProviderSelection`]:
//!
//! 1. local generation, only when explicitly requested
//! 2. the cloud provider, when requested and a credential is configured
//! 3. the rule-based fallback, only when no cloud provider is in the chain
//!
//! A local failure falls through to the next entry. A cloud failure is
//! terminal. The rule-based fallback cannot fail.

use super::context::AnalysisContext;
use super::prompts::analyst_prompts;
use super::report::{AnalysisReport, FilingAnalysis, ReportSchema};
use super::strategy::{
    CloudLlmStrategy, LocalLlmStrategy, ProviderFailure, ProviderKind, ProviderStrategy,
    RuleBasedStrategy, StrategyOutput,
};
use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use crate::models::ModelManager;
use edgar_llm::providers::{OpenAIConfig, OpenAIProvider};
use edgar_prompt::PromptRegistry;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{info, instrument, warn};

/// Request flags choosing the provider chain
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProviderSelection {
    pub use_local: bool,
    pub use_ai: bool,
}

/// Outcome of the local generation step, reported even when unused
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LocalLlmResult {
    pub provider: String,
    pub used: bool,
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub analysis: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_output: Option<String>,
}

impl LocalLlmResult {
    fn succeeded<R: ReportSchema>(model: Option<String>, output: &StrategyOutput<R>) -> Self {
        Self {
            provider: "ollama".to_string(),
            used: true,
            model,
            analysis: serde_json::to_value(&output.report).ok(),
            error: None,
            raw_output: output.raw_output.clone(),
        }
    }

    fn failed(model: Option<String>, failure: &ProviderFailure) -> Self {
        Self {
            provider: "ollama".to_string(),
            used: failure.raw_output.is_some(),
            model,
            analysis: None,
            error: Some(failure.message.clone()),
            raw_output: failure.raw_output.clone(),
        }
    }
}

/// A report and how it was produced
#[derive(Debug, Clone)]
pub struct Orchestrated<R> {
    pub report: R,
    pub provider: ProviderKind,
    pub model: Option<String>,
    pub warnings: Vec<String>,
    pub local: Option<LocalLlmResult>,
}

impl<R> Orchestrated<R> {
    /// Whether the cloud provider produced the report
    pub fn ai_used(&self) -> bool {
        self.provider == ProviderKind::Cloud
    }
}

/// Evaluates the provider chain for both report contracts
pub struct AnalystOrchestrator {
    local: LocalLlmStrategy,
    cloud: Option<CloudLlmStrategy>,
    rule_based: RuleBasedStrategy,
}

impl AnalystOrchestrator {
    /// Create an orchestrator; `cloud` is `None` when no credential exists
    pub fn new(local: LocalLlmStrategy, cloud: Option<CloudLlmStrategy>) -> Self {
        Self {
            local,
            cloud,
            rule_based: RuleBasedStrategy,
        }
    }

    /// Build the chain from configuration, sharing `models`
    pub fn from_config(config: &AnalystConfig, models: Arc<ModelManager>) -> Result<Self> {
        let prompts: Arc<PromptRegistry> = Arc::new(analyst_prompts(config.output_lang.clone())?);
        let local = LocalLlmStrategy::new(models, prompts.clone(), config.local_model());

        let cloud = match &config.openai_api_key {
            Some(key) => {
                let provider = OpenAIProvider::with_config(
                    OpenAIConfig::new(key)
                        .with_api_base(&config.openai_api_base)
                        .with_timeout(config.cloud_timeout.as_secs()),
                )?;
                Some(CloudLlmStrategy::new(
                    Arc::new(provider),
                    &config.openai_model,
                    prompts,
                    config.retry_policy(),
                ))
            }
            None => None,
        };

        Ok(Self::new(local, cloud))
    }

    /// Whether a cloud provider is configured
    pub fn has_cloud(&self) -> bool {
        self.cloud.is_some()
    }

    fn chain<R: ReportSchema>(&self, selection: ProviderSelection) -> Vec<&dyn ProviderStrategy<R>> {
        let mut chain: Vec<&dyn ProviderStrategy<R>> = Vec::with_capacity(2);
        if selection.use_local {
            chain.push(&self.local);
        }
        match self.cloud.as_ref().filter(|_| selection.use_ai) {
            Some(cloud) => chain.push(cloud),
            None => chain.push(&self.rule_based),
        }
        chain
    }

    /// Question-driven report
    pub async fn analysis_report(
        &self,
        ctx: &AnalysisContext,
        selection: ProviderSelection,
    ) -> Result<Orchestrated<AnalysisReport>> {
        self.run(ctx, selection).await
    }

    /// Whole-filing report
    pub async fn filing_analysis(
        &self,
        ctx: &AnalysisContext,
        selection: ProviderSelection,
    ) -> Result<Orchestrated<FilingAnalysis>> {
        self.run(ctx, selection).await
    }

    #[instrument(skip_all, fields(ticker = %ctx.ticker))]
    async fn run<R: ReportSchema>(
        &self,
        ctx: &AnalysisContext,
        selection: ProviderSelection,
    ) -> Result<Orchestrated<R>> {
        let mut warnings = Vec::new();
        let mut local = None;

        if selection.use_ai && !self.has_cloud() {
            warnings.push("AI requested but OPENAI_API_KEY is not set; rule-based analysis used".to_string());
        }

        for strategy in self.chain::<R>(selection) {
            let kind = strategy.kind();
            match strategy.attempt(ctx).await {
                Ok(output) => {
                    if kind == ProviderKind::Local {
                        local = Some(LocalLlmResult::succeeded(strategy.model(), &output));
                    }
                    info!("Report produced by {} provider", kind);
                    warnings.extend(output.warnings);
                    return Ok(Orchestrated {
                        report: output.report,
                        provider: kind,
                        model: strategy.model(),
                        warnings,
                        local,
                    });
                }
                Err(failure) => {
                    warn!("{} provider failed: {}", kind, failure.message);
                    if failure.terminal {
                        return Err(AnalystError::Provider(failure.message));
                    }
                    if kind == ProviderKind::Local {
                        warnings.push(format!("Local LLM unavailable: {}", failure.message));
                        local = Some(LocalLlmResult::failed(strategy.model(), &failure));
                    } else {
                        warnings.push(format!("{kind} provider failed: {}", failure.message));
                    }
                }
            }
        }

        Err(AnalystError::Provider("no provider produced a report".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LocalLlm, ModelLoader};
    use crate::retry::RetryPolicy;
    use crate::sentiment::{LexiconSentimentModel, SentimentModel};
    use crate::test_support::{MockProvider, completion};
    use async_trait::async_trait;
    use edgar_llm::LLMError;
    use edgar_prompt::Language;
    use std::time::Duration;

    const REPORT_JSON: &str = r#"{
        "executive_summary": "Apple remains highly profitable with steady growth.",
        "key_metrics_commentary": "Net margin near 24%.",
        "risks_summary": "Supply chain concentration.",
        "growth_drivers": "Services expansion.",
        "red_flags": "None detected."
    }"#;

    enum LocalBehaviour {
        Unreachable,
        Replies(&'static str),
    }

    struct StubLoader(LocalBehaviour);

    #[async_trait]
    impl ModelLoader for StubLoader {
        async fn load_local_llm(&self) -> Result<LocalLlm> {
            match self.0 {
                LocalBehaviour::Unreachable => Err(AnalystError::ModelLoad("connection refused".into())),
                LocalBehaviour::Replies(text) => {
                    let mut provider = MockProvider::new();
                    provider.expect_complete().returning(move |_| Ok(completion(text)));
                    Ok(LocalLlm::new(Arc::new(provider), "qwen2.5:7b", 800))
                }
            }
        }

        async fn load_sentiment_model(&self) -> Result<Arc<dyn SentimentModel>> {
            Ok(Arc::new(LexiconSentimentModel::new()))
        }
    }

    fn prompts() -> Arc<PromptRegistry> {
        Arc::new(analyst_prompts(Language::English).unwrap())
    }

    fn orchestrator(local: LocalBehaviour, cloud: Option<MockProvider>) -> AnalystOrchestrator {
        let models = Arc::new(ModelManager::new(Arc::new(StubLoader(local))));
        let local = LocalLlmStrategy::new(models, prompts(), "qwen2.5:7b");
        let cloud = cloud.map(|provider| {
            CloudLlmStrategy::new(Arc::new(provider), "gpt-4o-mini", prompts(), RetryPolicy::default())
        });
        AnalystOrchestrator::new(local, cloud)
    }

    fn cloud_replying(text: impl Into<String>) -> MockProvider {
        let text = text.into();
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(1)
            .returning(move |_| Ok(completion(&text)));
        provider
    }

    fn context() -> AnalysisContext {
        AnalysisContext::new("AAPL", "How is growth?", Language::English)
    }

    const AI: ProviderSelection = ProviderSelection {
        use_local: false,
        use_ai: true,
    };

    #[tokio::test]
    async fn test_fenced_json_parses_like_plain_json() {
        let fenced = format!("```json\n{REPORT_JSON}\n```");

        let plain = orchestrator(LocalBehaviour::Unreachable, Some(cloud_replying(REPORT_JSON)))
            .analysis_report(&context(), AI)
            .await
            .unwrap();
        let wrapped = orchestrator(LocalBehaviour::Unreachable, Some(cloud_replying(fenced)))
            .analysis_report(&context(), AI)
            .await
            .unwrap();

        assert_eq!(plain.report, wrapped.report);
        assert_eq!(wrapped.provider, ProviderKind::Cloud);
        assert!(wrapped.ai_used());
        assert!(wrapped.warnings.is_empty());
    }

    #[tokio::test]
    async fn test_local_failure_without_cloud_falls_back_to_rules() {
        let selection = ProviderSelection {
            use_local: true,
            use_ai: false,
        };
        let result = orchestrator(LocalBehaviour::Unreachable, None)
            .analysis_report(&context(), selection)
            .await
            .unwrap();

        assert_eq!(result.provider, ProviderKind::RuleBased);
        assert!(!result.ai_used());
        let local = result.local.unwrap();
        assert!(!local.used);
        assert_eq!(local.provider, "ollama");
        assert!(local.error.unwrap().contains("connection refused"));
        assert!(result.warnings.iter().any(|w| w.starts_with("Local LLM unavailable")));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cloud_transport_failures_are_terminal_after_three_attempts() {
        let mut provider = MockProvider::new();
        provider
            .expect_complete()
            .times(3)
            .returning(|_| Err(LLMError::Timeout(45)));

        let started = tokio::time::Instant::now();
        let err = orchestrator(LocalBehaviour::Unreachable, Some(provider))
            .analysis_report(&context(), AI)
            .await
            .unwrap_err();

        assert!(matches!(err, AnalystError::Provider(_)));
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_secs(7) && elapsed < Duration::from_secs(8));
    }

    #[tokio::test]
    async fn test_unparseable_cloud_reply_is_degraded_not_failed() {
        let reply = "Revenue is growing but I cannot format this as JSON right now.";
        let result = orchestrator(LocalBehaviour::Unreachable, Some(cloud_replying(reply)))
            .analysis_report(&context(), AI)
            .await
            .unwrap();

        assert_eq!(result.report.key_metrics_commentary, reply);
        assert_eq!(result.report.risks_summary, "Parsing error.");
        assert_eq!(result.warnings.len(), 1);
    }

    #[tokio::test]
    async fn test_local_success_short_circuits_chain() {
        let reply = r#"Here you go: {"executive_summary": "Services revenue keeps compounding.", "key_points": ["a"], "risks": [], "financial_drivers": [], "what_to_watch": []}"#;
        let selection = ProviderSelection {
            use_local: true,
            use_ai: true,
        };
        let mut cloud = MockProvider::new();
        cloud.expect_complete().times(0);

        let result = orchestrator(LocalBehaviour::Replies(reply), Some(cloud))
            .filing_analysis(&context(), selection)
            .await
            .unwrap();

        assert_eq!(result.provider, ProviderKind::Local);
        assert_eq!(result.report.key_points, vec!["a"]);
        let local = result.local.unwrap();
        assert!(local.used);
        assert_eq!(local.model.as_deref(), Some("qwen2.5:7b"));
        assert_eq!(local.analysis.unwrap()["executive_summary"], "Services revenue keeps compounding.");
    }

    #[tokio::test]
    async fn test_local_unparseable_reports_raw_output() {
        let selection = ProviderSelection {
            use_local: true,
            use_ai: false,
        };
        let result = orchestrator(LocalBehaviour::Replies("no json here"), None)
            .filing_analysis(&context(), selection)
            .await
            .unwrap();

        assert_eq!(result.provider, ProviderKind::RuleBased);
        let local = result.local.unwrap();
        assert!(local.used);
        assert_eq!(local.error.as_deref(), Some("JSON Parsing Failed"));
        assert_eq!(local.raw_output.as_deref(), Some("no json here"));
    }

    #[tokio::test]
    async fn test_ai_requested_without_credential_warns() {
        let result = orchestrator(LocalBehaviour::Unreachable, None)
            .analysis_report(&context(), AI)
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderKind::RuleBased);
        assert!(result.warnings[0].contains("OPENAI_API_KEY"));
    }
}
