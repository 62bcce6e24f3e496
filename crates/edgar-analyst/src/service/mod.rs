//! Request-level flows assembling pipeline stages into API responses
//!
//! Within a request the stages run strictly in order (filing, metrics,
//! forecast, AI) because later stages consume earlier outputs. Separate
//! requests share nothing but the on-disk caches and the model manager.

pub mod types;

pub use types::*;

use crate::analyst::{AnalysisContext, AnalysisReport, AnalystOrchestrator, ProviderSelection};
use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use crate::extract::{extract_mdna, extract_risk_factors, html_to_text, truncate_chars};
use crate::forecast::forecast;
use crate::metrics::MetricSeries;
use crate::metrics::csv::CsvMetricsEngine;
use crate::models::ModelManager;
use crate::risk::{RiskReport, RiskScorer};
use crate::sec::{
    FilingDocument, FilingIngestor, HttpFetch, IngestionOutcome, SecHttpClient, TickerResolver,
    XbrlClient,
};
use edgar_prompt::Language;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument, warn};

/// Lifetime of in-process ticker lookups
const TICKER_MEMO_TTL: Duration = Duration::from_secs(24 * 60 * 60);

/// Entry point for every API operation
pub struct AnalystService {
    config: AnalystConfig,
    ingestor: FilingIngestor,
    xbrl: XbrlClient,
    models: Arc<ModelManager>,
    orchestrator: AnalystOrchestrator,
}

impl AnalystService {
    /// Build the full pipeline against the live SEC endpoints
    pub fn from_config(config: AnalystConfig) -> Result<Self> {
        config.validate()?;
        let http: Arc<dyn HttpFetch> = Arc::new(SecHttpClient::new(&config)?);
        Self::with_http(config, http)
    }

    /// Build the pipeline around a custom HTTP implementation
    pub fn with_http(config: AnalystConfig, http: Arc<dyn HttpFetch>) -> Result<Self> {
        let resolver = Arc::new(TickerResolver::new(
            Arc::clone(&http),
            config.ticker_snapshot_path(),
            TICKER_MEMO_TTL,
        ));
        let ingestor = FilingIngestor::new(Arc::clone(&http), Arc::clone(&resolver), &config);
        let xbrl = XbrlClient::new(http, resolver, config.xbrl_cache_dir(), config.facts_ttl);
        let models = Arc::new(ModelManager::from_config(&config));
        let orchestrator = AnalystOrchestrator::from_config(&config, Arc::clone(&models))?;

        Ok(Self {
            config,
            ingestor,
            xbrl,
            models,
            orchestrator,
        })
    }

    pub fn config(&self) -> &AnalystConfig {
        &self.config
    }

    /// Fail unless a cloud AI credential is configured
    pub fn require_cloud(&self) -> Result<()> {
        if self.orchestrator.has_cloud() {
            Ok(())
        } else {
            Err(AnalystError::Config(
                "OPENAI_API_KEY is required for AI analysis".to_string(),
            ))
        }
    }

    fn normalize_ticker(ticker: &str) -> Result<String> {
        let ticker = ticker.trim().to_uppercase();
        if ticker.is_empty() {
            return Err(AnalystError::Data("ticker is required".to_string()));
        }
        Ok(ticker)
    }

    fn language(&self, code: Option<&str>) -> Language {
        match code.map(Language::from_code) {
            Some(lang) if lang.is_known() => lang,
            Some(lang) => {
                warn!("Unsupported output language {}, using {}", lang, self.config.output_lang);
                self.config.output_lang.clone()
            }
            None => self.config.output_lang.clone(),
        }
    }

    async fn csv_metrics(&self, ticker: &str) -> Result<MetricSeries> {
        let engine = CsvMetricsEngine::new(self.config.csv_path());
        let ticker = ticker.to_string();
        tokio::task::spawn_blocking(move || engine.calculate_metrics(&ticker)).await?
    }

    /// Answer a question with metrics, forecast, filing excerpt and a report
    #[instrument(skip(self, request), fields(ticker = %request.ticker, mode = ?request.mode))]
    pub async fn ask(&self, request: AskRequest) -> Result<AskResponse> {
        let ticker = Self::normalize_ticker(&request.ticker)?;
        let mut warnings = Vec::new();

        let series = match request.mode {
            MetricsMode::Csv => self.csv_metrics(&ticker).await,
            MetricsMode::Xbrl => self.xbrl.extract_metrics(&ticker, DEFAULT_XBRL_YEARS).await,
        };
        let series = match series {
            Ok(series) if !series.snapshots.is_empty() => Some(series),
            Ok(_) => {
                warnings.push(format!("No metrics found for {ticker}"));
                None
            }
            Err(e) => {
                warnings.push(format!("Metrics unavailable: {e}"));
                None
            }
        };

        let projection = series.as_ref().and_then(forecast);
        if projection.is_none() {
            warnings.push("Forecast unavailable: fewer than two years of revenue".to_string());
        }

        let ingestion = self.ingestor.latest_filing_text(&ticker).await;
        warnings.extend(ingestion.warnings);

        let mut ctx = AnalysisContext::new(&ticker, request.question, self.config.output_lang.clone());
        ctx.metrics = series.as_ref().map(MetricSeries::key_metrics).unwrap_or_default();
        ctx.forecast = projection;
        ctx.sec_text = ingestion.sec_text;

        let selection = ProviderSelection {
            use_local: false,
            use_ai: request.use_ai,
        };
        let answer = self.orchestrator.analysis_report(&ctx, selection).await?;
        let ai_used = answer.ai_used();
        warnings.extend(answer.warnings);

        Ok(AskResponse {
            status: ResponseStatus::from_warnings(&warnings),
            sec_excerpt: ctx.excerpt().to_string(),
            ticker,
            mode: request.mode,
            ai_used,
            metrics: ctx.metrics,
            forecast: ctx.forecast,
            answer: answer.report,
            warnings,
        })
    }

    /// Plain text of the most recent valid annual report, cache first
    pub async fn latest_filing_text(&self, ticker: &str) -> Result<IngestionOutcome> {
        let ticker = Self::normalize_ticker(ticker)?;
        Ok(self.ingestor.latest_filing_text(&ticker).await)
    }

    /// Latest annual report with its raw HTML
    pub async fn latest_10k(&self, ticker: &str) -> Result<FilingDocument> {
        let ticker = Self::normalize_ticker(ticker)?;
        self.ingestor.latest_10k_html(&ticker).await
    }

    async fn risk_report(&self, text: &str, top_n: usize, warnings: &mut Vec<String>) -> RiskReport {
        let model = match self.models.get_sentiment_model().await {
            Ok(model) => model,
            Err(e) => {
                warnings.push(format!("Sentiment model unavailable: {e}"));
                return RiskReport::failed("unavailable", e.to_string());
            }
        };
        let name = model.name().to_string();
        match RiskScorer::new(model).score_text(extract_risk_factors(text), top_n).await {
            Ok(report) => report,
            Err(e) => {
                warnings.push(format!("Risk scoring failed: {e}"));
                RiskReport::failed(name, e.to_string())
            }
        }
    }

    /// Analyse the latest annual report of a ticker
    #[instrument(skip(self, request), fields(ticker = %request.ticker))]
    pub async fn analyze_10k(&self, request: Analyze10kRequest) -> Result<Analyze10kResponse> {
        let ticker = Self::normalize_ticker(&request.ticker)?;
        let FilingDocument { reference, html } = self.ingestor.latest_10k_html(&ticker).await?;
        let mut warnings = Vec::new();

        let full_text = tokio::task::spawn_blocking(move || html_to_text(&html)).await?;
        if full_text.trim().is_empty() {
            warnings.push("Filing document contains no text".to_string());
        }
        let max_chars = request.max_chars.unwrap_or(DEFAULT_MAX_CHARS);

        let finbert = if request.use_finbert {
            Some(self.risk_report(&full_text, request.finbert_top_n, &mut warnings).await)
        } else {
            None
        };

        let mut ctx = AnalysisContext::new(&ticker, "", self.config.output_lang.clone());
        ctx.mdna = extract_mdna(&full_text).to_string();
        ctx.sec_text = truncate_chars(&full_text, max_chars).to_string();
        ctx.focus = request.focus.filter(|f| !f.trim().is_empty());
        ctx.risks = finbert
            .as_ref()
            .map(|r| r.top_risk_sentences.clone())
            .unwrap_or_default();

        let selection = ProviderSelection {
            use_local: request.use_llm,
            use_ai: request.use_ai,
        };
        let outcome = self.orchestrator.filing_analysis(&ctx, selection).await?;
        warnings.extend(outcome.warnings);
        info!("Analysed {} {} with {} provider", ticker, reference.accession, outcome.provider);

        Ok(Analyze10kResponse {
            ticker,
            cik: reference.cik,
            form: reference.form,
            filing_date: reference.filing_date,
            report_date: reference.report_date,
            accession: reference.accession,
            analysis: outcome.report,
            finbert,
            llm: outcome.local,
            warnings,
        })
    }

    /// XBRL metric series for the dashboard
    pub async fn xbrl_metrics(&self, ticker: &str, years: usize) -> Result<MetricSeries> {
        let ticker = Self::normalize_ticker(ticker)?;
        self.xbrl.extract_metrics(&ticker, years.max(1)).await
    }

    /// Report from the latest XBRL metrics and their yearly context
    #[instrument(skip(self))]
    pub async fn analyze_xbrl(
        &self,
        ticker: &str,
        years: usize,
        output_lang: Option<&str>,
    ) -> Result<AnalysisReport> {
        let series = self.xbrl_metrics(ticker, years).await?;
        if series.snapshots.is_empty() {
            return Err(AnalystError::Data(format!(
                "No XBRL data available for {}",
                series.ticker
            )));
        }

        let mut ctx = AnalysisContext::new(&series.ticker, XBRL_QUESTION, self.language(output_lang));
        ctx.metrics = series.key_metrics();
        ctx.sec_text = series.context_text();
        self.report(&ctx).await
    }

    /// Report from caller-supplied values
    pub async fn analyze(&self, request: AnalyzeRequest) -> Result<AnalysisReport> {
        let ticker = Self::normalize_ticker(&request.ticker)?;
        let mut ctx = AnalysisContext::new(&ticker, &request.question, self.config.output_lang.clone());
        ctx.forecast = request.forecast();
        ctx.metrics = request.metrics;
        ctx.sec_text = request.sec_text;
        self.report(&ctx).await
    }

    async fn report(&self, ctx: &AnalysisContext) -> Result<AnalysisReport> {
        let selection = ProviderSelection {
            use_local: false,
            use_ai: true,
        };
        let outcome = self.orchestrator.analysis_report(ctx, selection).await?;
        for warning in &outcome.warnings {
            warn!("{}", warning);
        }
        Ok(outcome.report)
    }
}
