//! Request and response bodies of the analyst API

use crate::analyst::{AnalysisReport, FilingAnalysis, LocalLlmResult};
use crate::forecast::Forecast;
use crate::metrics::KeyMetrics;
use crate::risk::{DEFAULT_TOP_N, RiskReport};
use crate::sec::{AccessionNumber, Cik, FormType};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Question used when the caller supplies none
pub const DEFAULT_QUESTION: &str = "General Financial Analysis";

/// Question sent for XBRL-driven analysis
pub const XBRL_QUESTION: &str = "Financial Analysis based on XBRL Data";

/// Fiscal years returned by default from XBRL facts
pub const DEFAULT_XBRL_YEARS: usize = 4;

/// Filing text characters analysed by default
pub const DEFAULT_MAX_CHARS: usize = 50_000;

fn default_true() -> bool {
    true
}

fn default_question() -> String {
    DEFAULT_QUESTION.to_string()
}

fn default_years() -> usize {
    DEFAULT_XBRL_YEARS
}

fn default_top_n() -> usize {
    DEFAULT_TOP_N
}

/// Where metrics come from
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricsMode {
    #[default]
    Csv,
    Xbrl,
}

/// Whether every step of a response succeeded
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseStatus {
    Ok,
    Degraded,
}

impl ResponseStatus {
    pub fn from_warnings(warnings: &[String]) -> Self {
        if warnings.is_empty() { Self::Ok } else { Self::Degraded }
    }
}

/// `POST /ask`
#[derive(Debug, Clone, Deserialize)]
pub struct AskRequest {
    pub ticker: String,
    #[serde(default = "default_question")]
    pub question: String,
    #[serde(default)]
    pub mode: MetricsMode,
    #[serde(default = "default_true")]
    pub use_ai: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct AskResponse {
    pub status: ResponseStatus,
    pub ticker: String,
    pub mode: MetricsMode,
    pub ai_used: bool,
    pub metrics: KeyMetrics,
    pub forecast: Option<Forecast>,
    pub sec_excerpt: String,
    pub answer: AnalysisReport,
    pub warnings: Vec<String>,
}

/// `POST /sec/10k/analyze`
#[derive(Debug, Clone, Deserialize)]
pub struct Analyze10kRequest {
    pub ticker: String,
    #[serde(default)]
    pub focus: Option<String>,
    #[serde(default = "default_true")]
    pub use_ai: bool,
    #[serde(default)]
    pub max_chars: Option<usize>,
    #[serde(default)]
    pub use_finbert: bool,
    #[serde(default)]
    pub use_llm: bool,
    #[serde(default = "default_top_n")]
    pub finbert_top_n: usize,
}

impl Analyze10kRequest {
    /// Request with defaults for `ticker`
    pub fn new(ticker: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            focus: None,
            use_ai: true,
            max_chars: None,
            use_finbert: false,
            use_llm: false,
            finbert_top_n: DEFAULT_TOP_N,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Analyze10kResponse {
    pub ticker: String,
    pub cik: Cik,
    pub form: FormType,
    pub filing_date: Option<NaiveDate>,
    pub report_date: Option<NaiveDate>,
    pub accession: AccessionNumber,
    pub analysis: FilingAnalysis,
    pub finbert: Option<RiskReport>,
    pub llm: Option<LocalLlmResult>,
    pub warnings: Vec<String>,
}

/// `GET /sec/xbrl/metrics`
#[derive(Debug, Clone, Deserialize)]
pub struct XbrlMetricsQuery {
    pub ticker: String,
    #[serde(default = "default_years")]
    pub years: usize,
}

/// `POST /ai/analyze/xbrl`
#[derive(Debug, Clone, Deserialize)]
pub struct XbrlAnalyzeRequest {
    pub ticker: String,
    #[serde(default = "default_years")]
    pub years: usize,
    #[serde(default)]
    pub output_lang: Option<String>,
}

/// `POST /ai/analyze`
#[derive(Debug, Clone, Deserialize)]
pub struct AnalyzeRequest {
    pub ticker: String,
    #[serde(default)]
    pub metrics: KeyMetrics,
    #[serde(default = "default_question")]
    pub question: String,
    /// Forecast object; anything that is not a complete forecast is ignored
    #[serde(default)]
    pub forecast: Value,
    #[serde(default)]
    pub sec_text: String,
}

impl AnalyzeRequest {
    pub fn forecast(&self) -> Option<Forecast> {
        serde_json::from_value(self.forecast.clone()).ok()
    }
}
