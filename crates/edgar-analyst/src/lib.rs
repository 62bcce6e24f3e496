//! SEC EDGAR financial analyst
//!
//! This crate turns a stock ticker into a financial analysis grounded in the
//! company's public filings. It includes:
//!
//! - Ticker to CIK resolution against the SEC company directory
//! - Annual filing discovery, download and a plain-text filing cache
//! - HTML text extraction with Risk Factors and MD&A slicing
//! - XBRL company facts and CSV datasets reduced to yearly metrics
//! - A linear revenue forecast and sentence-level risk sentiment scoring
//! - An AI analyst that tries a local model, a cloud model, then rules
//!
//! # Architecture
//!
//! Every SEC request goes through the [`sec::HttpFetch`] seam, implemented
//! in production by [`sec::SecHttpClient`] (rate limited, retried). The
//! [`AnalystService`] wires the stages together per request; heavy inference
//! resources live in one shared [`models::ModelManager`].
//!
//! # Example
//!
//! ```rust,ignore
//! use edgar_analyst::{AnalystConfig, AnalystService};
//! use edgar_analyst::service::{AskRequest, MetricsMode};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let service = AnalystService::from_config(AnalystConfig::from_env()?)?;
//!
//!     let response = service
//!         .ask(AskRequest {
//!             ticker: "AAPL".into(),
//!             question: "How durable is revenue growth?".into(),
//!             mode: MetricsMode::Xbrl,
//!             use_ai: true,
//!         })
//!         .await?;
//!     println!("{}", serde_json::to_string_pretty(&response)?);
//!
//!     Ok(())
//! }
//! ```

pub mod analyst;
pub mod config;
pub mod error;
pub mod extract;
pub mod forecast;
pub mod metrics;
pub mod models;
pub mod retry;
pub mod risk;
pub mod sec;
pub mod sentiment;
pub mod service;

#[cfg(test)]
mod test_support;

pub use analyst::{AnalysisReport, FilingAnalysis, ProviderKind};
pub use config::{AnalystConfig, LlmProfile};
pub use error::{AnalystError, Result};
pub use forecast::Forecast;
pub use metrics::{KeyMetrics, MetricSeries, MetricSnapshot};
pub use risk::RiskReport;
pub use service::AnalystService;
