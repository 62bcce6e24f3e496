//! Filing document download and text ingestion
//!
//! [`FilingIngestor::latest_filing_text`] never fails: every problem is
//! reported through the outcome's status and warnings so that callers can
//! continue with degraded data.

use super::filings::{FilingLocator, FilingReference, FormType};
use super::http::HttpFetch;
use super::text_cache::{FilingTextCache, TextSource};
use super::tickers::TickerResolver;
use crate::config::AnalystConfig;
use crate::error::{AnalystError, Result};
use crate::extract::{html_to_text, truncate_chars};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// Outcome category of a text ingestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IngestStatus {
    /// Valid text retrieved
    Success,
    /// Nothing attempted because of missing configuration
    Warning,
    /// Attempted and failed
    Error,
}

/// Result of [`FilingIngestor::latest_filing_text`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestionOutcome {
    pub status: IngestStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<TextSource>,
    pub sec_text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reference: Option<FilingReference>,
    pub warnings: Vec<String>,
}

impl IngestionOutcome {
    fn failed(status: IngestStatus, warnings: Vec<String>) -> Self {
        Self {
            status,
            source: None,
            sec_text: String::new(),
            reference: None,
            warnings,
        }
    }

    /// Valid text was retrieved
    pub fn is_success(&self) -> bool {
        self.status == IngestStatus::Success
    }
}

/// Raw HTML of a filing's primary document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingDocument {
    pub reference: FilingReference,
    pub html: String,
}

#[derive(Debug, Default, Deserialize)]
struct FilingIndex {
    #[serde(default)]
    directory: IndexDirectory,
}

#[derive(Debug, Default, Deserialize)]
struct IndexDirectory {
    #[serde(default)]
    item: Vec<IndexItem>,
}

#[derive(Debug, Deserialize)]
struct IndexItem {
    name: String,
}

/// Downloads filings and maintains the text cache
pub struct FilingIngestor {
    http: Arc<dyn HttpFetch>,
    resolver: Arc<TickerResolver>,
    locator: FilingLocator,
    cache: FilingTextCache,
    max_text_chars: usize,
    user_agent_configured: bool,
}

impl FilingIngestor {
    /// Create an ingestor sharing the resolver with other components
    pub fn new(http: Arc<dyn HttpFetch>, resolver: Arc<TickerResolver>, config: &AnalystConfig) -> Self {
        Self {
            locator: FilingLocator::new(Arc::clone(&http), Some(config.filing_scan_limit)),
            cache: FilingTextCache::new(
                config.text_cache_dir(),
                config.meta_cache_dir(),
                config.min_valid_text_len,
            ),
            http,
            resolver,
            max_text_chars: config.max_text_chars,
            user_agent_configured: config.sec_user_agent.is_some(),
        }
    }

    /// Text cache used by this ingestor
    pub fn cache(&self) -> &FilingTextCache {
        &self.cache
    }

    /// Most recent annual report of a ticker with its primary document HTML
    #[instrument(skip(self))]
    pub async fn latest_10k_html(&self, ticker: &str) -> Result<FilingDocument> {
        let ticker = ticker.trim().to_uppercase();
        let cik = self.resolver.resolve(&ticker).await?;
        let reference = self.locator.locate(&ticker, &cik, &FormType::ANNUAL).await?;
        self.fetch_document(reference).await
    }

    /// Download a filing's primary document
    ///
    /// When the feed has no primary document name, the first `.htm`/`.html`
    /// entry of the filing's `index.json` listing is used instead.
    pub async fn fetch_document(&self, mut reference: FilingReference) -> Result<FilingDocument> {
        if reference.primary_document.trim().is_empty() {
            reference.primary_document = self.primary_from_index(&reference).await?;
        }

        let url = reference.document_url();
        info!("Fetching {} {} from {}", reference.ticker, reference.form.as_str(), url);
        let response = self.http.get(&url).await?.error_for_status(&url)?;

        Ok(FilingDocument {
            reference,
            html: response.text(),
        })
    }

    async fn primary_from_index(&self, reference: &FilingReference) -> Result<String> {
        let url = reference.index_url();
        let index: FilingIndex = self.http.get(&url).await?.error_for_status(&url)?.json()?;

        index
            .directory
            .item
            .into_iter()
            .map(|item| item.name)
            .find(|name| {
                let lower = name.to_lowercase();
                lower.ends_with(".htm") || lower.ends_with(".html")
            })
            .ok_or_else(|| {
                AnalystError::Data(format!(
                    "no HTML document in filing {}",
                    reference.accession
                ))
            })
    }

    /// Plain text of the most recent annual report with valid content
    #[instrument(skip(self))]
    pub async fn latest_filing_text(&self, ticker: &str) -> IngestionOutcome {
        if !self.user_agent_configured {
            return IngestionOutcome::failed(
                IngestStatus::Warning,
                vec!["SEC_USER_AGENT not set. Cannot fetch live data.".to_string()],
            );
        }

        let ticker = ticker.trim().to_uppercase();
        let cik = match self.resolver.resolve(&ticker).await {
            Ok(cik) => cik,
            Err(e) => {
                return IngestionOutcome::failed(
                    IngestStatus::Error,
                    vec![format!("Could not resolve CIK for ticker {ticker}: {e}")],
                );
            }
        };

        let candidates = match self.locator.candidates(&ticker, &cik, &FormType::ANNUAL).await {
            Ok(candidates) => candidates,
            Err(e) => {
                return IngestionOutcome::failed(
                    IngestStatus::Error,
                    vec![format!("Could not locate an annual filing for {ticker}: {e}")],
                );
            }
        };

        let mut warnings = Vec::new();
        for reference in candidates {
            if let Some(cached) = self.cache.get(&reference).await {
                debug!("Filing text cache hit for {}", cached.key);
                return self.success(cached.text, TextSource::Cache, reference, warnings);
            }

            let text = match self.fetch_text(&reference).await {
                Ok(text) => text,
                Err(e) => {
                    warn!("Failed to fetch filing {}: {}", reference.accession, e);
                    warnings.push(format!("Failed to fetch filing {}: {e}", reference.accession));
                    continue;
                }
            };

            if !self.cache.is_valid(&text) {
                warnings.push(format!(
                    "Filing {} text too short ({} chars); trying next",
                    reference.accession,
                    text.chars().count()
                ));
                continue;
            }

            if let Err(e) = self.cache.put(&reference, &text).await {
                warn!("Failed to cache filing text: {}", e);
            }
            return self.success(text, TextSource::Live, reference, warnings);
        }

        warnings.push("Could not retrieve valid filing text (too short or missing).".to_string());
        IngestionOutcome::failed(IngestStatus::Error, warnings)
    }

    async fn fetch_text(&self, reference: &FilingReference) -> Result<String> {
        let document = self.fetch_document(reference.clone()).await?;
        let text = tokio::task::spawn_blocking(move || html_to_text(&document.html)).await?;
        Ok(text)
    }

    fn success(
        &self,
        text: String,
        source: TextSource,
        reference: FilingReference,
        warnings: Vec<String>,
    ) -> IngestionOutcome {
        IngestionOutcome {
            status: IngestStatus::Success,
            source: Some(source),
            sec_text: truncate_chars(&text, self.max_text_chars).to_string(),
            reference: Some(reference),
            warnings,
        }
    }
}
