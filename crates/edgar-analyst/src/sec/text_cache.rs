//! On-disk cache of extracted filing text
//!
//! Entries are keyed by `{TICKER}_{accession}`. Text is stored as
//! `<text_dir>/{key}.txt` with a JSON metadata sidecar in `<meta_dir>`.
//! Only text longer than the minimum valid length is ever written or served.

use super::filings::FilingReference;
use super::tickers::write_atomic;
use crate::error::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Where a piece of filing text came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextSource {
    /// Served from the on-disk cache
    Cache,
    /// Fetched and extracted during this request
    Live,
}

/// Filing text with its cache key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedFilingText {
    pub key: String,
    pub text: String,
    pub source: TextSource,
}

/// Metadata sidecar written next to cached text
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilingMeta {
    pub ticker: String,
    pub cik: String,
    pub accession: String,
    pub form: String,
    pub report_date: Option<String>,
    pub filing_date: Option<String>,
    pub url: String,
}

impl From<&FilingReference> for FilingMeta {
    fn from(reference: &FilingReference) -> Self {
        Self {
            ticker: reference.ticker.clone(),
            cik: reference.cik.to_string(),
            accession: reference.accession.to_string(),
            form: reference.form.as_str().to_string(),
            report_date: reference.report_date.map(|d| d.to_string()),
            filing_date: reference.filing_date.map(|d| d.to_string()),
            url: reference.document_url(),
        }
    }
}

/// Filing text cache rooted in the data directory
#[derive(Debug, Clone)]
pub struct FilingTextCache {
    text_dir: PathBuf,
    meta_dir: PathBuf,
    min_valid_len: usize,
}

impl FilingTextCache {
    /// Create a cache; directories are created on first write
    pub fn new(text_dir: impl Into<PathBuf>, meta_dir: impl Into<PathBuf>, min_valid_len: usize) -> Self {
        Self {
            text_dir: text_dir.into(),
            meta_dir: meta_dir.into(),
            min_valid_len,
        }
    }

    /// Cache key of a filing
    pub fn key(reference: &FilingReference) -> String {
        format!(
            "{}_{}",
            reference.ticker.to_uppercase(),
            reference.accession.compact()
        )
    }

    /// Text is long enough to be worth keeping
    pub fn is_valid(&self, text: &str) -> bool {
        text.chars().count() > self.min_valid_len
    }

    fn text_path(&self, key: &str) -> PathBuf {
        self.text_dir.join(format!("{key}.txt"))
    }

    fn meta_path(&self, key: &str) -> PathBuf {
        self.meta_dir.join(format!("{key}.json"))
    }

    /// Cached text of a filing, if present and valid
    pub async fn get(&self, reference: &FilingReference) -> Option<CachedFilingText> {
        let key = Self::key(reference);
        let path = self.text_path(&key);
        let text = match tokio::fs::read_to_string(&path).await {
            Ok(text) => text,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    warn!("Failed to read cached text {}: {}", path.display(), e);
                }
                return None;
            }
        };

        if !self.is_valid(&text) {
            debug!("Ignoring cached text for {} below minimum length", key);
            return None;
        }

        Some(CachedFilingText {
            key,
            text,
            source: TextSource::Cache,
        })
    }

    /// Persist text and metadata; returns false when the text is too short to keep
    pub async fn put(&self, reference: &FilingReference, text: &str) -> Result<bool> {
        if !self.is_valid(text) {
            return Ok(false);
        }

        let key = Self::key(reference);
        write_atomic(&self.text_path(&key), text.as_bytes()).await?;

        let meta = serde_json::to_vec_pretty(&FilingMeta::from(reference))?;
        write_atomic(&self.meta_path(&key), &meta).await?;

        debug!("Cached {} chars of filing text as {}", text.len(), key);
        Ok(true)
    }

    /// Read the metadata sidecar of a filing
    pub async fn meta(&self, reference: &FilingReference) -> Option<FilingMeta> {
        read_json(&self.meta_path(&Self::key(reference))).await
    }
}

async fn read_json<T: for<'de> Deserialize<'de>>(path: &Path) -> Option<T> {
    let body = tokio::fs::read(path).await.ok()?;
    serde_json::from_slice(&body).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sec::filings::{AccessionNumber, Cik, FormType};
    use chrono::NaiveDate;

    fn reference() -> FilingReference {
        FilingReference {
            ticker: "AAPL".to_string(),
            cik: Cik::new(320_193),
            accession: AccessionNumber::parse("0000320193-24-000123").unwrap(),
            form: FormType::TenK,
            filing_date: NaiveDate::from_ymd_opt(2024, 11, 1),
            report_date: NaiveDate::from_ymd_opt(2024, 9, 28),
            primary_document: "aapl-20240928.htm".to_string(),
        }
    }

    fn cache(root: &Path) -> FilingTextCache {
        FilingTextCache::new(root.join("sec_text"), root.join("sec_cache"), 1000)
    }

    #[test]
    fn test_key_format() {
        assert_eq!(FilingTextCache::key(&reference()), "AAPL_000032019324000123");
    }

    #[tokio::test]
    async fn test_put_then_get() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        let text = "Risk factors. ".repeat(100);

        assert!(cache.put(&reference(), &text).await.unwrap());
        let cached = cache.get(&reference()).await.unwrap();
        assert_eq!(cached.text, text);
        assert_eq!(cached.source, TextSource::Cache);

        let meta = cache.meta(&reference()).await.unwrap();
        assert_eq!(meta.accession, "0000320193-24-000123");
        assert_eq!(meta.report_date.as_deref(), Some("2024-09-28"));
        assert!(meta.url.ends_with("/aapl-20240928.htm"));
    }

    #[tokio::test]
    async fn test_short_text_never_cached() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());

        assert!(!cache.put(&reference(), "too short").await.unwrap());
        assert!(cache.get(&reference()).await.is_none());
        assert!(!dir.path().join("sec_text").exists());
    }

    #[tokio::test]
    async fn test_short_file_on_disk_is_a_miss() {
        let dir = tempfile::tempdir().unwrap();
        let cache = cache(dir.path());
        std::fs::create_dir_all(dir.path().join("sec_text")).unwrap();
        std::fs::write(
            dir.path().join("sec_text/AAPL_000032019324000123.txt"),
            "x".repeat(1000),
        )
        .unwrap();

        assert!(cache.get(&reference()).await.is_none());
    }
}
