//! Ticker to CIK resolution backed by the SEC company directory
//!
//! Lookup order: in-process memo, directory table (memory, then on-disk
//! snapshot), then a single refresh of the directory from SEC. A ticker
//! missing after the refresh is reported as not found. Concurrent misses
//! share one refresh.

use super::COMPANY_TICKERS_URL;
use super::filings::Cik;
use super::http::HttpFetch;
use crate::error::{AnalystError, Result};
use cached::{Cached, TimedCache};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

type TickerTable = Arc<HashMap<String, Cik>>;

#[derive(Debug, Deserialize)]
struct DirectoryEntry {
    cik_str: u64,
    ticker: String,
}

/// Resolves exchange tickers to CIKs
pub struct TickerResolver {
    http: Arc<dyn HttpFetch>,
    snapshot_path: PathBuf,
    table: RwLock<Option<TickerTable>>,
    memo: Mutex<TimedCache<String, Cik>>,
    /// Completed directory refreshes; held while a refresh is in flight
    refreshes: Mutex<u64>,
}

impl TickerResolver {
    /// Create a resolver persisting the directory at `snapshot_path`
    pub fn new(http: Arc<dyn HttpFetch>, snapshot_path: impl Into<PathBuf>, memo_ttl: Duration) -> Self {
        Self {
            http,
            snapshot_path: snapshot_path.into(),
            table: RwLock::new(None),
            memo: Mutex::new(TimedCache::with_lifespan(memo_ttl)),
            refreshes: Mutex::new(0),
        }
    }

    /// Resolve a ticker (case-insensitive) to its CIK
    #[instrument(skip(self))]
    pub async fn resolve(&self, ticker: &str) -> Result<Cik> {
        let key = ticker.trim().to_uppercase();
        if key.is_empty() {
            return Err(AnalystError::TickerNotFound(ticker.to_string()));
        }

        if let Some(cik) = self.memo.lock().await.cache_get(&key).cloned() {
            return Ok(cik);
        }

        let seen = *self.refreshes.lock().await;
        let table = self.current_table().await;
        let cik = match table.get(&key) {
            Some(cik) => cik.clone(),
            None => {
                debug!("{} not in directory snapshot, refreshing", key);
                let refreshed = self.refresh_after_miss(seen).await?;
                refreshed
                    .get(&key)
                    .cloned()
                    .ok_or_else(|| AnalystError::TickerNotFound(key.clone()))?
            }
        };

        let _ = self.memo.lock().await.cache_set(key, cik.clone());
        Ok(cik)
    }

    async fn current_table(&self) -> TickerTable {
        if let Some(table) = self.table.read().await.as_ref() {
            return Arc::clone(table);
        }

        let mut guard = self.table.write().await;
        if let Some(table) = guard.as_ref() {
            return Arc::clone(table);
        }

        let table = Arc::new(load_snapshot(&self.snapshot_path).await.unwrap_or_default());
        *guard = Some(Arc::clone(&table));
        table
    }

    /// Refresh unless another caller finished one since `seen`
    async fn refresh_after_miss(&self, seen: u64) -> Result<TickerTable> {
        let mut refreshes = self.refreshes.lock().await;
        if *refreshes != seen {
            debug!("Directory refreshed by a concurrent lookup");
            return Ok(self.current_table().await);
        }
        let table = self.refresh().await?;
        *refreshes += 1;
        Ok(table)
    }

    async fn refresh(&self) -> Result<TickerTable> {
        let response = self
            .http
            .get(COMPANY_TICKERS_URL)
            .await?
            .error_for_status(COMPANY_TICKERS_URL)?;
        let table = Arc::new(parse_directory(&response.body)?);
        info!("Fetched ticker directory with {} entries", table.len());

        if let Err(e) = write_atomic(&self.snapshot_path, &response.body).await {
            warn!("Failed to persist ticker snapshot: {}", e);
        }

        *self.table.write().await = Some(Arc::clone(&table));
        Ok(table)
    }
}

fn parse_directory(body: &[u8]) -> Result<HashMap<String, Cik>> {
    let entries: HashMap<String, DirectoryEntry> = serde_json::from_slice(body)?;
    Ok(entries
        .into_values()
        .filter(|entry| entry.cik_str > 0)
        .map(|entry| (entry.ticker.trim().to_uppercase(), Cik::new(entry.cik_str)))
        .collect())
}

async fn load_snapshot(path: &Path) -> Option<HashMap<String, Cik>> {
    let body = tokio::fs::read(path).await.ok()?;
    match parse_directory(&body) {
        Ok(table) => Some(table),
        Err(e) => {
            warn!("Ignoring unreadable ticker snapshot {}: {}", path.display(), e);
            None
        }
    }
}

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Write through a uniquely named sibling file, then rename into place
pub(crate) async fn write_atomic(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(
        ".{}.{}.{}.tmp",
        file_name,
        std::process::id(),
        TMP_COUNTER.fetch_add(1, Ordering::Relaxed)
    ));
    tokio::fs::write(&tmp, contents).await?;
    if let Err(e) = tokio::fs::rename(&tmp, path).await {
        let _ = tokio::fs::remove_file(&tmp).await;
        return Err(e);
    }
    Ok(())
}
