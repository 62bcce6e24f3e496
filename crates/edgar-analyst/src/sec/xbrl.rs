//! XBRL company facts retrieval and annual metric extraction

use super::DATA_BASE_URL;
use super::http::HttpFetch;
use super::tickers::{TickerResolver, write_atomic};
use crate::error::Result;
use crate::metrics::{FinancialFigures, MetricSeries, MetricSnapshot, MetricSource, cagr};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime};
use tracing::{debug, info, instrument, warn};

/// Accepted tags per metric, in preference order
pub const REVENUE_TAGS: &[&str] = &[
    "Revenues",
    "SalesRevenueNet",
    "RevenueFromContractWithCustomerExcludingAssessedTax",
    "RevenueFromContractWithCustomerIncludingAssessedTax",
];
pub const NET_INCOME_TAGS: &[&str] = &["NetIncomeLoss", "ProfitLoss"];
pub const OPERATING_INCOME_TAGS: &[&str] = &["OperatingIncomeLoss"];
pub const OPERATING_CASH_FLOW_TAGS: &[&str] = &["NetCashProvidedByUsedInOperatingActivities"];
pub const CAPEX_TAGS: &[&str] = &[
    "PaymentsToAcquirePropertyPlantAndEquipment",
    "PaymentsToAcquireProductiveAssets",
];
pub const EQUITY_TAGS: &[&str] = &[
    "StockholdersEquity",
    "StockholdersEquityIncludingPortionAttributableToNoncontrollingInterest",
];

const ANNUAL_FORMS: &[&str] = &["10-K", "20-F", "40-F"];

/// Company facts document (only the us-gaap taxonomy is read)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanyFacts {
    #[serde(default)]
    pub facts: Taxonomies,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Taxonomies {
    #[serde(rename = "us-gaap", default)]
    pub us_gaap: HashMap<String, Concept>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Concept {
    #[serde(default)]
    pub units: HashMap<String, Vec<FactRecord>>,
}

/// One reported value
#[derive(Debug, Clone, Deserialize)]
pub struct FactRecord {
    pub val: f64,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default)]
    pub form: Option<String>,
    #[serde(default)]
    pub frame: Option<String>,
}

impl FactRecord {
    /// Calendar year of an exact `CYnnnn` frame
    fn frame_year(&self) -> Option<i32> {
        let frame = self.frame.as_deref()?;
        if frame.len() != 6 {
            return None;
        }
        frame.strip_prefix("CY")?.parse().ok()
    }

    /// Period-end year of a record filed on an annual form
    fn annual_form_year(&self) -> Option<i32> {
        let form = self.form.as_deref()?;
        if !ANNUAL_FORMS.contains(&form) {
            return None;
        }
        self.end.as_deref()?.get(..4)?.parse().ok()
    }
}

/// Annual values of one unit: exact frames first, annual forms for the gaps
fn annual_values(records: &[FactRecord]) -> BTreeMap<i32, f64> {
    let mut values: BTreeMap<i32, f64> = records
        .iter()
        .filter_map(|r| r.frame_year().map(|y| (y, r.val)))
        .collect();

    for record in records {
        if let Some(year) = record.annual_form_year() {
            values.entry(year).or_insert(record.val);
        }
    }
    values
}

/// Series of the tag whose most recent year is greatest; earlier tags win ties
pub fn best_series(us_gaap: &HashMap<String, Concept>, tags: &[&str]) -> BTreeMap<i32, f64> {
    let mut best = BTreeMap::new();
    let mut best_year = i32::MIN;

    for tag in tags {
        let Some(concept) = us_gaap.get(*tag) else {
            continue;
        };
        let mut units: Vec<_> = concept.units.iter().collect();
        units.sort_by(|a, b| (a.0 != "USD").cmp(&(b.0 != "USD")).then(a.0.cmp(b.0)));

        for (_, records) in units {
            let series = annual_values(records);
            if let Some((&latest, _)) = series.last_key_value() {
                if latest > best_year {
                    debug!("Tag {} covers up to {}", tag, latest);
                    best_year = latest;
                    best = series;
                }
            }
        }
    }
    best
}

/// Build a metric series from a facts document
pub fn series_from_facts(ticker: &str, facts: &CompanyFacts, years: usize) -> MetricSeries {
    let us_gaap = &facts.facts.us_gaap;
    let revenue = best_series(us_gaap, REVENUE_TAGS);
    let net_income = best_series(us_gaap, NET_INCOME_TAGS);
    let operating_income = best_series(us_gaap, OPERATING_INCOME_TAGS);
    let operating_cash_flow = best_series(us_gaap, OPERATING_CASH_FLOW_TAGS);
    let capex = best_series(us_gaap, CAPEX_TAGS);
    let equity = best_series(us_gaap, EQUITY_TAGS);

    let snapshots = revenue
        .keys()
        .rev()
        .take(years)
        .map(|&year| {
            MetricSnapshot::from_figures(
                year,
                FinancialFigures {
                    revenue: revenue.get(&year).copied(),
                    net_income: net_income.get(&year).copied(),
                    operating_income: operating_income.get(&year).copied(),
                    equity: equity.get(&year).copied(),
                    operating_cash_flow: operating_cash_flow.get(&year).copied(),
                    capex: capex.get(&year).copied(),
                },
            )
        })
        .collect();

    let revenue_cagr_3yr = revenue.last_key_value().and_then(|(&latest, &end)| {
        let start = revenue.get(&(latest - 3))?;
        cagr(*start, end, 3.0)
    });

    MetricSeries::new(ticker, MetricSource::Xbrl, snapshots, revenue_cagr_3yr)
}

/// Company facts client with a per-ticker disk cache
pub struct XbrlClient {
    http: Arc<dyn HttpFetch>,
    resolver: Arc<TickerResolver>,
    cache_dir: PathBuf,
    ttl: Duration,
}

impl XbrlClient {
    /// Create a client caching under `cache_dir` for `ttl`
    pub fn new(
        http: Arc<dyn HttpFetch>,
        resolver: Arc<TickerResolver>,
        cache_dir: impl Into<PathBuf>,
        ttl: Duration,
    ) -> Self {
        Self {
            http,
            resolver,
            cache_dir: cache_dir.into(),
            ttl,
        }
    }

    fn cache_path(&self, ticker: &str) -> PathBuf {
        self.cache_dir.join(format!("{ticker}_facts.json"))
    }

    async fn read_fresh(&self, path: &Path) -> Option<Vec<u8>> {
        let modified = tokio::fs::metadata(path).await.ok()?.modified().ok()?;
        let age = SystemTime::now().duration_since(modified).unwrap_or_default();
        if age >= self.ttl {
            debug!("Facts cache {} is stale", path.display());
            return None;
        }
        tokio::fs::read(path).await.ok()
    }

    /// Raw company facts, served from disk while fresh
    #[instrument(skip(self))]
    pub async fn get_facts(&self, ticker: &str) -> Result<CompanyFacts> {
        let ticker = ticker.trim().to_uppercase();
        let path = self.cache_path(&ticker);

        if let Some(body) = self.read_fresh(&path).await {
            match serde_json::from_slice(&body) {
                Ok(facts) => return Ok(facts),
                Err(e) => warn!("Discarding unreadable facts cache {}: {}", path.display(), e),
            }
        }

        let cik = self.resolver.resolve(&ticker).await?;
        let url = format!("{}/api/xbrl/companyfacts/CIK{}.json", DATA_BASE_URL, cik.as_str());
        let response = self.http.get(&url).await?.error_for_status(&url)?;
        let facts = response.json()?;
        info!("Fetched company facts for {} ({} bytes)", ticker, response.body.len());

        if let Err(e) = write_atomic(&path, &response.body).await {
            warn!("Failed to cache company facts: {}", e);
        }
        Ok(facts)
    }

    /// Annual metrics for the most recent `years` fiscal years
    pub async fn extract_metrics(&self, ticker: &str, years: usize) -> Result<MetricSeries> {
        let ticker = ticker.trim().to_uppercase();
        let facts = self.get_facts(&ticker).await?;
        Ok(series_from_facts(&ticker, &facts, years))
    }
}
