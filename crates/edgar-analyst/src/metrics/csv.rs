//! Metrics from a tabular financial dataset
//!
//! Headers are standardised (trimmed, lower-cased, spaces to underscores)
//! and resolved by exact name first, then by substring. Every ratio is
//! guarded to `0.0` and rounded to four decimals. Without a year column,
//! matching rows keep file order and are numbered from zero.

use super::{FinancialFigures, MetricSeries, MetricSnapshot, MetricSource, cagr, round4};
use crate::error::{AnalystError, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

const TICKER_COLUMNS: &[&str] = &["ticker", "symbol", "company"];
const YEAR_COLUMNS: &[&str] = &["year", "fiscal_year"];
const REVENUE_COLUMNS: &[&str] = &["revenue", "total_revenue", "revenues"];
const NET_INCOME_COLUMNS: &[&str] = &["net_income"];
const OPERATING_INCOME_COLUMNS: &[&str] = &["operating_income"];
const EQUITY_COLUMNS: &[&str] = &["shareholders_equity", "stockholders_equity", "total_equity"];
const OCF_COLUMNS: &[&str] = &["operating_cash_flow"];
const CAPEX_COLUMNS: &[&str] = &["capital_expenditure", "capex"];

/// Standardised header name
pub fn standardize_header(header: &str) -> String {
    header.trim().to_lowercase().replace(' ', "_")
}

/// Index of the first column matching a candidate exactly, else by substring
fn find_column(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
        .or_else(|| {
            candidates
                .iter()
                .find_map(|c| headers.iter().position(|h| h.contains(c)))
        })
}

/// Exact match only, for identifier columns
fn find_exact(headers: &[String], candidates: &[&str]) -> Option<usize> {
    candidates
        .iter()
        .find_map(|c| headers.iter().position(|h| h == c))
}

/// Parse a numeric cell: `$1,234.5`, `(200)` and blanks are handled
fn parse_number(cell: &str) -> Option<f64> {
    let trimmed = cell.trim();
    let (negative, body) = match trimmed.strip_prefix('(').and_then(|s| s.strip_suffix(')')) {
        Some(inner) => (true, inner),
        None => (false, trimmed),
    };
    let cleaned: String = body
        .chars()
        .filter(|c| !matches!(c, ',' | '$' | ' '))
        .collect();
    if cleaned.is_empty() {
        return None;
    }
    let value: f64 = cleaned.parse().ok()?;
    value.is_finite().then_some(if negative { -value } else { value })
}

struct Columns {
    ticker: Option<usize>,
    year: Option<usize>,
    revenue: Option<usize>,
    net_income: Option<usize>,
    operating_income: Option<usize>,
    equity: Option<usize>,
    operating_cash_flow: Option<usize>,
    capex: Option<usize>,
}

impl Columns {
    fn resolve(headers: &[String]) -> Self {
        Self {
            ticker: find_exact(headers, TICKER_COLUMNS),
            year: find_exact(headers, YEAR_COLUMNS),
            revenue: find_column(headers, REVENUE_COLUMNS),
            net_income: find_column(headers, NET_INCOME_COLUMNS),
            operating_income: find_column(headers, OPERATING_INCOME_COLUMNS),
            equity: find_column(headers, EQUITY_COLUMNS),
            operating_cash_flow: find_column(headers, OCF_COLUMNS),
            capex: find_column(headers, CAPEX_COLUMNS),
        }
    }
}

/// Metrics engine over a CSV dataset with one row per company-year
#[derive(Debug, Clone)]
pub struct CsvMetricsEngine {
    path: PathBuf,
}

impl CsvMetricsEngine {
    /// Create an engine reading `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Dataset location
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Per-year metrics of a ticker, ascending by year
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn calculate_metrics(&self, ticker: &str) -> Result<MetricSeries> {
        let ticker = ticker.trim().to_uppercase();
        if !self.path.exists() {
            return Err(AnalystError::Data(format!(
                "financial data file not found: {}",
                self.path.display()
            )));
        }

        let mut reader = csv::ReaderBuilder::new()
            .flexible(true)
            .trim(csv::Trim::All)
            .from_path(&self.path)?;
        let headers: Vec<String> = reader.headers()?.iter().map(standardize_header).collect();
        let columns = Columns::resolve(&headers);
        if columns.year.is_none() {
            debug!("No year column, ordering rows by position");
        }

        let mut snapshots = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(idx) = columns.ticker {
                let matches = record
                    .get(idx)
                    .is_some_and(|cell| cell.trim().eq_ignore_ascii_case(&ticker));
                if !matches {
                    continue;
                }
            }

            let year = match columns.year {
                Some(idx) => match record.get(idx).and_then(parse_number) {
                    Some(year) => year as i32,
                    None => {
                        debug!("Skipping row without a fiscal year");
                        continue;
                    }
                },
                None => snapshots.len() as i32,
            };

            let cell = |idx: Option<usize>| idx.and_then(|i| record.get(i)).and_then(parse_number);
            let figures = FinancialFigures {
                revenue: cell(columns.revenue),
                net_income: cell(columns.net_income),
                operating_income: cell(columns.operating_income),
                equity: cell(columns.equity),
                operating_cash_flow: cell(columns.operating_cash_flow),
                capex: cell(columns.capex),
            };
            snapshots.push(guarded(MetricSnapshot::from_figures(year, figures)));
        }

        if snapshots.is_empty() {
            return Err(AnalystError::Data(format!(
                "no financial data found for {ticker}"
            )));
        }

        let mut series = MetricSeries::new(ticker, MetricSource::Csv, snapshots, None);
        if columns.year.is_none() {
            series = series.with_ordinal_years();
        }
        series.revenue_cagr_3yr = Some(round4(window_cagr(&series).unwrap_or(0.0)));
        Ok(series)
    }
}

fn guarded(mut snapshot: MetricSnapshot) -> MetricSnapshot {
    let zeroed = |ratio: Option<f64>| Some(round4(ratio.unwrap_or(0.0)));
    snapshot.net_margin = zeroed(snapshot.net_margin);
    snapshot.operating_margin = zeroed(snapshot.operating_margin);
    snapshot.roe = zeroed(snapshot.roe);
    snapshot.fcf = Some(snapshot.fcf.unwrap_or(0.0));
    snapshot
}

/// Three-year CAGR when four points exist, else growth annualised over the
/// span of years on record
fn window_cagr(series: &MetricSeries) -> Option<f64> {
    let points = series.revenue_points();
    let n = points.len();
    match n {
        0 | 1 => None,
        2 | 3 => {
            let (first_year, first) = points[0];
            let (last_year, last) = points[n - 1];
            cagr(first, last, f64::from(last_year - first_year))
        }
        _ => cagr(points[n - 4].1, points[n - 1].1, 3.0),
    }
}
