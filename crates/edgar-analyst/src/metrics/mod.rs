//! Financial metric model shared by the XBRL and CSV sources
//!
//! Ratios never fail: a zero or missing denominator yields `None`. The CSV
//! source additionally maps guarded ratios to `0.0` to keep its flat
//! summary fully populated.

pub mod csv;

pub use self::csv::CsvMetricsEngine;

use serde::ser::Serializer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Divide, yielding `None` when either side is missing or the denominator is zero
pub fn safe_ratio(numerator: Option<f64>, denominator: Option<f64>) -> Option<f64> {
    match (numerator, denominator) {
        (Some(n), Some(d)) if d != 0.0 && d.is_finite() && n.is_finite() => Some(n / d),
        _ => None,
    }
}

/// Operating cash flow minus the absolute capital expenditure
///
/// Missing capex counts as zero; missing cash flow yields `None`.
pub fn free_cash_flow(operating_cash_flow: Option<f64>, capex: Option<f64>) -> Option<f64> {
    operating_cash_flow.map(|ocf| ocf - capex.map_or(0.0, f64::abs))
}

/// Compound annual growth rate; both endpoints must be strictly positive
pub fn cagr(start: f64, end: f64, periods: f64) -> Option<f64> {
    if start <= 0.0 || end <= 0.0 || periods <= 0.0 {
        return None;
    }
    let rate = (end / start).powf(1.0 / periods) - 1.0;
    rate.is_finite().then_some(rate)
}

/// Round to four decimal places
pub fn round4(value: f64) -> f64 {
    (value * 10_000.0).round() / 10_000.0
}

/// Reported figures for one fiscal year
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct FinancialFigures {
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_income: Option<f64>,
    pub equity: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    pub capex: Option<f64>,
}

/// One fiscal year of reported and derived metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricSnapshot {
    pub fiscal_year: i32,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub operating_income: Option<f64>,
    pub equity: Option<f64>,
    pub operating_cash_flow: Option<f64>,
    /// Always stored as a positive outflow
    pub capex: Option<f64>,
    pub net_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub roe: Option<f64>,
    pub fcf: Option<f64>,
}

impl MetricSnapshot {
    /// Derive ratios from the reported figures
    pub fn from_figures(fiscal_year: i32, figures: FinancialFigures) -> Self {
        Self {
            fiscal_year,
            revenue: figures.revenue,
            net_income: figures.net_income,
            operating_income: figures.operating_income,
            equity: figures.equity,
            operating_cash_flow: figures.operating_cash_flow,
            capex: figures.capex.map(f64::abs),
            net_margin: safe_ratio(figures.net_income, figures.revenue),
            operating_margin: safe_ratio(figures.operating_income, figures.revenue),
            roe: safe_ratio(figures.net_income, figures.equity),
            fcf: free_cash_flow(figures.operating_cash_flow, figures.capex),
        }
    }
}

/// Where a series came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricSource {
    Xbrl,
    Csv,
}

/// Flat latest-year summary handed to the analyst prompts
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeyMetrics {
    pub latest_year: Option<i32>,
    pub revenue: Option<f64>,
    pub net_income: Option<f64>,
    pub net_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub roe: Option<f64>,
    pub fcf: Option<f64>,
    pub revenue_cagr_3yr: Option<f64>,
}

impl KeyMetrics {
    /// No figure is known
    pub fn is_empty(&self) -> bool {
        self.revenue.is_none() && self.net_income.is_none() && self.net_margin.is_none()
    }
}

/// Per-year metrics of one company, ordered by ascending fiscal year
#[derive(Debug, Clone, PartialEq)]
pub struct MetricSeries {
    pub ticker: String,
    pub currency: String,
    pub source: MetricSource,
    pub snapshots: Vec<MetricSnapshot>,
    pub revenue_cagr_3yr: Option<f64>,
    /// `fiscal_year` holds row positions because the source had no year column
    pub ordinal_years: bool,
}

impl MetricSeries {
    /// Create a series, sorting snapshots by year
    pub fn new(
        ticker: impl Into<String>,
        source: MetricSource,
        mut snapshots: Vec<MetricSnapshot>,
        revenue_cagr_3yr: Option<f64>,
    ) -> Self {
        snapshots.sort_by_key(|s| s.fiscal_year);
        Self {
            ticker: ticker.into(),
            currency: "USD".to_string(),
            source,
            snapshots,
            revenue_cagr_3yr,
            ordinal_years: false,
        }
    }

    /// Mark `fiscal_year` as a row position rather than a calendar year
    pub fn with_ordinal_years(mut self) -> Self {
        self.ordinal_years = true;
        self
    }

    /// Most recent snapshot
    pub fn latest(&self) -> Option<&MetricSnapshot> {
        self.snapshots.last()
    }

    /// Fiscal years, most recent first
    pub fn years_desc(&self) -> Vec<i32> {
        self.snapshots.iter().rev().map(|s| s.fiscal_year).collect()
    }

    /// `(year, revenue)` pairs with a known revenue, ascending
    pub fn revenue_points(&self) -> Vec<(i32, f64)> {
        self.snapshots
            .iter()
            .filter_map(|s| s.revenue.map(|r| (s.fiscal_year, r)))
            .collect()
    }

    /// Latest-year summary plus CAGR
    pub fn key_metrics(&self) -> KeyMetrics {
        let Some(latest) = self.latest() else {
            return KeyMetrics {
                revenue_cagr_3yr: self.revenue_cagr_3yr,
                ..KeyMetrics::default()
            };
        };
        KeyMetrics {
            latest_year: (!self.ordinal_years).then_some(latest.fiscal_year),
            revenue: latest.revenue,
            net_income: latest.net_income,
            net_margin: latest.net_margin,
            operating_margin: latest.operating_margin,
            roe: latest.roe,
            fcf: latest.fcf,
            revenue_cagr_3yr: self.revenue_cagr_3yr,
        }
    }

    /// One line per year, most recent first, for prompt context
    pub fn context_text(&self) -> String {
        let mut text = format!("XBRL Financial Data ({}):\n", self.ticker);
        for snapshot in self.snapshots.iter().rev() {
            text.push_str(&format!(
                "Year {}: Rev=${} Income=${} Margin={:.1}% FCF=${}\n",
                snapshot.fiscal_year,
                group_thousands(snapshot.revenue.unwrap_or_default()),
                group_thousands(snapshot.net_income.unwrap_or_default()),
                snapshot.net_margin.unwrap_or_default() * 100.0,
                group_thousands(snapshot.fcf.unwrap_or_default()),
            ));
        }
        text
    }
}

/// Dashboard payload: `{ticker, currency, source, years, data, revenue_cagr_3yr}`
#[derive(Serialize)]
struct SeriesPayload<'a> {
    ticker: &'a str,
    currency: &'a str,
    source: MetricSource,
    years: Vec<i32>,
    data: BTreeMap<i32, &'a MetricSnapshot>,
    revenue_cagr_3yr: Option<f64>,
}

impl Serialize for MetricSeries {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        SeriesPayload {
            ticker: &self.ticker,
            currency: &self.currency,
            source: self.source,
            years: self.years_desc(),
            data: self.snapshots.iter().map(|s| (s.fiscal_year, s)).collect(),
            revenue_cagr_3yr: self.revenue_cagr_3yr,
        }
        .serialize(serializer)
    }
}

fn group_thousands(value: f64) -> String {
    let rounded = value.round();
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(c);
    }
    if rounded < 0.0 {
        format!("-{grouped}")
    } else {
        grouped
    }
}
