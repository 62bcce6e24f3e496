//! Filing identifiers and the submissions-feed locator

use super::http::HttpFetch;
use super::{ARCHIVES_BASE_URL, DATA_BASE_URL};
use crate::error::{AnalystError, Result};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument};

/// Central Index Key, stored zero-padded to 10 digits
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Cik(String);

impl Cik {
    /// Create from the numeric identifier
    pub fn new(value: u64) -> Self {
        Self(format!("{value:010}"))
    }

    /// Parse a padded or unpadded CIK string
    pub fn parse(raw: &str) -> Result<Self> {
        let trimmed = raw.trim();
        trimmed
            .parse::<u64>()
            .ok()
            .filter(|v| *v > 0 && trimmed.len() <= 10)
            .map(Self::new)
            .ok_or_else(|| AnalystError::Data(format!("invalid CIK: {raw:?}")))
    }

    /// Zero-padded form
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Numeric form, as used in archive paths
    pub fn as_u64(&self) -> u64 {
        self.0.parse().unwrap_or_default()
    }
}

impl fmt::Display for Cik {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Cik {
    type Error = AnalystError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Cik> for String {
    fn from(cik: Cik) -> Self {
        cik.0
    }
}

/// Accession number, canonical dashed form `NNNNNNNNNN-YY-NNNNNN`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AccessionNumber(String);

impl AccessionNumber {
    /// Parse either the dashed or the 18-digit concatenated form
    pub fn parse(raw: &str) -> Result<Self> {
        let digits: String = raw.trim().chars().filter(|c| *c != '-').collect();
        if digits.len() != 18 || !digits.chars().all(|c| c.is_ascii_digit()) {
            return Err(AnalystError::Data(format!("invalid accession number: {raw:?}")));
        }
        Ok(Self(format!(
            "{}-{}-{}",
            &digits[..10],
            &digits[10..12],
            &digits[12..]
        )))
    }

    /// Dashed form
    pub fn dashed(&self) -> &str {
        &self.0
    }

    /// Concatenated form used in archive paths and cache keys
    pub fn compact(&self) -> String {
        self.0.replace('-', "")
    }
}

impl fmt::Display for AccessionNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for AccessionNumber {
    type Error = AnalystError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<AccessionNumber> for String {
    fn from(accession: AccessionNumber) -> Self {
        accession.0
    }
}

/// Annual report form types the pipeline accepts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormType {
    /// Domestic annual report
    #[serde(rename = "10-K")]
    TenK,
    /// Foreign private issuer annual report
    #[serde(rename = "20-F")]
    TwentyF,
    /// Canadian issuer annual report
    #[serde(rename = "40-F")]
    FortyF,
}

impl FormType {
    /// Every accepted annual form
    pub const ANNUAL: [FormType; 3] = [FormType::TenK, FormType::TwentyF, FormType::FortyF];

    /// SEC form name
    pub fn as_str(&self) -> &'static str {
        match self {
            FormType::TenK => "10-K",
            FormType::TwentyF => "20-F",
            FormType::FortyF => "40-F",
        }
    }

    /// Parse an exact SEC form name; amendments are not matched
    pub fn parse(form: &str) -> Option<Self> {
        match form.trim() {
            "10-K" => Some(FormType::TenK),
            "20-F" => Some(FormType::TwentyF),
            "40-F" => Some(FormType::FortyF),
            _ => None,
        }
    }

    /// Slash-joined names for messages
    pub fn join(forms: &[FormType]) -> String {
        forms.iter().map(FormType::as_str).collect::<Vec<_>>().join("/")
    }
}

/// One resolved filing
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingReference {
    /// Upper-case ticker
    pub ticker: String,
    /// Company CIK
    pub cik: Cik,
    /// Accession number
    pub accession: AccessionNumber,
    /// Form type
    pub form: FormType,
    /// Date the filing was accepted
    pub filing_date: Option<NaiveDate>,
    /// Period the filing covers
    pub report_date: Option<NaiveDate>,
    /// Primary document file name
    pub primary_document: String,
}

impl FilingReference {
    /// Folder of the filing in the archives
    pub fn folder_url(&self) -> String {
        format!(
            "{}/{}/{}",
            ARCHIVES_BASE_URL,
            self.cik.as_u64(),
            self.accession.compact()
        )
    }

    /// URL of the primary document
    pub fn document_url(&self) -> String {
        format!("{}/{}", self.folder_url(), self.primary_document)
    }

    /// URL of the JSON directory listing
    pub fn index_url(&self) -> String {
        format!("{}/index.json", self.folder_url())
    }
}

/// Submissions feed (only the fields the locator reads)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CompanySubmissions {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub filings: FilingsData,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FilingsData {
    #[serde(default)]
    pub recent: RecentFilings,
}

/// Parallel arrays of recent filings, newest first
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RecentFilings {
    pub accession_number: Vec<String>,
    pub filing_date: Vec<String>,
    pub report_date: Vec<Option<String>>,
    pub form: Vec<String>,
    pub primary_document: Vec<String>,
}

impl RecentFilings {
    /// Entries of accepted forms among the first `limit`, in feed order
    pub fn matching(
        &self,
        ticker: &str,
        cik: &Cik,
        accepted: &[FormType],
        limit: Option<usize>,
    ) -> Vec<FilingReference> {
        let len = limit.map_or(self.form.len(), |k| k.min(self.form.len()));

        (0..len)
            .filter_map(|i| {
                let form = FormType::parse(&self.form[i])?;
                if !accepted.contains(&form) {
                    return None;
                }
                let accession = match self
                    .accession_number
                    .get(i)
                    .map(|raw| AccessionNumber::parse(raw))
                {
                    Some(Ok(accession)) => accession,
                    _ => {
                        debug!("Skipping entry {} with malformed accession number", i);
                        return None;
                    }
                };
                Some(FilingReference {
                    ticker: ticker.to_string(),
                    cik: cik.clone(),
                    accession,
                    form,
                    filing_date: self.filing_date.get(i).and_then(|d| parse_date(d)),
                    report_date: self
                        .report_date
                        .get(i)
                        .and_then(|d| d.as_deref())
                        .and_then(parse_date),
                    primary_document: self.primary_document.get(i).cloned().unwrap_or_default(),
                })
            })
            .collect()
    }
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").ok()
}

/// Finds the most recent filing of accepted form types
pub struct FilingLocator {
    http: Arc<dyn HttpFetch>,
    scan_limit: Option<usize>,
}

impl FilingLocator {
    /// Create a locator; `scan_limit` bounds how many feed entries are examined
    pub fn new(http: Arc<dyn HttpFetch>, scan_limit: Option<usize>) -> Self {
        Self { http, scan_limit }
    }

    /// Fetch the submissions feed of a company
    #[instrument(skip(self), fields(cik = %cik))]
    pub async fn submissions(&self, cik: &Cik) -> Result<CompanySubmissions> {
        let url = format!("{}/submissions/CIK{}.json", DATA_BASE_URL, cik.as_str());
        self.http.get(&url).await?.error_for_status(&url)?.json()
    }

    /// All accepted filings within the scan window, newest first
    pub async fn candidates(
        &self,
        ticker: &str,
        cik: &Cik,
        accepted: &[FormType],
    ) -> Result<Vec<FilingReference>> {
        let submissions = self.submissions(cik).await?;
        let found = submissions
            .filings
            .recent
            .matching(ticker, cik, accepted, self.scan_limit);
        if found.is_empty() {
            return Err(AnalystError::FilingNotFound {
                ticker: ticker.to_string(),
                forms: FormType::join(accepted),
            });
        }
        Ok(found)
    }

    /// Most recent accepted filing
    pub async fn locate(
        &self,
        ticker: &str,
        cik: &Cik,
        accepted: &[FormType],
    ) -> Result<FilingReference> {
        let mut found = self.candidates(ticker, cik, accepted).await?;
        Ok(found.remove(0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sec::http::{HttpResponse, MockHttpFetch};
    use serde_json::json;

    fn feed() -> serde_json::Value {
        json!({
            "name": "Apple Inc.",
            "filings": {"recent": {
                "accessionNumber": [
                    "0000320193-24-000081", "0000320193-24-000123",
                    "0000320193-23-000106", "0000320193-22-000108"
                ],
                "filingDate": ["2024-08-02", "2024-11-01", "2023-11-03", "2022-10-28"],
                "reportDate": ["2024-06-29", "2024-09-28", "", "2022-09-24"],
                "form": ["10-Q", "10-K", "10-K", "10-K"],
                "primaryDocument": ["aapl-20240629.htm", "aapl-20240928.htm", "aapl-20230930.htm", "aapl-20220924.htm"]
            }}
        })
    }

    #[test]
    fn test_cik_formats() {
        let cik = Cik::parse("320193").unwrap();
        assert_eq!(cik.as_str(), "0000320193");
        assert_eq!(cik.as_u64(), 320_193);
        assert_eq!(Cik::parse("0000320193").unwrap(), cik);
        assert!(Cik::parse("abc").is_err());
        assert!(Cik::parse("0").is_err());
    }

    #[test]
    fn test_accession_forms() {
        let dashed = AccessionNumber::parse("0000320193-24-000123").unwrap();
        let compact = AccessionNumber::parse("000032019324000123").unwrap();
        assert_eq!(dashed, compact);
        assert_eq!(dashed.dashed(), "0000320193-24-000123");
        assert_eq!(dashed.compact(), "000032019324000123");
        assert!(AccessionNumber::parse("0000320193-24-0001").is_err());
    }

    #[test]
    fn test_form_type_parse_is_exact() {
        assert_eq!(FormType::parse("10-K"), Some(FormType::TenK));
        assert_eq!(FormType::parse("20-F"), Some(FormType::TwentyF));
        assert_eq!(FormType::parse("10-K/A"), None);
        assert_eq!(FormType::join(&FormType::ANNUAL), "10-K/20-F/40-F");
    }

    #[test]
    fn test_first_matching_entry_wins() {
        let submissions: CompanySubmissions = serde_json::from_value(feed()).unwrap();
        let cik = Cik::new(320_193);
        let found = submissions
            .filings
            .recent
            .matching("AAPL", &cik, &FormType::ANNUAL, None);

        assert_eq!(found.len(), 3);
        let latest = &found[0];
        assert_eq!(latest.accession.dashed(), "0000320193-24-000123");
        assert_eq!(latest.report_date, NaiveDate::from_ymd_opt(2024, 9, 28));
        assert_eq!(
            latest.document_url(),
            "https://www.sec.gov/Archives/edgar/data/320193/000032019324000123/aapl-20240928.htm"
        );
        assert_eq!(found[1].report_date, None);
    }

    #[test]
    fn test_scan_limit_bounds_search() {
        let submissions: CompanySubmissions = serde_json::from_value(feed()).unwrap();
        let cik = Cik::new(320_193);
        let recent = &submissions.filings.recent;

        assert!(recent.matching("AAPL", &cik, &FormType::ANNUAL, Some(1)).is_empty());
        assert_eq!(recent.matching("AAPL", &cik, &FormType::ANNUAL, Some(2)).len(), 1);
        assert!(recent.matching("AAPL", &cik, &[FormType::TwentyF], None).is_empty());
    }

    #[tokio::test]
    async fn test_locate_uses_submissions_feed() {
        let mut http = MockHttpFetch::new();
        http.expect_get()
            .withf(|url| url == "https://data.sec.gov/submissions/CIK0000320193.json")
            .times(1)
            .returning(|_| Ok(HttpResponse::new(200, feed().to_string())));

        let locator = FilingLocator::new(Arc::new(http), Some(5));
        let filing = locator
            .locate("AAPL", &Cik::new(320_193), &[FormType::TenK])
            .await
            .unwrap();
        assert_eq!(filing.primary_document, "aapl-20240928.htm");
    }

    #[tokio::test]
    async fn test_empty_feed_is_not_found() {
        let mut http = MockHttpFetch::new();
        http.expect_get()
            .returning(|_| Ok(HttpResponse::new(200, r#"{"filings": {"recent": {}}}"#)));

        let locator = FilingLocator::new(Arc::new(http), None);
        let result = locator
            .locate("NEWCO", &Cik::new(1), &FormType::ANNUAL)
            .await;
        assert!(matches!(result, Err(AnalystError::FilingNotFound { .. })));
    }
}
