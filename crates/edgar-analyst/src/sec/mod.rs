//! SEC EDGAR access: HTTP wrapper, ticker resolution, filing discovery,
//! filing text cache, document ingestion and XBRL company facts.
//!
//! Rate limit: 10 requests per second (as per SEC fair access policy)
//! User-Agent requirement: must identify the caller with a contact address

pub mod filings;
pub mod http;
pub mod ingest;
pub mod text_cache;
pub mod tickers;
pub mod xbrl;

pub use filings::{AccessionNumber, Cik, FilingLocator, FilingReference, FormType};
pub use http::{HttpFetch, HttpResponse, SecHttpClient};
pub use ingest::{FilingDocument, FilingIngestor, IngestStatus, IngestionOutcome};
pub use text_cache::{CachedFilingText, FilingTextCache, TextSource};
pub use tickers::TickerResolver;
pub use xbrl::XbrlClient;

/// Canonical ticker to CIK directory
pub const COMPANY_TICKERS_URL: &str = "https://www.sec.gov/files/company_tickers.json";

/// Base URL of the structured data API
pub const DATA_BASE_URL: &str = "https://data.sec.gov";

/// Base URL of filing archives
pub const ARCHIVES_BASE_URL: &str = "https://www.sec.gov/Archives/edgar/data";
