//! Error types for the analyst pipeline

use thiserror::Error;

/// Errors raised by the filing, metrics and analysis pipeline
#[derive(Debug, Error)]
pub enum AnalystError {
    /// Ticker absent from the SEC ticker directory
    #[error("Ticker not found: {0}")]
    TickerNotFound(String),

    /// No filing of an accepted form type in the submissions feed
    #[error("No {forms} filing found for {ticker}")]
    FilingNotFound { ticker: String, forms: String },

    /// Network failure or retries exhausted
    #[error("Transport error: {0}")]
    Transport(String),

    /// Upstream answered with a non-success status that is not retried
    #[error("HTTP {status} from {url}")]
    Status { url: String, status: u16 },

    /// Missing or invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Input data missing or unusable
    #[error("Data unavailable: {0}")]
    Data(String),

    /// AI provider chain exhausted
    #[error("Provider failure: {0}")]
    Provider(String),

    /// Local inference resource could not be loaded
    #[error("Model load failed: {0}")]
    ModelLoad(String),

    /// Filesystem error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Prompt rendering error
    #[error("Prompt error: {0}")]
    Prompt(#[from] edgar_prompt::PromptError),

    /// LLM provider error
    #[error("LLM error: {0}")]
    Llm(#[from] edgar_llm::LLMError),

    /// Background task panicked or was cancelled
    #[error("Task error: {0}")]
    Task(#[from] tokio::task::JoinError),
}

impl AnalystError {
    /// Ticker, CIK or filing could not be resolved
    pub fn is_resolution(&self) -> bool {
        matches!(self, Self::TickerNotFound(_) | Self::FilingNotFound { .. })
    }
}

/// Result type alias for analyst operations
pub type Result<T> = std::result::Result<T, AnalystError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = AnalystError::TickerNotFound("ZZZZ".to_string());
        assert_eq!(err.to_string(), "Ticker not found: ZZZZ");

        let err = AnalystError::FilingNotFound {
            ticker: "AAPL".to_string(),
            forms: "10-K/20-F/40-F".to_string(),
        };
        assert_eq!(err.to_string(), "No 10-K/20-F/40-F filing found for AAPL");
    }

    #[test]
    fn test_resolution_classification() {
        assert!(AnalystError::TickerNotFound("X".into()).is_resolution());
        assert!(!AnalystError::Transport("timeout".into()).is_resolution());
    }
}
