//! Provider errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, LLMError>;

#[derive(Error, Debug)]
pub enum LLMError {
    /// Non-success status without a more specific mapping
    #[error("provider returned HTTP {status}: {body}")]
    Api { status: u16, body: String },

    #[error("provider rejected the API key")]
    Unauthorized,

    #[error("rate limited: {0}")]
    RateLimited(String),

    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("model '{0}' is not available")]
    ModelNotFound(String),

    #[error("no reply within {0}s")]
    Timeout(u64),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Http(#[from] reqwest::Error),

    /// Reply arrived but did not have the expected shape
    #[error("malformed reply: {0}")]
    MalformedResponse(String),

    #[error("provider misconfigured: {0}")]
    Config(String),
}

impl LLMError {
    /// Classify a non-success HTTP status
    pub fn from_status(status: u16, body: String, model: &str) -> Self {
        match status {
            401 | 403 => Self::Unauthorized,
            429 => Self::RateLimited(body),
            400 => Self::BadRequest(body),
            404 => Self::ModelNotFound(model.to_string()),
            _ => Self::Api { status, body },
        }
    }

    /// Wrap a send failure, naming client timeouts explicitly
    pub fn from_send(err: reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            Self::Timeout(timeout_secs)
        } else {
            Self::Http(err)
        }
    }

    /// Whether the same request may succeed on a later attempt
    pub fn is_transient(&self) -> bool {
        match self {
            Self::RateLimited(_) | Self::Timeout(_) => true,
            Self::Api { status, .. } => *status >= 500,
            Self::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
            _ => false,
        }
    }

    /// Retrying cannot help: credentials, request shape, model or setup are wrong
    pub fn is_permanent(&self) -> bool {
        matches!(
            self,
            Self::Unauthorized | Self::BadRequest(_) | Self::ModelNotFound(_) | Self::Config(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert!(matches!(LLMError::from_status(401, String::new(), "m"), LLMError::Unauthorized));
        assert!(matches!(
            LLMError::from_status(404, String::new(), "gpt-x"),
            LLMError::ModelNotFound(m) if m == "gpt-x"
        ));
        assert!(matches!(
            LLMError::from_status(503, "busy".into(), "m"),
            LLMError::Api { status: 503, .. }
        ));
    }

    #[test]
    fn test_transient_and_permanent() {
        assert!(LLMError::RateLimited("slow down".into()).is_transient());
        assert!(LLMError::Timeout(45).is_transient());
        assert!(LLMError::from_status(502, String::new(), "m").is_transient());
        assert!(!LLMError::from_status(418, String::new(), "m").is_transient());
        assert!(LLMError::Unauthorized.is_permanent());
        assert!(LLMError::ModelNotFound("gpt-x".into()).is_permanent());
        assert!(!LLMError::Timeout(45).is_permanent());
        assert!(!LLMError::MalformedResponse("no choices".into()).is_permanent());
    }
}
