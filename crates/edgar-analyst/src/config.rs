//! Configuration for the analyst pipeline

use crate::error::{AnalystError, Result};
use crate::retry::RetryPolicy;
use edgar_prompt::Language;
use edgar_utils::{env_opt, env_or, env_parse};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// User agent sent when `SEC_USER_AGENT` is not configured
pub const PLACEHOLDER_USER_AGENT: &str = "edgar-analyst (contact@example.com)";

/// Which local model family to load
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LlmProfile {
    /// Finance-tuned model (default)
    #[default]
    Finance,
    /// General-purpose model
    General,
}

impl LlmProfile {
    fn from_env_value(value: &str) -> Self {
        if value.eq_ignore_ascii_case("finance") {
            Self::Finance
        } else {
            Self::General
        }
    }
}

/// Configuration for filing retrieval, metrics and AI providers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalystConfig {
    /// Root of all on-disk caches and the default CSV dataset
    pub data_dir: PathBuf,

    /// Identification string required by SEC fair-access policy
    pub sec_user_agent: Option<String>,

    /// Timeout for SEC metadata and document fetches
    pub metadata_timeout: Duration,

    /// Attempts for retryable HTTP and cloud AI calls
    pub max_retries: u32,

    /// Initial backoff duration for retries
    pub retry_backoff_base: Duration,

    /// SEC request quota
    pub requests_per_second: u32,

    /// Freshness window of cached XBRL company facts
    pub facts_ttl: Duration,

    /// Extracted filing text must be longer than this to be cached
    pub min_valid_text_len: usize,

    /// Recent submissions scanned when locating a filing
    pub filing_scan_limit: usize,

    /// Cap on filing text returned to callers
    pub max_text_chars: usize,

    /// Cloud AI credential
    #[serde(skip_serializing, default)]
    pub openai_api_key: Option<String>,

    /// Cloud AI base URL
    pub openai_api_base: String,

    /// Cloud AI model
    pub openai_model: String,

    /// Timeout for cloud AI calls
    pub cloud_timeout: Duration,

    /// Local Ollama daemon URL
    pub ollama_url: String,

    /// Local model family
    pub llm_profile: LlmProfile,

    /// Model used for the finance profile
    pub ollama_model_finance: String,

    /// Model used for the general profile
    pub ollama_model_general: String,

    /// Generation budget for the local model
    pub local_max_new_tokens: usize,

    /// Timeout for local generation
    pub local_timeout: Duration,

    /// Optional remote text-classification endpoint for risk scoring
    pub sentiment_endpoint: Option<String>,

    /// Report language
    pub output_lang: Language,

    /// Tabular financial dataset; defaults to `<data_dir>/financials_sec.csv`
    pub csv_path: Option<PathBuf>,
}

impl Default for AnalystConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            sec_user_agent: None,
            metadata_timeout: Duration::from_secs(10),
            max_retries: 3,
            retry_backoff_base: Duration::from_secs(1),
            requests_per_second: 10,
            facts_ttl: Duration::from_secs(24 * 60 * 60),
            min_valid_text_len: 1000,
            filing_scan_limit: 5,
            max_text_chars: 50_000,
            openai_api_key: None,
            openai_api_base: "https://api.openai.com/v1".to_string(),
            openai_model: "gpt-4o-mini".to_string(),
            cloud_timeout: Duration::from_secs(45),
            ollama_url: "http://127.0.0.1:11434".to_string(),
            llm_profile: LlmProfile::Finance,
            ollama_model_finance: "qwen2.5:7b".to_string(),
            ollama_model_general: "llama3.1:8b".to_string(),
            local_max_new_tokens: 800,
            local_timeout: Duration::from_secs(300),
            sentiment_endpoint: None,
            output_lang: Language::Japanese,
            csv_path: None,
        }
    }
}

impl AnalystConfig {
    /// Create a new configuration builder
    pub fn builder() -> AnalystConfigBuilder {
        AnalystConfigBuilder::default()
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let defaults = Self::default();
        let config = Self {
            data_dir: env_opt("EDGAR_DATA_DIR").map_or(defaults.data_dir, PathBuf::from),
            sec_user_agent: env_opt("SEC_USER_AGENT"),
            metadata_timeout: Duration::from_secs(env_parse("SEC_TIMEOUT_SECS", 10)),
            max_retries: env_parse("SEC_MAX_RETRIES", defaults.max_retries),
            facts_ttl: Duration::from_secs(env_parse("XBRL_CACHE_TTL_SECS", 24 * 60 * 60)),
            openai_api_key: env_opt("OPENAI_API_KEY"),
            openai_api_base: env_or("OPENAI_API_BASE", &defaults.openai_api_base),
            openai_model: env_or("OPENAI_MODEL", &defaults.openai_model),
            cloud_timeout: Duration::from_secs(env_parse("OPENAI_TIMEOUT_SECS", 45)),
            ollama_url: env_or("OLLAMA_URL", &defaults.ollama_url),
            llm_profile: LlmProfile::from_env_value(&env_or("LLM_PROFILE", "finance")),
            ollama_model_finance: env_or("OLLAMA_MODEL_FINANCE", &defaults.ollama_model_finance),
            ollama_model_general: env_or("OLLAMA_MODEL_GENERAL", &defaults.ollama_model_general),
            local_max_new_tokens: env_parse("LOCAL_MAX_NEW_TOKENS", defaults.local_max_new_tokens),
            local_timeout: Duration::from_secs(env_parse("OLLAMA_TIMEOUT_SECS", 300)),
            sentiment_endpoint: env_opt("SENTIMENT_ENDPOINT"),
            output_lang: Language::from_code(&env_or("OUTPUT_LANG", "ja")),
            csv_path: env_opt("FINANCIALS_CSV").map(PathBuf::from),
            ..defaults
        };
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_retries == 0 {
            return Err(AnalystError::Config(
                "max_retries must be greater than 0".to_string(),
            ));
        }

        if self.requests_per_second == 0 {
            return Err(AnalystError::Config(
                "requests_per_second must be greater than 0".to_string(),
            ));
        }

        if !self.output_lang.is_known() {
            return Err(AnalystError::Config(format!(
                "output_lang must be 'en' or 'ja', got '{}'",
                self.output_lang.code()
            )));
        }

        Ok(())
    }

    /// Retry policy shared by the SEC client and the cloud provider
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_backoff_base, 2.0)
    }

    /// User agent to send to SEC, falling back to a placeholder
    pub fn user_agent(&self) -> &str {
        self.sec_user_agent
            .as_deref()
            .unwrap_or(PLACEHOLDER_USER_AGENT)
    }

    /// Whether a cloud AI credential is present
    pub fn has_cloud_credential(&self) -> bool {
        self.openai_api_key.is_some()
    }

    /// Ollama model selected by the configured profile
    pub fn local_model(&self) -> &str {
        match self.llm_profile {
            LlmProfile::Finance => &self.ollama_model_finance,
            LlmProfile::General => &self.ollama_model_general,
        }
    }

    /// On-disk snapshot of the SEC ticker directory
    pub fn ticker_snapshot_path(&self) -> PathBuf {
        self.data_dir.join("company_tickers.json")
    }

    /// Directory of cached filing plain text
    pub fn text_cache_dir(&self) -> PathBuf {
        self.data_dir.join("sec_text")
    }

    /// Directory of filing metadata sidecars
    pub fn meta_cache_dir(&self) -> PathBuf {
        self.data_dir.join("sec_cache")
    }

    /// Directory of cached XBRL company facts
    pub fn xbrl_cache_dir(&self) -> PathBuf {
        self.data_dir.join("sec_xbrl_cache")
    }

    /// Tabular financial dataset path
    pub fn csv_path(&self) -> PathBuf {
        self.csv_path
            .clone()
            .unwrap_or_else(|| self.data_dir.join("financials_sec.csv"))
    }
}

/// Builder for AnalystConfig
#[derive(Debug, Default)]
pub struct AnalystConfigBuilder {
    data_dir: Option<PathBuf>,
    sec_user_agent: Option<String>,
    metadata_timeout: Option<Duration>,
    max_retries: Option<u32>,
    retry_backoff_base: Option<Duration>,
    facts_ttl: Option<Duration>,
    openai_api_key: Option<String>,
    openai_api_base: Option<String>,
    ollama_url: Option<String>,
    llm_profile: Option<LlmProfile>,
    sentiment_endpoint: Option<String>,
    output_lang: Option<Language>,
    csv_path: Option<PathBuf>,
}

impl AnalystConfigBuilder {
    /// Set the cache root
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Set the SEC user agent
    pub fn sec_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.sec_user_agent = Some(user_agent.into());
        self
    }

    /// Set the SEC request timeout
    pub fn metadata_timeout(mut self, duration: Duration) -> Self {
        self.metadata_timeout = Some(duration);
        self
    }

    /// Set maximum attempts
    pub fn max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    /// Set retry backoff base duration
    pub fn retry_backoff_base(mut self, duration: Duration) -> Self {
        self.retry_backoff_base = Some(duration);
        self
    }

    /// Set XBRL facts freshness window
    pub fn facts_ttl(mut self, duration: Duration) -> Self {
        self.facts_ttl = Some(duration);
        self
    }

    /// Set the cloud AI credential
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Set the cloud AI base URL
    pub fn openai_api_base(mut self, base: impl Into<String>) -> Self {
        self.openai_api_base = Some(base.into());
        self
    }

    /// Set the Ollama daemon URL
    pub fn ollama_url(mut self, url: impl Into<String>) -> Self {
        self.ollama_url = Some(url.into());
        self
    }

    /// Set the local model profile
    pub fn llm_profile(mut self, profile: LlmProfile) -> Self {
        self.llm_profile = Some(profile);
        self
    }

    /// Use a remote sentiment classifier
    pub fn sentiment_endpoint(mut self, url: impl Into<String>) -> Self {
        self.sentiment_endpoint = Some(url.into());
        self
    }

    /// Set the report language
    pub fn output_lang(mut self, lang: Language) -> Self {
        self.output_lang = Some(lang);
        self
    }

    /// Set the CSV dataset path
    pub fn csv_path(mut self, path: impl AsRef<Path>) -> Self {
        self.csv_path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<AnalystConfig> {
        let defaults = AnalystConfig::default();

        let config = AnalystConfig {
            data_dir: self.data_dir.unwrap_or(defaults.data_dir.clone()),
            sec_user_agent: self.sec_user_agent,
            metadata_timeout: self.metadata_timeout.unwrap_or(defaults.metadata_timeout),
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            retry_backoff_base: self.retry_backoff_base.unwrap_or(defaults.retry_backoff_base),
            facts_ttl: self.facts_ttl.unwrap_or(defaults.facts_ttl),
            openai_api_key: self.openai_api_key,
            openai_api_base: self.openai_api_base.unwrap_or(defaults.openai_api_base.clone()),
            ollama_url: self.ollama_url.unwrap_or(defaults.ollama_url.clone()),
            llm_profile: self.llm_profile.unwrap_or(defaults.llm_profile),
            sentiment_endpoint: self.sentiment_endpoint,
            output_lang: self.output_lang.unwrap_or(defaults.output_lang.clone()),
            csv_path: self.csv_path,
            ..defaults
        };

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AnalystConfig::default();
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.metadata_timeout, Duration::from_secs(10));
        assert_eq!(config.output_lang, Language::Japanese);
        assert_eq!(config.local_model(), "qwen2.5:7b");
        assert!(!config.has_cloud_credential());
        assert_eq!(config.user_agent(), PLACEHOLDER_USER_AGENT);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_builder() {
        let config = AnalystConfig::builder()
            .data_dir("/tmp/edgar")
            .sec_user_agent("Research Bot (ops@example.org)")
            .llm_profile(LlmProfile::General)
            .output_lang(Language::English)
            .build()
            .unwrap();

        assert_eq!(config.text_cache_dir(), PathBuf::from("/tmp/edgar/sec_text"));
        assert_eq!(config.csv_path(), PathBuf::from("/tmp/edgar/financials_sec.csv"));
        assert_eq!(config.local_model(), "llama3.1:8b");
        assert_eq!(config.user_agent(), "Research Bot (ops@example.org)");
    }

    #[test]
    fn test_validation_rejects_zero_retries() {
        assert!(AnalystConfig::builder().max_retries(0).build().is_err());
    }

    #[test]
    fn test_validation_rejects_unknown_language() {
        let config = AnalystConfig {
            output_lang: Language::Other("fr".to_string()),
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(AnalystError::Config(_))));
    }

    #[test]
    fn test_retry_policy_doubles() {
        let policy = AnalystConfig::default().retry_policy();
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.backoff_duration(1), Duration::from_secs(1));
        assert_eq!(policy.backoff_duration(3), Duration::from_secs(4));
    }

    #[test]
    fn test_api_key_not_serialized() {
        let config = AnalystConfig::builder().openai_api_key("sk-secret").build().unwrap();
        let json = serde_json::to_string(&config).unwrap();
        assert!(!json.contains("sk-secret"));
    }
}
