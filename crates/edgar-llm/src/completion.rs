//! Single-prompt completion exchange
//!
//! Every analyst call is one system prompt plus one user prompt, so requests
//! carry both as plain strings instead of a message list.

use serde::{Deserialize, Serialize};

const DEFAULT_MAX_TOKENS: usize = 1024;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    /// Provider-specific model identifier
    pub model: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system: Option<String>,
    pub prompt: String,
    pub max_tokens: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    /// Constrain output to a single JSON object where the backend supports it
    #[serde(default)]
    pub json_mode: bool,
}

impl CompletionRequest {
    pub fn new(model: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            system: None,
            prompt: prompt.into(),
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: None,
            json_mode: false,
        }
    }

    pub fn system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }

    pub fn max_tokens(mut self, max_tokens: usize) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn json_mode(mut self, enabled: bool) -> Self {
        self.json_mode = enabled;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionResponse {
    pub text: String,
    pub finish: FinishReason,
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Reply that ended normally, with no usage figures
    pub fn finished(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            finish: FinishReason::Stop,
            usage: TokenUsage::default(),
        }
    }

    /// Generation hit the token limit, so JSON output is likely cut short
    pub fn is_truncated(&self) -> bool {
        self.finish == FinishReason::Length
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    Length,
    Filtered,
}

impl FinishReason {
    /// Map the provider's finish string; unknown values count as a normal stop
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("length") => Self::Length,
            Some("content_filter") => Self::Filtered,
            _ => Self::Stop,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: usize,
    pub completion_tokens: usize,
}

impl TokenUsage {
    pub fn total(&self) -> usize {
        self.prompt_tokens + self.completion_tokens
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_defaults_and_setters() {
        let request = CompletionRequest::new("gpt-4o-mini", "Summarise the 10-K");
        assert_eq!(request.max_tokens, 1024);
        assert!(request.system.is_none());
        assert!(!request.json_mode);

        let request = request
            .system("You are a financial analyst")
            .max_tokens(2048)
            .temperature(0.7)
            .json_mode(true);
        assert_eq!(request.system.as_deref(), Some("You are a financial analyst"));
        assert_eq!(request.max_tokens, 2048);
        assert_eq!(request.temperature, Some(0.7));
        assert!(request.json_mode);
    }

    #[test]
    fn test_finish_reason_from_wire() {
        assert_eq!(FinishReason::from_wire(Some("stop")), FinishReason::Stop);
        assert_eq!(FinishReason::from_wire(Some("length")), FinishReason::Length);
        assert_eq!(FinishReason::from_wire(Some("content_filter")), FinishReason::Filtered);
        assert_eq!(FinishReason::from_wire(None), FinishReason::Stop);
    }

    #[test]
    fn test_truncation_and_usage() {
        let mut response = CompletionResponse::finished("{\"a\": 1");
        assert!(!response.is_truncated());
        response.finish = FinishReason::Length;
        response.usage = TokenUsage {
            prompt_tokens: 100,
            completion_tokens: 50,
        };
        assert!(response.is_truncated());
        assert_eq!(response.usage.total(), 150);
    }
}
