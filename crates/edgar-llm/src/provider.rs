//! Provider trait

use crate::{CompletionRequest, CompletionResponse, Result};
use async_trait::async_trait;

/// A backend that turns one prompt into one reply
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse>;

    /// Short backend name used in logs, e.g. "openai" or "ollama"
    fn name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_provider_as_trait_object() {
        let mut mock = MockLLMProvider::new();
        mock.expect_complete()
            .withf(|request| request.json_mode)
            .times(1)
            .returning(|request| Ok(CompletionResponse::finished(format!("echo: {}", request.prompt))));

        let provider: Box<dyn LLMProvider> = Box::new(mock);
        let response = provider
            .complete(CompletionRequest::new("test-model", "hello").json_mode(true))
            .await
            .unwrap();

        assert_eq!(response.text, "echo: hello");
    }
}
