//! Shared test doubles

use async_trait::async_trait;
use edgar_llm::{CompletionRequest, CompletionResponse, LLMProvider};
use mockall::mock;

mock! {
    pub Provider {}

    #[async_trait]
    impl LLMProvider for Provider {
        async fn complete(&self, request: CompletionRequest) -> edgar_llm::Result<CompletionResponse>;
        fn name(&self) -> &str;
    }
}

/// Completion carrying `text`
pub fn completion(text: &str) -> CompletionResponse {
    CompletionResponse::finished(text)
}
