//! Text-completion providers for edgar-analyst
//!
//! One trait, [`LLMProvider`], with two backends: an OpenAI-compatible
//! chat-completions client for the cloud tier and an Ollama client for the
//! local tier. Requests are a single system/user prompt pair.

pub mod completion;
pub mod error;
pub mod provider;
pub mod providers;

pub use completion::{CompletionRequest, CompletionResponse, FinishReason, TokenUsage};
pub use error::{LLMError, Result};
pub use provider::LLMProvider;
