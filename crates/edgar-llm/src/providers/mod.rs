//! Cloud (OpenAI-compatible) and local (Ollama) backends

pub mod ollama;
pub mod openai;

pub use ollama::{OllamaConfig, OllamaProvider};
pub use openai::{OpenAIConfig, OpenAIProvider};
