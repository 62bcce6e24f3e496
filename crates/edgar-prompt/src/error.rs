//! Prompt errors

use thiserror::Error;

pub type Result<T> = std::result::Result<T, PromptError>;

#[derive(Error, Debug)]
pub enum PromptError {
    /// Nothing registered under this name
    #[error("unknown prompt '{0}'")]
    UnknownPrompt(String),

    /// The prompt has no variant in the requested language
    #[error("prompt '{name}' has no '{language}' variant")]
    MissingVariant { name: String, language: String },

    /// A variant failed to compile
    #[error("prompt '{name}' ({language}) does not parse: {source}")]
    Syntax {
        name: String,
        language: String,
        source: minijinja::Error,
    },

    /// Rendering failed, usually a filter applied to a missing value
    #[error("prompt '{name}' failed to render: {source}")]
    Render {
        name: String,
        source: minijinja::Error,
    },

    /// Built without any language variant
    #[error("prompt '{0}' has no variants")]
    Empty(String),
}
