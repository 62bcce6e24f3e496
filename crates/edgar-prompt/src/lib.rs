//! Prompt template management for edgar-analyst
//!
//! Analyst prompts exist in English and Japanese. Templates are rendered with
//! Jinja2 syntax through MiniJinja and looked up by name in a registry that
//! falls back to English when a language variant is missing.
//!
//! # Quick Start
//!
//! ```
//! use edgar_prompt::{JinjaTemplate, Language, PromptRegistry, PromptTemplate};
//! use serde_json::json;
//!
//! let template = JinjaTemplate::bilingual(
//!     "summary",
//!     "Summarise {{ ticker }}",
//!     "{{ ticker }} を要約してください",
//! ).unwrap();
//!
//! let en = template.render(&Language::English, &json!({ "ticker": "AAPL" })).unwrap();
//! assert_eq!(en, "Summarise AAPL");
//!
//! let mut registry = PromptRegistry::with_language(Language::Japanese);
//! registry.register(template);
//! let ja = registry.render("summary", &json!({ "ticker": "AAPL" })).unwrap();
//! assert_eq!(ja, "AAPL を要約してください");
//! ```

mod error;
mod jinja;
mod language;
mod registry;
mod template;

pub use error::{PromptError, Result};
pub use jinja::{JinjaTemplate, JinjaTemplateBuilder};
pub use language::Language;
pub use registry::PromptRegistry;
pub use template::PromptTemplate;
