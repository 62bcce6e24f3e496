//! MiniJinja-based template implementation
//!
//! Besides the standard Jinja2 syntax, templates rendered here can use two
//! money/ratio filters:
//! - `billions`: `{{ revenue | billions }}` renders `394.33` for 394_328_000_000
//! - `pct`: `{{ margin | pct }}` renders `25.3` for 0.2531

use crate::{Language, PromptError, PromptTemplate, Result};
use minijinja::Environment;
use std::collections::HashMap;

/// A prompt template backed by MiniJinja
pub struct JinjaTemplate {
    name: String,
    templates: HashMap<Language, String>,
}

impl JinjaTemplate {
    /// Create a new template builder
    pub fn builder(name: impl Into<String>) -> JinjaTemplateBuilder {
        JinjaTemplateBuilder::new(name)
    }

    /// Create from a single template (defaults to English)
    pub fn new(name: impl Into<String>, template: impl Into<String>) -> Result<Self> {
        Self::builder(name).english(template).build()
    }

    /// Create with English and Japanese templates
    pub fn bilingual(
        name: impl Into<String>,
        english: impl Into<String>,
        japanese: impl Into<String>,
    ) -> Result<Self> {
        Self::builder(name).english(english).japanese(japanese).build()
    }
}

fn environment() -> Environment<'static> {
    let mut env = Environment::new();
    env.add_filter("billions", |v: f64| format!("{:.2}", v / 1e9));
    env.add_filter("pct", |v: f64| format!("{:.1}", v * 100.0));
    env
}

impl PromptTemplate for JinjaTemplate {
    fn name(&self) -> &str {
        &self.name
    }

    fn languages(&self) -> Vec<Language> {
        self.templates.keys().cloned().collect()
    }

    fn render(&self, lang: &Language, vars: &serde_json::Value) -> Result<String> {
        let source = self
            .templates
            .get(lang)
            .ok_or_else(|| PromptError::MissingVariant {
                name: self.name.clone(),
                language: lang.code().to_string(),
            })?;

        environment()
            .render_str(source, minijinja::Value::from_serialize(vars))
            .map_err(|source| PromptError::Render {
                name: self.name.clone(),
                source,
            })
    }
}

impl std::fmt::Debug for JinjaTemplate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JinjaTemplate")
            .field("name", &self.name)
            .field("languages", &self.templates.keys().collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for [`JinjaTemplate`]
pub struct JinjaTemplateBuilder {
    name: String,
    templates: HashMap<Language, String>,
}

impl JinjaTemplateBuilder {
    /// Create a new builder with the given template name
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            templates: HashMap::new(),
        }
    }

    /// Add a template for a specific language
    pub fn template(mut self, lang: Language, content: impl Into<String>) -> Self {
        self.templates.insert(lang, content.into());
        self
    }

    /// Add English template
    pub fn english(self, content: impl Into<String>) -> Self {
        self.template(Language::English, content)
    }

    /// Add Japanese template
    pub fn japanese(self, content: impl Into<String>) -> Self {
        self.template(Language::Japanese, content)
    }

    /// Build the template, checking that every variant parses
    pub fn build(self) -> Result<JinjaTemplate> {
        if self.templates.is_empty() {
            return Err(PromptError::Empty(self.name));
        }

        let env = environment();
        for (lang, content) in &self.templates {
            env.template_from_str(content)
                .map_err(|source| PromptError::Syntax {
                    name: self.name.clone(),
                    language: lang.code().to_string(),
                    source,
                })?;
        }

        Ok(JinjaTemplate {
            name: self.name,
            templates: self.templates,
        })
    }
}
