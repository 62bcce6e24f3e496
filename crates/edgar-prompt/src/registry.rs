//! Named prompt lookup

use crate::{Language, PromptError, PromptTemplate, Result};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Prompts keyed by name, rendered in one output language
///
/// Built once at startup and shared behind an `Arc`, so registration takes
/// `&mut self` and rendering needs no locking.
pub struct PromptRegistry {
    prompts: BTreeMap<String, Arc<dyn PromptTemplate>>,
    language: Language,
}

impl PromptRegistry {
    pub fn with_language(language: Language) -> Self {
        Self {
            prompts: BTreeMap::new(),
            language,
        }
    }

    pub fn language(&self) -> &Language {
        &self.language
    }

    /// Add a prompt; a later prompt with the same name wins
    pub fn register<T: PromptTemplate + 'static>(&mut self, prompt: T) {
        self.prompts.insert(prompt.name().to_string(), Arc::new(prompt));
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PromptTemplate>> {
        self.prompts.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.prompts.contains_key(name)
    }

    /// Render in the registry language
    pub fn render(&self, name: &str, vars: &serde_json::Value) -> Result<String> {
        self.render_with_lang(name, &self.language, vars)
    }

    /// Render in `lang`, falling back to English when that variant is absent
    pub fn render_with_lang(
        &self,
        name: &str,
        lang: &Language,
        vars: &serde_json::Value,
    ) -> Result<String> {
        self.prompts
            .get(name)
            .ok_or_else(|| PromptError::UnknownPrompt(name.to_string()))?
            .render_with_fallback(lang, vars)
    }

    /// Registered names in sorted order
    pub fn list(&self) -> Vec<String> {
        self.prompts.keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}

impl Default for PromptRegistry {
    fn default() -> Self {
        Self::with_language(Language::English)
    }
}

impl std::fmt::Debug for PromptRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PromptRegistry")
            .field("prompts", &self.list())
            .field("language", &self.language)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::JinjaTemplate;
    use serde_json::json;

    fn registry() -> PromptRegistry {
        let mut registry = PromptRegistry::with_language(Language::Japanese);
        registry.register(
            JinjaTemplate::bilingual("ask", "Question: {{ q }}", "質問: {{ q }}").unwrap(),
        );
        registry.register(JinjaTemplate::new("english_only", "Only {{ q }}").unwrap());
        registry
    }

    #[test]
    fn test_renders_in_registry_language() {
        assert_eq!(registry().render("ask", &json!({"q": "売上"})).unwrap(), "質問: 売上");
    }

    #[test]
    fn test_explicit_language_and_english_fallback() {
        let registry = registry();
        assert_eq!(
            registry
                .render_with_lang("ask", &Language::English, &json!({"q": "x"}))
                .unwrap(),
            "Question: x"
        );
        assert_eq!(
            registry.render("english_only", &json!({"q": "x"})).unwrap(),
            "Only x"
        );
    }

    #[test]
    fn test_unknown_prompt() {
        let registry = registry();
        assert!(matches!(
            registry.render("missing", &json!({})),
            Err(PromptError::UnknownPrompt(_))
        ));
        assert!(registry.contains("ask"));
        assert_eq!(registry.list(), vec!["ask", "english_only"]);
        assert_eq!(registry.language(), &Language::Japanese);
    }

    #[test]
    fn test_later_registration_replaces() {
        let mut registry = registry();
        registry.register(JinjaTemplate::new("ask", "Replaced").unwrap());
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.render("ask", &json!({})).unwrap(), "Replaced");
        assert!(!registry.is_empty());
    }
}
