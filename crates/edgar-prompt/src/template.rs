//! Language-aware prompt trait

use crate::{Language, PromptError, Result};
use serde_json::Value;

/// A named prompt with one text per language
///
/// Variables are a JSON value so that the trait stays object safe.
pub trait PromptTemplate: Send + Sync {
    fn name(&self) -> &str;

    fn languages(&self) -> Vec<Language>;

    fn supports_language(&self, lang: &Language) -> bool {
        self.languages().contains(lang)
    }

    /// Render the variant for `lang`
    fn render(&self, lang: &Language, vars: &Value) -> Result<String>;

    /// Render `lang`, else English, else whichever variant exists
    fn render_with_fallback(&self, lang: &Language, vars: &Value) -> Result<String> {
        let chosen = if self.supports_language(lang) {
            lang.clone()
        } else if self.supports_language(&Language::English) {
            Language::English
        } else {
            self.languages()
                .into_iter()
                .next()
                .ok_or_else(|| PromptError::Empty(self.name().to_string()))?
        };
        self.render(&chosen, vars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    /// Echoes the language code it was rendered in
    struct CodeEcho(Vec<Language>);

    impl PromptTemplate for CodeEcho {
        fn name(&self) -> &str {
            "echo"
        }

        fn languages(&self) -> Vec<Language> {
            self.0.clone()
        }

        fn render(&self, lang: &Language, _vars: &Value) -> Result<String> {
            Ok(lang.code().to_string())
        }
    }

    #[test]
    fn test_fallback_prefers_requested_then_english() {
        let both = CodeEcho(vec![Language::Japanese, Language::English]);
        assert_eq!(both.render_with_fallback(&Language::Japanese, &json!({})).unwrap(), "ja");
        assert_eq!(
            both.render_with_fallback(&Language::Other("de".into()), &json!({}))
                .unwrap(),
            "en"
        );
    }

    #[test]
    fn test_fallback_to_only_variant() {
        let japanese_only = CodeEcho(vec![Language::Japanese]);
        assert_eq!(
            japanese_only
                .render_with_fallback(&Language::English, &json!({}))
                .unwrap(),
            "ja"
        );
    }

    #[test]
    fn test_fallback_without_variants() {
        assert!(matches!(
            CodeEcho(Vec::new()).render_with_fallback(&Language::English, &json!({})),
            Err(PromptError::Empty(_))
        ));
    }
}
