//! Output language for analyst prompts

use serde::{Deserialize, Serialize};
use std::fmt;

/// Languages a report can be requested in
///
/// # Examples
///
/// ```
/// use edgar_prompt::Language;
///
/// assert_eq!(Language::from_code("ja"), Language::Japanese);
/// assert_eq!(Language::Japanese.code(), "ja");
/// assert_eq!(Language::from_code("de"), Language::Other("de".to_string()));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(from = "String", into = "String")]
pub enum Language {
    /// English
    #[default]
    English,
    /// Japanese
    Japanese,
    /// Other languages (ISO 639-1 code)
    Other(String),
}

impl Language {
    /// Get ISO 639-1 language code
    pub fn code(&self) -> &str {
        match self {
            Language::English => "en",
            Language::Japanese => "ja",
            Language::Other(code) => code,
        }
    }

    /// Get language name for display
    pub fn name(&self) -> &str {
        match self {
            Language::English => "English",
            Language::Japanese => "Japanese",
            Language::Other(code) => code,
        }
    }

    /// Parse from ISO 639-1 code or common name
    pub fn from_code(s: &str) -> Self {
        match s.trim().to_lowercase().as_str() {
            "en" | "english" | "en-us" => Language::English,
            "ja" | "japanese" | "日本語" | "ja-jp" | "jp" => Language::Japanese,
            other => Language::Other(other.to_string()),
        }
    }

    /// Check if this is a known language (not Other)
    pub fn is_known(&self) -> bool {
        !matches!(self, Language::Other(_))
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl From<&str> for Language {
    fn from(s: &str) -> Self {
        Language::from_code(s)
    }
}

impl From<String> for Language {
    fn from(s: String) -> Self {
        Language::from_code(&s)
    }
}

impl From<Language> for String {
    fn from(lang: Language) -> Self {
        lang.code().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_language_code() {
        assert_eq!(Language::English.code(), "en");
        assert_eq!(Language::Japanese.code(), "ja");
        assert_eq!(Language::Other("de".to_string()).code(), "de");
    }

    #[test]
    fn test_from_code() {
        assert_eq!(Language::from_code("EN"), Language::English);
        assert_eq!(Language::from_code("english"), Language::English);
        assert_eq!(Language::from_code("ja"), Language::Japanese);
        assert_eq!(Language::from_code("日本語"), Language::Japanese);
        assert_eq!(Language::from_code(" ja-JP "), Language::Japanese);
        assert!(!Language::from_code("fr").is_known());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Language::Japanese), "Japanese");
    }

    #[test]
    fn test_serde_uses_codes() {
        let json = serde_json::to_string(&Language::Japanese).unwrap();
        assert_eq!(json, "\"ja\"");
        let parsed: Language = serde_json::from_str("\"en\"").unwrap();
        assert_eq!(parsed, Language::English);
    }
}
