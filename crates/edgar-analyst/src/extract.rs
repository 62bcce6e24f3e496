//! HTML to plain text conversion and heuristic section slicing
//!
//! Sections are found by regex boundary search over the extracted text:
//! the first start marker, then the first end marker after it. Slicing
//! never fails; when markers are missing it degrades to a capped prefix.

use regex::Regex;
use scraper::{Html, Node};
use std::sync::LazyLock;

/// Characters kept when a section has no end marker, or no start marker at all
pub const SECTION_CAP: usize = 50_000;

/// Item 1A. Risk Factors
pub static RISK_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Item\s*1A\.?\s*Risk\s*Factors").expect("risk start pattern"));

/// Item 1B or Item 2
pub static RISK_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Item\s*(1B|2)\.?").expect("risk end pattern"));

/// Item 7. Management's Discussion and Analysis
pub static MDA_START: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Item\s*7\.?\s*Management").expect("MD&A start pattern"));

/// Item 8
pub static MDA_END: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)Item\s*8\.?").expect("MD&A end pattern"));

const SKIPPED_ELEMENTS: &[&str] = &["script", "style", "noscript", "head", "ix:header", "title"];

/// Convert an HTML document to whitespace-normalized plain text
///
/// Text nodes are joined with newlines, inline whitespace runs collapse to
/// a single space and blank lines are dropped.
pub fn html_to_text(html: &str) -> String {
    let document = Html::parse_document(html);
    let mut raw = String::with_capacity(html.len() / 2);

    let mut stack = vec![document.tree.root()];
    while let Some(node) = stack.pop() {
        match node.value() {
            Node::Text(text) => {
                raw.push_str(text);
                raw.push('\n');
            }
            Node::Element(element) if SKIPPED_ELEMENTS.contains(&element.name()) => continue,
            Node::Comment(_) => continue,
            _ => {}
        }
        // reversed so that document order is preserved when popping
        let children: Vec<_> = node.children().collect();
        stack.extend(children.into_iter().rev());
    }

    normalize_whitespace(&raw)
}

/// Collapse inline whitespace and drop blank lines
pub fn normalize_whitespace(text: &str) -> String {
    text.lines()
        .map(|line| line.split_whitespace().collect::<Vec<_>>().join(" "))
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Prefix of at most `max_chars` characters
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Span from the first `start` match up to the first `end` match after it
///
/// Without an end match the span runs for `cap` characters. Returns `None`
/// when `start` does not match.
pub fn find_section<'a>(text: &'a str, start: &Regex, end: &Regex, cap: usize) -> Option<&'a str> {
    let start_match = start.find(text)?;
    let rest = &text[start_match.start()..];
    let section = match end.find_at(text, start_match.end()) {
        Some(end_match) => &text[start_match.start()..end_match.start()],
        None => truncate_chars(rest, cap),
    };
    Some(section)
}

/// Section text, or the first `cap` characters of the document when the
/// start marker is absent
pub fn extract_section<'a>(text: &'a str, start: &Regex, end: &Regex, cap: usize) -> &'a str {
    find_section(text, start, end, cap).unwrap_or_else(|| truncate_chars(text, cap))
}

/// Risk factors section with full-document fallback
pub fn extract_risk_factors(text: &str) -> &str {
    extract_section(text, &RISK_START, &RISK_END, SECTION_CAP)
}

/// MD&A section, empty when no Item 7 heading is found
pub fn extract_mdna(text: &str) -> &str {
    find_section(text, &MDA_START, &MDA_END, SECTION_CAP).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    const FILING: &str = r#"<html>
<head><title>10-K</title><style>.x { color: red }</style></head>
<body>
  <script>var tracking = "Item 1A";</script>
  <p>Table of   Contents</p>
  <div>Item 1A. Risk Factors</div>
  <p>Our business is   subject to <b>significant</b> risks.</p>

  <p>Item 1B. Unresolved Staff Comments</p>
  <p>None.</p>
  <p>Item 7. Management's Discussion and Analysis</p>
  <p>Revenue grew 8% year over year.</p>
  <p>Item 8. Financial Statements</p>
</body></html>"#;

    #[test]
    fn test_section_patterns_compile() {
        assert!(RISK_START.is_match("ITEM 1A. RISK FACTORS"));
        assert!(RISK_END.is_match("Item 1B. Unresolved Staff Comments"));
        assert!(MDA_START.is_match("Item 7. Management's Discussion"));
        assert!(MDA_END.is_match("Item 8. Financial Statements"));
    }

    #[test]
    fn test_html_to_text_strips_scripts_and_styles() {
        let text = html_to_text(FILING);
        assert!(!text.contains("tracking"));
        assert!(!text.contains("color: red"));
        assert!(text.contains("Table of Contents"));
        assert!(text.lines().all(|line| !line.trim().is_empty()));
        assert!(text.lines().all(|line| !line.contains("  ")));
    }

    #[test]
    fn test_risk_section_bounded_by_next_item() {
        let text = html_to_text(FILING);
        let section = extract_risk_factors(&text);
        assert!(section.starts_with("Item 1A. Risk Factors"));
        assert!(section.contains("significant"));
        assert!(!section.contains("Unresolved"));
    }

    #[test]
    fn test_end_marker_searched_after_start_only() {
        let text = "Item 2 appears early. Item 1A Risk Factors body text. Item 2. Properties";
        let section = extract_section(text, &RISK_START, &RISK_END, 1000);
        assert_eq!(section, "Item 1A Risk Factors body text. ");
    }

    #[test]
    fn test_missing_end_marker_uses_cap() {
        let text = format!("ITEM 1A RISK FACTORS {}", "x".repeat(200));
        let section = extract_section(&text, &RISK_START, &RISK_END, 50);
        assert_eq!(section.chars().count(), 50);
        assert!(section.starts_with("ITEM 1A"));
    }

    #[test]
    fn test_missing_start_marker_falls_back_to_prefix() {
        let text = "No headings here at all.";
        assert_eq!(extract_section(text, &RISK_START, &RISK_END, 7), "No head");
        assert!(find_section(text, &RISK_START, &RISK_END, 7).is_none());
    }

    #[test]
    fn test_mdna_slice_and_empty_fallback() {
        let text = html_to_text(FILING);
        let mdna = extract_mdna(&text);
        assert!(mdna.contains("Revenue grew 8%"));
        assert!(!mdna.contains("Financial Statements"));
        assert_eq!(extract_mdna("nothing relevant"), "");
    }

    #[test]
    fn test_truncate_is_char_safe() {
        assert_eq!(truncate_chars("日本語テキスト", 3), "日本語");
        assert_eq!(truncate_chars("abc", 10), "abc");
    }
}
