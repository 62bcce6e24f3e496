//! Sentence-level risk scoring of the risk factors section

use crate::error::{AnalystError, Result};
use crate::extract::{extract_risk_factors, html_to_text};
use crate::sentiment::{SentimentLabel, SentimentModel};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Sentences shorter than this are treated as fragments
pub const MIN_SENTENCE_CHARS: usize = 20;

/// Maximum sentences handed to the classifier
pub const MAX_SENTENCES: usize = 200;

/// Default number of ranked sentences returned
pub const DEFAULT_TOP_N: usize = 15;

/// One classified sentence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskScore {
    pub text: String,
    pub label: SentimentLabel,
    /// Negative-class probability
    pub score: f64,
}

/// Per-label sentence counts
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SentimentCounts {
    pub negative: usize,
    pub neutral: usize,
    pub positive: usize,
    pub total_sentences_analyzed: usize,
}

/// Top risk sentences plus label totals
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskReport {
    pub model: String,
    pub top_risk_sentences: Vec<RiskScore>,
    pub summary_stats: SentimentCounts,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RiskReport {
    /// Report with no sentences and zeroed counts
    pub fn empty(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            top_risk_sentences: Vec::new(),
            summary_stats: SentimentCounts::default(),
            error: None,
        }
    }

    /// Report carrying a load or inference failure
    pub fn failed(model: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::empty(model)
        }
    }
}

/// Split on terminal punctuation followed by whitespace, dropping fragments
pub fn split_sentences(text: &str) -> Vec<String> {
    let normalized = text.split_whitespace().collect::<Vec<_>>().join(" ");
    let mut sentences = Vec::new();
    let mut start = 0;

    let mut chars = normalized.char_indices().peekable();
    while let Some((idx, c)) = chars.next() {
        if matches!(c, '.' | '!' | '?') && chars.peek().is_some_and(|(_, next)| *next == ' ') {
            let end = idx + c.len_utf8();
            sentences.push(normalized[start..end].trim().to_string());
            start = end;
        }
    }
    sentences.push(normalized[start..].trim().to_string());

    sentences
        .into_iter()
        .filter(|s| s.chars().count() > MIN_SENTENCE_CHARS)
        .collect()
}

/// Ranks risk sentences by negative-class probability
pub struct RiskScorer {
    model: Arc<dyn SentimentModel>,
}

impl RiskScorer {
    /// Create a scorer around a loaded classifier
    pub fn new(model: Arc<dyn SentimentModel>) -> Self {
        Self { model }
    }

    /// Score the risk factors section of a filing document
    pub async fn score_html(&self, html: &str, top_n: usize) -> Result<RiskReport> {
        let html = html.to_string();
        let section = tokio::task::spawn_blocking(move || {
            let text = html_to_text(&html);
            extract_risk_factors(&text).to_string()
        })
        .await?;
        self.score_text(&section, top_n).await
    }

    /// Score an already extracted section
    #[instrument(skip(self, section), fields(model = self.model.name()))]
    pub async fn score_text(&self, section: &str, top_n: usize) -> Result<RiskReport> {
        let mut sentences = split_sentences(section);
        sentences.truncate(MAX_SENTENCES);
        if sentences.is_empty() {
            return Ok(RiskReport::empty(self.model.name()));
        }

        let scores = self.model.classify(&sentences).await?;
        if scores.len() != sentences.len() {
            return Err(AnalystError::Data(format!(
                "{} returned {} scores for {} sentences",
                self.model.name(),
                scores.len(),
                sentences.len()
            )));
        }
        let mut counts = SentimentCounts {
            total_sentences_analyzed: sentences.len(),
            ..SentimentCounts::default()
        };

        let mut ranked: Vec<RiskScore> = sentences
            .into_iter()
            .zip(scores)
            .map(|(text, scores)| {
                let label = scores.label();
                match label {
                    SentimentLabel::Negative => counts.negative += 1,
                    SentimentLabel::Neutral => counts.neutral += 1,
                    SentimentLabel::Positive => counts.positive += 1,
                }
                RiskScore {
                    text,
                    label,
                    score: scores.negative,
                }
            })
            .collect();

        ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
        ranked.truncate(top_n);
        debug!("Ranked {} risk sentences", counts.total_sentences_analyzed);

        Ok(RiskReport {
            model: self.model.name().to_string(),
            top_risk_sentences: ranked,
            summary_stats: counts,
            error: None,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::{LexiconSentimentModel, SentimentScores};
    use async_trait::async_trait;

    struct ShortModel;

    #[async_trait]
    impl SentimentModel for ShortModel {
        fn name(&self) -> &str {
            "short"
        }

        async fn classify(&self, sentences: &[String]) -> Result<Vec<SentimentScores>> {
            Ok(sentences
                .iter()
                .skip(1)
                .map(|_| SentimentScores {
                    positive: 0.1,
                    neutral: 0.2,
                    negative: 0.7,
                })
                .collect())
        }
    }

    fn scorer() -> RiskScorer {
        RiskScorer::new(Arc::new(LexiconSentimentModel::new()))
    }

    #[test]
    fn test_split_sentences_drops_fragments() {
        let text = "Item 1A.   Risk Factors. Our operations could be adversely affected by weather.\n\
                    Short one! Demand for our products may decline significantly? Ok.";
        let sentences = split_sentences(text);
        assert_eq!(
            sentences,
            vec![
                "Our operations could be adversely affected by weather.",
                "Demand for our products may decline significantly?",
            ]
        );
    }

    #[tokio::test]
    async fn test_empty_section_yields_zeroed_report() {
        let report = scorer().score_text("   ", 15).await.unwrap();
        assert!(report.top_risk_sentences.is_empty());
        assert_eq!(report.summary_stats, SentimentCounts::default());
        assert!(report.error.is_none());
    }

    #[tokio::test]
    async fn test_ranked_by_negative_probability() {
        let section = "The Company designs and sells consumer electronics worldwide. \
                       A security breach could harm our reputation and result in losses and litigation. \
                       Our results may decline in an economic downturn.";
        let report = scorer().score_text(section, 2).await.unwrap();

        assert_eq!(report.top_risk_sentences.len(), 2);
        assert!(report.top_risk_sentences[0].text.contains("breach"));
        assert!(report.top_risk_sentences[0].score >= report.top_risk_sentences[1].score);
        assert_eq!(report.summary_stats.total_sentences_analyzed, 3);
        assert_eq!(
            report.summary_stats.negative + report.summary_stats.neutral + report.summary_stats.positive,
            3
        );
        assert_eq!(report.model, "financial-lexicon");
    }

    #[tokio::test]
    async fn test_score_html_uses_risk_section() {
        let html = "<html><body><p>We had record growth in services this year overall.</p>\
                    <h2>Item 1A. Risk Factors</h2>\
                    <p>Supply shortages could adversely affect our margins.</p>\
                    <h2>Item 1B. Unresolved Staff Comments</h2><p>None.</p></body></html>";
        let report = scorer().score_html(html, 15).await.unwrap();
        assert_eq!(report.summary_stats.total_sentences_analyzed, 1);
        assert!(report.top_risk_sentences[0].text.contains("shortages"));
    }

    #[tokio::test]
    async fn test_short_classifier_output_is_rejected() {
        let scorer = RiskScorer::new(Arc::new(ShortModel));
        let section = "Demand for our products may decline significantly. \
                       Competition could reduce our market share over time.";
        let err = scorer.score_text(section, 15).await.unwrap_err();
        assert!(matches!(err, AnalystError::Data(msg) if msg.contains("1 scores for 2 sentences")));
    }
}
