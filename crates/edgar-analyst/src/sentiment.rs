//! Three-class financial sentiment classifiers
//!
//! Two implementations of [`SentimentModel`]: a remote text-classification
//! endpoint speaking the FinBERT label set, and a deterministic lexicon
//! classifier used when no endpoint is configured.

use crate::error::{AnalystError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

/// Predicted sentiment class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Neutral,
    Negative,
}

/// Class probabilities of one sentence
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct SentimentScores {
    pub positive: f64,
    pub neutral: f64,
    pub negative: f64,
}

impl SentimentScores {
    /// Argmax class; ties resolve towards neutral, then negative
    pub fn label(&self) -> SentimentLabel {
        if self.neutral >= self.positive && self.neutral >= self.negative {
            SentimentLabel::Neutral
        } else if self.negative >= self.positive {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Positive
        }
    }
}

/// Sentence-level sentiment classifier
#[async_trait]
pub trait SentimentModel: Send + Sync {
    /// Model identifier reported alongside results
    fn name(&self) -> &str;

    /// Classify each sentence; the output has one entry per input
    async fn classify(&self, sentences: &[String]) -> Result<Vec<SentimentScores>>;
}

const POSITIVE_STEMS: &[(&str, f64)] = &[
    ("growth", 0.6),
    ("grow", 0.5),
    ("increas", 0.4),
    ("improv", 0.5),
    ("strong", 0.5),
    ("profit", 0.5),
    ("gain", 0.4),
    ("benefit", 0.5),
    ("succe", 0.5),
    ("record", 0.5),
    ("exceed", 0.6),
    ("outperform", 0.7),
    ("opportunit", 0.4),
    ("favorabl", 0.5),
    ("robust", 0.5),
    ("expand", 0.4),
];

const NEGATIVE_STEMS: &[(&str, f64)] = &[
    ("adverse", 0.9),
    ("advers", 0.9),
    ("declin", 0.6),
    ("decreas", 0.5),
    ("loss", 0.7),
    ("harm", 0.8),
    ("impair", 0.7),
    ("litigat", 0.6),
    ("penalt", 0.6),
    ("fail", 0.7),
    ("disrupt", 0.7),
    ("uncertain", 0.5),
    ("volatil", 0.5),
    ("risk", 0.3),
    ("breach", 0.8),
    ("default", 0.8),
    ("weak", 0.5),
    ("negative", 0.6),
    ("unfavorabl", 0.6),
    ("damag", 0.7),
    ("delay", 0.5),
    ("shortage", 0.6),
    ("inflation", 0.4),
    ("downturn", 0.7),
    ("recession", 0.7),
    ("fraud", 0.9),
    ("inabilit", 0.6),
    ("unable", 0.6),
    ("difficult", 0.5),
    ("costl", 0.5),
    ("reduc", 0.4),
    ("lower", 0.4),
    ("insufficient", 0.6),
];

const NEGATIONS: &[&str] = &[
    "not", "no", "never", "none", "cannot", "without", "neither", "nor", "isn't", "don't",
    "doesn't", "didn't", "won't", "wasn't", "aren't",
];

const NEUTRAL_LOGIT: f64 = 0.6;
const LOGIT_SCALE: f64 = 2.0;

/// Deterministic lexicon classifier tuned for annual-report risk language
#[derive(Debug, Clone)]
pub struct LexiconSentimentModel {
    negations: HashSet<&'static str>,
}

impl Default for LexiconSentimentModel {
    fn default() -> Self {
        Self::new()
    }
}

impl LexiconSentimentModel {
    /// Create the classifier with the built-in word lists
    pub fn new() -> Self {
        Self {
            negations: NEGATIONS.iter().copied().collect(),
        }
    }

    fn stem_score(stems: &[(&str, f64)], token: &str) -> Option<f64> {
        stems
            .iter()
            .find(|(stem, _)| token.starts_with(stem))
            .map(|(_, weight)| *weight)
    }

    /// Score one sentence
    pub fn score(&self, sentence: &str) -> SentimentScores {
        let mut positive = 0.0;
        let mut negative = 0.0;
        let mut negate = false;

        for raw in sentence.split_whitespace() {
            let token: String = raw
                .trim_matches(|c: char| !c.is_alphanumeric() && c != '\'')
                .to_lowercase();
            if token.is_empty() {
                continue;
            }
            if self.negations.contains(token.as_str()) {
                negate = true;
                continue;
            }

            let (mut pos, mut neg) = (
                Self::stem_score(POSITIVE_STEMS, &token).unwrap_or(0.0),
                Self::stem_score(NEGATIVE_STEMS, &token).unwrap_or(0.0),
            );
            if pos == 0.0 && neg == 0.0 {
                continue;
            }
            if negate {
                std::mem::swap(&mut pos, &mut neg);
                negate = false;
            }
            positive += pos;
            negative += neg;
        }

        softmax(positive * LOGIT_SCALE, NEUTRAL_LOGIT * LOGIT_SCALE, negative * LOGIT_SCALE)
    }
}

fn softmax(positive: f64, neutral: f64, negative: f64) -> SentimentScores {
    let max = positive.max(neutral).max(negative);
    let (p, n, g) = (
        (positive - max).exp(),
        (neutral - max).exp(),
        (negative - max).exp(),
    );
    let total = p + n + g;
    SentimentScores {
        positive: p / total,
        neutral: n / total,
        negative: g / total,
    }
}

#[async_trait]
impl SentimentModel for LexiconSentimentModel {
    fn name(&self) -> &str {
        "financial-lexicon"
    }

    async fn classify(&self, sentences: &[String]) -> Result<Vec<SentimentScores>> {
        Ok(sentences.iter().map(|s| self.score(s)).collect())
    }
}

/// Remote text-classification endpoint returning `[[{label, score}, ...], ...]`
pub struct HttpSentimentModel {
    client: Client,
    endpoint: String,
    batch_size: usize,
}

#[derive(Debug, Serialize)]
struct ClassifyRequest<'a> {
    inputs: &'a [String],
}

#[derive(Debug, Deserialize)]
struct LabelScore {
    label: String,
    score: f64,
}

impl HttpSentimentModel {
    /// Create a client for `endpoint`
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AnalystError::ModelLoad(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            batch_size: 32,
        })
    }

    fn to_scores(labels: Vec<LabelScore>) -> SentimentScores {
        let mut scores = SentimentScores::default();
        for LabelScore { label, score } in labels {
            match label.to_lowercase().as_str() {
                "positive" => scores.positive = score,
                "neutral" => scores.neutral = score,
                "negative" => scores.negative = score,
                other => debug!("Ignoring unknown sentiment label {}", other),
            }
        }
        scores
    }

    async fn classify_batch(&self, batch: &[String]) -> Result<Vec<SentimentScores>> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&ClassifyRequest { inputs: batch })
            .send()
            .await
            .map_err(|e| AnalystError::Transport(format!("sentiment request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AnalystError::Status {
                url: self.endpoint.clone(),
                status: status.as_u16(),
            });
        }

        let body: Vec<Vec<LabelScore>> = response
            .json()
            .await
            .map_err(|e| AnalystError::Data(format!("unexpected sentiment response: {e}")))?;
        if body.len() != batch.len() {
            return Err(AnalystError::Data(format!(
                "sentiment endpoint returned {} results for {} inputs",
                body.len(),
                batch.len()
            )));
        }
        Ok(body.into_iter().map(Self::to_scores).collect())
    }
}

#[async_trait]
impl SentimentModel for HttpSentimentModel {
    fn name(&self) -> &str {
        &self.endpoint
    }

    #[instrument(skip(self, sentences), fields(count = sentences.len()))]
    async fn classify(&self, sentences: &[String]) -> Result<Vec<SentimentScores>> {
        let mut results = Vec::with_capacity(sentences.len());
        for batch in sentences.chunks(self.batch_size) {
            results.extend(self.classify_batch(batch).await?);
        }
        Ok(results)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_label_argmax() {
        let scores = SentimentScores {
            positive: 0.1,
            neutral: 0.2,
            negative: 0.7,
        };
        assert_eq!(scores.label(), SentimentLabel::Negative);
        assert_eq!(SentimentScores::default().label(), SentimentLabel::Neutral);
    }

    #[test]
    fn test_lexicon_scores_risk_language() {
        let model = LexiconSentimentModel::new();

        let risky = model.score("A cybersecurity breach could materially harm our business and cause losses.");
        assert_eq!(risky.label(), SentimentLabel::Negative);

        let neutral = model.score("The Company is headquartered in Cupertino, California.");
        assert_eq!(neutral.label(), SentimentLabel::Neutral);

        let positive = model.score("Services revenue showed strong growth and record profitability.");
        assert_eq!(positive.label(), SentimentLabel::Positive);

        let total = risky.positive + risky.neutral + risky.negative;
        assert!((total - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_negation_flips_polarity() {
        let model = LexiconSentimentModel::new();
        let plain = model.score("Margins may decline.");
        let negated = model.score("Margins did not decline.");
        assert!(negated.negative < plain.negative);
        assert!(negated.positive > plain.positive);
    }

    #[test]
    fn test_endpoint_labels_mapped() {
        let labels: Vec<LabelScore> = serde_json::from_str(
            r#"[{"label": "Negative", "score": 0.8}, {"label": "neutral", "score": 0.15}, {"label": "positive", "score": 0.05}]"#,
        )
        .unwrap();
        let scores = HttpSentimentModel::to_scores(labels);
        assert_eq!(scores.negative, 0.8);
        assert_eq!(scores.label(), SentimentLabel::Negative);
    }

    #[tokio::test]
    async fn test_lexicon_classify_preserves_order() {
        let model = LexiconSentimentModel::new();
        let sentences = vec![
            "Revenue growth was strong.".to_string(),
            "We may incur significant losses.".to_string(),
        ];
        let scores = model.classify(&sentences).await.unwrap();
        assert_eq!(scores.len(), 2);
        assert_eq!(scores[0].label(), SentimentLabel::Positive);
        assert_eq!(scores[1].label(), SentimentLabel::Negative);
    }
}
