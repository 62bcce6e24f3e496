//! Inputs shared by every provider strategy

use crate::extract::truncate_chars;
use crate::forecast::Forecast;
use crate::metrics::KeyMetrics;
use crate::risk::RiskScore;
use edgar_prompt::Language;
use serde_json::{Value, json};

/// Characters of filing text sent to the cloud provider
pub const CLOUD_EXCERPT_CHARS: usize = 2000;

/// Characters of MD&A or filing text sent to the local model
pub const LOCAL_CONTEXT_CHARS: usize = 3000;

/// Risk sentences included in filing prompts
pub const PROMPT_RISK_LINES: usize = 15;

/// Everything a provider may draw on to write a report
#[derive(Debug, Clone, Default)]
pub struct AnalysisContext {
    pub ticker: String,
    pub question: String,
    pub metrics: KeyMetrics,
    pub forecast: Option<Forecast>,
    pub sec_text: String,
    pub mdna: String,
    pub risks: Vec<RiskScore>,
    pub focus: Option<String>,
    pub language: Language,
}

impl AnalysisContext {
    /// Create a context for a ticker and question
    pub fn new(ticker: impl Into<String>, question: impl Into<String>, language: Language) -> Self {
        Self {
            ticker: ticker.into(),
            question: question.into(),
            language,
            ..Self::default()
        }
    }

    /// `Revenue: $X.XXB, Net Margin: Y.Y%, 3Y CAGR: Z.Z%`
    pub fn summary_line(&self) -> String {
        format!(
            "Revenue: ${:.2}B, Net Margin: {:.1}%, 3Y CAGR: {:.1}%",
            self.metrics.revenue.unwrap_or_default() / 1e9,
            self.metrics.net_margin.unwrap_or_default() * 100.0,
            self.metrics.revenue_cagr_3yr.unwrap_or_default() * 100.0,
        )
    }

    /// Next-year projection or `Not available`
    pub fn forecast_line(&self) -> String {
        match self.forecast.as_ref().and_then(Forecast::next_revenue) {
            Some(next) => format!("Next Year Projected Revenue: ${:.2}B", next / 1e9),
            None => "Not available".to_string(),
        }
    }

    /// Filing text excerpt for the cloud prompt
    pub fn excerpt(&self) -> &str {
        truncate_chars(&self.sec_text, CLOUD_EXCERPT_CHARS)
    }

    /// MD&A excerpt, or the start of the filing when no MD&A was found
    pub fn financial_condition(&self) -> &str {
        if self.mdna.trim().is_empty() {
            truncate_chars(&self.sec_text, LOCAL_CONTEXT_CHARS)
        } else {
            truncate_chars(&self.mdna, LOCAL_CONTEXT_CHARS)
        }
    }

    /// `- sentence (Score: 0.93)` lines for the top risks
    pub fn risk_lines(&self) -> String {
        if self.risks.is_empty() {
            return "No specific high-risk sentences detected.".to_string();
        }
        self.risks
            .iter()
            .take(PROMPT_RISK_LINES)
            .map(|r| format!("- {} (Score: {:.2})", r.text, r.score))
            .collect::<Vec<_>>()
            .join("\n")
    }

    /// Template variables; money and ratios stay numeric for the template filters
    pub fn template_vars(&self) -> Value {
        json!({
            "ticker": self.ticker,
            "question": self.question,
            "focus": self.focus,
            "revenue": self.metrics.revenue.unwrap_or_default(),
            "net_margin": self.metrics.net_margin.unwrap_or_default(),
            "revenue_cagr": self.metrics.revenue_cagr_3yr.unwrap_or_default(),
            "next_revenue": self.forecast.as_ref().and_then(Forecast::next_revenue),
            "excerpt": self.excerpt(),
            "risks": self.risk_lines(),
            "financial_condition": self.financial_condition(),
            "language": self.language.name(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sentiment::SentimentLabel;

    fn context() -> AnalysisContext {
        let mut ctx = AnalysisContext::new("AAPL", "How is growth?", Language::English);
        ctx.metrics = KeyMetrics {
            revenue: Some(391_040_000_000.0),
            net_margin: Some(0.2397),
            revenue_cagr_3yr: Some(0.0281),
            ..KeyMetrics::default()
        };
        ctx
    }

    #[test]
    fn test_summary_line_format() {
        assert_eq!(
            context().summary_line(),
            "Revenue: $391.04B, Net Margin: 24.0%, 3Y CAGR: 2.8%"
        );
        let empty = AnalysisContext::new("X", "", Language::English);
        assert_eq!(empty.summary_line(), "Revenue: $0.00B, Net Margin: 0.0%, 3Y CAGR: 0.0%");
    }

    #[test]
    fn test_forecast_line() {
        let mut ctx = context();
        assert_eq!(ctx.forecast_line(), "Not available");
        ctx.forecast = Some(Forecast {
            method: "linear_regression".into(),
            forecast_years: vec![2025, 2026, 2027],
            forecast_revenue: vec![400e9, 410e9, 420e9],
            slope: 10e9,
            intercept: 0.0,
        });
        assert_eq!(ctx.forecast_line(), "Next Year Projected Revenue: $400.00B");
    }

    #[test]
    fn test_risk_lines_and_condition_fallback() {
        let mut ctx = context();
        assert_eq!(ctx.risk_lines(), "No specific high-risk sentences detected.");

        ctx.risks = vec![RiskScore {
            text: "Supply may be disrupted.".into(),
            label: SentimentLabel::Negative,
            score: 0.934,
        }];
        assert_eq!(ctx.risk_lines(), "- Supply may be disrupted. (Score: 0.93)");

        ctx.sec_text = "x".repeat(5000);
        assert_eq!(ctx.financial_condition().len(), LOCAL_CONTEXT_CHARS);
        assert_eq!(ctx.excerpt().len(), CLOUD_EXCERPT_CHARS);
        ctx.mdna = "Revenue increased.".into();
        assert_eq!(ctx.financial_condition(), "Revenue increased.");
    }
}
