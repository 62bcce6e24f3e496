//! The two report contracts produced by the orchestrator
//!
//! [`AnalysisReport`] answers a question about a company; [`FilingAnalysis`]
//! summarises a whole annual report. They share provider selection and retry
//! logic through [`ReportSchema`] but never share fields.

use super::context::AnalysisContext;
use super::prompts;
use crate::extract::truncate_chars;
use edgar_prompt::Language;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Minimum length of an acceptable executive summary
pub const MIN_SUMMARY_CHARS: usize = 20;

/// Characters of raw model output kept in a degraded summary
const DEGRADED_SUMMARY_CHARS: usize = 200;

/// Characters of raw model output kept as commentary
const DEGRADED_BODY_CHARS: usize = 4000;

/// Behaviour the orchestrator needs from a report type
pub trait ReportSchema: Serialize + Clone + Send + Sync + 'static {
    /// Registry name of the system prompt
    const SYSTEM_TEMPLATE: &'static str;
    /// Registry name of the user prompt
    const USER_TEMPLATE: &'static str;

    /// Build from a parsed JSON object, tolerating missing or mistyped keys
    fn from_value(value: &Value) -> Self;

    /// Best-effort report embedding unparseable model output
    fn degraded(raw: &str) -> Self;

    /// Deterministic report built from already computed data
    fn rule_based(ctx: &AnalysisContext) -> Self;

    /// Headline text, used to validate provider output
    fn executive_summary(&self) -> &str;

    /// Whether a provider response carries a usable summary
    fn has_valid_summary(&self) -> bool {
        self.executive_summary().trim().chars().count() >= MIN_SUMMARY_CHARS
    }
}

fn field_text(value: &Value) -> String {
    match value {
        Value::Null => String::new(),
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(field_text).collect::<Vec<_>>().join("\n"),
        other => other.to_string(),
    }
}

fn field_list(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items
            .iter()
            .map(field_text)
            .filter(|s| !s.trim().is_empty())
            .collect(),
        other => {
            let text = field_text(other);
            if text.trim().is_empty() { Vec::new() } else { vec![text] }
        }
    }
}

/// Five-field answer to a question about a company
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub executive_summary: String,
    pub key_metrics_commentary: String,
    pub risks_summary: String,
    pub growth_drivers: String,
    pub red_flags: String,
}

impl AnalysisReport {
    fn red_flags(ctx: &AnalysisContext) -> Vec<&'static str> {
        let japanese = ctx.language == Language::Japanese;
        let mut flags = Vec::new();
        if ctx.metrics.net_margin.is_some_and(|m| m < 0.0) {
            flags.push(if japanese { "純利益率がマイナスです。" } else { "Net margin is negative." });
        }
        if ctx.metrics.fcf.is_some_and(|f| f < 0.0) {
            flags.push(if japanese {
                "フリーキャッシュフローがマイナスです。"
            } else {
                "Free cash flow is negative."
            });
        }
        if ctx.metrics.revenue_cagr_3yr.is_some_and(|c| c < 0.0) {
            flags.push(if japanese { "売上高が縮小傾向です。" } else { "Revenue is shrinking." });
        }
        flags
    }
}

impl ReportSchema for AnalysisReport {
    const SYSTEM_TEMPLATE: &'static str = prompts::ANALYSIS_SYSTEM;
    const USER_TEMPLATE: &'static str = prompts::ANALYSIS_USER;

    fn from_value(value: &Value) -> Self {
        Self {
            executive_summary: field_text(&value["executive_summary"]),
            key_metrics_commentary: field_text(&value["key_metrics_commentary"]),
            risks_summary: field_text(&value["risks_summary"]),
            growth_drivers: field_text(&value["growth_drivers"]),
            red_flags: field_text(&value["red_flags"]),
        }
    }

    fn degraded(raw: &str) -> Self {
        Self {
            executive_summary: truncate_chars(raw, DEGRADED_SUMMARY_CHARS).to_string(),
            key_metrics_commentary: truncate_chars(raw, DEGRADED_BODY_CHARS).to_string(),
            risks_summary: "Parsing error.".to_string(),
            growth_drivers: "Parsing error.".to_string(),
            red_flags: "Parsing error.".to_string(),
        }
    }

    fn rule_based(ctx: &AnalysisContext) -> Self {
        let m = &ctx.metrics;
        let revenue = m.revenue.unwrap_or_default() / 1e9;
        let margin = m.net_margin.unwrap_or_default() * 100.0;
        let cagr = m.revenue_cagr_3yr.unwrap_or_default() * 100.0;
        let summary = ctx.summary_line();
        let forecast = ctx.forecast_line();
        let flags = Self::red_flags(ctx);

        if ctx.language == Language::Japanese {
            Self {
                executive_summary: format!(
                    "{}の財務分析概要です。直近の売上高は約${revenue:.2}B、純利益率は{margin:.1}%です。",
                    ctx.ticker
                ),
                key_metrics_commentary: format!(
                    "主要指標: {summary}。予測: {forecast}。安定した収益基盤があるか確認が必要です。"
                ),
                risks_summary: "10-Kに基づく具体的なリスク要因はAI機能が無効なため生成できませんが、一般的にマクロ経済、競合、規制リスクに注意が必要です。".to_string(),
                growth_drivers: format!(
                    "過去の成長率(CAGR)は{cagr:.1}%です。今後の成長は市場拡大と新製品に依存します。"
                ),
                red_flags: if flags.is_empty() {
                    "財務データ上の大きな異常値は簡易チェックでは検出されませんでしたが、キャッシュフローの推移を詳細に確認することを推奨します。".to_string()
                } else {
                    flags.join(" ")
                },
            }
        } else {
            Self {
                executive_summary: format!(
                    "Financial overview of {}. Latest revenue is about ${revenue:.2}B with a net margin of {margin:.1}%.",
                    ctx.ticker
                ),
                key_metrics_commentary: format!(
                    "Key metrics: {summary}. Forecast: {forecast}. Confirm the revenue base is stable."
                ),
                risks_summary: "Filing-specific risk factors cannot be summarised without an AI provider; macroeconomic, competitive and regulatory risks apply in general.".to_string(),
                growth_drivers: format!(
                    "Historical revenue CAGR is {cagr:.1}%. Future growth depends on market expansion and new products."
                ),
                red_flags: if flags.is_empty() {
                    "No major anomalies were detected by the basic checks; review the cash flow trend in detail.".to_string()
                } else {
                    flags.join(" ")
                },
            }
        }
    }

    fn executive_summary(&self) -> &str {
        &self.executive_summary
    }
}

/// Whole-filing analysis
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilingAnalysis {
    pub executive_summary: String,
    pub key_points: Vec<String>,
    pub risks: Vec<String>,
    pub financial_drivers: Vec<String>,
    pub what_to_watch: Vec<String>,
}

impl ReportSchema for FilingAnalysis {
    const SYSTEM_TEMPLATE: &'static str = prompts::FILING_SYSTEM;
    const USER_TEMPLATE: &'static str = prompts::FILING_USER;

    fn from_value(value: &Value) -> Self {
        Self {
            executive_summary: field_text(&value["executive_summary"]),
            key_points: field_list(&value["key_points"]),
            risks: field_list(&value["risks"]),
            financial_drivers: field_list(&value["financial_drivers"]),
            what_to_watch: field_list(&value["what_to_watch"]),
        }
    }

    fn degraded(raw: &str) -> Self {
        Self {
            executive_summary: truncate_chars(raw, DEGRADED_SUMMARY_CHARS).to_string(),
            key_points: vec![truncate_chars(raw, DEGRADED_BODY_CHARS).to_string()],
            ..Self::default()
        }
    }

    fn rule_based(ctx: &AnalysisContext) -> Self {
        let japanese = ctx.language == Language::Japanese;
        let chars = ctx.sec_text.chars().count();
        let negative = ctx
            .risks
            .iter()
            .filter(|r| r.label == crate::sentiment::SentimentLabel::Negative)
            .count();

        let executive_summary = if japanese {
            format!(
                "{}の最新年次報告書（{chars}文字）をルールベースで要約しました。上位リスク文{}件のうち{negative}件がネガティブと判定されています。",
                ctx.ticker,
                ctx.risks.len()
            )
        } else {
            format!(
                "Rule-based summary of the latest annual report of {} ({chars} characters). {negative} of the {} top risk sentences scored negative.",
                ctx.ticker,
                ctx.risks.len()
            )
        };

        let mut key_points = vec![if ctx.mdna.trim().is_empty() {
            let missing = if japanese { "MD&Aセクションは検出されませんでした。" } else { "No MD&A section was detected." };
            missing.to_string()
        } else if japanese {
            format!("MD&Aセクション: {}文字。", ctx.mdna.chars().count())
        } else {
            format!("MD&A section: {} characters.", ctx.mdna.chars().count())
        }];
        if let Some(focus) = ctx.focus.as_deref().filter(|f| !f.trim().is_empty()) {
            key_points.push(if japanese {
                format!("注目テーマ: {focus}")
            } else {
                format!("Requested focus: {focus}")
            });
        }

        let financial_drivers = if ctx.metrics.is_empty() {
            ctx.financial_condition()
                .lines()
                .filter(|l| l.chars().count() > 40)
                .take(3)
                .map(ToString::to_string)
                .collect()
        } else {
            vec![ctx.summary_line(), ctx.forecast_line()]
        };

        let what_to_watch = if japanese {
            vec![
                "上位リスク要因の次回報告書での変化".to_string(),
                "キャッシュフローと設備投資の推移".to_string(),
            ]
        } else {
            vec![
                "Changes to the top risk factors in the next filing".to_string(),
                "Operating cash flow and capital expenditure trend".to_string(),
            ]
        };

        Self {
            executive_summary,
            key_points,
            risks: ctx.risks.iter().take(5).map(|r| r.text.clone()).collect(),
            financial_drivers,
            what_to_watch,
        }
    }

    fn executive_summary(&self) -> &str {
        &self.executive_summary
    }
}
