//! Bilingual prompt templates for both report contracts

use edgar_prompt::{JinjaTemplate, Language, PromptRegistry, Result};

pub const ANALYSIS_SYSTEM: &str = "analysis.system";
pub const ANALYSIS_USER: &str = "analysis.user";
pub const FILING_SYSTEM: &str = "filing.system";
pub const FILING_USER: &str = "filing.user";

const ANALYSIS_SYSTEM_EN: &str = r"You are a professional financial analyst.
Analyze the company using the provided metrics, forecast and SEC 10-K excerpt.
Respond in English.
Return a single JSON object with exactly these keys:
- executive_summary
- key_metrics_commentary
- risks_summary
- growth_drivers
- red_flags
Every value is a string. Do not include markdown formatting like ```json. Just raw valid JSON.";

const ANALYSIS_SYSTEM_JA: &str = r"あなたはプロの財務アナリストです。
提供された指標、予測、SEC 10-K の抜粋に基づいて企業を分析してください。
Respond in Japanese.
次のキーを持つ JSON オブジェクトを1つだけ返してください:
- executive_summary
- key_metrics_commentary
- risks_summary
- growth_drivers
- red_flags
値はすべて文字列です。```json のような markdown は使わず、有効な JSON のみを出力してください。";

const ANALYSIS_USER_EN: &str = r"Ticker: {{ ticker }}
Question: {{ question }}
Data: Revenue: ${{ revenue | billions }}B, Net Margin: {{ net_margin | pct }}%, 3Y CAGR: {{ revenue_cagr | pct }}%
Forecast: {% if next_revenue is none %}Not available{% else %}Next Year Projected Revenue: ${{ next_revenue | billions }}B{% endif %}
SEC Text Excerpt: {{ excerpt }}

Generate the analysis.";

const ANALYSIS_USER_JA: &str = r"Ticker: {{ ticker }}
Question: {{ question }}
Data: Revenue: ${{ revenue | billions }}B, Net Margin: {{ net_margin | pct }}%, 3Y CAGR: {{ revenue_cagr | pct }}%
Forecast: {% if next_revenue is none %}Not available{% else %}Next Year Projected Revenue: ${{ next_revenue | billions }}B{% endif %}
SEC Text Excerpt: {{ excerpt }}

分析を生成してください。";

const FILING_SYSTEM_EN: &str = r"You are a senior financial analyst. Analyze the provided 10-K data (Risks & MD&A).
Output ONLY valid JSON. Keys: executive_summary, key_points, risks, financial_drivers, what_to_watch.
executive_summary is a string; every other key is an array of strings.
Respond in English.";

const FILING_SYSTEM_JA: &str = r"You are a senior financial analyst. Analyze the provided 10-K data (Risks & MD&A).
Output ONLY valid JSON. Keys: executive_summary, key_points, risks, financial_drivers, what_to_watch.
executive_summary は文字列、その他のキーは文字列の配列です。
Respond in Japanese.";

const FILING_USER_EN: &str = r"Ticker: {{ ticker }}
{% if focus %}Focus: {{ focus }}
{% endif %}
[Top Verified Risks (AI Scored)]
{{ risks }}

[Financial Condition (MD&A/Excerpt)]
{{ financial_condition }}

Generate a strict JSON financial analysis.";

const FILING_USER_JA: &str = r"Ticker: {{ ticker }}
{% if focus %}注目テーマ: {{ focus }}
{% endif %}
[Top Verified Risks (AI Scored)]
{{ risks }}

[Financial Condition (MD&A/Excerpt)]
{{ financial_condition }}

厳密な JSON 形式で財務分析を生成してください。";

/// Registry holding every analyst template, defaulting to `language`
pub fn analyst_prompts(language: Language) -> Result<PromptRegistry> {
    let mut registry = PromptRegistry::with_language(language);
    registry.register(JinjaTemplate::bilingual(
        ANALYSIS_SYSTEM,
        ANALYSIS_SYSTEM_EN,
        ANALYSIS_SYSTEM_JA,
    )?);
    registry.register(JinjaTemplate::bilingual(
        ANALYSIS_USER,
        ANALYSIS_USER_EN,
        ANALYSIS_USER_JA,
    )?);
    registry.register(JinjaTemplate::bilingual(
        FILING_SYSTEM,
        FILING_SYSTEM_EN,
        FILING_SYSTEM_JA,
    )?);
    registry.register(JinjaTemplate::bilingual(
        FILING_USER,
        FILING_USER_EN,
        FILING_USER_JA,
    )?);
    Ok(registry)
}
