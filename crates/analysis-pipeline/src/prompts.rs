use pipeline_core::{
    AnalysisError, ComponentScore, FundamentalSnapshot, IndicatorReport, NewsArticle,
};
use serde_json::json;

/// JSON schema handed to the LLM for every scoring stage. The score scale
/// and recommendation buckets match the deterministic scorers so both paths
/// stay interchangeable.
pub fn component_score_schema() -> serde_json::Value {
    json!({
        "type": "object",
        "properties": {
            "score": {"type": "number", "minimum": 0, "maximum": 100},
            "recommendation": {
                "type": "string",
                "enum": ["strong_buy", "buy", "hold", "sell", "strong_sell"]
            },
            "reasons": {"type": "array", "items": {"type": "string"}}
        },
        "required": ["score", "reasons"]
    })
}

pub fn technical_prompt(ticker: &str, report: &IndicatorReport) -> String {
    format!(
        "Score the technical setup of {} on a 0-100 scale (50 = neutral).\n\
         Indicator readings:\n{}\n\
         Weigh trend, momentum, and volume; cite the indicators behind your score.",
        ticker,
        serde_json::to_string_pretty(report).unwrap_or_default()
    )
}

pub fn fundamental_prompt(ticker: &str, snapshot: &FundamentalSnapshot) -> String {
    format!(
        "Score the fundamentals of {} on a 0-100 scale (50 = neutral).\n\
         Available data:\n{}\n\
         Consider valuation, profitability, financial health, growth, and analyst consensus.",
        ticker,
        serde_json::to_string_pretty(snapshot).unwrap_or_default()
    )
}

pub fn sentiment_prompt(ticker: &str, articles: &[NewsArticle]) -> String {
    let mut lines = String::new();
    for article in articles.iter().take(25) {
        lines.push_str(&format!(
            "- [{}] {}{}\n",
            article.published_at.format("%Y-%m-%d"),
            article.title,
            article
                .summary
                .as_deref()
                .map(|s| format!(": {}", s))
                .unwrap_or_default()
        ));
    }
    format!(
        "Score the news sentiment for {} on a 0-100 scale (50 = neutral).\n\
         Recent articles, newest first:\n{}\
         Weigh recent articles more heavily and explain the drivers.",
        ticker, lines
    )
}

/// Validate and convert an LLM completion into a ComponentScore
pub fn parse_component_score(value: serde_json::Value) -> Result<ComponentScore, AnalysisError> {
    let score = value
        .get("score")
        .and_then(|s| s.as_f64())
        .ok_or_else(|| AnalysisError::LlmFailure("completion missing numeric score".to_string()))?;

    if !score.is_finite() {
        return Err(AnalysisError::LlmFailure(
            "completion score is not finite".to_string(),
        ));
    }

    let mut breakdown = json!({"source": "llm"});
    if let (Some(map), Some(value_map)) = (breakdown.as_object_mut(), value.as_object()) {
        for (k, v) in value_map {
            if k != "score" {
                map.insert(k.clone(), v.clone());
            }
        }
    }

    Ok(ComponentScore::new(score, breakdown))
}
