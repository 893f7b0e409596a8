use crate::{AnalysisError, FundamentalSnapshot, NewsArticle, PriceSeries};
use async_trait::async_trait;
use chrono::NaiveDate;

/// Price-series fetch collaborator.
///
/// `as_of` constrains the window to data available on that date, which lets
/// a backtest run without lookahead.
#[async_trait]
pub trait PriceFetcher: Send + Sync {
    async fn fetch(
        &self,
        ticker: &str,
        days_back: u32,
        as_of: Option<NaiveDate>,
    ) -> Result<PriceSeries, AnalysisError>;
}

/// News-fetch collaborator
#[async_trait]
pub trait NewsFetcher: Send + Sync {
    async fn fetch(
        &self,
        ticker: &str,
        limit: usize,
        max_age_days: u32,
    ) -> Result<Vec<NewsArticle>, AnalysisError>;
}

/// Fundamental-data collaborator (analyst counts, metrics, momentum)
#[async_trait]
pub trait FundamentalFetcher: Send + Sync {
    async fn fetch(&self, ticker: &str) -> Result<FundamentalSnapshot, AnalysisError>;
}

/// Structured-completion LLM collaborator.
///
/// Implementations return the parsed JSON object matching `schema`; any
/// transport, status, timeout, or parse failure surfaces as
/// `AnalysisError::LlmFailure` and the hybrid layer treats them uniformly.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(
        &self,
        prompt: &str,
        agent_role: &str,
        schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AnalysisError>;
}
