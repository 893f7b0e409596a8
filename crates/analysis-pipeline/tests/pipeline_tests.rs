use analysis_pipeline::{AnalysisMode, AnalysisPipeline};
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, Utc};
use pipeline_core::{
    AnalysisError, FundamentalFetcher, FundamentalMetrics, FundamentalSnapshot, GrowthMetrics,
    HealthMetrics, LlmClient, NewsArticle, NewsFetcher, PriceFetcher, PricePoint, PriceSeries,
    ProfitabilityMetrics, SentimentLabel, SignalAction, TaskStatus, ValuationMetrics,
};
use serde_json::json;
use std::sync::Arc;
use ticker_filter::AllStrategy;

struct TrendingPrices {
    points: usize,
    fail_for: Option<&'static str>,
}

impl TrendingPrices {
    fn new(points: usize) -> Self {
        Self {
            points,
            fail_for: None,
        }
    }

    fn failing_for(mut self, ticker: &'static str) -> Self {
        self.fail_for = Some(ticker);
        self
    }
}

#[async_trait]
impl PriceFetcher for TrendingPrices {
    async fn fetch(
        &self,
        ticker: &str,
        _days_back: u32,
        _as_of: Option<NaiveDate>,
    ) -> Result<PriceSeries, AnalysisError> {
        if self.fail_for == Some(ticker) {
            return Err(AnalysisError::FetchFailed("provider timeout".to_string()));
        }
        let prices: Vec<PricePoint> = (0..self.points)
            .map(|i| {
                let close = 50.0 + i as f64 * 0.2;
                PricePoint {
                    date: NaiveDate::from_ymd_opt(2023, 1, 2).unwrap()
                        + Duration::days(i as i64),
                    open: close - 0.1,
                    high: close + 0.5,
                    low: close - 0.5,
                    close,
                    volume: 800_000.0,
                    currency: "USD".to_string(),
                }
            })
            .collect();
        Ok(PriceSeries::new(prices))
    }
}

struct StaticNews {
    scored: bool,
}

#[async_trait]
impl NewsFetcher for StaticNews {
    async fn fetch(
        &self,
        _ticker: &str,
        _limit: usize,
        _max_age_days: u32,
    ) -> Result<Vec<NewsArticle>, AnalysisError> {
        let now = Utc::now();
        let article = |days: i64, sentiment, score| NewsArticle {
            title: "quarterly results".to_string(),
            summary: Some("beat expectations".to_string()),
            source: "wire".to_string(),
            published_at: now - Duration::days(days),
            sentiment,
            sentiment_score: score,
            importance: Some(60.0),
        };
        if self.scored {
            Ok(vec![
                article(0, Some(SentimentLabel::Positive), Some(0.8)),
                article(3, Some(SentimentLabel::Positive), Some(0.6)),
                article(10, Some(SentimentLabel::Negative), Some(0.4)),
            ])
        } else {
            Ok(vec![article(0, None, None), article(5, None, None)])
        }
    }
}

struct StaticFundamentals;

#[async_trait]
impl FundamentalFetcher for StaticFundamentals {
    async fn fetch(&self, _ticker: &str) -> Result<FundamentalSnapshot, AnalysisError> {
        Ok(FundamentalSnapshot {
            analyst: None,
            sentiment: None,
            momentum: None,
            metrics: Some(FundamentalMetrics {
                valuation: ValuationMetrics {
                    pe_ratio: Some(18.0),
                    pb_ratio: Some(2.5),
                    ev_to_ebitda: Some(11.0),
                    peg_ratio: Some(1.4),
                },
                profitability: ProfitabilityMetrics {
                    gross_margin: Some(55.0),
                    operating_margin: Some(22.0),
                    net_margin: Some(18.0),
                    roe: Some(18.0),
                    roa: Some(9.0),
                },
                health: HealthMetrics {
                    debt_to_equity: Some(0.8),
                    current_ratio: Some(1.8),
                    quick_ratio: Some(1.2),
                    free_cash_flow: Some(500_000.0),
                    operating_cash_flow: Some(900_000.0),
                },
                growth: GrowthMetrics {
                    revenue_yoy: Some(12.0),
                    earnings_yoy: Some(15.0),
                },
            }),
        })
    }
}

struct FailingFundamentals;

#[async_trait]
impl FundamentalFetcher for FailingFundamentals {
    async fn fetch(&self, _ticker: &str) -> Result<FundamentalSnapshot, AnalysisError> {
        Err(AnalysisError::FetchFailed("no fundamentals".to_string()))
    }
}

/// Returns a fixed score, or fails every call when `score` is None
struct MockLlm {
    score: Option<f64>,
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(
        &self,
        _prompt: &str,
        _agent_role: &str,
        _schema: &serde_json::Value,
    ) -> Result<serde_json::Value, AnalysisError> {
        match self.score {
            Some(score) => Ok(json!({"score": score, "reasons": ["model judgment"]})),
            None => Err(AnalysisError::LlmFailure("model overloaded".to_string())),
        }
    }
}

fn rule_based_pipeline() -> AnalysisPipeline {
    AnalysisPipeline::new(
        Arc::new(TrendingPrices::new(250)),
        Arc::new(StaticNews { scored: true }),
        Arc::new(StaticFundamentals),
    )
}

#[tokio::test]
async fn rule_based_end_to_end() {
    let pipeline = rule_based_pipeline();
    let analysis = pipeline.analyze_ticker("TEST", None).await.unwrap();

    assert_eq!(analysis.mode, AnalysisMode::RuleBased);
    for stage in [&analysis.technical, &analysis.fundamental, &analysis.sentiment] {
        assert_eq!(stage.status, TaskStatus::Success);
        assert!(!stage.used_llm);
        assert!(!stage.used_fallback);
    }

    let signal = &analysis.signal;
    assert!((0.0..=100.0).contains(&signal.final_score));
    assert!((0.0..=100.0).contains(&signal.confidence));
    assert_eq!(signal.recommendation, SignalAction::from_score(signal.final_score));
    assert_eq!(signal.currency, "USD");
    assert!(signal.current_price.is_some());
    assert!(!signal.key_reasons.is_empty());
}

#[tokio::test]
async fn llm_path_is_preferred_when_wired() {
    let pipeline = rule_based_pipeline().with_llm(Arc::new(MockLlm { score: Some(80.0) }));
    let analysis = pipeline.analyze_ticker("TEST", None).await.unwrap();

    assert_eq!(analysis.mode, AnalysisMode::LlmAssisted);
    for stage in [&analysis.technical, &analysis.fundamental, &analysis.sentiment] {
        assert!(stage.used_llm);
        assert!(!stage.used_fallback);
    }
    // all three components scored 80, so the final is exactly 80, unanimous
    assert!((analysis.signal.final_score - 80.0).abs() < 1e-9);
    assert_eq!(analysis.signal.recommendation, SignalAction::Buy);
    assert!((analysis.signal.confidence - 100.0).abs() < 1e-9);

    let stats = pipeline.stats();
    assert_eq!(stats.llm_used, 3);
    assert_eq!(stats.fallback_used, 0);
}

#[tokio::test]
async fn llm_failure_falls_back_to_deterministic_scoring() {
    let pipeline = rule_based_pipeline().with_llm(Arc::new(MockLlm { score: None }));
    let analysis = pipeline.analyze_ticker("TEST", None).await.unwrap();

    for stage in [&analysis.technical, &analysis.fundamental, &analysis.sentiment] {
        assert_eq!(stage.status, TaskStatus::Success);
        assert!(!stage.used_llm);
        assert!(stage.used_fallback);
    }
    assert!((0.0..=100.0).contains(&analysis.signal.final_score));

    let stats = pipeline.stats();
    assert_eq!(stats.llm_used, 0);
    assert_eq!(stats.fallback_used, 3);
}

#[tokio::test]
async fn fundamental_fetch_failure_skips_synthesis() {
    let pipeline = AnalysisPipeline::new(
        Arc::new(TrendingPrices::new(250)),
        Arc::new(StaticNews { scored: true }),
        Arc::new(FailingFundamentals),
    );

    let err = pipeline.analyze_ticker("TEST", None).await.unwrap_err();
    assert!(matches!(err, AnalysisError::MissingComponent(_)));
}

#[tokio::test]
async fn batch_returns_partial_results_with_diagnostics() {
    let pipeline = AnalysisPipeline::new(
        Arc::new(TrendingPrices::new(250).failing_for("BAD")),
        Arc::new(StaticNews { scored: true }),
        Arc::new(StaticFundamentals),
    );
    let tickers = vec!["GOOD".to_string(), "BAD".to_string()];

    let batch = pipeline.analyze_many(&tickers, None).await;
    assert_eq!(batch.analyses.len(), 1);
    assert_eq!(batch.analyses[0].signal.ticker, "GOOD");
    assert_eq!(batch.diagnostics.len(), 1);
    assert_eq!(batch.diagnostics[0].ticker, "BAD");
    assert!(batch.diagnostics[0].error.contains("provider timeout"));
}

#[tokio::test]
async fn short_history_is_a_diagnostic_not_a_panic() {
    let pipeline = AnalysisPipeline::new(
        Arc::new(TrendingPrices::new(5)),
        Arc::new(StaticNews { scored: true }),
        Arc::new(StaticFundamentals),
    );
    let batch = pipeline.analyze_many(&["TINY".to_string()], None).await;

    assert!(batch.analyses.is_empty());
    assert_eq!(batch.diagnostics.len(), 1);
    assert!(batch.diagnostics[0].error.contains("Insufficient data"));
}

#[tokio::test]
async fn unscored_news_defaults_neutral_and_flags_llm_need() {
    let pipeline = AnalysisPipeline::new(
        Arc::new(TrendingPrices::new(250)),
        Arc::new(StaticNews { scored: false }),
        Arc::new(StaticFundamentals),
    );
    let analysis = pipeline.analyze_ticker("TEST", None).await.unwrap();

    assert_eq!(analysis.signal.sentiment_score, 50.0);
    let breakdown = &analysis.sentiment.result.as_ref().unwrap().breakdown;
    assert_eq!(breakdown["requires_llm_analysis"], true);
}

#[tokio::test]
async fn scan_and_analyze_chains_filter_into_scoring() {
    let pipeline = rule_based_pipeline();
    let tickers = vec!["AAA".to_string(), "BBB".to_string()];

    let run = pipeline.scan_and_analyze(&AllStrategy, &tickers, None).await;
    assert_eq!(run.filter.total_scanned, 2);
    assert_eq!(run.filter.total_filtered, 2);
    assert_eq!(run.batch.analyses.len(), 2);
    assert!(run.batch.diagnostics.is_empty());
}
