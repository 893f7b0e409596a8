use crate::strategies::FilterStrategy;
use chrono::{NaiveDate, Utc};
use pipeline_core::{AnalysisError, FilterDecision, FilterRunResult, PriceFetcher, RunStatus};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct FilterConfig {
    /// Price window fetched per ticker, in calendar days back
    pub window_days: u32,
    /// Fewer points than this skips the ticker before the strategy runs
    pub min_points: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            window_days: 60,
            min_points: 5,
        }
    }
}

/// Applies one strategy across a ticker list, fetching a bounded price
/// window per ticker and aggregating pass/fail with reasons.
///
/// Per-ticker fetch errors and short histories become exclusion reasons;
/// a batch-level failure fails closed with zero filtered tickers.
pub struct FilterOrchestrator {
    price_fetcher: Arc<dyn PriceFetcher>,
    config: FilterConfig,
}

impl FilterOrchestrator {
    pub fn new(price_fetcher: Arc<dyn PriceFetcher>, config: FilterConfig) -> Self {
        Self {
            price_fetcher,
            config,
        }
    }

    pub async fn run(
        &self,
        strategy: &dyn FilterStrategy,
        tickers: &[String],
        as_of: Option<NaiveDate>,
    ) -> FilterRunResult {
        match self.run_inner(strategy, tickers, as_of).await {
            Ok(result) => result,
            Err(e) => {
                tracing::error!("filter run with '{}' failed: {}", strategy.name(), e);
                FilterRunResult::failed(strategy.name(), e.to_string())
            }
        }
    }

    async fn run_inner(
        &self,
        strategy: &dyn FilterStrategy,
        tickers: &[String],
        as_of: Option<NaiveDate>,
    ) -> Result<FilterRunResult, AnalysisError> {
        tracing::info!(
            "filtering {} tickers with '{}' strategy{}",
            tickers.len(),
            strategy.name(),
            as_of.map(|d| format!(" as of {}", d)).unwrap_or_default()
        );

        let mut decisions = Vec::with_capacity(tickers.len());
        let mut filtered_tickers = Vec::new();

        for ticker in tickers {
            let decision = self.evaluate_ticker(strategy, ticker, as_of).await;
            if decision.included {
                filtered_tickers.push(ticker.clone());
            }
            decisions.push(decision);
        }

        let total_filtered = filtered_tickers.len();
        tracing::info!(
            "'{}' passed {}/{} tickers",
            strategy.name(),
            total_filtered,
            tickers.len()
        );

        Ok(FilterRunResult {
            status: RunStatus::Ok,
            strategy: strategy.name().to_string(),
            filtered_tickers,
            total_scanned: tickers.len(),
            total_filtered,
            decisions,
            timestamp: Utc::now(),
        })
    }

    async fn evaluate_ticker(
        &self,
        strategy: &dyn FilterStrategy,
        ticker: &str,
        as_of: Option<NaiveDate>,
    ) -> FilterDecision {
        let series = match self
            .price_fetcher
            .fetch(ticker, self.config.window_days, as_of)
            .await
        {
            Ok(series) => series,
            Err(e) => {
                tracing::warn!("skipping {}: {}", ticker, e);
                return FilterDecision {
                    ticker: ticker.to_string(),
                    included: false,
                    reasons: vec![format!("price fetch failed: {}", e)],
                    latest_price: None,
                };
            }
        };

        if series.len() < self.config.min_points {
            return FilterDecision {
                ticker: ticker.to_string(),
                included: false,
                reasons: vec![format!(
                    "only {} price points available, need {}",
                    series.len(),
                    self.config.min_points
                )],
                latest_price: series.latest_price,
            };
        }

        let verdict = strategy.evaluate(ticker, &series.prices);
        FilterDecision {
            ticker: ticker.to_string(),
            included: verdict.included,
            reasons: verdict.reasons,
            latest_price: series.latest_price,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::strategies::{AllStrategy, AnomalyConfig, AnomalyStrategy};
    use async_trait::async_trait;
    use chrono::NaiveDate;
    use pipeline_core::{PricePoint, PriceSeries};
    use std::sync::Mutex;

    struct MockPriceFetcher {
        points_per_ticker: usize,
        fail_for: Option<String>,
        seen_as_of: Mutex<Vec<Option<NaiveDate>>>,
    }

    impl MockPriceFetcher {
        fn new(points_per_ticker: usize) -> Self {
            Self {
                points_per_ticker,
                fail_for: None,
                seen_as_of: Mutex::new(Vec::new()),
            }
        }

        fn failing_for(mut self, ticker: &str) -> Self {
            self.fail_for = Some(ticker.to_string());
            self
        }
    }

    #[async_trait]
    impl PriceFetcher for MockPriceFetcher {
        async fn fetch(
            &self,
            ticker: &str,
            _days_back: u32,
            as_of: Option<NaiveDate>,
        ) -> Result<PriceSeries, AnalysisError> {
            self.seen_as_of.lock().unwrap().push(as_of);
            if self.fail_for.as_deref() == Some(ticker) {
                return Err(AnalysisError::FetchFailed("provider 500".to_string()));
            }
            let prices: Vec<PricePoint> = (0..self.points_per_ticker)
                .map(|i| PricePoint {
                    date: NaiveDate::from_ymd_opt(2024, 1, 1).unwrap()
                        + chrono::Duration::days(i as i64),
                    open: 100.0,
                    high: 101.0,
                    low: 99.0,
                    close: 100.0,
                    volume: 1_000_000.0,
                    currency: "USD".to_string(),
                })
                .collect();
            Ok(PriceSeries::new(prices))
        }
    }

    fn tickers(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn all_strategy_passes_everything() {
        let orchestrator = FilterOrchestrator::new(
            Arc::new(MockPriceFetcher::new(30)),
            FilterConfig::default(),
        );
        let result = orchestrator
            .run(&AllStrategy, &tickers(&["AAA", "BBB", "CCC"]), None)
            .await;

        assert_eq!(result.status, RunStatus::Ok);
        assert_eq!(result.total_scanned, 3);
        assert_eq!(result.total_filtered, 3);
        assert_eq!(result.filtered_tickers, tickers(&["AAA", "BBB", "CCC"]));
        assert!(result.decisions.iter().all(|d| d.included));
    }

    #[tokio::test]
    async fn fetch_failure_skips_ticker_not_batch() {
        let orchestrator = FilterOrchestrator::new(
            Arc::new(MockPriceFetcher::new(30).failing_for("BAD")),
            FilterConfig::default(),
        );
        let result = orchestrator
            .run(&AllStrategy, &tickers(&["AAA", "BAD", "CCC"]), None)
            .await;

        assert_eq!(result.status, RunStatus::Ok);
        assert_eq!(result.total_scanned, 3);
        assert_eq!(result.total_filtered, 2);

        let bad = result.decisions.iter().find(|d| d.ticker == "BAD").unwrap();
        assert!(!bad.included);
        assert!(bad.reasons[0].contains("price fetch failed"));
    }

    #[tokio::test]
    async fn short_series_is_excluded_with_diagnostic() {
        let orchestrator = FilterOrchestrator::new(
            Arc::new(MockPriceFetcher::new(3)),
            FilterConfig::default(),
        );
        let strategy = AnomalyStrategy::new(AnomalyConfig::default());
        let result = orchestrator.run(&strategy, &tickers(&["TINY"]), None).await;

        assert_eq!(result.total_filtered, 0);
        assert!(result.decisions[0].reasons[0].contains("price points available"));
    }

    #[tokio::test]
    async fn as_of_reaches_the_fetcher() {
        let fetcher = Arc::new(MockPriceFetcher::new(30));
        let orchestrator = FilterOrchestrator::new(fetcher.clone(), FilterConfig::default());
        let as_of = NaiveDate::from_ymd_opt(2023, 6, 30).unwrap();

        let _ = orchestrator
            .run(&AllStrategy, &tickers(&["AAA"]), Some(as_of))
            .await;

        let seen = fetcher.seen_as_of.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0], Some(as_of));
    }

    #[tokio::test]
    async fn latest_price_is_carried_into_the_decision() {
        let orchestrator = FilterOrchestrator::new(
            Arc::new(MockPriceFetcher::new(30)),
            FilterConfig::default(),
        );
        let result = orchestrator.run(&AllStrategy, &tickers(&["AAA"]), None).await;
        assert_eq!(result.decisions[0].latest_price, Some(100.0));
    }
}
