pub mod prompts;

use chrono::{NaiveDate, Utc};
use hybrid_executor::{HybridConfig, HybridExecutor, RunStatsSnapshot};
use pipeline_core::{
    AnalysisError, ComponentScore, FilterRunResult, FundamentalFetcher, HybridTaskResult,
    InvestmentSignal, LlmClient, NewsFetcher, PriceFetcher, PriceSeries,
};
use sentiment_analysis::{SentimentConfig, SentimentWeightingEngine};
use serde::Serialize;
use signal_synthesis::{SignalSynthesizer, SynthesisWeights};
use std::sync::Arc;
use technical_analysis::{EngineConfig, IndicatorEngine, TechnicalScorer};
use ticker_filter::{FilterConfig, FilterOrchestrator, FilterStrategy};

use fundamental_analysis::{FreeTierScorer, MetricsScorer};
pub use prompts::{
    component_score_schema, fundamental_prompt, parse_component_score, sentiment_prompt,
    technical_prompt,
};

/// Whether signals in this run came from the LLM-assisted or rule-based
/// path; external persistence keys stored artifacts by this
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMode {
    LlmAssisted,
    RuleBased,
}

impl AnalysisMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            AnalysisMode::LlmAssisted => "llm",
            AnalysisMode::RuleBased => "rule_based",
        }
    }
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Price window per ticker; long enough for the 200-day SMA
    pub price_window_days: u32,
    pub news_limit: usize,
    pub news_max_age_days: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            price_window_days: 250,
            news_limit: 25,
            news_max_age_days: 30,
        }
    }
}

/// Per-ticker analysis output: the synthesized signal plus the per-stage
/// execution bookkeeping
#[derive(Debug, Clone)]
pub struct TickerAnalysis {
    pub signal: InvestmentSignal,
    pub mode: AnalysisMode,
    pub technical: HybridTaskResult<ComponentScore>,
    pub fundamental: HybridTaskResult<ComponentScore>,
    pub sentiment: HybridTaskResult<ComponentScore>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TickerDiagnostic {
    pub ticker: String,
    pub error: String,
}

/// Batch output: partial results plus per-ticker diagnostics; one ticker's
/// failure never aborts the batch
#[derive(Debug)]
pub struct BatchAnalysisResult {
    pub analyses: Vec<TickerAnalysis>,
    pub diagnostics: Vec<TickerDiagnostic>,
    pub stats: RunStatsSnapshot,
}

#[derive(Debug)]
pub struct PipelineRunResult {
    pub filter: FilterRunResult,
    pub batch: BatchAnalysisResult,
}

/// Wires the filter, the three scoring stages, and the synthesis step
/// around the external collaborators. Stage order within a ticker is a
/// strict data dependency: technical, then fundamental, then sentiment,
/// then synthesis.
pub struct AnalysisPipeline {
    price_fetcher: Arc<dyn PriceFetcher>,
    news_fetcher: Arc<dyn NewsFetcher>,
    fundamental_fetcher: Arc<dyn FundamentalFetcher>,
    llm: Option<Arc<dyn LlmClient>>,
    indicator_engine: IndicatorEngine,
    technical_scorer: TechnicalScorer,
    sentiment_engine: SentimentWeightingEngine,
    free_tier_scorer: FreeTierScorer,
    metrics_scorer: MetricsScorer,
    synthesizer: SignalSynthesizer,
    executor: HybridExecutor,
    filter_orchestrator: FilterOrchestrator,
    config: PipelineConfig,
}

impl AnalysisPipeline {
    pub fn new(
        price_fetcher: Arc<dyn PriceFetcher>,
        news_fetcher: Arc<dyn NewsFetcher>,
        fundamental_fetcher: Arc<dyn FundamentalFetcher>,
    ) -> Self {
        let filter_orchestrator =
            FilterOrchestrator::new(price_fetcher.clone(), FilterConfig::default());
        Self {
            price_fetcher,
            news_fetcher,
            fundamental_fetcher,
            llm: None,
            indicator_engine: IndicatorEngine::new(EngineConfig::default()),
            technical_scorer: TechnicalScorer::new(),
            sentiment_engine: SentimentWeightingEngine::new(SentimentConfig::default()),
            free_tier_scorer: FreeTierScorer::default(),
            metrics_scorer: MetricsScorer::default(),
            synthesizer: SignalSynthesizer::default(),
            executor: HybridExecutor::default(),
            filter_orchestrator,
            config: PipelineConfig::default(),
        }
    }

    pub fn with_llm(mut self, llm: Arc<dyn LlmClient>) -> Self {
        self.llm = Some(llm);
        self
    }

    pub fn with_config(mut self, config: PipelineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_weights(mut self, weights: SynthesisWeights) -> Self {
        self.synthesizer = SignalSynthesizer::new(weights);
        self
    }

    pub fn with_hybrid_config(mut self, config: HybridConfig) -> Self {
        self.executor = HybridExecutor::new(config);
        self
    }

    pub fn mode(&self) -> AnalysisMode {
        if self.llm.is_some() {
            AnalysisMode::LlmAssisted
        } else {
            AnalysisMode::RuleBased
        }
    }

    pub fn stats(&self) -> RunStatsSnapshot {
        self.executor.stats()
    }

    /// One scoring stage: LLM-first when a client is wired, with the
    /// deterministic scorer as fallback; rule-based otherwise.
    async fn scored_stage<F>(
        &self,
        task: &str,
        agent_role: &str,
        prompt: String,
        fallback: F,
    ) -> HybridTaskResult<ComponentScore>
    where
        F: FnOnce() -> Result<ComponentScore, AnalysisError>,
    {
        match &self.llm {
            Some(client) => {
                let client = client.clone();
                let schema = component_score_schema();
                let role = agent_role.to_string();
                let llm_path = async move {
                    let raw = client.complete(&prompt, &role, &schema).await?;
                    parse_component_score(raw)
                };
                self.executor.execute(task, llm_path, Some(fallback)).await
            }
            None => self.executor.execute_rule_based(task, fallback),
        }
    }

    async fn technical_stage(
        &self,
        ticker: &str,
        series: &PriceSeries,
    ) -> Result<HybridTaskResult<ComponentScore>, AnalysisError> {
        let report = self.indicator_engine.compute(&series.prices)?;
        let prompt = technical_prompt(ticker, &report);
        let prices = series.prices.clone();
        let scorer = &self.technical_scorer;
        let fallback = move || Ok(scorer.score(&prices, &report));

        Ok(self
            .scored_stage(
                &format!("{}:technical", ticker),
                "a technical analyst",
                prompt,
                fallback,
            )
            .await)
    }

    async fn fundamental_stage(&self, ticker: &str) -> HybridTaskResult<ComponentScore> {
        let snapshot = match self.fundamental_fetcher.fetch(ticker).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!("{}: fundamental fetch failed: {}", ticker, e);
                return HybridTaskResult::failed(format!("fundamental fetch failed: {}", e));
            }
        };

        let prompt = fundamental_prompt(ticker, &snapshot);
        let free_tier = &self.free_tier_scorer;
        let metrics = &self.metrics_scorer;
        let fallback = move || {
            // richer metrics win when the provider has them; otherwise the
            // free-tier signals carry the score
            Ok(match &snapshot.metrics {
                Some(m) => metrics.score(m),
                None => free_tier.score(
                    snapshot.analyst.as_ref(),
                    snapshot.sentiment.as_ref(),
                    snapshot.momentum.as_ref(),
                ),
            })
        };

        self.scored_stage(
            &format!("{}:fundamental", ticker),
            "a fundamental analyst",
            prompt,
            fallback,
        )
        .await
    }

    async fn sentiment_stage(&self, ticker: &str) -> HybridTaskResult<ComponentScore> {
        let articles = match self
            .news_fetcher
            .fetch(ticker, self.config.news_limit, self.config.news_max_age_days)
            .await
        {
            Ok(articles) => articles,
            Err(e) => {
                tracing::warn!("{}: news fetch failed: {}", ticker, e);
                return HybridTaskResult::failed(format!("news fetch failed: {}", e));
            }
        };

        let assessment = self.sentiment_engine.aggregate(&articles, Utc::now());
        if assessment.requires_llm_analysis {
            tracing::debug!(
                "{}: no provider sentiment on {} articles, LLM pass needed",
                ticker,
                articles.len()
            );
        }

        let prompt = sentiment_prompt(ticker, &articles);
        let fallback = move || Ok(assessment.to_component_score());

        self.scored_stage(
            &format!("{}:sentiment", ticker),
            "a market sentiment analyst",
            prompt,
            fallback,
        )
        .await
    }

    /// Full per-ticker run. A failed stage skips synthesis for this ticker
    /// rather than guessing a score.
    pub async fn analyze_ticker(
        &self,
        ticker: &str,
        as_of: Option<NaiveDate>,
    ) -> Result<TickerAnalysis, AnalysisError> {
        tracing::info!("analyzing {}{}", ticker, match as_of {
            Some(d) => format!(" as of {}", d),
            None => String::new(),
        });

        let series = self
            .price_fetcher
            .fetch(ticker, self.config.price_window_days, as_of)
            .await?;

        let technical = self.technical_stage(ticker, &series).await?;
        let fundamental = self.fundamental_stage(ticker).await;
        let sentiment = self.sentiment_stage(ticker).await;

        let signal = self.synthesizer.synthesize(
            ticker,
            series.latest_price,
            series.currency(),
            technical.result.as_ref(),
            fundamental.result.as_ref(),
            sentiment.result.as_ref(),
        )?;

        Ok(TickerAnalysis {
            signal,
            mode: self.mode(),
            technical,
            fundamental,
            sentiment,
        })
    }

    /// Sequential batch run with partial results and per-ticker diagnostics
    pub async fn analyze_many(
        &self,
        tickers: &[String],
        as_of: Option<NaiveDate>,
    ) -> BatchAnalysisResult {
        let mut analyses = Vec::new();
        let mut diagnostics = Vec::new();

        for ticker in tickers {
            match self.analyze_ticker(ticker, as_of).await {
                Ok(analysis) => analyses.push(analysis),
                Err(e) => {
                    tracing::warn!("skipping {}: {}", ticker, e);
                    diagnostics.push(TickerDiagnostic {
                        ticker: ticker.clone(),
                        error: e.to_string(),
                    });
                }
            }
        }

        tracing::info!(
            "batch complete: {} analyzed, {} skipped",
            analyses.len(),
            diagnostics.len()
        );

        BatchAnalysisResult {
            analyses,
            diagnostics,
            stats: self.executor.stats(),
        }
    }

    /// Filter-first entry point: apply a strategy across the universe, then
    /// analyze whatever passed
    pub async fn scan_and_analyze(
        &self,
        strategy: &dyn FilterStrategy,
        tickers: &[String],
        as_of: Option<NaiveDate>,
    ) -> PipelineRunResult {
        let filter = self.filter_orchestrator.run(strategy, tickers, as_of).await;
        let batch = self.analyze_many(&filter.filtered_tickers, as_of).await;
        PipelineRunResult { filter, batch }
    }
}
