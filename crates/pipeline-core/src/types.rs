use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One trading day of OHLCV data
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricePoint {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    #[serde(default = "default_currency")]
    pub currency: String,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl PricePoint {
    /// Invariant check: high >= low >= 0, volume >= 0
    pub fn is_valid(&self) -> bool {
        self.high >= self.low && self.low >= 0.0 && self.volume >= 0.0
    }
}

/// A fetched price window, oldest to newest
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PriceSeries {
    pub prices: Vec<PricePoint>,
    pub latest_price: Option<f64>,
}

impl PriceSeries {
    pub fn new(prices: Vec<PricePoint>) -> Self {
        let latest_price = prices.last().map(|p| p.close);
        Self {
            prices,
            latest_price,
        }
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }

    pub fn currency(&self) -> &str {
        self.prices
            .last()
            .map(|p| p.currency.as_str())
            .unwrap_or("USD")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SentimentLabel {
    Positive,
    Negative,
    Neutral,
}

/// News article as returned by the news-fetch collaborator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsArticle {
    pub title: String,
    pub summary: Option<String>,
    pub source: String,
    pub published_at: DateTime<Utc>,
    /// Provider-attached sentiment, if any
    #[serde(default)]
    pub sentiment: Option<SentimentLabel>,
    /// 0..1 magnitude attached by the provider
    #[serde(default)]
    pub sentiment_score: Option<f64>,
    /// 0..100 importance attached by the provider
    #[serde(default)]
    pub importance: Option<f64>,
}

/// Per-ticker outcome of one filter run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterDecision {
    pub ticker: String,
    pub included: bool,
    pub reasons: Vec<String>,
    pub latest_price: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "message")]
pub enum RunStatus {
    Ok,
    Error(String),
}

/// Aggregate result of applying one strategy across a ticker list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRunResult {
    pub status: RunStatus,
    pub strategy: String,
    pub filtered_tickers: Vec<String>,
    pub total_scanned: usize,
    pub total_filtered: usize,
    pub decisions: Vec<FilterDecision>,
    pub timestamp: DateTime<Utc>,
}

impl FilterRunResult {
    /// Fail-closed result: zero filtered tickers, carrying the batch error
    pub fn failed(strategy: &str, message: String) -> Self {
        Self {
            status: RunStatus::Error(message),
            strategy: strategy.to_string(),
            filtered_tickers: Vec::new(),
            total_scanned: 0,
            total_filtered: 0,
            decisions: Vec::new(),
            timestamp: Utc::now(),
        }
    }
}

/// Computed value of a single indicator, keyed by name + parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "type")]
pub enum IndicatorValue {
    Value {
        value: f64,
    },
    Macd {
        line: f64,
        signal: f64,
        histogram: f64,
    },
    Bands {
        upper: f64,
        middle: f64,
        lower: f64,
    },
    Stochastic {
        k: f64,
        d: f64,
    },
    Ichimoku {
        conversion: f64,
        base: f64,
        span_a: f64,
        span_b: f64,
    },
    /// Calculation failure isolated to this indicator
    Failed {
        error: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendDirection {
    Bullish,
    Bearish,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendStrength {
    Strong,
    Moderate,
    Weak,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendSummary {
    pub direction: TrendDirection,
    pub strength: TrendStrength,
    /// Some(true) = golden cross, Some(false) = death cross, None = SMAs unavailable
    pub golden_cross: Option<bool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VolumeStatus {
    High,
    Low,
    Normal,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolumeAnalysis {
    /// Latest volume over trailing-20 average
    pub ratio: f64,
    pub status: VolumeStatus,
}

/// Full output of the indicator engine for one price series
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorReport {
    pub values: BTreeMap<String, IndicatorValue>,
    pub trend: TrendSummary,
    pub volume: VolumeAnalysis,
}

impl IndicatorReport {
    pub fn value(&self, key: &str) -> Option<f64> {
        match self.values.get(key) {
            Some(IndicatorValue::Value { value }) => Some(*value),
            _ => None,
        }
    }
}

/// A 0..100 component score with its breakdown attached
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentScore {
    pub score: f64,
    pub breakdown: serde_json::Value,
}

impl ComponentScore {
    /// Construct with the score clamped into [0, 100]
    pub fn new(score: f64, breakdown: serde_json::Value) -> Self {
        Self {
            score: score.clamp(0.0, 100.0),
            breakdown,
        }
    }

    pub fn neutral(breakdown: serde_json::Value) -> Self {
        Self {
            score: 50.0,
            breakdown,
        }
    }
}

/// Five-bucket recommendation used by the component scorers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Recommendation {
    StrongBuy,
    Buy,
    Hold,
    Sell,
    StrongSell,
}

impl Recommendation {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 75.0 => Recommendation::StrongBuy,
            s if s >= 60.0 => Recommendation::Buy,
            s if s >= 40.0 => Recommendation::Hold,
            s if s >= 25.0 => Recommendation::Sell,
            _ => Recommendation::StrongSell,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::StrongBuy => "strong_buy",
            Recommendation::Buy => "buy",
            Recommendation::Hold => "hold",
            Recommendation::Sell => "sell",
            Recommendation::StrongSell => "strong_sell",
        }
    }
}

/// Synthesis-level action bucket over the combined final score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalAction {
    Buy,
    HoldBullish,
    Hold,
    HoldBearish,
    Sell,
}

impl SignalAction {
    pub fn from_score(score: f64) -> Self {
        match score {
            s if s >= 75.0 => SignalAction::Buy,
            s if s >= 60.0 => SignalAction::HoldBullish,
            s if s >= 40.0 => SignalAction::Hold,
            s if s >= 25.0 => SignalAction::HoldBearish,
            _ => SignalAction::Sell,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SignalAction::Buy => "buy",
            SignalAction::HoldBullish => "hold_bullish",
            SignalAction::Hold => "hold",
            SignalAction::HoldBearish => "hold_bearish",
            SignalAction::Sell => "sell",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Moderate,
    High,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeHorizon {
    Short,
    Medium,
    Long,
}

/// Final synthesized signal for one ticker, one analysis run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InvestmentSignal {
    pub ticker: String,
    pub current_price: Option<f64>,
    pub currency: String,
    pub technical_score: f64,
    pub fundamental_score: f64,
    pub sentiment_score: f64,
    pub final_score: f64,
    pub recommendation: SignalAction,
    /// 0..100, from cross-component agreement (not a statistical interval)
    pub confidence: f64,
    pub key_reasons: Vec<String>,
    pub risk_level: RiskLevel,
    pub time_horizon: TimeHorizon,
    /// Indicative (low, high) expected return range, percent
    pub expected_return: (f64, f64),
    pub generated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    Success,
    Error,
}

/// Outcome of one hybrid (LLM-or-fallback) task execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HybridTaskResult<T> {
    pub status: TaskStatus,
    pub result: Option<T>,
    pub used_llm: bool,
    pub used_fallback: bool,
    pub error: Option<String>,
}

impl<T> HybridTaskResult<T> {
    pub fn llm_success(result: T) -> Self {
        Self {
            status: TaskStatus::Success,
            result: Some(result),
            used_llm: true,
            used_fallback: false,
            error: None,
        }
    }

    pub fn fallback_success(result: T) -> Self {
        Self {
            status: TaskStatus::Success,
            result: Some(result),
            used_llm: false,
            used_fallback: true,
            error: None,
        }
    }

    pub fn failed(error: String) -> Self {
        Self {
            status: TaskStatus::Error,
            result: None,
            used_llm: false,
            used_fallback: false,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == TaskStatus::Success
    }
}

/// Analyst rating counts from the free-tier data provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalystRatings {
    pub strong_buy: u32,
    pub buy: u32,
    pub hold: u32,
    pub sell: u32,
    pub strong_sell: u32,
}

impl AnalystRatings {
    pub fn total(&self) -> u32 {
        self.strong_buy + self.buy + self.hold + self.sell + self.strong_sell
    }
}

/// Coarse sentiment distribution from the free-tier provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SentimentPercentages {
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub neutral_pct: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MomentumTrend {
    Up,
    Down,
    Flat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceMomentum {
    pub change_pct: f64,
    pub trend: MomentumTrend,
}

/// Valuation multiples
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValuationMetrics {
    pub pe_ratio: Option<f64>,
    pub pb_ratio: Option<f64>,
    pub ev_to_ebitda: Option<f64>,
    pub peg_ratio: Option<f64>,
}

/// Margin and return metrics, percentages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProfitabilityMetrics {
    pub gross_margin: Option<f64>,
    pub operating_margin: Option<f64>,
    pub net_margin: Option<f64>,
    pub roe: Option<f64>,
    pub roa: Option<f64>,
}

/// Balance-sheet and cash-flow health
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HealthMetrics {
    pub debt_to_equity: Option<f64>,
    pub current_ratio: Option<f64>,
    pub quick_ratio: Option<f64>,
    pub free_cash_flow: Option<f64>,
    pub operating_cash_flow: Option<f64>,
}

/// Year-over-year growth, percentages
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GrowthMetrics {
    pub revenue_yoy: Option<f64>,
    pub earnings_yoy: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalMetrics {
    pub valuation: ValuationMetrics,
    pub profitability: ProfitabilityMetrics,
    pub health: HealthMetrics,
    pub growth: GrowthMetrics,
}

/// Everything the fundamental-fetch collaborator can return for one ticker.
/// Free-tier fields and rich metrics are both optional; the scorers pick
/// whichever side is populated.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FundamentalSnapshot {
    pub analyst: Option<AnalystRatings>,
    pub sentiment: Option<SentimentPercentages>,
    pub momentum: Option<PriceMomentum>,
    pub metrics: Option<FundamentalMetrics>,
}
