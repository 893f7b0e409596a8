use pipeline_core::PricePoint;
use serde::Deserialize;

/// Outcome of one strategy applied to one ticker's price window
#[derive(Debug, Clone)]
pub struct FilterVerdict {
    pub included: bool,
    pub reasons: Vec<String>,
}

impl FilterVerdict {
    pub fn included(reasons: Vec<String>) -> Self {
        Self {
            included: true,
            reasons,
        }
    }

    pub fn excluded(reason: String) -> Self {
        Self {
            included: false,
            reasons: vec![reason],
        }
    }
}

/// Decides whether a ticker is interesting enough to analyze further.
/// Implementations are stateless apart from construction-time thresholds.
pub trait FilterStrategy: std::fmt::Debug + Send + Sync {
    fn name(&self) -> &'static str;

    /// Minimum history length; shorter windows are excluded with a reason,
    /// never an error
    fn min_history(&self) -> usize;

    fn evaluate(&self, ticker: &str, prices: &[PricePoint]) -> FilterVerdict;
}

fn too_short(prices: &[PricePoint], needed: usize) -> Option<FilterVerdict> {
    if prices.len() < needed {
        Some(FilterVerdict::excluded(format!(
            "insufficient history: {} points, need {}",
            prices.len(),
            needed
        )))
    } else {
        None
    }
}

fn pct_change(from: f64, to: f64) -> f64 {
    if from != 0.0 {
        (to - from) / from * 100.0
    } else {
        0.0
    }
}

fn average(values: impl Iterator<Item = f64>) -> f64 {
    let collected: Vec<f64> = values.collect();
    if collected.is_empty() {
        0.0
    } else {
        collected.iter().sum::<f64>() / collected.len() as f64
    }
}

// --- Anomaly ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnomalyConfig {
    pub daily_move_pct: f64,
    pub weekly_move_pct: f64,
    pub volume_ratio: f64,
    pub high_low_window: usize,
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            daily_move_pct: 5.0,
            weekly_move_pct: 15.0,
            volume_ratio: 1.5,
            high_low_window: 30,
        }
    }
}

/// Flags outsized daily/weekly moves, volume spikes, and window highs/lows.
/// Any single trigger includes the ticker.
#[derive(Debug)]
pub struct AnomalyStrategy {
    config: AnomalyConfig,
}

impl AnomalyStrategy {
    pub fn new(config: AnomalyConfig) -> Self {
        Self { config }
    }
}

impl FilterStrategy for AnomalyStrategy {
    fn name(&self) -> &'static str {
        "anomaly"
    }

    fn min_history(&self) -> usize {
        6
    }

    fn evaluate(&self, _ticker: &str, prices: &[PricePoint]) -> FilterVerdict {
        if let Some(verdict) = too_short(prices, self.min_history()) {
            return verdict;
        }

        let mut reasons = Vec::new();
        let latest = &prices[prices.len() - 1];

        let daily = pct_change(prices[prices.len() - 2].close, latest.close);
        if daily.abs() > self.config.daily_move_pct {
            reasons.push(format!("daily move {:+.1}%", daily));
        }

        // five trading days back
        let weekly = pct_change(prices[prices.len() - 6].close, latest.close);
        if weekly.abs() > self.config.weekly_move_pct {
            reasons.push(format!("weekly move {:+.1}%", weekly));
        }

        let prior_volume = average(
            prices[prices.len() - 6..prices.len() - 1]
                .iter()
                .map(|p| p.volume),
        );
        if prior_volume > 0.0 && latest.volume > self.config.volume_ratio * prior_volume {
            reasons.push(format!(
                "volume {:.1}x the 5-day average",
                latest.volume / prior_volume
            ));
        }

        let window = self.config.high_low_window.min(prices.len());
        let tail = &prices[prices.len() - window..];
        let window_high = tail.iter().map(|p| p.close).fold(f64::NEG_INFINITY, f64::max);
        let window_low = tail.iter().map(|p| p.close).fold(f64::INFINITY, f64::min);
        // a flat window is at its high and low at once; treat it as neither
        if window_high > window_low {
            if latest.close >= window_high {
                reasons.push(format!("at {}-day high", window));
            } else if latest.close <= window_low {
                reasons.push(format!("at {}-day low", window));
            }
        }

        if reasons.is_empty() {
            FilterVerdict::excluded("no anomaly triggers".to_string())
        } else {
            FilterVerdict::included(reasons)
        }
    }
}

// --- Volume ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolumeConfig {
    pub ratio_threshold: f64,
    pub trend_window: usize,
    pub trend_shift_pct: f64,
}

impl Default for VolumeConfig {
    fn default() -> Self {
        Self {
            ratio_threshold: 1.2,
            trend_window: 10,
            trend_shift_pct: 10.0,
        }
    }
}

/// Flags elevated volume against the 20-day average, or a first-half vs
/// second-half volume trend shift over the trend window.
#[derive(Debug)]
pub struct VolumeStrategy {
    config: VolumeConfig,
}

impl VolumeStrategy {
    pub fn new(config: VolumeConfig) -> Self {
        Self { config }
    }
}

impl FilterStrategy for VolumeStrategy {
    fn name(&self) -> &'static str {
        "volume"
    }

    fn min_history(&self) -> usize {
        20
    }

    fn evaluate(&self, _ticker: &str, prices: &[PricePoint]) -> FilterVerdict {
        if let Some(verdict) = too_short(prices, self.min_history()) {
            return verdict;
        }

        let mut reasons = Vec::new();
        let latest = prices[prices.len() - 1].volume;
        let avg_20 = average(prices[prices.len() - 20..].iter().map(|p| p.volume));

        if avg_20 > 0.0 && latest / avg_20 >= self.config.ratio_threshold {
            reasons.push(format!("volume {:.1}x the 20-day average", latest / avg_20));
        }

        let window = self.config.trend_window.min(prices.len());
        let tail = &prices[prices.len() - window..];
        let half = window / 2;
        let first_half = average(tail[..half].iter().map(|p| p.volume));
        let second_half = average(tail[window - half..].iter().map(|p| p.volume));
        if first_half > 0.0 {
            let shift = pct_change(first_half, second_half);
            if shift.abs() >= self.config.trend_shift_pct {
                let direction = if shift > 0.0 { "rising" } else { "falling" };
                reasons.push(format!(
                    "{} volume trend ({:+.0}% over {} days)",
                    direction, shift, window
                ));
            }
        }

        if reasons.is_empty() {
            FilterVerdict::excluded("volume unremarkable".to_string())
        } else {
            FilterVerdict::included(reasons)
        }
    }
}

// --- Momentum ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MomentumConfig {
    pub lookback: usize,
    pub min_streak: usize,
    pub min_change_pct: f64,
}

impl Default for MomentumConfig {
    fn default() -> Self {
        Self {
            lookback: 10,
            min_streak: 3,
            min_change_pct: 8.0,
        }
    }
}

/// Flags sustained directional streaks paired with a meaningful total move
/// over the lookback, up and down checked independently.
#[derive(Debug)]
pub struct MomentumStrategy {
    config: MomentumConfig,
}

impl MomentumStrategy {
    pub fn new(config: MomentumConfig) -> Self {
        Self { config }
    }

    fn longest_streaks(closes: &[f64]) -> (usize, usize) {
        let mut longest_up = 0usize;
        let mut longest_down = 0usize;
        let mut up = 0usize;
        let mut down = 0usize;

        for pair in closes.windows(2) {
            if pair[1] > pair[0] {
                up += 1;
                down = 0;
            } else if pair[1] < pair[0] {
                down += 1;
                up = 0;
            } else {
                up = 0;
                down = 0;
            }
            longest_up = longest_up.max(up);
            longest_down = longest_down.max(down);
        }
        (longest_up, longest_down)
    }
}

impl FilterStrategy for MomentumStrategy {
    fn name(&self) -> &'static str {
        "momentum"
    }

    fn min_history(&self) -> usize {
        self.config.lookback
    }

    fn evaluate(&self, _ticker: &str, prices: &[PricePoint]) -> FilterVerdict {
        if let Some(verdict) = too_short(prices, self.min_history()) {
            return verdict;
        }

        let closes: Vec<f64> = prices[prices.len() - self.config.lookback..]
            .iter()
            .map(|p| p.close)
            .collect();
        let total_change = pct_change(closes[0], closes[closes.len() - 1]);
        let (up_streak, down_streak) = Self::longest_streaks(&closes);

        if up_streak >= self.config.min_streak && total_change >= self.config.min_change_pct {
            return FilterVerdict::included(vec![format!(
                "{}-day up streak, {:+.1}% over {} days",
                up_streak, total_change, self.config.lookback
            )]);
        }
        if down_streak >= self.config.min_streak && total_change <= -self.config.min_change_pct {
            return FilterVerdict::included(vec![format!(
                "{}-day down streak, {:+.1}% over {} days",
                down_streak, total_change, self.config.lookback
            )]);
        }

        FilterVerdict::excluded("no sustained momentum".to_string())
    }
}

// --- Volatility ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct VolatilityConfig {
    pub window: usize,
    pub avg_range_pct: f64,
    pub spike_ratio: f64,
    pub expansion_ratio: f64,
}

impl Default for VolatilityConfig {
    fn default() -> Self {
        Self {
            window: 20,
            avg_range_pct: 3.0,
            spike_ratio: 1.5,
            expansion_ratio: 1.3,
        }
    }
}

/// Flags wide daily trading ranges, a latest-day range spike, or a
/// recent-half expansion in average range.
#[derive(Debug)]
pub struct VolatilityStrategy {
    config: VolatilityConfig,
}

impl VolatilityStrategy {
    pub fn new(config: VolatilityConfig) -> Self {
        Self { config }
    }
}

impl FilterStrategy for VolatilityStrategy {
    fn name(&self) -> &'static str {
        "volatility"
    }

    fn min_history(&self) -> usize {
        self.config.window
    }

    fn evaluate(&self, _ticker: &str, prices: &[PricePoint]) -> FilterVerdict {
        if let Some(verdict) = too_short(prices, self.min_history()) {
            return verdict;
        }

        let ranges: Vec<f64> = prices[prices.len() - self.config.window..]
            .iter()
            .map(|p| {
                if p.close > 0.0 {
                    (p.high - p.low) / p.close * 100.0
                } else {
                    0.0
                }
            })
            .collect();

        let avg_range = average(ranges.iter().copied());
        let latest_range = ranges[ranges.len() - 1];
        let mut reasons = Vec::new();

        if avg_range >= self.config.avg_range_pct {
            reasons.push(format!("average daily range {:.1}%", avg_range));
        }
        if avg_range > 0.0 && latest_range >= self.config.spike_ratio * avg_range {
            reasons.push(format!(
                "latest range {:.1}% is {:.1}x the average",
                latest_range,
                latest_range / avg_range
            ));
        }
        if ranges.len() >= 20 {
            let first_10 = average(ranges[..10].iter().copied());
            let last_10 = average(ranges[ranges.len() - 10..].iter().copied());
            if first_10 > 0.0 && last_10 >= self.config.expansion_ratio * first_10 {
                reasons.push(format!(
                    "range expansion {:.1}x over the window",
                    last_10 / first_10
                ));
            }
        }

        if reasons.is_empty() {
            FilterVerdict::excluded("volatility within normal bounds".to_string())
        } else {
            FilterVerdict::included(reasons)
        }
    }
}

// --- Breakout ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct BreakoutConfig {
    pub window: usize,
    pub threshold_pct: f64,
    pub volume_confirm_ratio: f64,
}

impl Default for BreakoutConfig {
    fn default() -> Self {
        Self {
            window: 30,
            threshold_pct: 2.0,
            volume_confirm_ratio: 1.3,
        }
    }
}

/// Flags closes beyond the trailing-window resistance/support bands and
/// annotates whether volume confirms the move.
#[derive(Debug)]
pub struct BreakoutStrategy {
    config: BreakoutConfig,
}

impl BreakoutStrategy {
    pub fn new(config: BreakoutConfig) -> Self {
        Self { config }
    }
}

impl FilterStrategy for BreakoutStrategy {
    fn name(&self) -> &'static str {
        "breakout"
    }

    fn min_history(&self) -> usize {
        self.config.window + 1
    }

    fn evaluate(&self, _ticker: &str, prices: &[PricePoint]) -> FilterVerdict {
        if let Some(verdict) = too_short(prices, self.min_history()) {
            return verdict;
        }

        let latest = &prices[prices.len() - 1];
        // trailing window excludes the latest point
        let window = &prices[prices.len() - 1 - self.config.window..prices.len() - 1];
        let resistance = window.iter().map(|p| p.high).fold(f64::NEG_INFINITY, f64::max);
        let support = window.iter().map(|p| p.low).fold(f64::INFINITY, f64::min);

        let threshold = self.config.threshold_pct / 100.0;
        let breakout_up = latest.close >= resistance * (1.0 + threshold);
        let breakout_down = latest.close <= support * (1.0 - threshold);

        if !breakout_up && !breakout_down {
            return FilterVerdict::excluded("no breakout beyond the trailing range".to_string());
        }

        let volume_window = 20.min(window.len());
        let avg_volume = average(window[window.len() - volume_window..].iter().map(|p| p.volume));
        let confirmed =
            avg_volume > 0.0 && latest.volume >= self.config.volume_confirm_ratio * avg_volume;
        let confirmation = if confirmed {
            "volume-confirmed"
        } else {
            "without volume confirmation"
        };

        let reason = if breakout_up {
            format!(
                "close {:.2} broke above {}-day resistance {:.2} ({})",
                latest.close, self.config.window, resistance, confirmation
            )
        } else {
            format!(
                "close {:.2} broke below {}-day support {:.2} ({})",
                latest.close, self.config.window, support, confirmation
            )
        };

        FilterVerdict::included(vec![reason])
    }
}

// --- Gap ---

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GapConfig {
    pub days: usize,
    pub threshold_pct: f64,
}

impl Default for GapConfig {
    fn default() -> Self {
        Self {
            days: 5,
            threshold_pct: 3.0,
        }
    }
}

/// Flags open-vs-previous-close gaps over the trailing days, reporting
/// direction and recency.
#[derive(Debug)]
pub struct GapStrategy {
    config: GapConfig,
}

impl GapStrategy {
    pub fn new(config: GapConfig) -> Self {
        Self { config }
    }
}

impl FilterStrategy for GapStrategy {
    fn name(&self) -> &'static str {
        "gap"
    }

    fn min_history(&self) -> usize {
        self.config.days + 1
    }

    fn evaluate(&self, _ticker: &str, prices: &[PricePoint]) -> FilterVerdict {
        if let Some(verdict) = too_short(prices, self.min_history()) {
            return verdict;
        }

        let mut reasons = Vec::new();
        let start = prices.len() - self.config.days;
        for i in start..prices.len() {
            let gap = pct_change(prices[i - 1].close, prices[i].open);
            if gap.abs() >= self.config.threshold_pct {
                let direction = if gap > 0.0 { "up" } else { "down" };
                let days_ago = prices.len() - 1 - i;
                let recency = if days_ago == 0 {
                    "today".to_string()
                } else {
                    format!("{} days ago", days_ago)
                };
                reasons.push(format!("gap {} {:+.1}% {}", direction, gap, recency));
            }
        }

        if reasons.is_empty() {
            FilterVerdict::excluded("no significant gaps".to_string())
        } else {
            FilterVerdict::included(reasons)
        }
    }
}

// --- All ---

/// Pass-through strategy used to disable filtering
#[derive(Debug)]
pub struct AllStrategy;

impl FilterStrategy for AllStrategy {
    fn name(&self) -> &'static str {
        "all"
    }

    fn min_history(&self) -> usize {
        0
    }

    fn evaluate(&self, _ticker: &str, _prices: &[PricePoint]) -> FilterVerdict {
        FilterVerdict::included(vec!["filtering disabled".to_string()])
    }
}
