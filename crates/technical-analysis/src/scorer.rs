use pipeline_core::{
    ComponentScore, IndicatorReport, IndicatorValue, PricePoint, TrendDirection, VolumeStatus,
};
use serde_json::json;

/// Deterministic technical scorer: converts an indicator report into a
/// 0..100 component score. Serves as the rule-based path when no LLM is
/// wired and as the fallback when the LLM call fails.
pub struct TechnicalScorer;

impl TechnicalScorer {
    pub fn new() -> Self {
        Self
    }

    pub fn score(&self, prices: &[PricePoint], report: &IndicatorReport) -> ComponentScore {
        let close = prices.last().map(|p| p.close).unwrap_or(0.0);
        let mut signals: Vec<(&'static str, i32, bool)> = Vec::new();

        if let Some(rsi) = report.value("rsi_14") {
            if rsi < 25.0 {
                signals.push(("RSI Deeply Oversold", 3, true));
            } else if rsi < 30.0 {
                signals.push(("RSI Oversold", 2, true));
            } else if rsi > 75.0 {
                signals.push(("RSI Deeply Overbought", 3, false));
            } else if rsi > 70.0 {
                signals.push(("RSI Overbought", 2, false));
            }
        }

        if let Some(IndicatorValue::Macd { histogram, .. }) = report.values.get("macd_12_26_9") {
            if *histogram > 0.0 {
                signals.push(("MACD Above Signal", 2, true));
            } else if *histogram < 0.0 {
                signals.push(("MACD Below Signal", 2, false));
            }
        }

        let sma_20 = report.value("sma_20");
        let sma_50 = report.value("sma_50");
        if let (Some(s20), Some(s50)) = (sma_20, sma_50) {
            if close > s20 && close > s50 {
                signals.push(("Price Above MAs", 2, true));
            } else if close < s20 && close < s50 {
                signals.push(("Price Below MAs", 2, false));
            }
        }

        if let Some(IndicatorValue::Bands { upper, lower, .. }) = report.values.get("bollinger_20")
        {
            if close < *lower {
                signals.push(("Below Lower Band", 2, true));
            } else if close > *upper {
                signals.push(("Above Upper Band", 2, false));
            }
        }

        if let Some(IndicatorValue::Stochastic { k, .. }) = report.values.get("stochastic_14_3") {
            if *k < 20.0 {
                signals.push(("Stochastic Oversold", 2, true));
            } else if *k > 80.0 {
                signals.push(("Stochastic Overbought", 2, false));
            }
        }

        // ADX above 25 qualifies the trend direction as a strong signal
        if let Some(adx) = report.value("adx_14") {
            if adx > 25.0 {
                match report.trend.direction {
                    TrendDirection::Bullish => signals.push(("Strong Trend Up (ADX)", 3, true)),
                    TrendDirection::Bearish => signals.push(("Strong Trend Down (ADX)", 3, false)),
                    TrendDirection::Unknown => {}
                }
            }
        }

        match report.trend.golden_cross {
            Some(true) => signals.push(("Golden Cross", 3, true)),
            Some(false) => signals.push(("Death Cross", 3, false)),
            None => {}
        }

        // High volume amplifies whatever the latest bar did
        if report.volume.status == VolumeStatus::High && prices.len() >= 2 {
            let closed_up = prices[prices.len() - 1].close > prices[prices.len() - 2].close;
            signals.push(("Volume Spike", 1, closed_up));
        }

        let mut total_score = 0i32;
        let mut total_weight = 0i32;
        for (_, weight, bullish) in &signals {
            total_weight += weight;
            total_score += if *bullish { *weight } else { -weight };
        }

        let score = if total_weight > 0 {
            50.0 + (total_score as f64 / total_weight as f64) * 50.0
        } else {
            50.0
        };

        let signal_list: Vec<serde_json::Value> = signals
            .iter()
            .map(|(name, weight, bullish)| {
                json!({"name": name, "weight": weight, "bullish": bullish})
            })
            .collect();

        let breakdown = json!({
            "signals": signal_list,
            "raw": {
                "close": close,
                "rsi_14": report.value("rsi_14"),
                "sma_20": sma_20,
                "sma_50": sma_50,
                "adx_14": report.value("adx_14"),
                "volume_ratio": report.volume.ratio,
                "trend": report.trend,
            },
        });

        ComponentScore::new(score, breakdown)
    }
}

impl Default for TechnicalScorer {
    fn default() -> Self {
        Self::new()
    }
}
