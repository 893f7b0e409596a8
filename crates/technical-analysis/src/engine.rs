use pipeline_core::{
    AnalysisError, IndicatorReport, IndicatorValue, PricePoint, TrendDirection, TrendStrength,
    TrendSummary, VolumeAnalysis, VolumeStatus,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::indicators::*;

/// One entry in the declarative indicator list
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorSpec {
    pub name: String,
    pub params: Vec<usize>,
    pub enabled: bool,
}

impl IndicatorSpec {
    pub fn new(name: &str, params: &[usize]) -> Self {
        Self {
            name: name.to_string(),
            params: params.to_vec(),
            enabled: true,
        }
    }

    /// Key disambiguated by parameters, e.g. `sma_20` vs `sma_50`
    pub fn key(&self) -> String {
        if self.params.is_empty() {
            self.name.clone()
        } else {
            let params: Vec<String> = self.params.iter().map(|p| p.to_string()).collect();
            format!("{}_{}", self.name, params.join("_"))
        }
    }

    fn param(&self, index: usize) -> Result<usize, String> {
        self.params
            .get(index)
            .copied()
            .ok_or_else(|| format!("{}: missing parameter {}", self.name, index))
    }
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fewer points than this is an explicit insufficient-data error
    pub min_periods: usize,
    pub specs: Vec<IndicatorSpec>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            min_periods: 30,
            specs: vec![
                IndicatorSpec::new("sma", &[20]),
                IndicatorSpec::new("sma", &[50]),
                IndicatorSpec::new("sma", &[200]),
                IndicatorSpec::new("ema", &[12]),
                IndicatorSpec::new("ema", &[26]),
                IndicatorSpec::new("rsi", &[14]),
                IndicatorSpec::new("macd", &[12, 26, 9]),
                IndicatorSpec::new("bollinger", &[20]),
                IndicatorSpec::new("atr", &[14]),
                IndicatorSpec::new("adx", &[14]),
                IndicatorSpec::new("stochastic", &[14, 3]),
                IndicatorSpec::new("ichimoku", &[9, 26, 52]),
            ],
        }
    }
}

/// Computes the configured indicator set from one OHLCV series.
///
/// Individual indicator failures are isolated: the failing key carries an
/// error marker and the rest of the report is still produced.
pub struct IndicatorEngine {
    config: EngineConfig,
}

impl IndicatorEngine {
    pub fn new(config: EngineConfig) -> Self {
        Self { config }
    }

    pub fn compute(&self, prices: &[PricePoint]) -> Result<IndicatorReport, AnalysisError> {
        if prices.len() < self.config.min_periods {
            return Err(AnalysisError::InsufficientData(format!(
                "need at least {} points for indicator computation, got {}",
                self.config.min_periods,
                prices.len()
            )));
        }

        let closes: Vec<f64> = prices.iter().map(|p| p.close).collect();
        let mut values = BTreeMap::new();

        for spec in self.config.specs.iter().filter(|s| s.enabled) {
            let value = match Self::compute_one(spec, prices, &closes) {
                Ok(v) => v,
                Err(error) => {
                    tracing::warn!("indicator {} failed: {}", spec.key(), error);
                    IndicatorValue::Failed { error }
                }
            };
            values.insert(spec.key(), value);
        }

        let trend = Self::summarize_trend(&closes);
        let volume = Self::summarize_volume(prices);

        Ok(IndicatorReport {
            values,
            trend,
            volume,
        })
    }

    fn compute_one(
        spec: &IndicatorSpec,
        prices: &[PricePoint],
        closes: &[f64],
    ) -> Result<IndicatorValue, String> {
        let short = |p: usize| format!("{}: needs at least {} points", spec.name, p);

        match spec.name.as_str() {
            "sma" => {
                let period = spec.param(0)?;
                let series = sma(closes, period);
                let value = *series.last().ok_or_else(|| short(period))?;
                Ok(IndicatorValue::Value { value })
            }
            "ema" => {
                let period = spec.param(0)?;
                let series = ema(closes, period);
                let value = *series.last().ok_or_else(|| short(period))?;
                Ok(IndicatorValue::Value { value })
            }
            "rsi" => {
                let period = spec.param(0)?;
                let series = rsi(closes, period);
                let value = *series.last().ok_or_else(|| short(period + 1))?;
                Ok(IndicatorValue::Value { value })
            }
            "macd" => {
                let (fast, slow, signal_period) =
                    (spec.param(0)?, spec.param(1)?, spec.param(2)?);
                let series = macd(closes, fast, slow, signal_period);
                match (
                    series.line.last(),
                    series.signal.last(),
                    series.histogram.last(),
                ) {
                    (Some(&line), Some(&signal), Some(&histogram)) => Ok(IndicatorValue::Macd {
                        line,
                        signal,
                        histogram,
                    }),
                    _ => Err(short(slow + signal_period)),
                }
            }
            "bollinger" => {
                let period = spec.param(0)?;
                let bands = bollinger_bands(closes, period, 2.0);
                match (bands.upper.last(), bands.middle.last(), bands.lower.last()) {
                    (Some(&upper), Some(&middle), Some(&lower)) => Ok(IndicatorValue::Bands {
                        upper,
                        middle,
                        lower,
                    }),
                    _ => Err(short(period)),
                }
            }
            "atr" => {
                let period = spec.param(0)?;
                let series = atr(prices, period);
                let value = *series.last().ok_or_else(|| short(period + 1))?;
                Ok(IndicatorValue::Value { value })
            }
            "adx" => {
                let period = spec.param(0)?;
                let series = adx(prices, period);
                let value = *series.adx.last().ok_or_else(|| short(period * 2 + 1))?;
                Ok(IndicatorValue::Value { value })
            }
            "stochastic" => {
                let (k_period, d_period) = (spec.param(0)?, spec.param(1)?);
                let series = stochastic(prices, k_period, d_period);
                match (series.k.last(), series.d.last()) {
                    (Some(&k), Some(&d)) => Ok(IndicatorValue::Stochastic { k, d }),
                    _ => Err(short(k_period + d_period)),
                }
            }
            "ichimoku" => {
                let (conv, base_p, span_b_p) = (spec.param(0)?, spec.param(1)?, spec.param(2)?);
                let series = ichimoku(prices, conv, base_p, span_b_p);
                match (
                    series.conversion.last(),
                    series.base.last(),
                    series.span_a.last(),
                    series.span_b.last(),
                ) {
                    (Some(&conversion), Some(&base), Some(&span_a), Some(&span_b)) => {
                        Ok(IndicatorValue::Ichimoku {
                            conversion,
                            base,
                            span_a,
                            span_b,
                        })
                    }
                    _ => Err(short(span_b_p)),
                }
            }
            other => Err(format!("unknown indicator '{}'", other)),
        }
    }

    /// Trend from the SMA50/SMA200 cross, strength from how many directional
    /// signals (cross, RSI extreme, MACD sign) agree.
    fn summarize_trend(closes: &[f64]) -> TrendSummary {
        let sma_50 = sma(closes, 50);
        let sma_200 = sma(closes, 200);

        let golden_cross = match (sma_50.last(), sma_200.last()) {
            (Some(&s50), Some(&s200)) => Some(s50 > s200),
            _ => None,
        };

        // Directional votes: true = bullish
        let mut votes: Vec<bool> = Vec::new();
        if let Some(cross) = golden_cross {
            votes.push(cross);
        }
        if let Some(&last_rsi) = rsi(closes, 14).last() {
            if last_rsi < 30.0 {
                votes.push(true);
            } else if last_rsi > 70.0 {
                votes.push(false);
            }
        }
        if let Some(&hist) = macd(closes, 12, 26, 9).histogram.last() {
            if hist != 0.0 {
                votes.push(hist > 0.0);
            }
        }

        let direction = match golden_cross {
            Some(true) => TrendDirection::Bullish,
            Some(false) => TrendDirection::Bearish,
            None => {
                let bulls = votes.iter().filter(|v| **v).count();
                let bears = votes.len() - bulls;
                if bulls > bears {
                    TrendDirection::Bullish
                } else if bears > bulls {
                    TrendDirection::Bearish
                } else {
                    TrendDirection::Unknown
                }
            }
        };

        let agreeing = match direction {
            TrendDirection::Bullish => votes.iter().filter(|v| **v).count(),
            TrendDirection::Bearish => votes.iter().filter(|v| !**v).count(),
            TrendDirection::Unknown => 0,
        };

        let strength = if agreeing >= 2 {
            TrendStrength::Strong
        } else if agreeing == 0 {
            TrendStrength::Weak
        } else {
            TrendStrength::Moderate
        };

        TrendSummary {
            direction,
            strength,
            golden_cross,
        }
    }

    fn summarize_volume(prices: &[PricePoint]) -> VolumeAnalysis {
        let window = prices.len().min(20);
        let tail = &prices[prices.len() - window..];
        let average: f64 = tail.iter().map(|p| p.volume).sum::<f64>() / window as f64;
        let latest = prices.last().map(|p| p.volume).unwrap_or(0.0);

        let ratio = if average > 0.0 { latest / average } else { 1.0 };
        let status = if ratio > 1.5 {
            VolumeStatus::High
        } else if ratio < 0.5 {
            VolumeStatus::Low
        } else {
            VolumeStatus::Normal
        };

        VolumeAnalysis { ratio, status }
    }
}

impl Default for IndicatorEngine {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}
