use chrono::Utc;
use pipeline_core::{
    AnalysisError, ComponentScore, InvestmentSignal, RiskLevel, SignalAction, TimeHorizon,
};

/// Component weights for the final score. Defaults match the documented
/// 0.35 / 0.35 / 0.30 split and must stay close to a unit sum.
#[derive(Debug, Clone)]
pub struct SynthesisWeights {
    pub technical: f64,
    pub fundamental: f64,
    pub sentiment: f64,
}

impl Default for SynthesisWeights {
    fn default() -> Self {
        Self {
            technical: 0.35,
            fundamental: 0.35,
            sentiment: 0.30,
        }
    }
}

impl SynthesisWeights {
    pub fn is_normalized(&self) -> bool {
        ((self.technical + self.fundamental + self.sentiment) - 1.0).abs() < 1e-6
    }
}

/// Combines the three component scores into one InvestmentSignal.
pub struct SignalSynthesizer {
    weights: SynthesisWeights,
}

impl SignalSynthesizer {
    pub fn new(weights: SynthesisWeights) -> Self {
        if !weights.is_normalized() {
            tracing::warn!(
                "synthesis weights sum to {:.3}, expected 1.0",
                weights.technical + weights.fundamental + weights.sentiment
            );
        }
        Self { weights }
    }

    /// Confidence is a consensus proxy: the tighter the three components
    /// agree, the higher it goes. Not a statistical interval.
    fn confidence(scores: &[f64; 3]) -> f64 {
        let max = scores.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
        let min = scores.iter().cloned().fold(f64::INFINITY, f64::min);
        (100.0 - 0.5 * (max - min)).max(0.0)
    }

    fn key_reasons(technical: f64, fundamental: f64, sentiment: f64) -> Vec<String> {
        let mut reasons = Vec::new();
        for (name, score) in [
            ("technical", technical),
            ("fundamental", fundamental),
            ("sentiment", sentiment),
        ] {
            if score > 70.0 {
                reasons.push(format!("Strong {} picture (score {:.0})", name, score));
            } else if score < 30.0 {
                reasons.push(format!("Weak {} picture (score {:.0})", name, score));
            }
        }
        if reasons.is_empty() {
            reasons.push("No component strongly bullish or bearish".to_string());
        }
        reasons
    }

    fn risk_level(confidence: f64, final_score: f64) -> RiskLevel {
        if confidence >= 80.0 && (40.0..=75.0).contains(&final_score) {
            RiskLevel::Low
        } else if confidence >= 60.0 {
            RiskLevel::Moderate
        } else {
            RiskLevel::High
        }
    }

    /// Technical-led signals resolve faster than fundamental-led ones
    fn time_horizon(technical: f64, fundamental: f64) -> TimeHorizon {
        let tech_tilt = (technical - 50.0).abs();
        let fund_tilt = (fundamental - 50.0).abs();
        if tech_tilt > fund_tilt * 1.5 {
            TimeHorizon::Short
        } else if fund_tilt > tech_tilt * 1.5 {
            TimeHorizon::Long
        } else {
            TimeHorizon::Medium
        }
    }

    /// Indicative return range per action bucket, percent
    fn expected_return(action: SignalAction) -> (f64, f64) {
        match action {
            SignalAction::Buy => (8.0, 20.0),
            SignalAction::HoldBullish => (3.0, 10.0),
            SignalAction::Hold => (-3.0, 5.0),
            SignalAction::HoldBearish => (-10.0, 0.0),
            SignalAction::Sell => (-25.0, -5.0),
        }
    }

    pub fn synthesize(
        &self,
        ticker: &str,
        current_price: Option<f64>,
        currency: &str,
        technical: Option<&ComponentScore>,
        fundamental: Option<&ComponentScore>,
        sentiment: Option<&ComponentScore>,
    ) -> Result<InvestmentSignal, AnalysisError> {
        let technical = technical
            .ok_or_else(|| AnalysisError::MissingComponent("technical".to_string()))?
            .score;
        let fundamental = fundamental
            .ok_or_else(|| AnalysisError::MissingComponent("fundamental".to_string()))?
            .score;
        let sentiment = sentiment
            .ok_or_else(|| AnalysisError::MissingComponent("sentiment".to_string()))?
            .score;

        let final_score = (technical * self.weights.technical
            + fundamental * self.weights.fundamental
            + sentiment * self.weights.sentiment)
            .clamp(0.0, 100.0);

        let confidence = Self::confidence(&[technical, fundamental, sentiment]);
        let recommendation = SignalAction::from_score(final_score);

        tracing::info!(
            "{}: final score {:.2} ({}) confidence {:.0}",
            ticker,
            final_score,
            recommendation.as_str(),
            confidence
        );

        Ok(InvestmentSignal {
            ticker: ticker.to_string(),
            current_price,
            currency: currency.to_string(),
            technical_score: technical,
            fundamental_score: fundamental,
            sentiment_score: sentiment,
            final_score,
            recommendation,
            confidence,
            key_reasons: Self::key_reasons(technical, fundamental, sentiment),
            risk_level: Self::risk_level(confidence, final_score),
            time_horizon: Self::time_horizon(technical, fundamental),
            expected_return: Self::expected_return(recommendation),
            generated_at: Utc::now(),
        })
    }
}

impl Default for SignalSynthesizer {
    fn default() -> Self {
        Self::new(SynthesisWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn component(score: f64) -> ComponentScore {
        ComponentScore::new(score, json!({}))
    }

    #[test]
    fn exact_weighting() {
        let signal = SignalSynthesizer::default()
            .synthesize(
                "TEST",
                Some(100.0),
                "USD",
                Some(&component(80.0)),
                Some(&component(75.0)),
                Some(&component(70.0)),
            )
            .unwrap();
        assert!((signal.final_score - 75.25).abs() < 1e-9);
        assert_eq!(signal.recommendation, SignalAction::Buy);
    }

    #[test]
    fn consensus_scenario_confidence() {
        // spread of 10 across {80, 75, 70} gives confidence 100 - 0.5*10 = 95
        let signal = SignalSynthesizer::default()
            .synthesize(
                "TEST",
                Some(42.0),
                "USD",
                Some(&component(80.0)),
                Some(&component(75.0)),
                Some(&component(70.0)),
            )
            .unwrap();
        assert!((signal.final_score - 75.25).abs() < 1e-9);
        assert!((signal.confidence - 95.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_depends_only_on_spread() {
        let synth = SignalSynthesizer::default();
        let a = synth
            .synthesize(
                "A",
                None,
                "USD",
                Some(&component(90.0)),
                Some(&component(50.0)),
                Some(&component(70.0)),
            )
            .unwrap();
        let b = synth
            .synthesize(
                "B",
                None,
                "USD",
                Some(&component(50.0)),
                Some(&component(90.0)),
                Some(&component(70.0)),
            )
            .unwrap();
        assert_eq!(a.confidence, b.confidence);
        assert!((a.confidence - 80.0).abs() < 1e-9);
    }

    #[test]
    fn confidence_floors_at_zero() {
        // max spread 100 gives 50; the formula cannot go below zero anyway,
        // but the guard is exercised through the max(0.0) path
        let signal = SignalSynthesizer::default()
            .synthesize(
                "X",
                None,
                "USD",
                Some(&component(100.0)),
                Some(&component(0.0)),
                Some(&component(50.0)),
            )
            .unwrap();
        assert!(signal.confidence >= 0.0);
        assert!((signal.confidence - 50.0).abs() < 1e-9);
    }

    #[test]
    fn missing_component_skips_synthesis() {
        let err = SignalSynthesizer::default()
            .synthesize("X", None, "USD", Some(&component(80.0)), None, Some(&component(70.0)))
            .unwrap_err();
        assert!(matches!(err, AnalysisError::MissingComponent(ref c) if c == "fundamental"));
    }

    #[test]
    fn final_score_bounded_at_extremes() {
        let synth = SignalSynthesizer::default();
        let bullish = synth
            .synthesize(
                "UP",
                None,
                "USD",
                Some(&component(100.0)),
                Some(&component(100.0)),
                Some(&component(100.0)),
            )
            .unwrap();
        assert!(bullish.final_score <= 100.0);
        assert_eq!(bullish.recommendation, SignalAction::Buy);

        let bearish = synth
            .synthesize(
                "DOWN",
                None,
                "USD",
                Some(&component(0.0)),
                Some(&component(0.0)),
                Some(&component(0.0)),
            )
            .unwrap();
        assert!(bearish.final_score >= 0.0);
        assert_eq!(bearish.recommendation, SignalAction::Sell);
    }

    #[test]
    fn key_reasons_name_strong_and_weak_components() {
        let signal = SignalSynthesizer::default()
            .synthesize(
                "MIX",
                None,
                "USD",
                Some(&component(85.0)),
                Some(&component(20.0)),
                Some(&component(50.0)),
            )
            .unwrap();
        assert!(signal.key_reasons.iter().any(|r| r.contains("technical")));
        assert!(signal.key_reasons.iter().any(|r| r.contains("fundamental")));
    }
}
