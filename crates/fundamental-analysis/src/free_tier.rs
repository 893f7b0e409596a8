use pipeline_core::{
    AnalystRatings, ComponentScore, MomentumTrend, PriceMomentum, SentimentPercentages,
};
use serde_json::json;

/// Pillar weights for the free-tier scorer
#[derive(Debug, Clone)]
pub struct FreeTierWeights {
    pub analyst: f64,
    pub sentiment: f64,
    pub momentum: f64,
}

impl Default for FreeTierWeights {
    fn default() -> Self {
        Self {
            analyst: 0.40,
            sentiment: 0.35,
            momentum: 0.25,
        }
    }
}

/// Scores a ticker from free-tier signals: analyst consensus counts, coarse
/// sentiment percentages, and price momentum. A missing input pins its
/// sub-score at the neutral 50 instead of propagating into the total.
pub struct FreeTierScorer {
    weights: FreeTierWeights,
}

impl FreeTierScorer {
    pub fn new(weights: FreeTierWeights) -> Self {
        Self { weights }
    }

    /// Point table: strong_buy 100, buy 75, hold 50, sell 25, strong_sell 0,
    /// averaged across all contributing analysts.
    fn analyst_sub_score(ratings: Option<&AnalystRatings>) -> f64 {
        let ratings = match ratings {
            Some(r) if r.total() > 0 => r,
            _ => return 50.0,
        };

        let points = ratings.strong_buy as f64 * 100.0
            + ratings.buy as f64 * 75.0
            + ratings.hold as f64 * 50.0
            + ratings.sell as f64 * 25.0;
        (points / ratings.total() as f64).clamp(0.0, 100.0)
    }

    /// Positive/negative spread mapped around the neutral midpoint
    fn sentiment_sub_score(sentiment: Option<&SentimentPercentages>) -> f64 {
        match sentiment {
            Some(s) => (50.0 + (s.positive_pct - s.negative_pct) / 2.0).clamp(0.0, 100.0),
            None => 50.0,
        }
    }

    fn momentum_sub_score(momentum: Option<&PriceMomentum>) -> f64 {
        let momentum = match momentum {
            Some(m) => m,
            None => return 50.0,
        };

        let mut sub: f64 = 50.0;
        sub += match momentum.change_pct {
            c if c >= 10.0 => 25.0,
            c if c >= 5.0 => 15.0,
            c if c >= 2.0 => 5.0,
            c if c <= -10.0 => -25.0,
            c if c <= -5.0 => -15.0,
            c if c <= -2.0 => -5.0,
            _ => 0.0,
        };
        sub += match momentum.trend {
            MomentumTrend::Up => 10.0,
            MomentumTrend::Down => -10.0,
            MomentumTrend::Flat => 0.0,
        };
        sub.clamp(0.0, 100.0)
    }

    pub fn score(
        &self,
        analyst: Option<&AnalystRatings>,
        sentiment: Option<&SentimentPercentages>,
        momentum: Option<&PriceMomentum>,
    ) -> ComponentScore {
        let analyst_sub = Self::analyst_sub_score(analyst);
        let sentiment_sub = Self::sentiment_sub_score(sentiment);
        let momentum_sub = Self::momentum_sub_score(momentum);

        let overall = analyst_sub * self.weights.analyst
            + sentiment_sub * self.weights.sentiment
            + momentum_sub * self.weights.momentum;

        ComponentScore::new(
            overall,
            json!({
                "analyst_sub_score": analyst_sub,
                "sentiment_sub_score": sentiment_sub,
                "momentum_sub_score": momentum_sub,
                "weights": {
                    "analyst": self.weights.analyst,
                    "sentiment": self.weights.sentiment,
                    "momentum": self.weights.momentum,
                },
                "inputs": {
                    "analyst": analyst,
                    "sentiment": sentiment,
                    "momentum": momentum,
                },
            }),
        )
    }
}

impl Default for FreeTierScorer {
    fn default() -> Self {
        Self::new(FreeTierWeights::default())
    }
}
