use pipeline_core::{ComponentScore, FundamentalMetrics};
use serde_json::json;

/// Pillar weights for the metrics scorer
#[derive(Debug, Clone)]
pub struct MetricsWeights {
    pub valuation: f64,
    pub profitability: f64,
    pub health: f64,
    pub growth: f64,
}

impl Default for MetricsWeights {
    fn default() -> Self {
        Self {
            valuation: 0.30,
            profitability: 0.30,
            health: 0.25,
            growth: 0.15,
        }
    }
}

/// Scores richer fundamental metrics through additive threshold bands.
/// Every pillar starts at the neutral 50 and accumulates signed deltas; a
/// pillar with no inputs stays at 50.
pub struct MetricsScorer {
    weights: MetricsWeights,
}

impl MetricsScorer {
    pub fn new(weights: MetricsWeights) -> Self {
        Self { weights }
    }

    fn valuation_sub_score(m: &FundamentalMetrics) -> f64 {
        let mut sub: f64 = 50.0;
        let v = &m.valuation;

        if let Some(pe) = v.pe_ratio {
            sub += match pe {
                p if p <= 0.0 => -10.0,
                p if p < 15.0 => 15.0,
                p if p < 25.0 => 5.0,
                p if p > 50.0 => -15.0,
                p if p > 35.0 => -8.0,
                _ => 0.0,
            };
        }
        if let Some(pb) = v.pb_ratio {
            sub += match pb {
                p if p < 1.0 => 10.0,
                p if p < 3.0 => 5.0,
                p if p > 10.0 => -10.0,
                _ => 0.0,
            };
        }
        if let Some(ev) = v.ev_to_ebitda {
            sub += match ev {
                e if e < 8.0 => 10.0,
                e if e > 20.0 => -10.0,
                _ => 0.0,
            };
        }
        if let Some(peg) = v.peg_ratio {
            sub += match peg {
                p if p < 1.0 => 10.0,
                p if p < 2.0 => 5.0,
                p if p > 3.0 => -10.0,
                _ => 0.0,
            };
        }
        sub.clamp(0.0, 100.0)
    }

    fn profitability_sub_score(m: &FundamentalMetrics) -> f64 {
        let mut sub: f64 = 50.0;
        let p = &m.profitability;

        if let Some(net) = p.net_margin {
            sub += match net {
                n if n > 20.0 => 15.0,
                n if n > 10.0 => 8.0,
                n if n < 0.0 => -15.0,
                n if n < 5.0 => -5.0,
                _ => 0.0,
            };
        }
        if let Some(op) = p.operating_margin {
            sub += match op {
                o if o > 25.0 => 10.0,
                o if o < 0.0 => -10.0,
                _ => 0.0,
            };
        }
        if let Some(gross) = p.gross_margin {
            sub += match gross {
                g if g > 50.0 => 5.0,
                g if g < 20.0 => -5.0,
                _ => 0.0,
            };
        }
        if let Some(roe) = p.roe {
            sub += match roe {
                r if r > 20.0 => 15.0,
                r if r > 15.0 => 10.0,
                r if r < 0.0 => -15.0,
                r if r < 5.0 => -10.0,
                _ => 0.0,
            };
        }
        if let Some(roa) = p.roa {
            sub += match roa {
                r if r > 10.0 => 10.0,
                r if r < 2.0 => -5.0,
                _ => 0.0,
            };
        }
        sub.clamp(0.0, 100.0)
    }

    fn health_sub_score(m: &FundamentalMetrics) -> f64 {
        let mut sub: f64 = 50.0;
        let h = &m.health;

        if let Some(de) = h.debt_to_equity {
            sub += match de {
                d if d < 0.5 => 15.0,
                d if d < 1.0 => 8.0,
                d if d > 3.0 => -15.0,
                d if d > 2.0 => -8.0,
                _ => 0.0,
            };
        }
        if let Some(current) = h.current_ratio {
            sub += match current {
                c if c > 2.0 => 10.0,
                c if c > 1.5 => 5.0,
                c if c < 1.0 => -10.0,
                _ => 0.0,
            };
        }
        if let Some(quick) = h.quick_ratio {
            sub += match quick {
                q if q > 1.0 => 5.0,
                q if q < 0.5 => -5.0,
                _ => 0.0,
            };
        }
        if let Some(fcf) = h.free_cash_flow {
            sub += if fcf > 0.0 { 10.0 } else { -10.0 };
        }
        if let Some(ocf) = h.operating_cash_flow {
            sub += if ocf > 0.0 { 5.0 } else { -10.0 };
        }
        sub.clamp(0.0, 100.0)
    }

    fn growth_sub_score(m: &FundamentalMetrics) -> f64 {
        let mut sub: f64 = 50.0;
        let g = &m.growth;

        if let Some(revenue) = g.revenue_yoy {
            sub += match revenue {
                r if r > 20.0 => 20.0,
                r if r > 10.0 => 10.0,
                r if r > 5.0 => 5.0,
                r if r < -10.0 => -20.0,
                r if r < 0.0 => -10.0,
                _ => 0.0,
            };
        }
        if let Some(earnings) = g.earnings_yoy {
            sub += match earnings {
                e if e > 20.0 => 15.0,
                e if e > 10.0 => 8.0,
                e if e < 0.0 => -10.0,
                _ => 0.0,
            };
        }
        sub.clamp(0.0, 100.0)
    }

    pub fn score(&self, metrics: &FundamentalMetrics) -> ComponentScore {
        let valuation = Self::valuation_sub_score(metrics);
        let profitability = Self::profitability_sub_score(metrics);
        let health = Self::health_sub_score(metrics);
        let growth = Self::growth_sub_score(metrics);

        let overall = valuation * self.weights.valuation
            + profitability * self.weights.profitability
            + health * self.weights.health
            + growth * self.weights.growth;

        ComponentScore::new(
            overall,
            json!({
                "valuation_sub_score": valuation,
                "profitability_sub_score": profitability,
                "health_sub_score": health,
                "growth_sub_score": growth,
                "weights": {
                    "valuation": self.weights.valuation,
                    "profitability": self.weights.profitability,
                    "health": self.weights.health,
                    "growth": self.weights.growth,
                },
                "inputs": metrics,
            }),
        )
    }
}

impl Default for MetricsScorer {
    fn default() -> Self {
        Self::new(MetricsWeights::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recommendation_for;
    use pipeline_core::{
        GrowthMetrics, HealthMetrics, ProfitabilityMetrics, Recommendation, ValuationMetrics,
    };

    fn strong_metrics() -> FundamentalMetrics {
        FundamentalMetrics {
            valuation: ValuationMetrics {
                pe_ratio: Some(12.0),
                pb_ratio: Some(0.9),
                ev_to_ebitda: Some(6.0),
                peg_ratio: Some(0.8),
            },
            profitability: ProfitabilityMetrics {
                gross_margin: Some(60.0),
                operating_margin: Some(30.0),
                net_margin: Some(25.0),
                roe: Some(25.0),
                roa: Some(12.0),
            },
            health: HealthMetrics {
                debt_to_equity: Some(0.3),
                current_ratio: Some(2.5),
                quick_ratio: Some(1.5),
                free_cash_flow: Some(1_000_000.0),
                operating_cash_flow: Some(2_000_000.0),
            },
            growth: GrowthMetrics {
                revenue_yoy: Some(25.0),
                earnings_yoy: Some(30.0),
            },
        }
    }

    fn weak_metrics() -> FundamentalMetrics {
        FundamentalMetrics {
            valuation: ValuationMetrics {
                pe_ratio: Some(80.0),
                pb_ratio: Some(15.0),
                ev_to_ebitda: Some(30.0),
                peg_ratio: Some(4.0),
            },
            profitability: ProfitabilityMetrics {
                gross_margin: Some(10.0),
                operating_margin: Some(-5.0),
                net_margin: Some(-8.0),
                roe: Some(-10.0),
                roa: Some(0.5),
            },
            health: HealthMetrics {
                debt_to_equity: Some(4.0),
                current_ratio: Some(0.6),
                quick_ratio: Some(0.3),
                free_cash_flow: Some(-500_000.0),
                operating_cash_flow: Some(-100_000.0),
            },
            growth: GrowthMetrics {
                revenue_yoy: Some(-20.0),
                earnings_yoy: Some(-30.0),
            },
        }
    }

    #[test]
    fn empty_metrics_is_neutral() {
        let score = MetricsScorer::default().score(&FundamentalMetrics::default());
        assert_eq!(score.score, 50.0);
        assert_eq!(recommendation_for(score.score), Recommendation::Hold);
    }

    #[test]
    fn documented_pe_bands() {
        let cheap = FundamentalMetrics {
            valuation: ValuationMetrics {
                pe_ratio: Some(10.0),
                ..Default::default()
            },
            ..Default::default()
        };
        let expensive = FundamentalMetrics {
            valuation: ValuationMetrics {
                pe_ratio: Some(60.0),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(MetricsScorer::valuation_sub_score(&cheap), 65.0);
        assert_eq!(MetricsScorer::valuation_sub_score(&expensive), 35.0);
    }

    #[test]
    fn documented_debt_bands() {
        let low_debt = FundamentalMetrics {
            health: HealthMetrics {
                debt_to_equity: Some(0.4),
                ..Default::default()
            },
            ..Default::default()
        };
        let leveraged = FundamentalMetrics {
            health: HealthMetrics {
                debt_to_equity: Some(3.5),
                ..Default::default()
            },
            ..Default::default()
        };
        assert_eq!(MetricsScorer::health_sub_score(&low_debt), 65.0);
        assert_eq!(MetricsScorer::health_sub_score(&leveraged), 35.0);
    }

    #[test]
    fn strong_metrics_reach_strong_buy_territory() {
        let score = MetricsScorer::default().score(&strong_metrics());
        assert!(score.score <= 100.0);
        assert!(score.score >= 75.0, "got {}", score.score);
        assert_eq!(recommendation_for(score.score), Recommendation::StrongBuy);
    }

    #[test]
    fn weak_metrics_sink_and_stay_bounded() {
        let score = MetricsScorer::default().score(&weak_metrics());
        assert!(score.score >= 0.0);
        assert!(score.score <= 25.0, "got {}", score.score);
    }

    #[test]
    fn breakdown_names_each_pillar() {
        let score = MetricsScorer::default().score(&strong_metrics());
        for key in [
            "valuation_sub_score",
            "profitability_sub_score",
            "health_sub_score",
            "growth_sub_score",
        ] {
            assert!(score.breakdown.get(key).is_some(), "missing {}", key);
        }
    }
}
