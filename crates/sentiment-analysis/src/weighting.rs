use chrono::{DateTime, Utc};
use pipeline_core::{ComponentScore, NewsArticle, SentimentLabel};
use serde::{Deserialize, Serialize};
use serde_json::json;

#[derive(Debug, Clone)]
pub struct SentimentConfig {
    /// e-folding time of the recency decay, days
    pub decay_days: f64,
    /// Importance weight applied when an article carries no importance value
    pub default_importance_weight: f64,
    /// Weighted average above this reads as positive, below its negative as negative
    pub direction_threshold: f64,
}

impl Default for SentimentConfig {
    fn default() -> Self {
        Self {
            decay_days: 30.0,
            default_importance_weight: 0.7,
            direction_threshold: 0.05,
        }
    }
}

/// Aggregated sentiment for one ticker's article batch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentimentAssessment {
    /// 0..100, 50 = neutral
    pub score: f64,
    pub direction: SentimentLabel,
    /// Signed weighted average in [-1, 1]
    pub weighted_average: f64,
    pub positive_count: usize,
    pub negative_count: usize,
    pub neutral_count: usize,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub neutral_pct: f64,
    pub scored_articles: usize,
    pub total_articles: usize,
    /// True when no article carried provider sentiment; the caller should run
    /// an LLM pass rather than treat the neutral default as a real score.
    pub requires_llm_analysis: bool,
}

impl SentimentAssessment {
    pub fn to_component_score(&self) -> ComponentScore {
        ComponentScore::new(
            self.score,
            json!({
                "weighted_average": self.weighted_average,
                "direction": self.direction,
                "positive_count": self.positive_count,
                "negative_count": self.negative_count,
                "neutral_count": self.neutral_count,
                "positive_pct": self.positive_pct,
                "negative_pct": self.negative_pct,
                "neutral_pct": self.neutral_pct,
                "scored_articles": self.scored_articles,
                "total_articles": self.total_articles,
                "requires_llm_analysis": self.requires_llm_analysis,
            }),
        )
    }
}

/// Aggregates per-article sentiment with recency decay and importance
/// weighting into a single directional score.
pub struct SentimentWeightingEngine {
    config: SentimentConfig,
}

impl SentimentWeightingEngine {
    pub fn new(config: SentimentConfig) -> Self {
        Self { config }
    }

    /// Recency weight: exponential decay with the configured e-folding time,
    /// clamped so even very old articles keep a trace of influence.
    pub fn recency_weight(&self, age_days: f64) -> f64 {
        (-age_days / self.config.decay_days).exp().clamp(0.01, 1.0)
    }

    fn importance_weight(&self, importance: Option<f64>) -> f64 {
        match importance {
            Some(imp) => 0.3 + (imp.clamp(0.0, 100.0) / 100.0) * 0.7,
            None => self.config.default_importance_weight,
        }
    }

    pub fn aggregate(&self, articles: &[NewsArticle], now: DateTime<Utc>) -> SentimentAssessment {
        let mut positive_count = 0usize;
        let mut negative_count = 0usize;
        let mut neutral_count = 0usize;
        let mut weighted_sum = 0.0;
        let mut weight_sum = 0.0;
        let mut scored_articles = 0usize;

        for article in articles {
            let label = match article.sentiment {
                Some(label) => label,
                None => continue,
            };
            scored_articles += 1;

            let magnitude = article.sentiment_score.unwrap_or(0.5).clamp(0.0, 1.0);
            let signed = match label {
                SentimentLabel::Positive => {
                    positive_count += 1;
                    magnitude
                }
                SentimentLabel::Negative => {
                    negative_count += 1;
                    -magnitude
                }
                SentimentLabel::Neutral => {
                    neutral_count += 1;
                    0.0
                }
            };

            let age_days = (now - article.published_at).num_seconds() as f64 / 86_400.0;
            let weight =
                self.recency_weight(age_days) * self.importance_weight(article.importance);

            weighted_sum += signed * weight;
            weight_sum += weight;
        }

        if scored_articles == 0 {
            tracing::debug!(
                "no provider sentiment on {} articles, deferring to LLM analysis",
                articles.len()
            );
            return SentimentAssessment {
                score: 50.0,
                direction: SentimentLabel::Neutral,
                weighted_average: 0.0,
                positive_count: 0,
                negative_count: 0,
                neutral_count: 0,
                positive_pct: 0.0,
                negative_pct: 0.0,
                neutral_pct: 0.0,
                scored_articles: 0,
                total_articles: articles.len(),
                requires_llm_analysis: true,
            };
        }

        let weighted_average = if weight_sum > 0.0 {
            weighted_sum / weight_sum
        } else {
            0.0
        };

        let direction = if weighted_average > self.config.direction_threshold {
            SentimentLabel::Positive
        } else if weighted_average < -self.config.direction_threshold {
            SentimentLabel::Negative
        } else {
            SentimentLabel::Neutral
        };

        let pct = |count: usize| count as f64 / scored_articles as f64 * 100.0;

        SentimentAssessment {
            score: (50.0 + weighted_average * 50.0).clamp(0.0, 100.0),
            direction,
            weighted_average,
            positive_count,
            negative_count,
            neutral_count,
            positive_pct: pct(positive_count),
            negative_pct: pct(negative_count),
            neutral_pct: pct(neutral_count),
            scored_articles,
            total_articles: articles.len(),
            requires_llm_analysis: false,
        }
    }
}

impl Default for SentimentWeightingEngine {
    fn default() -> Self {
        Self::new(SentimentConfig::default())
    }
}
