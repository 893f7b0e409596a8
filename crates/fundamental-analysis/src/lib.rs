pub mod free_tier;
pub mod metrics;

pub use free_tier::*;
pub use metrics::*;

use pipeline_core::Recommendation;

/// Shared recommendation mapping for both fundamental scorers
pub fn recommendation_for(score: f64) -> Recommendation {
    Recommendation::from_score(score)
}
