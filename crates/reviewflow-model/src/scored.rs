use serde::{Deserialize, Serialize};

use crate::labels::{QualityTier, Recommendation};
use crate::staged::StagedRestaurant;

/// Raw keyword/topic mention counts over a restaurant's matched reviews.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TopicCounts {
    pub positive_keyword_reviews: usize,
    pub negative_keyword_reviews: usize,
    pub service_mentions: usize,
    pub food_mentions: usize,
}

/// One mart row: a restaurant with its aggregated review metrics and labels.
///
/// Built fresh on every run and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredRestaurant {
    pub restaurant: StagedRestaurant,
    /// Number of staged reviews joined to this restaurant.
    pub review_count_matched: usize,
    /// Mean matched review rating, two decimals. `None` without matches.
    pub avg_review_rating: Option<f64>,
    pub positive_sentiment_pct: f64,
    pub negative_sentiment_pct: f64,
    pub detailed_review_pct: f64,
    pub topics: TopicCounts,
    /// Composite 0-100 score, one decimal.
    pub quality_score: f64,
    pub tier: QualityTier,
    pub recommendation: Recommendation,
}

impl ScoredRestaurant {
    pub fn name(&self) -> &str {
        &self.restaurant.name
    }
}
