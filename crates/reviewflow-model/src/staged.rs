//! Staging-layer rows: cleaned, typed, one row per entity.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::labels::{
    PriceCategory, Popularity, RatingCategory, ReviewLength, SentimentCategory, SimpleSentiment,
};
use crate::records::{Contact, Coordinates, DataSource};

/// A restaurant that passed staging, with its presentation buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedRestaurant {
    pub place_id: Option<String>,
    pub name: String,
    pub rating: Option<f64>,
    pub review_count: u64,
    pub price_level: Option<u8>,
    pub address: String,
    pub coordinates: Option<Coordinates>,
    pub categories: BTreeSet<String>,
    pub contact: Option<Contact>,
    pub collected_at: DateTime<Utc>,
    pub source: DataSource,
    pub rating_category: RatingCategory,
    pub price_category: PriceCategory,
    pub popularity: Popularity,
}

impl StagedRestaurant {
    /// Rating used by score arithmetic; an absent rating counts as zero.
    pub fn rating_or_zero(&self) -> f64 {
        self.rating.unwrap_or(0.0)
    }
}

/// Per-review derived attributes. Computed without cross-review state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewClassification {
    pub sentiment_category: SentimentCategory,
    pub sentiment_simple: SimpleSentiment,
    pub length_category: ReviewLength,
    pub is_detailed: bool,
    pub contains_positive_keywords: bool,
    pub contains_negative_keywords: bool,
    pub mentions_service: bool,
    pub mentions_food: bool,
}

/// A review that passed staging.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StagedReview {
    pub place_id: Option<String>,
    pub restaurant_name: String,
    pub author: String,
    /// Always within 1-5.
    pub rating: u8,
    pub text: String,
    pub relative_time: String,
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    pub source: DataSource,
    pub classification: ReviewClassification,
}

/// Row counts kept and dropped by staging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagingReport {
    pub restaurants_in: usize,
    pub restaurants_kept: usize,
    pub restaurants_missing_name: usize,
    pub restaurants_duplicate_place_id: usize,
    pub reviews_in: usize,
    pub reviews_kept: usize,
    pub reviews_invalid_rating: usize,
}

impl StagingReport {
    pub fn restaurants_dropped(&self) -> usize {
        self.restaurants_in - self.restaurants_kept
    }

    pub fn reviews_dropped(&self) -> usize {
        self.reviews_in - self.reviews_kept
    }
}
