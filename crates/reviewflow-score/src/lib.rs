//! Scoring and classification engine.
//!
//! The engine is a set of pure functions: the same staged restaurants and
//! reviews always produce the same ordered mart rows. Nothing here performs
//! I/O, so re-running a pipeline on unchanged data is reproducible.
//!
//! Stages:
//! 1. [`staging::stage`] cleans raw records and classifies each review.
//! 2. [`score_restaurants`] joins reviews to restaurants, aggregates them,
//!    computes the composite score, tier and recommendation, and orders the
//!    result.

pub mod aggregate;
pub mod classify;
pub mod keywords;
pub mod ladder;
pub mod staging;

use std::cmp::Ordering;
use std::collections::HashMap;

use reviewflow_model::{
    RestaurantRecord, ReviewRecord, ScoredRestaurant, StagedRestaurant, StagedReview,
    StagingReport,
};

pub use aggregate::{ReviewAggregate, percentage, round_to};
pub use classify::classify_review;
pub use ladder::{ScoreInputs, recommendation, tier};
pub use staging::{StagedData, stage};

/// Upper bound of the sentiment component of the quality score.
pub const SENTIMENT_POINTS_CAP: f64 = 20.0;
/// Matched reviews needed for the volume bonus.
pub const VOLUME_BONUS_MIN_REVIEWS: usize = 5;
pub const VOLUME_BONUS_POINTS: f64 = 5.0;
pub const RATING_WEIGHT: f64 = 15.0;

/// Composite 0-100 quality score.
///
/// `rating * 15 + min(positive_pct / 4, 20) + (5 if reviews >= 5)`, rounded to
/// one decimal. Rating contributes at most 75, sentiment at most 20.
pub fn quality_score(inputs: &ScoreInputs) -> f64 {
    let sentiment_points = (inputs.positive_sentiment_pct / 4.0).min(SENTIMENT_POINTS_CAP);
    let volume_points = if inputs.reviews_collected >= VOLUME_BONUS_MIN_REVIEWS {
        VOLUME_BONUS_POINTS
    } else {
        0.0
    };
    round_to(
        inputs.rating * RATING_WEIGHT + sentiment_points + volume_points,
        1,
    )
}

/// Index of staged reviews by join key.
///
/// Reviews with a place id are only reachable by place id; reviews without
/// one are reachable by exact restaurant name. A restaurant without a place
/// id therefore picks up every id-less review carrying its name, which
/// merges distinct places that share a name.
struct ReviewIndex<'a> {
    by_place_id: HashMap<&'a str, Vec<&'a StagedReview>>,
    by_name: HashMap<&'a str, Vec<&'a StagedReview>>,
}

impl<'a> ReviewIndex<'a> {
    fn new(reviews: &'a [StagedReview]) -> Self {
        let mut by_place_id: HashMap<&str, Vec<&StagedReview>> = HashMap::new();
        let mut by_name: HashMap<&str, Vec<&StagedReview>> = HashMap::new();
        for review in reviews {
            match review.place_id.as_deref() {
                Some(id) => by_place_id.entry(id).or_default().push(review),
                None => by_name
                    .entry(review.restaurant_name.as_str())
                    .or_default()
                    .push(review),
            }
        }
        Self {
            by_place_id,
            by_name,
        }
    }

    fn matches(&self, restaurant: &StagedRestaurant) -> &[&'a StagedReview] {
        let found = match restaurant.place_id.as_deref() {
            Some(id) => self.by_place_id.get(id),
            None => self.by_name.get(restaurant.name.as_str()),
        };
        found.map(Vec::as_slice).unwrap_or_default()
    }
}

/// Score every staged restaurant and return mart rows in leaderboard order.
///
/// Ordering is descending by quality score, then rating, then positive
/// sentiment share. The sort is stable, so rows tied on all three keep their
/// staging order. Reviews that match no restaurant are ignored.
pub fn score_restaurants(
    restaurants: &[StagedRestaurant],
    reviews: &[StagedReview],
) -> Vec<ScoredRestaurant> {
    let index = ReviewIndex::new(reviews);
    let mut scored: Vec<ScoredRestaurant> = restaurants
        .iter()
        .map(|restaurant| {
            let aggregate = ReviewAggregate::from_reviews(index.matches(restaurant).iter().copied());
            score_one(restaurant, &aggregate)
        })
        .collect();
    scored.sort_by(leaderboard_order);
    scored
}

fn score_one(restaurant: &StagedRestaurant, aggregate: &ReviewAggregate) -> ScoredRestaurant {
    let inputs = ScoreInputs {
        rating: restaurant.rating_or_zero(),
        positive_sentiment_pct: aggregate.positive_pct,
        reviews_collected: aggregate.matched,
    };
    ScoredRestaurant {
        restaurant: restaurant.clone(),
        review_count_matched: aggregate.matched,
        avg_review_rating: aggregate.avg_rating,
        positive_sentiment_pct: aggregate.positive_pct,
        negative_sentiment_pct: aggregate.negative_pct,
        detailed_review_pct: aggregate.detailed_pct,
        topics: aggregate.topics,
        quality_score: quality_score(&inputs),
        tier: tier(&inputs),
        recommendation: recommendation(&inputs),
    }
}

fn leaderboard_order(a: &ScoredRestaurant, b: &ScoredRestaurant) -> Ordering {
    b.quality_score
        .total_cmp(&a.quality_score)
        .then_with(|| {
            b.restaurant
                .rating_or_zero()
                .total_cmp(&a.restaurant.rating_or_zero())
        })
        .then_with(|| b.positive_sentiment_pct.total_cmp(&a.positive_sentiment_pct))
}

/// Staging report plus ordered mart rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOutput {
    pub report: StagingReport,
    pub mart: Vec<ScoredRestaurant>,
}

/// Stage raw records and score them in one call.
pub fn stage_and_score(restaurants: &[RestaurantRecord], reviews: &[ReviewRecord]) -> ScoringOutput {
    let staged = stage(restaurants, reviews);
    let mart = score_restaurants(&staged.restaurants, &staged.reviews);
    ScoringOutput {
        report: staged.report,
        mart,
    }
}
