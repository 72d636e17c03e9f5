//! Staging layer: clean raw records into one-row-per-entity tables.
//!
//! Staging drops rows the scoring engine must never see (restaurants without
//! a name, reviews without a valid 1-5 rating) and computes the
//! presentation buckets that are carried unchanged into the mart.

use std::collections::BTreeSet;

use tracing::debug;

use reviewflow_model::{
    PriceCategory, Popularity, RatingCategory, RestaurantRecord, ReviewRecord, StagedRestaurant,
    StagedReview, StagingReport,
};

use crate::classify::classify_review;

/// Output of [`stage`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StagedData {
    pub restaurants: Vec<StagedRestaurant>,
    pub reviews: Vec<StagedReview>,
    pub report: StagingReport,
}

pub fn rating_category(rating: Option<f64>) -> RatingCategory {
    match rating.unwrap_or(0.0) {
        r if r >= 4.5 => RatingCategory::Excellent,
        r if r >= 4.0 => RatingCategory::VeryGood,
        r if r >= 3.5 => RatingCategory::Good,
        r if r >= 3.0 => RatingCategory::Average,
        r if r > 0.0 => RatingCategory::Poor,
        _ => RatingCategory::NotRated,
    }
}

pub fn price_category(price_level: Option<u8>) -> PriceCategory {
    match price_level {
        Some(1) => PriceCategory::Budget,
        Some(2) => PriceCategory::Moderate,
        Some(3) => PriceCategory::Expensive,
        Some(4) => PriceCategory::VeryExpensive,
        _ => PriceCategory::NotSpecified,
    }
}

pub fn popularity(review_count: u64) -> Popularity {
    match review_count {
        n if n >= 500 => Popularity::VeryPopular,
        n if n >= 100 => Popularity::Popular,
        n if n >= 20 => Popularity::WellKnown,
        _ => Popularity::LesserKnown,
    }
}

/// Stage restaurants and reviews together.
pub fn stage(restaurants: &[RestaurantRecord], reviews: &[ReviewRecord]) -> StagedData {
    let mut report = StagingReport {
        restaurants_in: restaurants.len(),
        reviews_in: reviews.len(),
        ..StagingReport::default()
    };
    let staged_restaurants = stage_restaurants(restaurants, &mut report);
    let staged_reviews = stage_reviews(reviews, &mut report);
    debug!(
        restaurants_kept = report.restaurants_kept,
        restaurants_dropped = report.restaurants_dropped(),
        reviews_kept = report.reviews_kept,
        reviews_dropped = report.reviews_dropped(),
        "staging complete"
    );
    StagedData {
        restaurants: staged_restaurants,
        reviews: staged_reviews,
        report,
    }
}

fn stage_restaurants(
    records: &[RestaurantRecord],
    report: &mut StagingReport,
) -> Vec<StagedRestaurant> {
    let mut seen_ids = BTreeSet::new();
    let mut staged = Vec::with_capacity(records.len());
    for record in records {
        let name = record.name.trim();
        if name.is_empty() {
            report.restaurants_missing_name += 1;
            continue;
        }
        let place_id = normalize_id(record.place_id.as_deref());
        if let Some(id) = &place_id
            && !seen_ids.insert(id.clone())
        {
            report.restaurants_duplicate_place_id += 1;
            continue;
        }
        let rating = record
            .rating
            .filter(|rating| rating.is_finite() && (0.0..=5.0).contains(rating));
        let price_level = record.price_level.filter(|level| *level <= 4);
        let categories = record
            .categories
            .iter()
            .map(|category| category.trim().to_string())
            .filter(|category| !category.is_empty())
            .collect();
        staged.push(StagedRestaurant {
            place_id,
            name: name.to_string(),
            rating,
            review_count: record.review_count,
            price_level,
            address: record.address.trim().to_string(),
            coordinates: record.coordinates,
            categories,
            contact: record.contact.clone(),
            collected_at: record.collected_at,
            source: record.source,
            rating_category: rating_category(rating),
            price_category: price_category(price_level),
            popularity: popularity(record.review_count),
        });
    }
    report.restaurants_kept = staged.len();
    staged
}

fn stage_reviews(records: &[ReviewRecord], report: &mut StagingReport) -> Vec<StagedReview> {
    let mut staged = Vec::with_capacity(records.len());
    for record in records {
        let Some(rating) = valid_review_rating(record.rating) else {
            report.reviews_invalid_rating += 1;
            continue;
        };
        let text = record.text.trim().to_string();
        let classification = classify_review(Some(rating), &text);
        staged.push(StagedReview {
            place_id: normalize_id(record.place_id.as_deref()),
            restaurant_name: record.restaurant_name.trim().to_string(),
            author: record.author.trim().to_string(),
            rating,
            text,
            relative_time: record.relative_time.clone(),
            published_at: record.published_at,
            collected_at: record.collected_at,
            source: record.source,
            classification,
        });
    }
    report.reviews_kept = staged.len();
    staged
}

fn valid_review_rating(rating: Option<i64>) -> Option<u8> {
    rating
        .filter(|rating| (1..=5).contains(rating))
        .and_then(|rating| u8::try_from(rating).ok())
}

fn normalize_id(id: Option<&str>) -> Option<String> {
    id.map(str::trim)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
}
