//! Data tests run after the models are built, and post-run audits.
//!
//! Tests with [`Severity::Warn`] are reported but never fail a run.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use reviewflow_model::{ScoredRestaurant, SimpleSentiment, StagedRestaurant, StagedReview};
use reviewflow_score::StagedData;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Error,
    Warn,
}

/// Outcome of one named check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub name: String,
    pub severity: Severity,
    /// Offending rows; zero means the check passed.
    pub failures: usize,
}

impl CheckResult {
    fn new(name: &str, severity: Severity, failures: usize) -> Self {
        Self {
            name: name.to_string(),
            severity,
            failures,
        }
    }

    pub fn passed(&self) -> bool {
        self.failures == 0
    }

    /// Failed with error severity.
    pub fn is_failure(&self) -> bool {
        !self.passed() && self.severity == Severity::Error
    }
}

/// Names of checks that fail the run, in check order.
pub fn failing_names(results: &[CheckResult]) -> Vec<String> {
    results
        .iter()
        .filter(|result| result.is_failure())
        .map(|result| result.name.clone())
        .collect()
}

/// Schema tests over the staging tables and the mart.
pub fn data_tests(staged: &StagedData, mart: &[ScoredRestaurant]) -> Vec<CheckResult> {
    let results = vec![
        CheckResult::new(
            "not_null_stg_restaurants_name",
            Severity::Error,
            staged
                .restaurants
                .iter()
                .filter(|row| row.name.trim().is_empty())
                .count(),
        ),
        CheckResult::new(
            "unique_stg_restaurants_place_id",
            Severity::Error,
            duplicate_place_ids(&staged.restaurants),
        ),
        CheckResult::new(
            "accepted_range_stg_restaurants_rating",
            Severity::Error,
            staged
                .restaurants
                .iter()
                .filter(|row| row.rating.is_some_and(|r| !(0.0..=5.0).contains(&r)))
                .count(),
        ),
        CheckResult::new(
            "accepted_values_stg_reviews_rating",
            Severity::Error,
            staged
                .reviews
                .iter()
                .filter(|row| !(1..=5).contains(&row.rating))
                .count(),
        ),
        CheckResult::new(
            "accepted_range_mart_quality_score",
            Severity::Error,
            mart.iter()
                .filter(|row| !(0.0..=100.0).contains(&row.quality_score))
                .count(),
        ),
        CheckResult::new(
            "relationships_stg_reviews_restaurant",
            Severity::Warn,
            orphan_reviews(&staged.restaurants, &staged.reviews),
        ),
    ];
    log_results(&results);
    results
}

/// Checks run against the finished store: the mart must not be empty and
/// review sentiment must agree with the rating it was derived from.
pub fn audits(reviews: &[StagedReview], mart: &[ScoredRestaurant]) -> Vec<CheckResult> {
    let inconsistent = reviews
        .iter()
        .filter(|review| {
            let sentiment = review.classification.sentiment_simple;
            (review.rating >= 4 && sentiment != SimpleSentiment::Positive)
                || (review.rating <= 2 && sentiment != SimpleSentiment::Negative)
        })
        .count();
    let results = vec![
        CheckResult::new("mart_not_empty", Severity::Error, usize::from(mart.is_empty())),
        CheckResult::new("sentiment_consistency", Severity::Error, inconsistent),
    ];
    log_results(&results);
    results
}

fn duplicate_place_ids(restaurants: &[StagedRestaurant]) -> usize {
    let mut seen = HashSet::new();
    restaurants
        .iter()
        .filter_map(|row| row.place_id.as_deref())
        .filter(|id| !seen.insert(*id))
        .count()
}

fn orphan_reviews(restaurants: &[StagedRestaurant], reviews: &[StagedReview]) -> usize {
    let ids: HashSet<&str> = restaurants
        .iter()
        .filter_map(|row| row.place_id.as_deref())
        .collect();
    let names: HashSet<&str> = restaurants
        .iter()
        .filter(|row| row.place_id.is_none())
        .map(|row| row.name.as_str())
        .collect();
    reviews
        .iter()
        .filter(|review| match review.place_id.as_deref() {
            Some(id) => !ids.contains(id),
            None => !names.contains(review.restaurant_name.as_str()),
        })
        .count()
}

fn log_results(results: &[CheckResult]) {
    for result in results {
        if result.passed() {
            debug!(check = %result.name, "check passed");
        } else {
            warn!(
                check = %result.name,
                severity = ?result.severity,
                failures = result.failures,
                "check failed"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reviewflow_model::{DataSource, RestaurantRecord, ReviewRecord};
    use reviewflow_score::{score_restaurants, stage};

    fn restaurant(place_id: Option<&str>, name: &str) -> RestaurantRecord {
        RestaurantRecord {
            place_id: place_id.map(str::to_string),
            name: name.to_string(),
            rating: Some(4.2),
            review_count: 30,
            price_level: None,
            address: String::new(),
            coordinates: None,
            categories: Default::default(),
            contact: None,
            collected_at: Utc::now(),
            source: DataSource::Snapshot,
        }
    }

    fn review(place_id: Option<&str>, name: &str, rating: i64) -> ReviewRecord {
        ReviewRecord {
            place_id: place_id.map(str::to_string),
            restaurant_name: name.to_string(),
            author: String::new(),
            rating: Some(rating),
            text: String::new(),
            relative_time: String::new(),
            published_at: None,
            collected_at: Utc::now(),
            source: DataSource::Snapshot,
        }
    }

    #[test]
    fn clean_data_passes_every_test() {
        let staged = stage(
            &[restaurant(Some("a"), "A"), restaurant(None, "B")],
            &[review(Some("a"), "A", 5), review(None, "B", 2)],
        );
        let mart = score_restaurants(&staged.restaurants, &staged.reviews);

        let results = data_tests(&staged, &mart);

        assert_eq!(results.len(), 6);
        assert!(results.iter().all(CheckResult::passed));
        assert!(audits(&staged.reviews, &mart).iter().all(CheckResult::passed));
    }

    #[test]
    fn orphan_reviews_only_warn() {
        let staged = stage(
            &[restaurant(Some("a"), "A")],
            &[review(Some("zz"), "Gone", 4), review(None, "A", 4)],
        );
        let mart = score_restaurants(&staged.restaurants, &staged.reviews);

        let results = data_tests(&staged, &mart);
        let relationships = results
            .iter()
            .find(|r| r.name == "relationships_stg_reviews_restaurant")
            .unwrap();

        assert_eq!(relationships.failures, 2);
        assert!(!relationships.is_failure());
        assert!(failing_names(&results).is_empty());
    }

    #[test]
    fn tampered_staging_is_caught() {
        let mut staged = stage(&[restaurant(Some("a"), "A")], &[review(Some("a"), "A", 5)]);
        staged.restaurants.push(staged.restaurants[0].clone());
        staged.reviews[0].rating = 9;
        let mart = score_restaurants(&staged.restaurants, &staged.reviews);

        let failing = failing_names(&data_tests(&staged, &mart));

        assert_eq!(
            failing,
            vec![
                "unique_stg_restaurants_place_id".to_string(),
                "accepted_values_stg_reviews_rating".to_string(),
            ]
        );
    }

    #[test]
    fn empty_mart_fails_audit() {
        let results = audits(&[], &[]);
        assert_eq!(failing_names(&results), vec!["mart_not_empty".to_string()]);
    }

    #[test]
    fn inconsistent_sentiment_fails_audit() {
        let staged = stage(&[restaurant(Some("a"), "A")], &[review(Some("a"), "A", 5)]);
        let mut reviews = staged.reviews.clone();
        reviews[0].classification.sentiment_simple = SimpleSentiment::Negative;
        let mart = score_restaurants(&staged.restaurants, &reviews);

        let results = audits(&reviews, &mart);

        assert_eq!(
            failing_names(&results),
            vec!["sentiment_consistency".to_string()]
        );
    }
}
