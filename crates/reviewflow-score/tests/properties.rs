//! Property tests for the scoring engine.

use chrono::{DateTime, Utc};
use proptest::prelude::*;

use reviewflow_model::{DataSource, QualityTier, RestaurantRecord, ReviewRecord};
use reviewflow_score::{ScoreInputs, quality_score, stage_and_score, tier};

fn collected_at() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).expect("valid timestamp")
}

fn restaurant(rating: f64) -> RestaurantRecord {
    RestaurantRecord {
        place_id: Some("p1".to_string()),
        name: "Bistro".to_string(),
        rating: Some(rating),
        review_count: 42,
        price_level: None,
        address: String::new(),
        coordinates: None,
        categories: Default::default(),
        contact: None,
        collected_at: collected_at(),
        source: DataSource::Snapshot,
    }
}

fn review(rating: i64, text: String) -> ReviewRecord {
    ReviewRecord {
        place_id: Some("p1".to_string()),
        restaurant_name: "Bistro".to_string(),
        author: String::new(),
        rating: Some(rating),
        text,
        relative_time: String::new(),
        published_at: None,
        collected_at: collected_at(),
        source: DataSource::Snapshot,
    }
}

proptest! {
    #[test]
    fn percentages_stay_within_bounds(
        rating in 0.0f64..=5.0,
        reviews in prop::collection::vec((1i64..=5, "[a-z ]{0,80}"), 0..40),
    ) {
        let reviews: Vec<ReviewRecord> = reviews
            .into_iter()
            .map(|(rating, text)| review(rating, text))
            .collect();
        let output = stage_and_score(&[restaurant(rating)], &reviews);
        let row = &output.mart[0];

        for pct in [row.positive_sentiment_pct, row.negative_sentiment_pct, row.detailed_review_pct] {
            prop_assert!((0.0..=100.0).contains(&pct));
            if row.review_count_matched == 0 {
                prop_assert_eq!(pct, 0.0);
            }
        }
        prop_assert!((0.0..=100.0).contains(&row.quality_score));
    }

    #[test]
    fn score_is_monotonic_in_rating(
        low in 0.0f64..=5.0,
        delta in 0.0f64..=5.0,
        positive in 0.0f64..=100.0,
        reviews in 0usize..20,
    ) {
        let high = (low + delta).min(5.0);
        let at = |rating| quality_score(&ScoreInputs {
            rating,
            positive_sentiment_pct: positive,
            reviews_collected: reviews,
        });
        prop_assert!(at(high) >= at(low));
    }

    #[test]
    fn score_is_monotonic_in_sentiment_until_clamp(
        rating in 0.0f64..=5.0,
        low in 0.0f64..=100.0,
        delta in 0.0f64..=100.0,
        reviews in 0usize..20,
    ) {
        let high = (low + delta).min(100.0);
        let at = |positive| quality_score(&ScoreInputs {
            rating,
            positive_sentiment_pct: positive,
            reviews_collected: reviews,
        });
        prop_assert!(at(high) >= at(low));
        if low >= 80.0 {
            prop_assert_eq!(at(high), at(low));
        }
    }

    #[test]
    fn premium_rule_outranks_good_rule(
        rating in 4.5f64..=5.0,
        positive in 80.0f64..=100.0,
        reviews in 0usize..50,
    ) {
        let inputs = ScoreInputs {
            rating,
            positive_sentiment_pct: positive,
            reviews_collected: reviews,
        };
        prop_assert_eq!(tier(&inputs), QualityTier::Premium);
    }
}
