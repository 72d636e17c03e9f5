//! Per-restaurant aggregation over matched reviews.

use reviewflow_model::{SimpleSentiment, StagedReview, TopicCounts};

/// Metrics over one restaurant's matched reviews. Safe on an empty set.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ReviewAggregate {
    pub matched: usize,
    pub avg_rating: Option<f64>,
    pub positive_pct: f64,
    pub negative_pct: f64,
    pub detailed_pct: f64,
    pub topics: TopicCounts,
}

impl ReviewAggregate {
    pub fn from_reviews<'a>(reviews: impl IntoIterator<Item = &'a StagedReview>) -> Self {
        let mut matched = 0usize;
        let mut rating_sum = 0u64;
        let mut positive = 0usize;
        let mut negative = 0usize;
        let mut detailed = 0usize;
        let mut topics = TopicCounts::default();

        for review in reviews {
            let flags = &review.classification;
            matched += 1;
            rating_sum += u64::from(review.rating);
            match flags.sentiment_simple {
                SimpleSentiment::Positive => positive += 1,
                SimpleSentiment::Negative => negative += 1,
                SimpleSentiment::Neutral => {}
            }
            if flags.is_detailed {
                detailed += 1;
            }
            if flags.contains_positive_keywords {
                topics.positive_keyword_reviews += 1;
            }
            if flags.contains_negative_keywords {
                topics.negative_keyword_reviews += 1;
            }
            if flags.mentions_service {
                topics.service_mentions += 1;
            }
            if flags.mentions_food {
                topics.food_mentions += 1;
            }
        }

        let avg_rating =
            (matched > 0).then(|| round_to(rating_sum as f64 / matched as f64, 2));
        Self {
            matched,
            avg_rating,
            positive_pct: percentage(positive, matched),
            negative_pct: percentage(negative, matched),
            detailed_pct: percentage(detailed, matched),
            topics,
        }
    }
}

/// `count * 100 / total` rounded to one decimal; zero when `total` is zero.
pub fn percentage(count: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    round_to(count as f64 * 100.0 / total as f64, 1)
}

/// Round half away from zero to `decimals` places.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentage_guards_zero_denominator() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(3, 0), 0.0);
        assert_eq!(percentage(1, 3), 33.3);
        assert_eq!(percentage(2, 3), 66.7);
        assert_eq!(percentage(4, 4), 100.0);
    }

    #[test]
    fn empty_aggregate_is_all_zero() {
        let aggregate = ReviewAggregate::from_reviews(std::iter::empty());
        assert_eq!(aggregate.matched, 0);
        assert_eq!(aggregate.avg_rating, None);
        assert_eq!(aggregate.positive_pct, 0.0);
        assert_eq!(aggregate.negative_pct, 0.0);
        assert_eq!(aggregate.detailed_pct, 0.0);
        assert_eq!(aggregate.topics, TopicCounts::default());
    }

    #[test]
    fn round_to_decimals() {
        assert_eq!(round_to(4.666, 2), 4.67);
        assert_eq!(round_to(93.96, 1), 94.0);
        assert_eq!(round_to(48.000000000000014, 1), 48.0);
    }
}
