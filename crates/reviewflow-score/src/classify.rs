//! Per-review classification.

use reviewflow_model::{ReviewClassification, ReviewLength, SentimentCategory, SimpleSentiment};

use crate::keywords::{
    FOOD_KEYWORDS, NEGATIVE_KEYWORDS, POSITIVE_KEYWORDS, SERVICE_KEYWORDS, contains_any,
};

/// Minimum body length (characters) of a detailed review.
pub const DETAILED_REVIEW_MIN_CHARS: usize = 50;

pub fn sentiment_category(rating: u8) -> SentimentCategory {
    match rating {
        5 => SentimentCategory::Excellent,
        4 => SentimentCategory::Positive,
        3 => SentimentCategory::Neutral,
        2 => SentimentCategory::Negative,
        _ => SentimentCategory::VeryNegative,
    }
}

pub fn sentiment_simple(rating: u8) -> SimpleSentiment {
    match rating {
        r if r >= 4 => SimpleSentiment::Positive,
        3 => SimpleSentiment::Neutral,
        _ => SimpleSentiment::Negative,
    }
}

/// Bucket a review body by its length in characters.
pub fn length_category(text: &str) -> ReviewLength {
    match text.chars().count() {
        n if n > 200 => ReviewLength::Detailed,
        n if n > 50 => ReviewLength::Medium,
        n if n > 0 => ReviewLength::Short,
        _ => ReviewLength::Empty,
    }
}

/// Classify one review. Pure; uses nothing but the review's own fields.
pub fn classify_review(rating: Option<u8>, text: &str) -> ReviewClassification {
    let lowered = text.to_lowercase();
    let rating_value = rating.unwrap_or(0);
    ReviewClassification {
        sentiment_category: sentiment_category(rating_value),
        sentiment_simple: sentiment_simple(rating_value),
        length_category: length_category(text),
        is_detailed: rating.is_some() && text.chars().count() >= DETAILED_REVIEW_MIN_CHARS,
        contains_positive_keywords: contains_any(&lowered, POSITIVE_KEYWORDS),
        contains_negative_keywords: contains_any(&lowered, NEGATIVE_KEYWORDS),
        mentions_service: contains_any(&lowered, SERVICE_KEYWORDS),
        mentions_food: contains_any(&lowered, FOOD_KEYWORDS),
    }
}
