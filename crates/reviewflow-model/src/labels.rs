//! Classification labels produced by staging and scoring.
//!
//! Every label serializes to the same human string it displays as, so mart
//! rows read the same in JSON output and in the terminal.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Five-level sentiment derived from a review rating.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SentimentCategory {
    Excellent,
    Positive,
    Neutral,
    Negative,
    #[serde(rename = "Very Negative")]
    VeryNegative,
}

impl SentimentCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            SentimentCategory::Excellent => "Excellent",
            SentimentCategory::Positive => "Positive",
            SentimentCategory::Neutral => "Neutral",
            SentimentCategory::Negative => "Negative",
            SentimentCategory::VeryNegative => "Very Negative",
        }
    }
}

/// Three-bucket sentiment used for percentages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimpleSentiment {
    Positive,
    Neutral,
    Negative,
}

impl SimpleSentiment {
    pub fn as_str(&self) -> &'static str {
        match self {
            SimpleSentiment::Positive => "Positive",
            SimpleSentiment::Neutral => "Neutral",
            SimpleSentiment::Negative => "Negative",
        }
    }
}

/// Review body length bucket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReviewLength {
    Detailed,
    Medium,
    Short,
    Empty,
}

impl ReviewLength {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReviewLength::Detailed => "Detailed",
            ReviewLength::Medium => "Medium",
            ReviewLength::Short => "Short",
            ReviewLength::Empty => "Empty",
        }
    }
}

/// Restaurant rating bucket computed at staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RatingCategory {
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Average,
    Poor,
    #[serde(rename = "Not Rated")]
    NotRated,
}

impl RatingCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            RatingCategory::Excellent => "Excellent",
            RatingCategory::VeryGood => "Very Good",
            RatingCategory::Good => "Good",
            RatingCategory::Average => "Average",
            RatingCategory::Poor => "Poor",
            RatingCategory::NotRated => "Not Rated",
        }
    }
}

/// Price level bucket computed at staging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PriceCategory {
    Budget,
    Moderate,
    Expensive,
    #[serde(rename = "Very Expensive")]
    VeryExpensive,
    #[serde(rename = "Not Specified")]
    NotSpecified,
}

impl PriceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            PriceCategory::Budget => "Budget",
            PriceCategory::Moderate => "Moderate",
            PriceCategory::Expensive => "Expensive",
            PriceCategory::VeryExpensive => "Very Expensive",
            PriceCategory::NotSpecified => "Not Specified",
        }
    }
}

/// Popularity bucket from the source-reported rating count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Popularity {
    #[serde(rename = "Very Popular")]
    VeryPopular,
    Popular,
    #[serde(rename = "Well Known")]
    WellKnown,
    #[serde(rename = "Lesser Known")]
    LesserKnown,
}

impl Popularity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Popularity::VeryPopular => "Very Popular",
            Popularity::Popular => "Popular",
            Popularity::WellKnown => "Well Known",
            Popularity::LesserKnown => "Lesser Known",
        }
    }
}

/// Ordered quality tier: Premium > Excellent > Very Good > Good > Average.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum QualityTier {
    Premium,
    Excellent,
    #[serde(rename = "Very Good")]
    VeryGood,
    Good,
    Average,
}

impl QualityTier {
    pub fn as_str(&self) -> &'static str {
        match self {
            QualityTier::Premium => "Premium",
            QualityTier::Excellent => "Excellent",
            QualityTier::VeryGood => "Very Good",
            QualityTier::Good => "Good",
            QualityTier::Average => "Average",
        }
    }

    /// Rank where 0 is the best tier.
    pub fn rank(&self) -> u8 {
        match self {
            QualityTier::Premium => 0,
            QualityTier::Excellent => 1,
            QualityTier::VeryGood => 2,
            QualityTier::Good => 3,
            QualityTier::Average => 4,
        }
    }
}

/// Recommendation label, evaluated independently from the tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Recommendation {
    #[serde(rename = "Highly Recommended")]
    HighlyRecommended,
    Recommended,
    Average,
    #[serde(rename = "Not Recommended")]
    NotRecommended,
}

impl Recommendation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Recommendation::HighlyRecommended => "Highly Recommended",
            Recommendation::Recommended => "Recommended",
            Recommendation::Average => "Average",
            Recommendation::NotRecommended => "Not Recommended",
        }
    }
}

macro_rules! impl_display_via_as_str {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.as_str())
                }
            }
        )+
    };
}

impl_display_via_as_str!(
    SentimentCategory,
    SimpleSentiment,
    ReviewLength,
    RatingCategory,
    PriceCategory,
    Popularity,
    QualityTier,
    Recommendation,
);
