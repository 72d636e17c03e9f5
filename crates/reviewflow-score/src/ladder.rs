//! First-match-wins rule ladders for tier and recommendation.
//!
//! Each ladder is an ordered list of `(label, predicate)` rules. The first
//! rule whose predicate holds decides the label; the fallback applies when
//! none does. Inserting a tier means inserting a rule at its position.

use reviewflow_model::{QualityTier, Recommendation};

/// Inputs every ladder predicate is evaluated against.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoreInputs {
    /// Restaurant rating, 0 when absent.
    pub rating: f64,
    pub positive_sentiment_pct: f64,
    /// Matched (collected) reviews.
    pub reviews_collected: usize,
}

#[derive(Debug, Clone, Copy)]
pub struct Rule<L> {
    pub label: L,
    pub predicate: fn(&ScoreInputs) -> bool,
}

#[derive(Debug, Clone, Copy)]
pub struct Ladder<L: 'static> {
    pub rules: &'static [Rule<L>],
    pub fallback: L,
}

impl<L: Copy> Ladder<L> {
    pub fn classify(&self, inputs: &ScoreInputs) -> L {
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(inputs))
            .map_or(self.fallback, |rule| rule.label)
    }
}

pub static TIER_LADDER: Ladder<QualityTier> = Ladder {
    rules: &[
        Rule {
            label: QualityTier::Premium,
            predicate: |s: &ScoreInputs| s.rating >= 4.5 && s.positive_sentiment_pct >= 80.0,
        },
        Rule {
            label: QualityTier::Excellent,
            predicate: |s: &ScoreInputs| s.rating >= 4.0 && s.positive_sentiment_pct >= 70.0,
        },
        Rule {
            label: QualityTier::VeryGood,
            predicate: |s: &ScoreInputs| s.rating >= 3.5 && s.positive_sentiment_pct >= 60.0,
        },
        Rule {
            label: QualityTier::Good,
            predicate: |s: &ScoreInputs| s.rating >= 3.0,
        },
    ],
    fallback: QualityTier::Average,
};

pub static RECOMMENDATION_LADDER: Ladder<Recommendation> = Ladder {
    rules: &[
        Rule {
            label: Recommendation::HighlyRecommended,
            predicate: |s: &ScoreInputs| {
                s.rating >= 4.0 && s.positive_sentiment_pct >= 75.0 && s.reviews_collected >= 3
            },
        },
        Rule {
            label: Recommendation::Recommended,
            predicate: |s: &ScoreInputs| s.rating >= 3.5 && s.positive_sentiment_pct >= 60.0,
        },
        Rule {
            label: Recommendation::Average,
            predicate: |s: &ScoreInputs| s.rating >= 3.0,
        },
    ],
    fallback: Recommendation::NotRecommended,
};

pub fn tier(inputs: &ScoreInputs) -> QualityTier {
    TIER_LADDER.classify(inputs)
}

pub fn recommendation(inputs: &ScoreInputs) -> Recommendation {
    RECOMMENDATION_LADDER.classify(inputs)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn inputs(rating: f64, positive: f64, reviews: usize) -> ScoreInputs {
        ScoreInputs {
            rating,
            positive_sentiment_pct: positive,
            reviews_collected: reviews,
        }
    }

    #[test]
    fn tier_first_match_wins() {
        // Satisfies both the Premium rule and the Good rule.
        assert_eq!(tier(&inputs(4.8, 90.0, 5)), QualityTier::Premium);
        assert_eq!(tier(&inputs(4.6, 75.0, 5)), QualityTier::Excellent);
        assert_eq!(tier(&inputs(3.6, 60.0, 0)), QualityTier::VeryGood);
        assert_eq!(tier(&inputs(4.9, 10.0, 0)), QualityTier::Good);
        assert_eq!(tier(&inputs(2.9, 100.0, 10)), QualityTier::Average);
    }

    #[test]
    fn recommendation_needs_volume_for_top_label() {
        assert_eq!(
            recommendation(&inputs(4.5, 80.0, 3)),
            Recommendation::HighlyRecommended
        );
        assert_eq!(
            recommendation(&inputs(4.5, 80.0, 2)),
            Recommendation::Recommended
        );
        assert_eq!(recommendation(&inputs(3.2, 0.0, 0)), Recommendation::Average);
        assert_eq!(
            recommendation(&inputs(0.0, 0.0, 0)),
            Recommendation::NotRecommended
        );
    }

    #[test]
    fn boundaries_are_inclusive() {
        assert_eq!(tier(&inputs(4.5, 80.0, 0)), QualityTier::Premium);
        assert_eq!(tier(&inputs(4.0, 70.0, 0)), QualityTier::Excellent);
        assert_eq!(tier(&inputs(3.0, 0.0, 0)), QualityTier::Good);
    }
}
