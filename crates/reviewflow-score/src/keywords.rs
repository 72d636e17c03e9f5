//! Fixed keyword sets for review content flags.
//!
//! Matching is a case-insensitive substring test, not tokenized:
//! "disappointed" matches "disappoint" and "servers" matches "server". A
//! review can set both the positive and the negative flag. Reviews are
//! collected in English and French, so both languages are listed.

pub const POSITIVE_KEYWORDS: &[&str] = &[
    "excellent",
    "amazing",
    "great",
    "delicious",
    "perfect",
    "wonderful",
    "fantastic",
    "love",
    "best",
    "recommend",
    "délicieux",
    "parfait",
    "génial",
    "super",
    "recommande",
];

pub const NEGATIVE_KEYWORDS: &[&str] = &[
    "terrible",
    "awful",
    "horrible",
    "bad",
    "worst",
    "disappoint",
    "rude",
    "dirty",
    "cold",
    "overpriced",
    "mauvais",
    "décevant",
    "déçu",
    "sale",
    "froid",
];

pub const SERVICE_KEYWORDS: &[&str] = &[
    "service",
    "staff",
    "waiter",
    "waitress",
    "server",
    "serveur",
    "serveuse",
    "accueil",
    "personnel",
];

pub const FOOD_KEYWORDS: &[&str] = &[
    "food",
    "dish",
    "meal",
    "taste",
    "flavor",
    "flavour",
    "plat",
    "cuisine",
    "repas",
    "goût",
];

/// True when `lowered` contains any keyword of `set`.
///
/// `lowered` must already be lowercase; keyword sets are stored lowercase.
pub fn contains_any(lowered: &str, set: &[&str]) -> bool {
    set.iter().any(|keyword| lowered.contains(keyword))
}
