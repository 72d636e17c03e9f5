//! Raw records as delivered by a collector.
//!
//! These types mirror what the places API returns after flattening. Nothing
//! here is validated; staging decides which rows survive.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a record was collected from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataSource {
    #[default]
    GooglePlaces,
    Snapshot,
}

impl DataSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            DataSource::GooglePlaces => "google_places",
            DataSource::Snapshot => "snapshot",
        }
    }
}

/// Latitude/longitude pair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    pub latitude: f64,
    pub longitude: f64,
}

/// Optional contact details of a restaurant.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contact {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub website: Option<String>,
}

/// A restaurant listing as collected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RestaurantRecord {
    /// Places identifier. Some sources do not provide one.
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub name: String,
    /// Average rating on a 0-5 scale.
    #[serde(default)]
    pub rating: Option<f64>,
    /// Total number of ratings reported by the source.
    #[serde(default)]
    pub review_count: u64,
    /// Price level on a 0-4 scale.
    #[serde(default)]
    pub price_level: Option<u8>,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub coordinates: Option<Coordinates>,
    #[serde(default)]
    pub categories: BTreeSet<String>,
    #[serde(default)]
    pub contact: Option<Contact>,
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub source: DataSource,
}

/// A single review as collected.
///
/// Identity is `(place_id or restaurant_name, author, published_at)`, which
/// is not guaranteed to be unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReviewRecord {
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub restaurant_name: String,
    #[serde(default)]
    pub author: String,
    /// Star rating. Required to be within 1-5 for the review to be kept.
    #[serde(default)]
    pub rating: Option<i64>,
    #[serde(default)]
    pub text: String,
    /// Human description of the review age ("2 weeks ago").
    #[serde(default)]
    pub relative_time: String,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub source: DataSource,
}
