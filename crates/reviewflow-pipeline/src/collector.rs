//! Data source adapters.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use reviewflow_model::{RestaurantRecord, ReviewRecord};

use crate::error::AdapterError;

/// Raw records returned by one collect call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectedBatch {
    pub city: String,
    pub collected_at: DateTime<Utc>,
    #[serde(default)]
    pub restaurants: Vec<RestaurantRecord>,
    #[serde(default)]
    pub reviews: Vec<ReviewRecord>,
}

impl CollectedBatch {
    pub fn new(city: impl Into<String>) -> Self {
        Self {
            city: city.into(),
            collected_at: Utc::now(),
            restaurants: Vec::new(),
            reviews: Vec::new(),
        }
    }

    /// Keep at most `max_results` restaurants and drop reviews that no longer
    /// belong to a kept restaurant.
    pub fn truncate(&mut self, max_results: usize) {
        if self.restaurants.len() <= max_results {
            return;
        }
        self.restaurants.truncate(max_results);
        let kept_ids: Vec<&str> = self
            .restaurants
            .iter()
            .filter_map(|restaurant| restaurant.place_id.as_deref())
            .collect();
        let kept_names: Vec<&str> = self
            .restaurants
            .iter()
            .map(|restaurant| restaurant.name.as_str())
            .collect();
        self.reviews.retain(|review| match review.place_id.as_deref() {
            Some(id) => kept_ids.contains(&id),
            None => kept_names.contains(&review.restaurant_name.as_str()),
        });
    }
}

/// Source of raw restaurant and review records.
pub trait Collector {
    /// Fetch up to `max_results` restaurants in `city` with their reviews.
    fn collect(&self, city: &str, max_results: usize) -> Result<CollectedBatch, AdapterError>;
}

/// Replays a batch previously written to disk as JSON.
#[derive(Debug, Clone)]
pub struct SnapshotCollector {
    path: PathBuf,
}

impl SnapshotCollector {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read and decode the snapshot without applying any limits.
    pub fn read(&self) -> Result<CollectedBatch, AdapterError> {
        let contents = std::fs::read_to_string(&self.path).map_err(|e| AdapterError::Io {
            path: self.path.clone(),
            message: e.to_string(),
        })?;
        serde_json::from_str(&contents).map_err(|e| AdapterError::Parse(e.to_string()))
    }
}

impl Collector for SnapshotCollector {
    fn collect(&self, city: &str, max_results: usize) -> Result<CollectedBatch, AdapterError> {
        let mut batch = self.read()?;
        if !batch.city.eq_ignore_ascii_case(city) {
            debug!(
                snapshot_city = %batch.city,
                requested_city = %city,
                "snapshot city differs from requested city"
            );
        }
        batch.truncate(max_results);
        info!(
            path = %self.path.display(),
            restaurants = batch.restaurants.len(),
            reviews = batch.reviews.len(),
            "loaded snapshot"
        );
        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewflow_model::DataSource;
    use tempfile::TempDir;

    fn restaurant(place_id: Option<&str>, name: &str) -> RestaurantRecord {
        RestaurantRecord {
            place_id: place_id.map(str::to_string),
            name: name.to_string(),
            rating: Some(4.0),
            review_count: 10,
            price_level: None,
            address: String::new(),
            coordinates: None,
            categories: Default::default(),
            contact: None,
            collected_at: Utc::now(),
            source: DataSource::Snapshot,
        }
    }

    fn review(place_id: Option<&str>, name: &str) -> ReviewRecord {
        ReviewRecord {
            place_id: place_id.map(str::to_string),
            restaurant_name: name.to_string(),
            author: String::new(),
            rating: Some(5),
            text: String::new(),
            relative_time: String::new(),
            published_at: None,
            collected_at: Utc::now(),
            source: DataSource::Snapshot,
        }
    }

    #[test]
    fn truncate_drops_reviews_of_removed_restaurants() {
        let mut batch = CollectedBatch::new("Paris");
        batch.restaurants = vec![
            restaurant(Some("a"), "A"),
            restaurant(None, "B"),
            restaurant(Some("c"), "C"),
        ];
        batch.reviews = vec![
            review(Some("a"), "A"),
            review(None, "B"),
            review(Some("c"), "C"),
        ];

        batch.truncate(2);

        assert_eq!(batch.restaurants.len(), 2);
        assert_eq!(batch.reviews.len(), 2);
        assert!(batch.reviews.iter().all(|r| r.restaurant_name != "C"));
    }

    #[test]
    fn snapshot_round_trips_through_disk() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("batch.json");
        let mut batch = CollectedBatch::new("Paris");
        batch.restaurants = vec![restaurant(Some("a"), "A")];
        batch.reviews = vec![review(Some("a"), "A")];
        std::fs::write(&path, serde_json::to_string(&batch).unwrap()).unwrap();

        let loaded = SnapshotCollector::new(&path).collect("Paris", 60).unwrap();

        assert_eq!(loaded, batch);
    }

    #[test]
    fn missing_snapshot_is_an_io_error() {
        let dir = TempDir::new().unwrap();
        let collector = SnapshotCollector::new(dir.path().join("absent.json"));

        let err = collector.collect("Paris", 60).unwrap_err();

        assert!(matches!(err, AdapterError::Io { .. }));
    }
}
