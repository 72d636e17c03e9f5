//! Transformation engine boundary and the in-process implementation.
//!
//! The orchestrator only sees [`TransformEngine`]: load a batch, build the
//! models, read back test counts. Which models exist and how they are built
//! stays behind the trait.

use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, info_span};

use reviewflow_model::{ScoredRestaurant, StagingReport};
use reviewflow_score::{StagedData, score_restaurants, stage};

use crate::collector::CollectedBatch;
use crate::error::TransformError;
use crate::quality::{self, CheckResult};

pub const STG_RESTAURANTS: &str = "stg_restaurants";
pub const STG_REVIEWS: &str = "stg_reviews";
pub const MART_RESTAURANT_SCORES: &str = "mart_restaurant_scores";

/// Rows written to the raw tables by [`TransformEngine::load`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub restaurants: usize,
    pub reviews: usize,
}

/// Structured result of one transform run.
///
/// `success` reports whether every model was built. Test failures are
/// counted separately and do not clear it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransformResult {
    pub success: bool,
    pub tests_passed: usize,
    pub tests_failed: usize,
    pub failing_test_names: Vec<String>,
    pub models_built: Vec<String>,
    pub mart_rows: usize,
}

/// Engine that owns the relational store.
pub trait TransformEngine {
    /// Replace the raw tables with `batch`.
    fn load(&self, batch: &CollectedBatch) -> Result<LoadSummary, TransformError>;

    /// Rebuild staging and mart models from the raw tables and run the data
    /// tests.
    fn run_transforms(&self) -> Result<TransformResult, TransformError>;

    /// Post-run checks against the built store.
    fn audit(&self) -> Result<Vec<CheckResult>, TransformError>;

    /// Current mart rows in leaderboard order.
    fn mart(&self) -> Result<Vec<ScoredRestaurant>, TransformError>;
}

#[derive(Debug, Default)]
struct Store {
    raw: Option<CollectedBatch>,
    staged: Option<StagedData>,
    mart: Option<Vec<ScoredRestaurant>>,
}

/// In-memory store with raw, staging and mart tables.
///
/// Every table is dropped and recreated on write, so repeated runs on the
/// same batch leave the store unchanged.
#[derive(Debug, Default)]
pub struct LocalTransformEngine {
    store: Mutex<Store>,
}

impl LocalTransformEngine {
    pub fn new() -> Self {
        Self::default()
    }

    fn store(&self) -> Result<MutexGuard<'_, Store>, TransformError> {
        self.store.lock().map_err(|_| TransformError::StorePoisoned)
    }

    /// Staging counters of the last run, if any.
    pub fn staging_report(&self) -> Result<Option<StagingReport>, TransformError> {
        Ok(self.store()?.staged.as_ref().map(|staged| staged.report))
    }
}

impl TransformEngine for LocalTransformEngine {
    fn load(&self, batch: &CollectedBatch) -> Result<LoadSummary, TransformError> {
        let mut store = self.store()?;
        store.raw = Some(batch.clone());
        let summary = LoadSummary {
            restaurants: batch.restaurants.len(),
            reviews: batch.reviews.len(),
        };
        debug!(
            restaurants = summary.restaurants,
            reviews = summary.reviews,
            "raw tables replaced"
        );
        Ok(summary)
    }

    fn run_transforms(&self) -> Result<TransformResult, TransformError> {
        let span = info_span!("run_transforms");
        let _guard = span.enter();
        let start = Instant::now();

        let mut store = self.store()?;
        let raw = store.raw.as_ref().ok_or(TransformError::NotLoaded)?;

        let staged = stage(&raw.restaurants, &raw.reviews);
        let mart = score_restaurants(&staged.restaurants, &staged.reviews);
        let tests = quality::data_tests(&staged, &mart);

        let failing_test_names = quality::failing_names(&tests);
        let result = TransformResult {
            success: true,
            tests_passed: tests.len() - failing_test_names.len(),
            tests_failed: failing_test_names.len(),
            failing_test_names,
            models_built: vec![
                STG_RESTAURANTS.to_string(),
                STG_REVIEWS.to_string(),
                MART_RESTAURANT_SCORES.to_string(),
            ],
            mart_rows: mart.len(),
        };

        store.staged = Some(staged);
        store.mart = Some(mart);

        info!(
            models = result.models_built.len(),
            mart_rows = result.mart_rows,
            tests_passed = result.tests_passed,
            tests_failed = result.tests_failed,
            duration_ms = start.elapsed().as_millis(),
            "transforms complete"
        );
        Ok(result)
    }

    fn audit(&self) -> Result<Vec<CheckResult>, TransformError> {
        let store = self.store()?;
        let staged = store
            .staged
            .as_ref()
            .ok_or(TransformError::MartMissing(STG_REVIEWS))?;
        let mart = store
            .mart
            .as_ref()
            .ok_or(TransformError::MartMissing(MART_RESTAURANT_SCORES))?;
        Ok(quality::audits(&staged.reviews, mart))
    }

    fn mart(&self) -> Result<Vec<ScoredRestaurant>, TransformError> {
        self.store()?
            .mart
            .clone()
            .ok_or(TransformError::MartMissing(MART_RESTAURANT_SCORES))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use reviewflow_model::{DataSource, RestaurantRecord, ReviewRecord};

    fn batch() -> CollectedBatch {
        let mut batch = CollectedBatch::new("Paris");
        batch.restaurants = vec![RestaurantRecord {
            place_id: Some("p1".to_string()),
            name: "Le Comptoir".to_string(),
            rating: Some(4.6),
            review_count: 812,
            price_level: Some(2),
            address: String::new(),
            coordinates: None,
            categories: Default::default(),
            contact: None,
            collected_at: Utc::now(),
            source: DataSource::Snapshot,
        }];
        batch.reviews = vec![ReviewRecord {
            place_id: Some("p1".to_string()),
            restaurant_name: "Le Comptoir".to_string(),
            author: String::new(),
            rating: Some(5),
            text: "Excellent".to_string(),
            relative_time: String::new(),
            published_at: None,
            collected_at: Utc::now(),
            source: DataSource::Snapshot,
        }];
        batch
    }

    #[test]
    fn transforms_require_a_load() {
        let engine = LocalTransformEngine::new();
        assert!(matches!(
            engine.run_transforms(),
            Err(TransformError::NotLoaded)
        ));
        assert!(matches!(engine.mart(), Err(TransformError::MartMissing(_))));
        assert!(matches!(engine.audit(), Err(TransformError::MartMissing(_))));
    }

    #[test]
    fn load_and_build() {
        let engine = LocalTransformEngine::new();

        let summary = engine.load(&batch()).unwrap();
        let result = engine.run_transforms().unwrap();

        assert_eq!(summary, LoadSummary { restaurants: 1, reviews: 1 });
        assert!(result.success);
        assert_eq!(result.tests_failed, 0);
        assert_eq!(result.tests_passed, 6);
        assert_eq!(result.mart_rows, 1);
        assert_eq!(result.models_built.len(), 3);
        assert!(engine.audit().unwrap().iter().all(CheckResult::passed));
        assert_eq!(engine.mart().unwrap()[0].name(), "Le Comptoir");
        assert_eq!(engine.staging_report().unwrap().unwrap().reviews_kept, 1);
    }

    #[test]
    fn reload_replaces_raw_tables() {
        let engine = LocalTransformEngine::new();
        engine.load(&batch()).unwrap();
        engine.run_transforms().unwrap();

        engine.load(&CollectedBatch::new("Paris")).unwrap();
        let result = engine.run_transforms().unwrap();

        assert_eq!(result.mart_rows, 0);
        assert_eq!(
            quality::failing_names(&engine.audit().unwrap()),
            vec!["mart_not_empty".to_string()]
        );
    }
}
