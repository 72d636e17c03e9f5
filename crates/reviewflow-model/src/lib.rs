//! Shared types for the ReviewFlow pipeline: collected records, staged rows,
//! scored mart rows, labels, run records and options.

pub mod error;
pub mod labels;
pub mod options;
pub mod records;
pub mod run;
pub mod scored;
pub mod staged;

pub use error::{ConfigError, Result};
pub use labels::{
    PriceCategory, Popularity, QualityTier, RatingCategory, Recommendation, ReviewLength,
    SentimentCategory, SimpleSentiment,
};
pub use options::{PipelineOptions, StepTimeouts};
pub use records::{Contact, Coordinates, DataSource, RestaurantRecord, ReviewRecord};
pub use run::{
    DeliveryStatus, FailureKind, PipelineRun, PipelineState, RunOutcome, RunRecorder, StepFailure,
    StepName, StepResult, StepStatus,
};
pub use scored::{ScoredRestaurant, TopicCounts};
pub use staged::{ReviewClassification, StagedRestaurant, StagedReview, StagingReport};
