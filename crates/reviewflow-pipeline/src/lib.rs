//! Batch pipeline: collect restaurant reviews, build the scored mart, check
//! it, and report the run.
//!
//! The orchestrator talks to three collaborators through traits:
//! [`Collector`], [`TransformEngine`] and [`NotificationSink`]. Concrete
//! implementations for Google Places, on-disk snapshots, the in-memory
//! transform engine and several notification targets live here too.

pub mod collector;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod places;
pub mod quality;
pub mod step;
pub mod transform;

pub use collector::{CollectedBatch, Collector, SnapshotCollector};
pub use error::{AdapterError, DeliveryError, QualityCheckFailure, StepError, TransformError};
pub use notify::{
    FailureSummary, FanOutSink, FileSink, LogSink, NotificationPayload, NotificationSink,
    RunCounts, StepSummary, TopEntry, WebhookSink,
};
pub use orchestrator::{AbortHandle, Orchestrator, SharedCollector, SharedEngine, SharedSink};
pub use places::{API_KEY_ENV, GooglePlacesCollector};
pub use quality::{CheckResult, Severity};
pub use step::{CancelToken, StepPolicy, StepRun, StepWork, run_step, step_work};
pub use transform::{LoadSummary, LocalTransformEngine, TransformEngine, TransformResult};
