//! Error types for the pipeline collaborators and the step runner.

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use reviewflow_model::{FailureKind, StepName};

/// Failure of the data source adapter (collect step).
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum AdapterError {
    /// The API key is not configured.
    #[error("missing API key: set {0}")]
    MissingApiKey(&'static str),

    #[error("invalid endpoint URL: {0}")]
    InvalidUrl(String),

    /// Network request failed before a response arrived.
    #[error("network error: {0}")]
    Network(String),

    /// Non-success HTTP status.
    #[error("HTTP {status} from {endpoint}")]
    Http { status: u16, endpoint: &'static str },

    /// The provider refused the request because of quota.
    #[error("API quota exceeded: {0}")]
    QuotaExceeded(String),

    /// The provider rejected the credentials.
    #[error("request denied: {0}")]
    RequestDenied(String),

    /// Any other non-OK provider status.
    #[error("API returned {status}: {message}")]
    Api { status: String, message: String },

    /// Failed to read a local snapshot.
    #[error("failed to read {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    /// Response or snapshot body could not be decoded.
    #[error("malformed payload: {0}")]
    Parse(String),
}

impl From<reqwest::Error> for AdapterError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

/// Failure of the transformation engine while loading, building or checking.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TransformError {
    /// `run_transforms` or `audit` called before any batch was loaded.
    #[error("no raw data loaded")]
    NotLoaded,

    /// `audit` or `mart` called before the mart was built.
    #[error("mart {0} has not been built")]
    MartMissing(&'static str),

    /// A model failed to build.
    #[error("model {model} failed: {message}")]
    Model { model: &'static str, message: String },

    /// The run finished but reported itself unsuccessful.
    #[error("transform run unsuccessful: {0}")]
    Unsuccessful(String),

    /// The shared store was poisoned by a panicking writer.
    #[error("transform store unavailable")]
    StorePoisoned,
}

/// Failure to deliver the run notification.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum DeliveryError {
    #[error("network error: {0}")]
    Network(String),

    #[error("webhook returned HTTP {0}")]
    Http(u16),

    #[error("failed to write {}: {message}", .path.display())]
    Io { path: PathBuf, message: String },

    #[error("failed to encode payload: {0}")]
    Encode(String),

    /// One or more sinks of a fan-out failed.
    #[error("{failed} of {total} sinks failed: {}", .messages.join("; "))]
    Partial {
        failed: usize,
        total: usize,
        messages: Vec<String>,
    },
}

impl From<reqwest::Error> for DeliveryError {
    fn from(err: reqwest::Error) -> Self {
        Self::Network(err.to_string())
    }
}

impl From<serde_json::Error> for DeliveryError {
    fn from(err: serde_json::Error) -> Self {
        Self::Encode(err.to_string())
    }
}

/// Data checks failed. Structured rather than an error string because the
/// notification lists every failing check by name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityCheckFailure {
    pub failing_checks: Vec<String>,
}

impl fmt::Display for QualityCheckFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} data check(s) failed: {}",
            self.failing_checks.len(),
            self.failing_checks.join(", ")
        )
    }
}

impl std::error::Error for QualityCheckFailure {}

/// Failure of a single step attempt.
#[derive(Debug, Error)]
pub enum StepError {
    #[error(transparent)]
    Adapter(#[from] AdapterError),

    #[error(transparent)]
    Transform(#[from] TransformError),

    #[error(transparent)]
    QualityCheck(#[from] QualityCheckFailure),

    #[error(transparent)]
    Delivery(#[from] DeliveryError),

    #[error("timed out after {}s", .0.as_secs_f64())]
    TimedOut(Duration),

    /// The attempt noticed it was past its deadline and stopped early.
    #[error("attempt cancelled after its deadline")]
    Cancelled,

    /// The worker thread died without reporting a result.
    #[error("worker thread panicked")]
    Panicked,

    #[error("failed to spawn worker thread: {0}")]
    Spawn(String),
}

impl StepError {
    /// Whether another attempt may succeed. Failing data checks are a
    /// property of the data and are never retried.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        !matches!(self, Self::QualityCheck(_))
    }

    /// Failure category recorded on the run for this error.
    ///
    /// Timeouts and worker failures are attributed to the component that
    /// owns `step`.
    #[must_use]
    pub fn kind(&self, step: StepName) -> FailureKind {
        match self {
            Self::Adapter(_) => FailureKind::Adapter,
            Self::Transform(_) => FailureKind::Transform,
            Self::QualityCheck(_) => FailureKind::QualityCheck,
            Self::Delivery(_) => FailureKind::NotificationDelivery,
            Self::TimedOut(_) | Self::Cancelled | Self::Panicked | Self::Spawn(_) => match step {
                StepName::Collect => FailureKind::Adapter,
                StepName::Transform | StepName::QualityCheck => FailureKind::Transform,
                StepName::Notify => FailureKind::NotificationDelivery,
            },
        }
    }

    /// Names of failing data checks, empty for every other error.
    #[must_use]
    pub fn failing_checks(&self) -> &[String] {
        match self {
            Self::QualityCheck(failure) => &failure.failing_checks,
            _ => &[],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quality_failures_are_not_retryable() {
        let failure = StepError::from(QualityCheckFailure {
            failing_checks: vec!["a".to_string(), "b".to_string()],
        });
        assert!(!failure.is_retryable());
        assert_eq!(failure.kind(StepName::QualityCheck), FailureKind::QualityCheck);
        assert_eq!(failure.failing_checks().len(), 2);
        assert_eq!(failure.to_string(), "2 data check(s) failed: a, b");

        assert!(StepError::from(TransformError::NotLoaded).is_retryable());
        assert!(StepError::TimedOut(Duration::from_secs(1)).is_retryable());
    }

    #[test]
    fn timeouts_are_attributed_to_the_step_owner() {
        let timeout = StepError::TimedOut(Duration::from_millis(500));
        assert_eq!(timeout.kind(StepName::Collect), FailureKind::Adapter);
        assert_eq!(timeout.kind(StepName::Transform), FailureKind::Transform);
        assert_eq!(
            timeout.kind(StepName::Notify),
            FailureKind::NotificationDelivery
        );
        assert_eq!(timeout.to_string(), "timed out after 0.5s");
    }

    #[test]
    fn partial_delivery_lists_messages() {
        let err = DeliveryError::Partial {
            failed: 2,
            total: 3,
            messages: vec!["webhook: HTTP 500".to_string(), "file: denied".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "2 of 3 sinks failed: webhook: HTTP 500; file: denied"
        );
    }
}
