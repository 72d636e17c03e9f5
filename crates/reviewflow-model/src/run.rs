//! Pipeline run record.
//!
//! A run is opened with [`RunRecorder::start`], receives one [`StepResult`]
//! per resolved step, and is sealed into an immutable [`PipelineRun`] once the
//! outcome is known.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// The four orchestrated steps, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepName {
    Collect,
    Transform,
    QualityCheck,
    Notify,
}

impl StepName {
    pub const ALL: [StepName; 4] = [
        StepName::Collect,
        StepName::Transform,
        StepName::QualityCheck,
        StepName::Notify,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StepName::Collect => "collect",
            StepName::Transform => "transform",
            StepName::QualityCheck => "quality_check",
            StepName::Notify => "notify",
        }
    }

    /// State the orchestrator is in while this step runs.
    pub fn state(&self) -> PipelineState {
        match self {
            StepName::Collect => PipelineState::Collecting,
            StepName::Transform => PipelineState::Transforming,
            StepName::QualityCheck => PipelineState::QualityChecking,
            StepName::Notify => PipelineState::Notifying,
        }
    }
}

impl fmt::Display for StepName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Orchestrator state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Idle,
    Collecting,
    Transforming,
    QualityChecking,
    Notifying,
    Done(RunOutcome),
}

/// Overall result of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    Success,
    /// Processing completed but the produced data failed quality checks.
    PartialFailure,
    Failure,
}

impl RunOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunOutcome::Success => "SUCCESS",
            RunOutcome::PartialFailure => "PARTIAL_FAILURE",
            RunOutcome::Failure => "FAILED",
        }
    }
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Success,
    Failed,
    TimedOut,
}

impl StepStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StepStatus::Success => "success",
            StepStatus::Failed => "failed",
            StepStatus::TimedOut => "timed_out",
        }
    }
}

impl fmt::Display for StepStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which kind of failure a step ended with.
///
/// Lets an operator tell "nothing ran" (adapter), "ran but broke"
/// (transform), "ran but data is bad" (quality check) and "ran fine but
/// nobody was told" (notification delivery) apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    Adapter,
    Transform,
    QualityCheck,
    NotificationDelivery,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::Adapter => "adapter",
            FailureKind::Transform => "transform",
            FailureKind::QualityCheck => "quality_check",
            FailureKind::NotificationDelivery => "notification_delivery",
        }
    }
}

impl fmt::Display for FailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last error recorded for a step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    pub kind: FailureKind,
    pub message: String,
    /// Names of failing data checks (quality check failures only).
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing_checks: Vec<String>,
}

impl StepFailure {
    pub fn new(kind: FailureKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            failing_checks: Vec::new(),
        }
    }
}

/// Outcome of one step after retries were resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub step: StepName,
    pub attempts: u32,
    pub status: StepStatus,
    pub failure: Option<StepFailure>,
    pub duration: Duration,
}

impl StepResult {
    pub fn succeeded(step: StepName, attempts: u32, duration: Duration) -> Self {
        Self {
            step,
            attempts,
            status: StepStatus::Success,
            failure: None,
            duration,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == StepStatus::Success
    }
}

/// Whether the run notification reached its sink.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum DeliveryStatus {
    #[default]
    NotAttempted,
    Delivered,
    Failed { message: String },
}

/// Open, appendable run record.
#[derive(Debug)]
pub struct RunRecorder {
    id: Uuid,
    started_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    aborted_before: Option<StepName>,
    delivery: DeliveryStatus,
}

impl RunRecorder {
    pub fn start() -> Self {
        Self {
            id: Uuid::new_v4(),
            started_at: Utc::now(),
            steps: Vec::new(),
            aborted_before: None,
            delivery: DeliveryStatus::NotAttempted,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn record(&mut self, result: StepResult) {
        self.steps.push(result);
    }

    pub fn mark_aborted(&mut self, before: StepName) {
        self.aborted_before = Some(before);
    }

    pub fn aborted_before(&self) -> Option<StepName> {
        self.aborted_before
    }

    pub fn set_delivery(&mut self, delivery: DeliveryStatus) {
        self.delivery = delivery;
    }

    /// Close the record. Nothing can be appended afterwards.
    pub fn seal(self, outcome: RunOutcome) -> PipelineRun {
        PipelineRun {
            id: self.id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            steps: self.steps,
            outcome,
            aborted_before: self.aborted_before,
            delivery: self.delivery,
        }
    }
}

/// Sealed record of one orchestrator invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineRun {
    id: Uuid,
    started_at: DateTime<Utc>,
    finished_at: DateTime<Utc>,
    steps: Vec<StepResult>,
    outcome: RunOutcome,
    aborted_before: Option<StepName>,
    delivery: DeliveryStatus,
}

impl PipelineRun {
    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn finished_at(&self) -> DateTime<Utc> {
        self.finished_at
    }

    pub fn steps(&self) -> &[StepResult] {
        &self.steps
    }

    pub fn step(&self, name: StepName) -> Option<&StepResult> {
        self.steps.iter().find(|result| result.step == name)
    }

    pub fn outcome(&self) -> RunOutcome {
        self.outcome
    }

    /// Step the run was aborted in front of, if the invoker cancelled it.
    pub fn aborted_before(&self) -> Option<StepName> {
        self.aborted_before
    }

    pub fn delivery(&self) -> &DeliveryStatus {
        &self.delivery
    }

    pub fn duration(&self) -> Duration {
        (self.finished_at - self.started_at)
            .to_std()
            .unwrap_or_default()
    }
}
