//! Pipeline orchestrator.
//!
//! Drives one run through collect, transform, quality check and notify. Each
//! step goes through [`run_step`] for timeout and retry handling; the
//! orchestrator decides what a resolved step means for the rest of the run.
//!
//! | Step fails           | Effect                                         |
//! |----------------------|------------------------------------------------|
//! | collect              | outcome Failure, skip to notify                |
//! | transform            | outcome Failure, skip to notify                |
//! | quality check (data) | outcome PartialFailure                         |
//! | quality check (run)  | outcome Failure                                |
//! | notify               | delivery failure recorded, outcome unchanged   |

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use chrono::Utc;
use tracing::{info, info_span, warn};

use reviewflow_model::{
    ConfigError, DeliveryStatus, PipelineOptions, PipelineRun, PipelineState, RunOutcome,
    RunRecorder, StepName, StepResult,
};

use crate::collector::{CollectedBatch, Collector};
use crate::error::{QualityCheckFailure, StepError, TransformError};
use crate::notify::{
    FailureSummary, NotificationPayload, NotificationSink, RunCounts, StepSummary, TopEntry,
};
use crate::quality;
use crate::step::{StepPolicy, StepRun, run_step, step_work};
use crate::transform::{TransformEngine, TransformResult};

pub type SharedCollector = Arc<dyn Collector + Send + Sync>;
pub type SharedEngine = Arc<dyn TransformEngine + Send + Sync>;
pub type SharedSink = Arc<dyn NotificationSink + Send + Sync>;

/// Cancels a run between steps.
///
/// A step that is already running finishes (or times out) first. The flag is
/// cleared when the run it stopped is sealed.
#[derive(Debug, Clone, Default)]
pub struct AbortHandle(Arc<AtomicBool>);

impl AbortHandle {
    pub fn abort(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_aborted(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    fn reset(&self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// What the notification needs beyond the step records.
#[derive(Debug, Default)]
struct RunReport {
    counts: Option<RunCounts>,
    top: Vec<TopEntry>,
    failure: Option<FailureSummary>,
}

pub struct Orchestrator {
    options: PipelineOptions,
    collector: SharedCollector,
    engine: SharedEngine,
    sink: SharedSink,
    abort: AbortHandle,
    state: PipelineState,
}

impl Orchestrator {
    pub fn new(
        options: PipelineOptions,
        collector: SharedCollector,
        engine: SharedEngine,
        sink: SharedSink,
    ) -> Result<Self, ConfigError> {
        options.validate()?;
        Ok(Self {
            options,
            collector,
            engine,
            sink,
            abort: AbortHandle::default(),
            state: PipelineState::Idle,
        })
    }

    pub fn options(&self) -> &PipelineOptions {
        &self.options
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn abort_handle(&self) -> AbortHandle {
        self.abort.clone()
    }

    /// Execute one full run and return its sealed record.
    ///
    /// Exactly one notification is attempted per run, whatever the outcome.
    pub fn run(&mut self) -> PipelineRun {
        let mut recorder = RunRecorder::start();
        let span = info_span!("pipeline_run", run_id = %recorder.id(), city = %self.options.city);
        let _guard = span.enter();
        info!("pipeline run started");

        let mut report = RunReport::default();
        let outcome = self.execute(&mut recorder, &mut report);
        self.notify(&mut recorder, outcome, &report);

        self.state = PipelineState::Done(outcome);
        self.abort.reset();
        let run = recorder.seal(outcome);
        info!(
            outcome = %run.outcome(),
            steps = run.steps().len(),
            duration_ms = run.duration().as_millis(),
            "pipeline run finished"
        );
        run
    }

    fn execute(&mut self, recorder: &mut RunRecorder, report: &mut RunReport) -> RunOutcome {
        let Some(batch) = self.collect(recorder, report) else {
            return RunOutcome::Failure;
        };
        let Some(transformed) = self.transform(recorder, report, batch) else {
            return RunOutcome::Failure;
        };
        self.quality_check(recorder, report, &transformed)
    }

    fn collect(
        &mut self,
        recorder: &mut RunRecorder,
        report: &mut RunReport,
    ) -> Option<Arc<CollectedBatch>> {
        self.enter(StepName::Collect, recorder)?;
        let collector = Arc::clone(&self.collector);
        let city = self.options.city.clone();
        let max_results = self.options.max_results;
        let run = run_step(
            StepName::Collect,
            self.policy(StepName::Collect),
            step_work(move |_| Ok(collector.collect(&city, max_results)?)),
        );
        let batch = resolve(recorder, report, run)?;
        info!(
            restaurants = batch.restaurants.len(),
            reviews = batch.reviews.len(),
            "collected"
        );
        report.counts = Some(RunCounts {
            restaurants: batch.restaurants.len(),
            reviews: batch.reviews.len(),
            mart_rows: 0,
        });
        Some(Arc::new(batch))
    }

    fn transform(
        &mut self,
        recorder: &mut RunRecorder,
        report: &mut RunReport,
        batch: Arc<CollectedBatch>,
    ) -> Option<TransformResult> {
        self.enter(StepName::Transform, recorder)?;
        let engine = Arc::clone(&self.engine);
        let run = run_step(
            StepName::Transform,
            self.policy(StepName::Transform),
            step_work(move |token| {
                engine.load(&batch)?;
                // A timed-out attempt must not rebuild the mart.
                token.check()?;
                let result = engine.run_transforms()?;
                if !result.success {
                    return Err(TransformError::Unsuccessful(format!(
                        "models built: {}",
                        result.models_built.join(", ")
                    ))
                    .into());
                }
                Ok(result)
            }),
        );
        let result = resolve(recorder, report, run)?;
        if let Some(counts) = report.counts.as_mut() {
            counts.mart_rows = result.mart_rows;
        }
        Some(result)
    }

    fn quality_check(
        &mut self,
        recorder: &mut RunRecorder,
        report: &mut RunReport,
        transformed: &TransformResult,
    ) -> RunOutcome {
        if self.enter(StepName::QualityCheck, recorder).is_none() {
            return RunOutcome::Failure;
        }
        let engine = Arc::clone(&self.engine);
        let failing_tests = transformed.failing_test_names.clone();
        let top_n = self.options.top_n;
        let run = run_step(
            StepName::QualityCheck,
            self.policy(StepName::QualityCheck),
            step_work(move |_| {
                let mut failing_checks = failing_tests.clone();
                failing_checks.extend(quality::failing_names(&engine.audit()?));
                if !failing_checks.is_empty() {
                    return Err(QualityCheckFailure { failing_checks }.into());
                }
                let mart = engine.mart()?;
                Ok(mart
                    .iter()
                    .take(top_n)
                    .map(|row| TopEntry {
                        name: row.name().to_string(),
                        quality_score: row.quality_score,
                        tier: row.tier,
                    })
                    .collect::<Vec<_>>())
            }),
        );
        let data_failed = matches!(run.outcome, Err(StepError::QualityCheck(_)));
        match resolve(recorder, report, run) {
            Some(top) => {
                report.top = top;
                RunOutcome::Success
            }
            None if data_failed => RunOutcome::PartialFailure,
            None => RunOutcome::Failure,
        }
    }

    fn notify(&mut self, recorder: &mut RunRecorder, outcome: RunOutcome, report: &RunReport) {
        self.state = PipelineState::Notifying;
        let payload = Arc::new(build_payload(
            recorder,
            &self.options.city,
            outcome,
            report,
        ));
        let sink = Arc::clone(&self.sink);
        let run = run_step(
            StepName::Notify,
            self.policy(StepName::Notify),
            step_work(move |_| Ok(sink.notify(&payload)?)),
        );
        let delivery = match &run.outcome {
            Ok(()) => DeliveryStatus::Delivered,
            Err(err) => {
                warn!(error = %err, "notification not delivered");
                DeliveryStatus::Failed {
                    message: err.to_string(),
                }
            }
        };
        recorder.record(run.result);
        recorder.set_delivery(delivery);
    }

    /// Move into `step` unless the run was aborted. Returns `None` on abort.
    fn enter(&mut self, step: StepName, recorder: &mut RunRecorder) -> Option<()> {
        if self.abort.is_aborted() {
            warn!(before = step.as_str(), "run aborted");
            recorder.mark_aborted(step);
            return None;
        }
        self.state = step.state();
        Some(())
    }

    fn policy(&self, step: StepName) -> StepPolicy {
        StepPolicy {
            max_attempts: self.options.max_attempts,
            timeout: self.options.timeout_for(step),
        }
    }
}

/// Record the step and keep its failure for the notification.
fn resolve<T>(recorder: &mut RunRecorder, report: &mut RunReport, run: StepRun<T>) -> Option<T> {
    let StepRun { result, outcome } = run;
    if let Some(failure) = &result.failure {
        report.failure = Some(FailureSummary {
            step: result.step,
            kind: failure.kind,
            attempts: result.attempts,
            error: failure.message.clone(),
            failing_checks: failure.failing_checks.clone(),
        });
    }
    recorder.record(result);
    outcome.ok()
}

fn build_payload(
    recorder: &RunRecorder,
    city: &str,
    outcome: RunOutcome,
    report: &RunReport,
) -> NotificationPayload {
    let elapsed = (Utc::now() - recorder.started_at())
        .to_std()
        .unwrap_or_default();
    NotificationPayload {
        run_id: recorder.id(),
        city: city.to_string(),
        outcome,
        started_at: recorder.started_at(),
        duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
        steps: recorder.steps().iter().map(step_summary).collect(),
        counts: report.counts,
        top: if outcome == RunOutcome::Success {
            report.top.clone()
        } else {
            Vec::new()
        },
        failure: report.failure.clone(),
        aborted_before: recorder.aborted_before(),
    }
}

fn step_summary(result: &StepResult) -> StepSummary {
    StepSummary {
        step: result.step,
        status: result.status,
        attempts: result.attempts,
        duration_ms: u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
    }
}
