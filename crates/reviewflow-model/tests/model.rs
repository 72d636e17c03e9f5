//! Tests for reviewflow-model types.

use std::time::Duration;

use reviewflow_model::{
    ConfigError, DeliveryStatus, FailureKind, PipelineOptions, RunOutcome, RunRecorder,
    StepFailure, StepName, StepResult, StepStatus, StepTimeouts,
};

#[test]
fn default_options_are_valid() {
    let options = PipelineOptions::default();
    assert_eq!(options.max_attempts, 3);
    assert_eq!(options.top_n, 5);
    assert_eq!(options.city, "Paris");
    assert!(options.validate().is_ok());
}

#[test]
fn options_reject_zero_attempts_and_blank_city() {
    let options = PipelineOptions::default().with_max_attempts(0);
    assert_eq!(
        options.validate(),
        Err(ConfigError::ZeroValue {
            field: "max_attempts"
        })
    );

    let options = PipelineOptions::default().with_city("   ");
    assert_eq!(options.validate(), Err(ConfigError::BlankCity));
}

#[test]
fn options_reject_zero_step_timeout() {
    let options = PipelineOptions {
        timeouts: StepTimeouts {
            transform_secs: 0,
            ..StepTimeouts::default()
        },
        ..PipelineOptions::default()
    };
    assert_eq!(
        options.validate(),
        Err(ConfigError::ZeroTimeout { step: "transform" })
    );
}

#[test]
fn timeout_override_applies_to_every_step() {
    let options = PipelineOptions::default().with_step_timeout(Duration::from_millis(250));
    for step in StepName::ALL {
        assert_eq!(options.timeout_for(step), Duration::from_millis(250));
    }
    let defaults = PipelineOptions::default();
    assert_eq!(
        defaults.timeout_for(StepName::Collect),
        Duration::from_secs(1800)
    );
}

#[test]
fn options_deserialize_with_partial_fields() {
    let json = r#"{"city":"Lyon","timeouts":{"collect_secs":30}}"#;
    let options: PipelineOptions = serde_json::from_str(json).expect("deserialize options");
    assert_eq!(options.city, "Lyon");
    assert_eq!(options.max_attempts, 3);
    assert_eq!(options.timeouts.collect_secs, 30);
    assert_eq!(options.timeouts.notify_secs, 60);
}

#[test]
fn recorder_seals_steps_in_order() {
    let mut recorder = RunRecorder::start();
    let id = recorder.id();
    recorder.record(StepResult::succeeded(
        StepName::Collect,
        1,
        Duration::from_millis(12),
    ));
    recorder.record(StepResult {
        step: StepName::Transform,
        attempts: 3,
        status: StepStatus::TimedOut,
        failure: Some(StepFailure::new(FailureKind::Transform, "timed out")),
        duration: Duration::from_secs(1),
    });
    recorder.set_delivery(DeliveryStatus::Delivered);

    let run = recorder.seal(RunOutcome::Failure);
    assert_eq!(run.id(), id);
    assert_eq!(run.outcome(), RunOutcome::Failure);
    let names: Vec<StepName> = run.steps().iter().map(|step| step.step).collect();
    assert_eq!(names, vec![StepName::Collect, StepName::Transform]);
    assert_eq!(run.step(StepName::Transform).map(|s| s.attempts), Some(3));
    assert!(run.step(StepName::Notify).is_none());
    assert!(run.finished_at() >= run.started_at());
    assert_eq!(run.delivery(), &DeliveryStatus::Delivered);
}

#[test]
fn sealed_run_serializes() {
    let mut recorder = RunRecorder::start();
    recorder.mark_aborted(StepName::Transform);
    let run = recorder.seal(RunOutcome::Failure);
    let json = serde_json::to_value(&run).expect("serialize run");
    assert_eq!(json["outcome"], "failure");
    assert_eq!(json["aborted_before"], "transform");
    assert_eq!(json["delivery"]["status"], "not_attempted");
}

#[test]
fn distinct_recorders_get_distinct_ids() {
    assert_ne!(RunRecorder::start().id(), RunRecorder::start().id());
}
