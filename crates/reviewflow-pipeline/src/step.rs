//! Bounded, retried execution of one pipeline step.
//!
//! Each attempt runs on its own worker thread and the caller waits on a
//! channel with the step timeout. When the deadline passes, the attempt is
//! recorded as timed out, its [`CancelToken`] is set, and the caller joins the
//! worker before retrying or returning. Attempts never overlap, and nothing a
//! step does can land after the step resolved. Work that ignores its token
//! delays the retry until it returns.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, error, info_span, warn};

use reviewflow_model::{StepFailure, StepName, StepResult, StepStatus};

use crate::error::StepError;

/// Set once an attempt has missed its deadline. Work should stop before
/// making further changes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// `Err(StepError::Cancelled)` once cancelled.
    pub fn check(&self) -> Result<(), StepError> {
        if self.is_cancelled() {
            Err(StepError::Cancelled)
        } else {
            Ok(())
        }
    }

    fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

/// Work executed by one attempt.
pub type StepWork<T> = Arc<dyn Fn(&CancelToken) -> Result<T, StepError> + Send + Sync>;

/// Box a closure as [`StepWork`].
pub fn step_work<T, F>(work: F) -> StepWork<T>
where
    F: Fn(&CancelToken) -> Result<T, StepError> + Send + Sync + 'static,
{
    Arc::new(work)
}

/// Retry and timeout policy applied to a step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepPolicy {
    pub max_attempts: u32,
    pub timeout: Duration,
}

/// Resolved step: the record for the run plus the value or final error.
#[derive(Debug)]
pub struct StepRun<T> {
    pub result: StepResult,
    pub outcome: Result<T, StepError>,
}

/// Run `work` until it succeeds, fails with a non-retryable error, or the
/// attempt ceiling is reached.
pub fn run_step<T: Send + 'static>(
    step: StepName,
    policy: StepPolicy,
    work: StepWork<T>,
) -> StepRun<T> {
    let span = info_span!("step", step = step.as_str());
    let _guard = span.enter();
    let start = Instant::now();
    let max_attempts = policy.max_attempts.max(1);

    let mut attempt = 0u32;
    loop {
        attempt += 1;
        let attempt_start = Instant::now();
        match run_attempt(step, policy.timeout, Arc::clone(&work)) {
            Ok(value) => {
                debug!(
                    attempt,
                    duration_ms = attempt_start.elapsed().as_millis(),
                    "step succeeded"
                );
                return StepRun {
                    result: StepResult::succeeded(step, attempt, start.elapsed()),
                    outcome: Ok(value),
                };
            }
            Err(err) if err.is_retryable() && attempt < max_attempts => {
                warn!(
                    attempt,
                    max_attempts,
                    error = %err,
                    duration_ms = attempt_start.elapsed().as_millis(),
                    "step attempt failed, retrying"
                );
            }
            Err(err) => {
                error!(attempt, error = %err, "step failed");
                let status = if matches!(err, StepError::TimedOut(_)) {
                    StepStatus::TimedOut
                } else {
                    StepStatus::Failed
                };
                let failure = StepFailure {
                    kind: err.kind(step),
                    message: err.to_string(),
                    failing_checks: err.failing_checks().to_vec(),
                };
                return StepRun {
                    result: StepResult {
                        step,
                        attempts: attempt,
                        status,
                        failure: Some(failure),
                        duration: start.elapsed(),
                    },
                    outcome: Err(err),
                };
            }
        }
    }
}

fn run_attempt<T: Send + 'static>(
    step: StepName,
    timeout: Duration,
    work: StepWork<T>,
) -> Result<T, StepError> {
    let (sender, receiver) = mpsc::channel();
    let token = CancelToken::default();
    let worker_token = token.clone();
    let worker = thread::Builder::new()
        .name(format!("reviewflow-{}", step.as_str()))
        .spawn(move || {
            // Ignored after a timeout: the result is no longer wanted.
            let _ = sender.send(work(&worker_token));
        })
        .map_err(|e| StepError::Spawn(e.to_string()))?;

    let outcome = match receiver.recv_timeout(timeout) {
        Ok(result) => result,
        Err(RecvTimeoutError::Timeout) => {
            token.cancel();
            let waited = Instant::now();
            warn!(
                timeout_ms = timeout.as_millis(),
                "attempt timed out, waiting for worker to stop"
            );
            let _ = worker.join();
            debug!(
                waited_ms = waited.elapsed().as_millis(),
                "timed-out worker stopped"
            );
            return Err(StepError::TimedOut(timeout));
        }
        // The sender was dropped without sending: the worker panicked.
        Err(RecvTimeoutError::Disconnected) => Err(StepError::Panicked),
    };
    // Panics were already reported through the closed channel.
    let _ = worker.join();
    outcome
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use reviewflow_model::FailureKind;

    use crate::error::{AdapterError, QualityCheckFailure};

    fn policy(max_attempts: u32, timeout_ms: u64) -> StepPolicy {
        StepPolicy {
            max_attempts,
            timeout: Duration::from_millis(timeout_ms),
        }
    }

    #[test]
    fn succeeds_after_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let work = step_work(move |_| {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            if call < 3 {
                Err(AdapterError::Network("reset".to_string()).into())
            } else {
                Ok(call)
            }
        });

        let run = run_step(StepName::Collect, policy(3, 1_000), work);

        assert_eq!(run.outcome.unwrap(), 3);
        assert_eq!(run.result.attempts, 3);
        assert!(run.result.is_success());
    }

    #[test]
    fn exhausted_retries_keep_last_error() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let work: StepWork<()> = step_work(move |_| {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            Err(AdapterError::Network(format!("failure {call}")).into())
        });

        let run = run_step(StepName::Collect, policy(3, 1_000), work);

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(run.result.status, StepStatus::Failed);
        let failure = run.result.failure.unwrap();
        assert_eq!(failure.kind, FailureKind::Adapter);
        assert_eq!(failure.message, "network error: failure 3");
    }

    #[test]
    fn timeout_is_recorded_as_timed_out() {
        let work = step_work(|_: &CancelToken| {
            thread::sleep(Duration::from_millis(200));
            Ok(())
        });

        let run = run_step(StepName::Transform, policy(2, 20), work);

        assert_eq!(run.result.status, StepStatus::TimedOut);
        assert_eq!(run.result.attempts, 2);
        assert!(matches!(run.outcome, Err(StepError::TimedOut(_))));
    }

    #[test]
    fn quality_failures_stop_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let work: StepWork<()> = step_work(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(QualityCheckFailure {
                failing_checks: vec!["mart_not_empty".to_string()],
            }
            .into())
        });

        let run = run_step(StepName::QualityCheck, policy(3, 1_000), work);

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(
            run.result.failure.unwrap().failing_checks,
            vec!["mart_not_empty".to_string()]
        );
    }

    #[test]
    fn panics_are_failures() {
        let work = step_work(|_: &CancelToken| -> Result<(), StepError> { panic!("boom") });

        let run = run_step(StepName::Notify, policy(1, 1_000), work);

        assert!(matches!(run.outcome, Err(StepError::Panicked)));
        assert_eq!(
            run.result.failure.unwrap().kind,
            FailureKind::NotificationDelivery
        );
    }

    #[test]
    fn timed_out_attempts_do_not_overlap() {
        let running = Arc::new(AtomicU32::new(0));
        let max_seen = Arc::new(AtomicU32::new(0));
        let (active, peak) = (Arc::clone(&running), Arc::clone(&max_seen));
        let work: StepWork<()> = step_work(move |_| {
            let now = active.fetch_add(1, Ordering::SeqCst) + 1;
            peak.fetch_max(now, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(150));
            active.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        });

        let run = run_step(StepName::Collect, policy(3, 20), work);

        assert_eq!(run.result.attempts, 3);
        assert_eq!(run.result.status, StepStatus::TimedOut);
        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert_eq!(running.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn late_worker_sees_cancellation() {
        let observed = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&observed);
        let work: StepWork<()> = step_work(move |token| {
            thread::sleep(Duration::from_millis(100));
            flag.store(token.is_cancelled(), Ordering::SeqCst);
            token.check()
        });

        let run = run_step(StepName::Transform, policy(1, 10), work);

        assert!(matches!(run.outcome, Err(StepError::TimedOut(_))));
        // The step resolves only after the worker returned.
        assert!(observed.load(Ordering::SeqCst));
    }
}
