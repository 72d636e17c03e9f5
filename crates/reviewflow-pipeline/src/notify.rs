//! Run notifications and the sinks that deliver them.

use std::collections::HashSet;
use std::fmt::Write as _;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::blocking::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use reviewflow_model::{FailureKind, QualityTier, RunOutcome, StepName, StepStatus};

use crate::error::DeliveryError;

const WEBHOOK_TIMEOUT: Duration = Duration::from_secs(30);

/// One line of the step table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepSummary {
    pub step: StepName,
    pub status: StepStatus,
    pub attempts: u32,
    pub duration_ms: u64,
}

/// Row counts reported on a run that got past the transform step.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunCounts {
    pub restaurants: usize,
    pub reviews: usize,
    pub mart_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopEntry {
    pub name: String,
    pub quality_score: f64,
    pub tier: QualityTier,
}

/// Why the run did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FailureSummary {
    pub step: StepName,
    pub kind: FailureKind,
    pub attempts: u32,
    pub error: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub failing_checks: Vec<String>,
}

/// Everything a sink needs to tell an operator how a run went.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NotificationPayload {
    pub run_id: Uuid,
    pub city: String,
    pub outcome: RunOutcome,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub steps: Vec<StepSummary>,
    pub counts: Option<RunCounts>,
    pub top: Vec<TopEntry>,
    pub failure: Option<FailureSummary>,
    pub aborted_before: Option<StepName>,
}

impl NotificationPayload {
    pub fn subject(&self) -> String {
        format!(
            "[ReviewFlow] {} - {} ({})",
            self.outcome,
            self.city,
            short_id(self.run_id)
        )
    }

    /// Plain text body, used by every text-based sink.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "{}", self.subject());
        let _ = writeln!(
            out,
            "Duration: {:.1}s",
            Duration::from_millis(self.duration_ms).as_secs_f64()
        );

        if let Some(before) = self.aborted_before {
            let _ = writeln!(out, "Aborted before step: {before}");
        }

        let _ = writeln!(out, "Steps:");
        for step in &self.steps {
            let _ = writeln!(
                out,
                "  {:<14} {:<10} attempts={} {}ms",
                step.step.as_str(),
                step.status.as_str(),
                step.attempts,
                step.duration_ms
            );
        }

        if let Some(counts) = &self.counts {
            let _ = writeln!(
                out,
                "Collected: {} restaurants, {} reviews; mart rows: {}",
                counts.restaurants, counts.reviews, counts.mart_rows
            );
        }

        if let Some(failure) = &self.failure {
            let _ = writeln!(
                out,
                "Failing step: {} ({}) after {} attempt(s)",
                failure.step, failure.kind, failure.attempts
            );
            let _ = writeln!(out, "Last error: {}", failure.error);
            if !failure.failing_checks.is_empty() {
                let _ = writeln!(out, "Failing checks:");
                for check in &failure.failing_checks {
                    let _ = writeln!(out, "  - {check}");
                }
            }
        }

        if !self.top.is_empty() {
            let _ = writeln!(out, "Top {}:", self.top.len());
            for (rank, entry) in self.top.iter().enumerate() {
                let _ = writeln!(
                    out,
                    "  {}. {} - {:.1} ({})",
                    rank + 1,
                    entry.name,
                    entry.quality_score,
                    entry.tier
                );
            }
        }
        out
    }
}

fn short_id(id: Uuid) -> String {
    id.simple().to_string().chars().take(8).collect()
}

/// Destination for run notifications.
pub trait NotificationSink {
    /// Label used in logs and fan-out error messages.
    fn name(&self) -> &str;

    fn notify(&self, payload: &NotificationPayload) -> Result<(), DeliveryError>;
}

/// Writes the notification to the log.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

impl NotificationSink for LogSink {
    fn name(&self) -> &str {
        "log"
    }

    fn notify(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        match payload.outcome {
            RunOutcome::Success => info!(subject = %payload.subject(), "{}", payload.render_text()),
            _ => warn!(subject = %payload.subject(), "{}", payload.render_text()),
        }
        Ok(())
    }
}

/// Writes one `run-<id>.txt` file per run into a directory.
#[derive(Debug, Clone)]
pub struct FileSink {
    dir: PathBuf,
}

impl FileSink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn path_for(&self, run_id: Uuid) -> PathBuf {
        self.dir.join(format!("run-{}.txt", run_id.simple()))
    }
}

impl NotificationSink for FileSink {
    fn name(&self) -> &str {
        "file"
    }

    fn notify(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let io_error = |path: &PathBuf, e: std::io::Error| DeliveryError::Io {
            path: path.clone(),
            message: e.to_string(),
        };
        std::fs::create_dir_all(&self.dir).map_err(|e| io_error(&self.dir, e))?;
        let path = self.path_for(payload.run_id);
        std::fs::write(&path, payload.render_text()).map_err(|e| io_error(&path, e))?;
        info!(path = %path.display(), "notification written");
        Ok(())
    }
}

/// Posts `{"text": ...}` to a chat webhook.
pub struct WebhookSink {
    client: Client,
    url: String,
}

impl WebhookSink {
    pub fn new(url: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = Client::builder().timeout(WEBHOOK_TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl NotificationSink for WebhookSink {
    fn name(&self) -> &str {
        "webhook"
    }

    fn notify(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        let body = json!({ "text": payload.render_text() });
        let response = self.client.post(&self.url).json(&body).send()?;
        if !response.status().is_success() {
            return Err(DeliveryError::Http(response.status().as_u16()));
        }
        info!(status = response.status().as_u16(), "webhook delivered");
        Ok(())
    }
}

/// Delivers to every inner sink. Fails when any of them fails, after all
/// were attempted.
///
/// Sinks that already accepted a run's payload are skipped when the same run
/// is notified again, so a retried delivery only reaches the sinks that
/// failed.
#[derive(Default)]
pub struct FanOutSink {
    sinks: Vec<Box<dyn NotificationSink + Send + Sync>>,
    delivered: Mutex<Delivered>,
}

/// Indices of the sinks that accepted the payload of `run_id`.
#[derive(Debug, Default)]
struct Delivered {
    run_id: Option<Uuid>,
    sinks: HashSet<usize>,
}

impl FanOutSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: impl NotificationSink + Send + Sync + 'static) -> Self {
        self.sinks.push(Box::new(sink));
        self
    }

    pub fn len(&self) -> usize {
        self.sinks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sinks.is_empty()
    }
}

impl NotificationSink for FanOutSink {
    fn name(&self) -> &str {
        "fan-out"
    }

    fn notify(&self, payload: &NotificationPayload) -> Result<(), DeliveryError> {
        // Held for the whole delivery: one payload goes out at a time.
        let mut delivered = self
            .delivered
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if delivered.run_id != Some(payload.run_id) {
            delivered.run_id = Some(payload.run_id);
            delivered.sinks.clear();
        }

        let mut messages = Vec::new();
        for (index, sink) in self.sinks.iter().enumerate() {
            if delivered.sinks.contains(&index) {
                debug!(sink = sink.name(), "already delivered, skipping");
                continue;
            }
            match sink.notify(payload) {
                Ok(()) => {
                    delivered.sinks.insert(index);
                }
                Err(e) => messages.push(format!("{}: {e}", sink.name())),
            }
        }
        if messages.is_empty() {
            Ok(())
        } else {
            Err(DeliveryError::Partial {
                failed: messages.len(),
                total: self.sinks.len(),
                messages,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tempfile::TempDir;

    fn started_at() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    fn step(step: StepName, status: StepStatus, attempts: u32, duration_ms: u64) -> StepSummary {
        StepSummary {
            step,
            status,
            attempts,
            duration_ms,
        }
    }

    fn success_payload() -> NotificationPayload {
        NotificationPayload {
            run_id: Uuid::from_u128(0x1234_5678_9abc_def0_1234_5678_9abc_def0),
            city: "Paris".to_string(),
            outcome: RunOutcome::Success,
            started_at: started_at(),
            duration_ms: 12_340,
            steps: vec![
                step(StepName::Collect, StepStatus::Success, 1, 9_000),
                step(StepName::Transform, StepStatus::Success, 2, 3_000),
                step(StepName::QualityCheck, StepStatus::Success, 1, 340),
            ],
            counts: Some(RunCounts {
                restaurants: 20,
                reviews: 97,
                mart_rows: 20,
            }),
            top: vec![
                TopEntry {
                    name: "Le Comptoir".to_string(),
                    quality_score: 94.0,
                    tier: QualityTier::Premium,
                },
                TopEntry {
                    name: "Chez Paul".to_string(),
                    quality_score: 72.5,
                    tier: QualityTier::VeryGood,
                },
            ],
            failure: None,
            aborted_before: None,
        }
    }

    fn partial_payload() -> NotificationPayload {
        NotificationPayload {
            outcome: RunOutcome::PartialFailure,
            top: Vec::new(),
            failure: Some(FailureSummary {
                step: StepName::QualityCheck,
                kind: FailureKind::QualityCheck,
                attempts: 1,
                error: "2 data check(s) failed: unique_stg_restaurants_place_id, mart_not_empty"
                    .to_string(),
                failing_checks: vec![
                    "unique_stg_restaurants_place_id".to_string(),
                    "mart_not_empty".to_string(),
                ],
            }),
            ..success_payload()
        }
    }

    #[test]
    fn success_text() {
        insta::assert_snapshot!(success_payload().render_text(), @r"
        [ReviewFlow] SUCCESS - Paris (12345678)
        Duration: 12.3s
        Steps:
          collect        success    attempts=1 9000ms
          transform      success    attempts=2 3000ms
          quality_check  success    attempts=1 340ms
        Collected: 20 restaurants, 97 reviews; mart rows: 20
        Top 2:
          1. Le Comptoir - 94.0 (Premium)
          2. Chez Paul - 72.5 (Very Good)
        ");
    }

    #[test]
    fn partial_failure_text() {
        insta::assert_snapshot!(partial_payload().render_text(), @r"
        [ReviewFlow] PARTIAL_FAILURE - Paris (12345678)
        Duration: 12.3s
        Steps:
          collect        success    attempts=1 9000ms
          transform      success    attempts=2 3000ms
          quality_check  success    attempts=1 340ms
        Collected: 20 restaurants, 97 reviews; mart rows: 20
        Failing step: quality_check (quality_check) after 1 attempt(s)
        Last error: 2 data check(s) failed: unique_stg_restaurants_place_id, mart_not_empty
        Failing checks:
          - unique_stg_restaurants_place_id
          - mart_not_empty
        ");
    }

    #[test]
    fn file_sink_writes_one_file_per_run() {
        let dir = TempDir::new().unwrap();
        let sink = FileSink::new(dir.path().join("notifications"));
        let payload = success_payload();

        sink.notify(&payload).unwrap();

        let written = std::fs::read_to_string(sink.path_for(payload.run_id)).unwrap();
        assert_eq!(written, payload.render_text());
    }

    struct Failing;

    impl NotificationSink for Failing {
        fn name(&self) -> &str {
            "failing"
        }

        fn notify(&self, _payload: &NotificationPayload) -> Result<(), DeliveryError> {
            Err(DeliveryError::Http(503))
        }
    }

    #[test]
    fn fan_out_attempts_every_sink() {
        let dir = TempDir::new().unwrap();
        let file = FileSink::new(dir.path());
        let sink = FanOutSink::new().with(Failing).with(file.clone()).with(LogSink);
        let payload = success_payload();

        let err = sink.notify(&payload).unwrap_err();

        assert_eq!(err.to_string(), "1 of 3 sinks failed: failing: webhook returned HTTP 503");
        assert!(file.path_for(payload.run_id).exists());
    }

    struct Counting(Arc<AtomicU32>);

    impl NotificationSink for Counting {
        fn name(&self) -> &str {
            "counting"
        }

        fn notify(&self, _payload: &NotificationPayload) -> Result<(), DeliveryError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[test]
    fn fan_out_retries_only_failed_sinks() {
        let calls = Arc::new(AtomicU32::new(0));
        let sink = FanOutSink::new()
            .with(Counting(Arc::clone(&calls)))
            .with(Failing);
        let payload = success_payload();

        for _ in 0..3 {
            let err = sink.notify(&payload).unwrap_err();
            assert_eq!(err.to_string(), "1 of 2 sinks failed: failing: webhook returned HTTP 503");
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let mut next_run = success_payload();
        next_run.run_id = Uuid::new_v4();
        sink.notify(&next_run).unwrap_err();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }
}
