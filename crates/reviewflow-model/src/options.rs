//! Options consumed by the orchestrator.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};
use crate::run::StepName;

/// Default city searched when none is configured.
pub const DEFAULT_CITY: &str = "Paris";

/// Per-step time budgets, in seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StepTimeouts {
    pub collect_secs: u64,
    pub transform_secs: u64,
    pub quality_check_secs: u64,
    pub notify_secs: u64,
}

impl Default for StepTimeouts {
    fn default() -> Self {
        Self {
            collect_secs: 1800,
            transform_secs: 600,
            quality_check_secs: 300,
            notify_secs: 60,
        }
    }
}

impl StepTimeouts {
    /// Same budget for every step.
    pub fn uniform(timeout: Duration) -> Self {
        let secs = timeout.as_secs();
        Self {
            collect_secs: secs,
            transform_secs: secs,
            quality_check_secs: secs,
            notify_secs: secs,
        }
    }

    pub fn for_step(&self, step: StepName) -> Duration {
        let secs = match step {
            StepName::Collect => self.collect_secs,
            StepName::Transform => self.transform_secs,
            StepName::QualityCheck => self.quality_check_secs,
            StepName::Notify => self.notify_secs,
        };
        Duration::from_secs(secs)
    }
}

/// Options controlling one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineOptions {
    /// City passed to the collector.
    pub city: String,
    /// Upper bound on restaurants the collector returns.
    pub max_results: usize,
    /// Total attempts per step, first attempt included.
    pub max_attempts: u32,
    /// Number of restaurants listed in a success notification.
    pub top_n: usize,
    pub timeouts: StepTimeouts,
    /// Sub-second override of every step timeout; used by tests.
    #[serde(skip)]
    pub timeout_override: Option<Duration>,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            city: DEFAULT_CITY.to_string(),
            max_results: 60,
            max_attempts: 3,
            top_n: 5,
            timeouts: StepTimeouts::default(),
            timeout_override: None,
        }
    }
}

impl PipelineOptions {
    pub fn with_city(mut self, city: impl Into<String>) -> Self {
        self.city = city.into();
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    pub fn with_max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = max_attempts;
        self
    }

    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    pub fn with_step_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_override = Some(timeout);
        self
    }

    /// Time budget of a single attempt of `step`.
    pub fn timeout_for(&self, step: StepName) -> Duration {
        self.timeout_override
            .unwrap_or_else(|| self.timeouts.for_step(step))
    }

    /// Reject options the orchestrator cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.city.trim().is_empty() {
            return Err(ConfigError::BlankCity);
        }
        if self.max_results == 0 {
            return Err(ConfigError::ZeroValue {
                field: "max_results",
            });
        }
        if self.max_attempts == 0 {
            return Err(ConfigError::ZeroValue {
                field: "max_attempts",
            });
        }
        if self.top_n == 0 {
            return Err(ConfigError::ZeroValue { field: "top_n" });
        }
        if self.timeout_override.is_none() {
            for step in StepName::ALL {
                if self.timeouts.for_step(step).is_zero() {
                    return Err(ConfigError::ZeroTimeout {
                        step: step.as_str(),
                    });
                }
            }
        } else if self.timeout_override.is_some_and(|timeout| timeout.is_zero()) {
            return Err(ConfigError::ZeroTimeout { step: "all" });
        }
        Ok(())
    }
}
