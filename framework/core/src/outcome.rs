use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::aggregator::AggregatedErrors;

/// Result reported for a finished test.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum TestResult {
    #[display("pass")]
    Pass,
    #[display("fail")]
    Fail,
}

/// Whether the test itself could be carried out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
#[serde(rename_all = "lowercase")]
pub enum TestStatus {
    #[display("succeeded")]
    Succeeded,
    #[display("errored")]
    Errored,
}

/// The part of the run that broke when the outcome is [`Verdict::Errored`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, derive_more::Display)]
pub enum InfraStage {
    /// The trigger did not describe a reachable deployment.
    #[display("trigger")]
    Trigger,
    /// The workload mapping could not be loaded.
    #[display("workload")]
    Workload,
    /// The scenario could not be fetched.
    #[display("fetch")]
    Fetch,
    /// The load generator failed.
    #[display("invoke")]
    Invoke,
    /// The result stream was unreadable.
    #[display("aggregate")]
    Aggregate,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Verdict {
    /// No scenario is configured for the strategy.
    Skipped,
    Passed,
    /// The system under test produced errors.
    Failed(AggregatedErrors),
    /// The test could not be carried out.
    Errored(InfraStage),
}

/// The terminal state of one triggered run.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    pub verdict: Verdict,
    /// The scenario that was selected, `None` when skipped or when the run failed before a
    /// scenario was selected.
    pub scenario: Option<String>,
    /// Set once the load generator was started.
    pub started_at: Option<DateTime<Utc>>,
    /// Set once the load generator finished successfully.
    pub ended_at: Option<DateTime<Utc>>,
    pub message: String,
}

impl RunOutcome {
    pub fn skipped(strategy: &str) -> Self {
        Self {
            verdict: Verdict::Skipped,
            scenario: None,
            started_at: None,
            ended_at: None,
            message: format!(
                "No test file configured for test strategy '{strategy}', skipping tests"
            ),
        }
    }

    pub fn passed(
        scenario: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        note: Option<&str>,
    ) -> Self {
        let mut message = format!("Artillery test [{scenario}] finished successfully");
        if let Some(note) = note {
            message.push_str(&format!(" ({note})"));
        }

        Self {
            verdict: Verdict::Passed,
            scenario: Some(scenario.to_string()),
            started_at: Some(started_at),
            ended_at: Some(ended_at),
            message,
        }
    }

    pub fn failed(
        scenario: &str,
        started_at: DateTime<Utc>,
        ended_at: DateTime<Utc>,
        errors: AggregatedErrors,
    ) -> Self {
        Self {
            message: format!("Artillery test [{scenario}] failed: {errors}"),
            verdict: Verdict::Failed(errors),
            scenario: Some(scenario.to_string()),
            started_at: Some(started_at),
            ended_at: Some(ended_at),
        }
    }

    /// An infrastructure failure at `stage`.
    ///
    /// Use [`RunOutcome::with_timing`] to record how far the run got.
    pub fn errored(stage: InfraStage, scenario: Option<&str>, message: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Errored(stage),
            scenario: scenario.map(str::to_string),
            started_at: None,
            ended_at: None,
            message: message.into(),
        }
    }

    pub fn with_timing(
        mut self,
        started_at: Option<DateTime<Utc>>,
        ended_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.started_at = started_at;
        self.ended_at = ended_at;
        self
    }

    pub fn result(&self) -> TestResult {
        match self.verdict {
            Verdict::Skipped | Verdict::Passed => TestResult::Pass,
            Verdict::Failed(_) | Verdict::Errored(_) => TestResult::Fail,
        }
    }

    /// A failed test still succeeded as far as the tooling is concerned, only infrastructure
    /// problems are reported as errored.
    pub fn status(&self) -> TestStatus {
        match self.verdict {
            Verdict::Errored(_) => TestStatus::Errored,
            _ => TestStatus::Succeeded,
        }
    }

    pub fn scenario_label(&self) -> &str {
        self.scenario.as_deref().unwrap_or("none")
    }

    pub fn is_skipped(&self) -> bool {
        self.verdict == Verdict::Skipped
    }
}
