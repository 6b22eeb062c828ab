//! Selects an artillery scenario for a test strategy, runs it through a [`LoadGenerator`] and
//! turns the resulting statistics stream into a pass/fail verdict.
//!
//! [`LoadGenerator`]: prelude::LoadGenerator

mod aggregator;
mod event;
mod handler;
mod orchestrator;
mod outcome;
mod workload;

pub mod prelude {
    pub use crate::aggregator::{
        AggregateError, AggregateReport, AggregatedErrors, DecodeError, ResultRecord,
        ScenarioResultAggregator,
    };
    pub use crate::event::{
        DeploymentDetails, TestDetails, TestFinishedEvent, TestStartedEvent, TestTiming,
        TestTriggeredData, TestTriggeredEvent, TriggerError, TEST_FINISHED_EVENT_TYPE,
        TEST_STARTED_EVENT_TYPE, TEST_TRIGGERED_EVENT_TYPE,
    };
    pub use crate::handler::{HandlerError, Notifier, NotifyError, TestTriggeredHandler};
    pub use crate::orchestrator::{
        GeneratorError, LoadGenerator, ResourceStore, RunOrchestrator, StoreError,
    };
    pub use crate::outcome::{InfraStage, RunOutcome, TestResult, TestStatus, Verdict};
    pub use crate::workload::{
        resolve, ScenarioSelection, WorkloadError, WorkloadMapping, WorkloadRule,
        DEFAULT_SCENARIO_RESOURCE, WORKLOAD_MAPPING_RESOURCE,
    };
}
