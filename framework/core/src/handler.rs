use crate::event::{TestFinishedEvent, TestStartedEvent, TestTriggeredEvent};
use crate::orchestrator::{LoadGenerator, ResourceStore, RunOrchestrator, StoreError};
use crate::outcome::{InfraStage, RunOutcome};
use crate::workload::{
    WorkloadError, WorkloadMapping, DEFAULT_SCENARIO_RESOURCE, WORKLOAD_MAPPING_RESOURCE,
};

/// Announces the lifecycle of a test run.
pub trait Notifier: Send + Sync {
    fn started(&self, event: &TestStartedEvent) -> Result<(), NotifyError>;

    fn finished(&self, event: &TestFinishedEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
#[error("failed to send {event_type} event: {reason}")]
pub struct NotifyError {
    event_type: String,
    reason: String,
}

impl NotifyError {
    pub fn new(event_type: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            event_type: event_type.into(),
            reason: reason.to_string(),
        }
    }
}

/// The trigger could not be handled to the point of reporting a verdict.
#[derive(Debug, thiserror::Error)]
pub enum HandlerError {
    #[error("Failed to send task started event, aborting: {0}")]
    Started(#[source] NotifyError),
    #[error("Failed to send task finished event: {source}")]
    Finished {
        source: NotifyError,
        outcome: Box<RunOutcome>,
    },
}

/// The workload mapping exists for the service but cannot be used.
#[derive(Debug, thiserror::Error)]
enum MappingError {
    #[error("error when trying to load {resource} file for service {service} on stage {stage} or project-level {project}: {source}")]
    Store {
        resource: String,
        project: String,
        stage: String,
        service: String,
        source: StoreError,
    },
    #[error("Couldn't parse {resource} file found for service {service} in stage {stage} in project {project}: {source}")]
    Malformed {
        resource: String,
        project: String,
        stage: String,
        service: String,
        source: WorkloadError,
    },
}

/// Handles `test.triggered` events: announces the run, loads the workload mapping, runs the test
/// and reports the verdict.
///
/// Each handled event produces exactly one started and one finished notification, unless sending
/// the started notification fails, in which case nothing else happens.
pub struct TestTriggeredHandler<G, N> {
    service_name: String,
    generator: G,
    notifier: N,
    mapping_resource: String,
    default_scenario: String,
}

impl<G, N> TestTriggeredHandler<G, N>
where
    G: LoadGenerator,
    N: Notifier,
{
    /// `service_name` is used as the source of every notification.
    pub fn new(service_name: impl Into<String>, generator: G, notifier: N) -> Self {
        Self {
            service_name: service_name.into(),
            generator,
            notifier,
            mapping_resource: WORKLOAD_MAPPING_RESOURCE.to_string(),
            default_scenario: DEFAULT_SCENARIO_RESOURCE.to_string(),
        }
    }

    pub fn with_mapping_resource(mut self, mapping_resource: impl Into<String>) -> Self {
        self.mapping_resource = mapping_resource.into();
        self
    }

    pub fn with_default_scenario(mut self, default_scenario: impl Into<String>) -> Self {
        self.default_scenario = default_scenario.into();
        self
    }

    pub fn service_name(&self) -> &str {
        &self.service_name
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Handle a single trigger, reading scenarios and the workload mapping from `store`.
    pub fn handle<S>(
        &self,
        event: &TestTriggeredEvent,
        store: &S,
    ) -> Result<RunOutcome, HandlerError>
    where
        S: ResourceStore + ?Sized,
    {
        log::info!("Handling {} event: {}", event.event_type, event.id);

        self.notifier
            .started(&TestStartedEvent::new(&self.service_name, event))
            .map_err(HandlerError::Started)?;

        let outcome = self.run(event, store);
        log::info!(
            "Test run for {} finished: result={}, status={}, scenario={}",
            event.id,
            outcome.result(),
            outcome.status(),
            outcome.scenario_label()
        );

        let finished = TestFinishedEvent::new(&self.service_name, event, &outcome);
        match self.notifier.finished(&finished) {
            Ok(()) => Ok(outcome),
            Err(source) => Err(HandlerError::Finished {
                source,
                outcome: Box::new(outcome),
            }),
        }
    }

    fn run<S>(&self, event: &TestTriggeredEvent, store: &S) -> RunOutcome
    where
        S: ResourceStore + ?Sized,
    {
        let data = &event.data;

        let service_url = match data.service_url() {
            Ok(url) => url,
            Err(e) => {
                log::error!("{e}");
                return RunOutcome::errored(InfraStage::Trigger, None, e.to_string());
            }
        };

        let mapping = match self.load_mapping(event, store) {
            Ok(mapping) => mapping,
            Err(e) => {
                log::error!("{e}");
                return RunOutcome::errored(InfraStage::Workload, None, e.to_string());
            }
        };

        RunOrchestrator::new(store, &self.generator)
            .with_default_scenario(self.default_scenario.as_str())
            .run(&data.test.test_strategy, &service_url, mapping.as_ref())
    }

    /// Load the workload mapping for the service. A missing mapping is not an error.
    fn load_mapping<S>(
        &self,
        event: &TestTriggeredEvent,
        store: &S,
    ) -> Result<Option<WorkloadMapping>, MappingError>
    where
        S: ResourceStore + ?Sized,
    {
        let data = &event.data;
        log::debug!(
            "Loading {} for {}.{}.{}",
            self.mapping_resource,
            data.project,
            data.stage,
            data.service
        );

        let content = match store.get_resource(&self.mapping_resource) {
            Ok(Some(content)) if !content.trim().is_empty() => content,
            Ok(_) => {
                log::info!("No {} found", self.mapping_resource);
                return Ok(None);
            }
            Err(source) => {
                return Err(MappingError::Store {
                    resource: self.mapping_resource.clone(),
                    project: data.project.clone(),
                    stage: data.stage.clone(),
                    service: data.service.clone(),
                    source,
                });
            }
        };

        let mapping = match WorkloadMapping::from_yaml(&content) {
            Ok(mapping) => mapping,
            Err(source) => {
                return Err(MappingError::Malformed {
                    resource: self.mapping_resource.clone(),
                    project: data.project.clone(),
                    stage: data.stage.clone(),
                    service: data.service.clone(),
                    source,
                });
            }
        };
        log::info!(
            "Successfully loaded {} with {} workloads",
            self.mapping_resource,
            mapping.workloads.len()
        );

        Ok(Some(mapping))
    }
}
