use std::path::{Path, PathBuf};

use chrono::Utc;
use url::Url;

use crate::aggregator::ScenarioResultAggregator;
use crate::outcome::{InfraStage, RunOutcome};
use crate::workload::{resolve, WorkloadMapping, DEFAULT_SCENARIO_RESOURCE};

/// Read access to the configuration store holding scenarios and the workload mapping.
pub trait ResourceStore: Send + Sync {
    /// Fetch the content of the resource `name`.
    ///
    /// `Ok(None)` means the store was reachable but has no such resource. Empty content is treated
    /// the same way by callers.
    fn get_resource(&self, name: &str) -> Result<Option<String>, StoreError>;
}

/// The external load generator.
pub trait LoadGenerator: Send + Sync {
    /// Run the scenario at `scenario_file` against `target_url`, blocking until it completes.
    ///
    /// Result records are written as JSON lines to `output_file`.
    fn invoke(
        &self,
        target_url: &Url,
        scenario_file: &Path,
        output_file: &Path,
    ) -> Result<(), GeneratorError>;
}

/// The configuration store could not be read.
#[derive(Debug, thiserror::Error)]
#[error("failed to load resource {name}: {reason}")]
pub struct StoreError {
    name: String,
    reason: String,
}

impl StoreError {
    pub fn new(name: impl Into<String>, reason: impl ToString) -> Self {
        Self {
            name: name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The load generator failed. The message is the generator's own error output.
#[derive(Debug, thiserror::Error)]
#[error("{message}")]
pub struct GeneratorError {
    message: String,
}

impl GeneratorError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum FetchError {
    #[error("resource not found")]
    NotFound,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error("could not stage scenario file: {0}")]
    Stage(#[from] std::io::Error),
}

/// Drives one test run: select the scenario, fetch it, run the load generator and decide the
/// verdict from its result stream.
///
/// Holds no state between runs, so a single orchestrator may serve concurrent runs.
pub struct RunOrchestrator<'a, S: ?Sized, G: ?Sized> {
    store: &'a S,
    generator: &'a G,
    default_scenario: String,
}

impl<'a, S, G> RunOrchestrator<'a, S, G>
where
    S: ResourceStore + ?Sized,
    G: LoadGenerator + ?Sized,
{
    pub fn new(store: &'a S, generator: &'a G) -> Self {
        Self {
            store,
            generator,
            default_scenario: DEFAULT_SCENARIO_RESOURCE.to_string(),
        }
    }

    /// Scenario to run when there is no workload mapping.
    pub fn with_default_scenario(mut self, default_scenario: impl Into<String>) -> Self {
        self.default_scenario = default_scenario.into();
        self
    }

    pub fn run(
        &self,
        strategy: &str,
        target_url: &Url,
        mapping: Option<&WorkloadMapping>,
    ) -> RunOutcome {
        let selection = resolve(mapping, strategy, &self.default_scenario);
        let Some(scenario) = selection.path() else {
            log::info!("No test file provided for test strategy '{strategy}' -> Skipping tests");
            return RunOutcome::skipped(strategy);
        };
        log::info!("TestStrategy={strategy} -> testFile={scenario}, serviceUrl={target_url}");

        // Dropping these removes the staged scenario and the result sink, whichever way we return.
        let workdir = match tempfile::Builder::new().prefix("artillery").tempdir() {
            Ok(workdir) => workdir,
            Err(e) => {
                return RunOutcome::errored(
                    InfraStage::Fetch,
                    Some(scenario),
                    format!("Failed to create working directory: {e}"),
                );
            }
        };
        let scenario_file = match self.fetch_scenario(scenario, workdir.path()) {
            Ok(path) => path,
            Err(e) => {
                let message =
                    format!("Failed to fetch artillery file {scenario} from config repo: {e}");
                log::error!("{message}");
                return RunOutcome::errored(InfraStage::Fetch, Some(scenario), message);
            }
        };
        log::debug!("Fetched artillery test file to {}", scenario_file.display());

        let sink = match tempfile::Builder::new()
            .prefix("stats")
            .suffix(".jsonl")
            .tempfile()
        {
            Ok(sink) => sink,
            Err(e) => {
                return RunOutcome::errored(
                    InfraStage::Invoke,
                    Some(scenario),
                    format!("Failed to create statistics file: {e}"),
                );
            }
        };

        let started_at = Utc::now();
        if let Err(e) = self
            .generator
            .invoke(target_url, &scenario_file, sink.path())
        {
            log::error!("Artillery test [{scenario}] could not be run: {e}");
            return RunOutcome::errored(InfraStage::Invoke, Some(scenario), e.to_string())
                .with_timing(Some(started_at), None);
        }
        let ended_at = Utc::now();

        if !sink.path().exists() {
            log::warn!("Artillery test [{scenario}] did not leave a statistics file behind");
            return RunOutcome::passed(
                scenario,
                started_at,
                ended_at,
                Some("no statistics file was written"),
            );
        }

        let report = match ScenarioResultAggregator::aggregate_file(sink.path()) {
            Ok(report) => report,
            Err(e) => {
                log::warn!(
                    "Discarding partial statistics for [{scenario}]: {}",
                    e.partial()
                );
                return RunOutcome::errored(
                    InfraStage::Aggregate,
                    Some(scenario),
                    format!("Failed to read artillery statistics for [{scenario}]: {e}"),
                )
                .with_timing(Some(started_at), Some(ended_at));
            }
        };

        if !report.errors.is_empty() {
            log::info!(
                "Artillery test [{scenario}] reported errors: {}",
                report.errors
            );
            RunOutcome::failed(scenario, started_at, ended_at, report.errors)
        } else if report.records == 0 {
            log::warn!("Artillery test [{scenario}] recorded no statistics");
            RunOutcome::passed(
                scenario,
                started_at,
                ended_at,
                Some("no statistics were recorded"),
            )
        } else {
            RunOutcome::passed(scenario, started_at, ended_at, None)
        }
    }

    /// Fetch `scenario` from the store into `workdir`, keeping only its file name.
    fn fetch_scenario(&self, scenario: &str, workdir: &Path) -> Result<PathBuf, FetchError> {
        let content = self
            .store
            .get_resource(scenario)?
            .filter(|content| !content.is_empty())
            .ok_or(FetchError::NotFound)?;

        let file_name = scenario
            .rsplit('/')
            .find(|part| !part.is_empty())
            .unwrap_or("scenario.yaml");
        let path = workdir.join(file_name);
        std::fs::write(&path, content)?;

        Ok(path)
    }
}
