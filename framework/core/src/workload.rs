use serde::Deserialize;

/// Resource name of the workload mapping in the configuration store.
pub const WORKLOAD_MAPPING_RESOURCE: &str = "scenarios/artillery.conf.yaml";
/// Resource name of the scenario run when no workload mapping exists.
pub const DEFAULT_SCENARIO_RESOURCE: &str = "scenarios/load.yaml";

/// The workload mapping document, associating test strategies with scenario files.
///
/// ```yaml
/// spec_version: '0.1.0'
/// workloads:
///   - teststrategy: performance
///     script: scenarios/load.yaml
///   - teststrategy: functional
///     script: scenarios/basic.yaml
/// ```
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkloadMapping {
    #[serde(default, rename = "spec_version", alias = "specVersion")]
    pub spec_version: String,
    #[serde(default)]
    pub workloads: Vec<WorkloadRule>,
}

/// A single strategy to scenario association.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct WorkloadRule {
    /// Strategy this rule applies to. A rule without one only matches an empty strategy.
    #[serde(default, rename = "teststrategy", alias = "testStrategy")]
    pub test_strategy: String,
    /// Path of the scenario in the configuration store. Empty means no run for this strategy.
    #[serde(default)]
    pub script: String,
}

impl WorkloadMapping {
    /// Parse a workload mapping from its YAML representation.
    pub fn from_yaml(content: &str) -> Result<Self, WorkloadError> {
        Ok(serde_yaml::from_str(content)?)
    }
}

/// The workload mapping was found but could not be parsed.
#[derive(Debug, thiserror::Error)]
#[error("malformed workload mapping: {0}")]
pub struct WorkloadError(#[from] serde_yaml::Error);

/// The scenario chosen for a test strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScenarioSelection {
    /// A rule in the workload mapping matched.
    Scenario(String),
    /// There was no workload mapping at all.
    Default(String),
    /// The strategy is not configured to run anything.
    NoScenario,
}

impl ScenarioSelection {
    /// The scenario path to run, if any.
    pub fn path(&self) -> Option<&str> {
        match self {
            ScenarioSelection::Scenario(path) | ScenarioSelection::Default(path) => Some(path),
            ScenarioSelection::NoScenario => None,
        }
    }
}

/// Pick the scenario to run for `strategy`.
///
/// Without a mapping the default scenario always runs. With a mapping, rules are scanned in
/// document order and the last one matching the strategy wins; no match or an empty script means
/// nothing runs.
pub fn resolve(
    mapping: Option<&WorkloadMapping>,
    strategy: &str,
    default_scenario: &str,
) -> ScenarioSelection {
    let Some(mapping) = mapping else {
        log::info!(
            "No workload mapping provided, continuing with default scenario {default_scenario}"
        );
        return ScenarioSelection::Default(default_scenario.to_string());
    };

    let script = mapping
        .workloads
        .iter()
        .rfind(|rule| rule.test_strategy == strategy)
        .map(|rule| rule.script.as_str())
        .unwrap_or_default();

    if script.is_empty() {
        ScenarioSelection::NoScenario
    } else {
        ScenarioSelection::Scenario(script.to_string())
    }
}
