use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::outcome::{RunOutcome, TestResult, TestStatus};

pub const TEST_TRIGGERED_EVENT_TYPE: &str = "sh.keptn.event.test.triggered";
pub const TEST_STARTED_EVENT_TYPE: &str = "sh.keptn.event.test.started";
pub const TEST_FINISHED_EVENT_TYPE: &str = "sh.keptn.event.test.finished";

/// An incoming event asking for a test run.
#[derive(Debug, Clone, Deserialize)]
pub struct TestTriggeredEvent {
    pub id: String,
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub data: TestTriggeredData,
}

impl TestTriggeredEvent {
    pub fn is_test_triggered(&self) -> bool {
        self.event_type == TEST_TRIGGERED_EVENT_TYPE
    }
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TestTriggeredData {
    #[serde(default)]
    pub project: String,
    #[serde(default)]
    pub stage: String,
    #[serde(default)]
    pub service: String,
    #[serde(default)]
    pub test: TestDetails,
    #[serde(default)]
    pub deployment: DeploymentDetails,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct TestDetails {
    #[serde(default, rename = "teststrategy")]
    pub test_strategy: String,
}

#[derive(Debug, Default, Clone, Deserialize)]
pub struct DeploymentDetails {
    #[serde(default, rename = "deploymentURIsPublic")]
    pub deployment_uris_public: Vec<String>,
    #[serde(default, rename = "deploymentURIsLocal")]
    pub deployment_uris_local: Vec<String>,
}

/// The trigger does not say where the service under test lives.
#[derive(Debug, thiserror::Error)]
pub enum TriggerError {
    #[error("no deployment URI included in event")]
    NoDeploymentUri,
    #[error("invalid deployment URI {uri:?}: {source}")]
    InvalidUri {
        uri: String,
        source: url::ParseError,
    },
}

impl TestTriggeredData {
    /// The URL of the service under test.
    ///
    /// The first public deployment URI is preferred, the first local one is used otherwise.
    pub fn service_url(&self) -> Result<Url, TriggerError> {
        let uri = [
            &self.deployment.deployment_uris_public,
            &self.deployment.deployment_uris_local,
        ]
        .into_iter()
        .filter_map(|uris| uris.first())
        .find(|uri| !uri.is_empty())
        .ok_or(TriggerError::NoDeploymentUri)?;

        Url::parse(uri).map_err(|source| TriggerError::InvalidUri {
            uri: uri.clone(),
            source,
        })
    }
}

/// Sent once when a run begins.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestStartedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    #[serde(rename = "triggeredid")]
    pub triggered_id: String,
    pub project: String,
    pub stage: String,
    pub service: String,
}

impl TestStartedEvent {
    pub fn new(service_name: &str, trigger: &TestTriggeredEvent) -> Self {
        Self {
            event_type: TEST_STARTED_EVENT_TYPE.to_string(),
            source: service_name.to_string(),
            triggered_id: trigger.id.clone(),
            project: trigger.data.project.clone(),
            stage: trigger.data.stage.clone(),
            service: trigger.data.service.clone(),
        }
    }
}

/// Sent once when a run ends, whatever the outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestFinishedEvent {
    #[serde(rename = "type")]
    pub event_type: String,
    pub source: String,
    #[serde(rename = "triggeredid")]
    pub triggered_id: String,
    pub project: String,
    pub stage: String,
    pub service: String,
    pub status: TestStatus,
    pub result: TestResult,
    pub message: String,
    pub test: TestTiming,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TestTiming {
    /// RFC 3339 start time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start: Option<String>,
    /// RFC 3339 end time
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end: Option<String>,
}

impl TestFinishedEvent {
    pub fn new(service_name: &str, trigger: &TestTriggeredEvent, outcome: &RunOutcome) -> Self {
        Self {
            event_type: TEST_FINISHED_EVENT_TYPE.to_string(),
            source: service_name.to_string(),
            triggered_id: trigger.id.clone(),
            project: trigger.data.project.clone(),
            stage: trigger.data.stage.clone(),
            service: trigger.data.service.clone(),
            status: outcome.status(),
            result: outcome.result(),
            message: outcome.message.clone(),
            test: TestTiming {
                start: outcome.started_at.map(rfc3339),
                end: outcome.ended_at.map(rfc3339),
            },
        }
    }
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}
