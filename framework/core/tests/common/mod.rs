#![allow(dead_code)]

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use artillery_service_core::prelude::{
    GeneratorError, LoadGenerator, Notifier, NotifyError, ResourceStore, StoreError,
    TestFinishedEvent, TestStartedEvent,
};
use parking_lot::Mutex;
use url::Url;

pub const FAILING_STATS: &str = include_str!("../data/artillery_stats.jsonl");
pub const PASSING_STATS: &str = include_str!("../data/artillery_stats_pass.jsonl");

pub const LOAD_SCENARIO: &str = r#"config:
  target: "http://localhost"
  phases:
    - duration: 10
      arrivalRate: 1
scenarios:
  - flow:
      - get:
          url: "/carts/1"
"#;

/// In-memory configuration store.
#[derive(Debug, Default)]
pub struct MemoryStore {
    resources: HashMap<String, String>,
    unavailable: Vec<String>,
}

impl MemoryStore {
    pub fn with_resource(mut self, name: &str, content: &str) -> Self {
        self.resources.insert(name.to_string(), content.to_string());
        self
    }

    /// Make reads of `name` fail as if the store was unreachable.
    pub fn with_unavailable(mut self, name: &str) -> Self {
        self.unavailable.push(name.to_string());
        self
    }
}

impl ResourceStore for MemoryStore {
    fn get_resource(&self, name: &str) -> Result<Option<String>, StoreError> {
        if self.unavailable.iter().any(|n| n == name) {
            return Err(StoreError::new(name, "connection refused"));
        }
        Ok(self.resources.get(name).cloned())
    }
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub target_url: Url,
    pub scenario_file: PathBuf,
    pub scenario_content: String,
    pub output_file: PathBuf,
}

#[derive(Debug)]
enum Behaviour {
    Write(String),
    Fail(String),
    RemoveOutput,
}

/// A load generator which writes canned statistics instead of running anything.
#[derive(Debug)]
pub struct FakeGenerator {
    behaviour: Behaviour,
    invocations: Mutex<Vec<Invocation>>,
}

impl FakeGenerator {
    pub fn writing(stats: &str) -> Self {
        Self::new(Behaviour::Write(stats.to_string()))
    }

    pub fn failing(message: &str) -> Self {
        Self::new(Behaviour::Fail(message.to_string()))
    }

    pub fn removing_output() -> Self {
        Self::new(Behaviour::RemoveOutput)
    }

    fn new(behaviour: Behaviour) -> Self {
        Self {
            behaviour,
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn invocations(&self) -> Vec<Invocation> {
        self.invocations.lock().clone()
    }
}

impl LoadGenerator for FakeGenerator {
    fn invoke(
        &self,
        target_url: &Url,
        scenario_file: &Path,
        output_file: &Path,
    ) -> Result<(), GeneratorError> {
        let scenario_content = std::fs::read_to_string(scenario_file)
            .map_err(|e| GeneratorError::new(format!("scenario not staged: {e}")))?;
        self.invocations.lock().push(Invocation {
            target_url: target_url.clone(),
            scenario_file: scenario_file.to_path_buf(),
            scenario_content,
            output_file: output_file.to_path_buf(),
        });

        let result = match &self.behaviour {
            Behaviour::Write(stats) => std::fs::write(output_file, stats),
            Behaviour::Fail(message) => return Err(GeneratorError::new(message.as_str())),
            Behaviour::RemoveOutput => std::fs::remove_file(output_file),
        };
        result.map_err(|e| GeneratorError::new(format!("cannot prepare stats: {e}")))
    }
}

/// Records notifications in the order they were sent.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    pub started: Mutex<Vec<TestStartedEvent>>,
    pub finished: Mutex<Vec<TestFinishedEvent>>,
    fail_started: bool,
    fail_finished: bool,
}

impl RecordingNotifier {
    pub fn failing_started() -> Self {
        Self {
            fail_started: true,
            ..Default::default()
        }
    }

    pub fn failing_finished() -> Self {
        Self {
            fail_finished: true,
            ..Default::default()
        }
    }
}

impl Notifier for RecordingNotifier {
    fn started(&self, event: &TestStartedEvent) -> Result<(), NotifyError> {
        if self.fail_started {
            return Err(NotifyError::new(&event.event_type, "broker unavailable"));
        }
        self.started.lock().push(event.clone());
        Ok(())
    }

    fn finished(&self, event: &TestFinishedEvent) -> Result<(), NotifyError> {
        if self.fail_finished {
            return Err(NotifyError::new(&event.event_type, "broker unavailable"));
        }
        self.finished.lock().push(event.clone());
        Ok(())
    }
}

pub fn target_url() -> Url {
    Url::parse("http://carts.sockshop-dev.io").expect("invalid url")
}
