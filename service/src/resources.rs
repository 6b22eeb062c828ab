use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};

use artillery_service_core::prelude::{ResourceStore, StoreError, TestTriggeredData};

/// Reads resources from a checkout of the configuration repository.
///
/// A resource is looked up for the service first, then for the stage and finally for the whole
/// project, so a scenario can be shared by every service of a stage or project.
#[derive(Debug, Clone)]
pub struct DirectoryResourceStore {
    root: PathBuf,
    project: String,
    stage: String,
    service: String,
}

impl DirectoryResourceStore {
    pub fn new(
        root: impl Into<PathBuf>,
        project: impl Into<String>,
        stage: impl Into<String>,
        service: impl Into<String>,
    ) -> Self {
        Self {
            root: root.into(),
            project: project.into(),
            stage: stage.into(),
            service: service.into(),
        }
    }

    /// A store scoped to the project, stage and service of a trigger.
    pub fn for_trigger(root: impl Into<PathBuf>, data: &TestTriggeredData) -> Self {
        Self::new(root, &data.project, &data.stage, &data.service)
    }

    /// Candidate locations of `name`, most specific first.
    ///
    /// Fails if `name` or any scope segment could point outside of the checkout.
    fn candidates(&self, name: &str) -> Result<Vec<PathBuf>, StoreError> {
        let segments = [
            name,
            self.project.as_str(),
            self.stage.as_str(),
            self.service.as_str(),
        ];
        if let Some(segment) = segments.iter().find(|s| !is_plain_relative(s)) {
            return Err(StoreError::new(
                name,
                format!(
                    "{segment:?} is not a relative path below {}",
                    self.root.display()
                ),
            ));
        }

        let project_dir = self.root.join(&self.project);
        let stage_dir = project_dir.join(&self.stage);
        let service_dir = stage_dir.join(&self.service);

        let candidates = [service_dir, stage_dir, project_dir]
            .into_iter()
            .map(|dir| dir.join(name))
            .collect();
        Ok(candidates)
    }
}

/// Whether `path` is not empty and only names entries below the directory it is joined to.
fn is_plain_relative(path: &str) -> bool {
    let mut components = Path::new(path).components();
    !path.is_empty() && components.all(|c| matches!(c, Component::Normal(_)))
}

impl ResourceStore for DirectoryResourceStore {
    fn get_resource(&self, name: &str) -> Result<Option<String>, StoreError> {
        for path in self.candidates(name)? {
            match std::fs::read_to_string(&path) {
                Ok(content) => {
                    debug!("Found resource {name} at {}", path.display());
                    return Ok(Some(content));
                }
                Err(e) if e.kind() == ErrorKind::NotFound => continue,
                Err(e) => return Err(StoreError::new(name, format!("{}: {e}", path.display()))),
            }
        }

        debug!("Resource {name} not found under {}", self.root.display());
        Ok(None)
    }
}
