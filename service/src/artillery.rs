use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context as _};
use artillery_service_core::prelude::{GeneratorError, LoadGenerator};
use url::Url;

const ARTILLERY_BINARY: &str = "artillery";

/// Resolve the artillery binary.
///
/// An explicit path must exist; otherwise artillery is looked up in the user's `PATH`.
pub fn artillery_path(explicit: Option<PathBuf>) -> anyhow::Result<PathBuf> {
    match explicit {
        Some(path) if path.as_os_str().is_empty() => bail!("artillery path set to empty string"),
        Some(path) => {
            if !path.exists() {
                bail!(
                    "Path to artillery binary set to '{path}' but that path doesn't exist",
                    path = path.display()
                );
            }
            Ok(path)
        }
        None => {
            debug!("No artillery path configured, looking in user's 'PATH'");
            which::which(ARTILLERY_BINARY).context("artillery binary not found in PATH")
        }
    }
}

/// Runs scenarios with the artillery CLI, saving per-interval statistics with the `save-stats`
/// plugin.
pub struct ArtilleryGenerator {
    binary: PathBuf,
}

impl ArtilleryGenerator {
    pub fn new<P>(binary: P) -> Self
    where
        P: Into<PathBuf>,
    {
        Self {
            binary: binary.into(),
        }
    }

    /// Arguments for `artillery run`.
    fn run_args(target_url: &Url, scenario_file: &Path, output_file: &Path) -> Vec<OsString> {
        let overrides = serde_json::json!({
            "config": {
                "plugins": {
                    "save-stats": { "destination": output_file.to_string_lossy() }
                }
            }
        });

        vec![
            "run".into(),
            "-t".into(),
            target_url.as_str().into(),
            "--overrides".into(),
            overrides.to_string().into(),
            scenario_file.into(),
        ]
    }
}

impl LoadGenerator for ArtilleryGenerator {
    fn invoke(
        &self,
        target_url: &Url,
        scenario_file: &Path,
        output_file: &Path,
    ) -> Result<(), GeneratorError> {
        let args = Self::run_args(target_url, scenario_file, output_file);
        let command_line = format!(
            "{} {}",
            self.binary.display(),
            args.iter()
                .map(|arg| arg.to_string_lossy())
                .collect::<Vec<_>>()
                .join(" ")
        );
        debug!("Running {command_line}");

        // blocks until artillery exits
        let output = std::process::Command::new(&self.binary)
            .args(&args)
            .output()
            .map_err(|e| {
                GeneratorError::new(format!("Error executing command {command_line}: {e}"))
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        trace!("artillery stdout:\n{stdout}");

        if output.status.success() {
            info!("Artillery ran successfully");
            Ok(())
        } else {
            Err(GeneratorError::new(format!(
                "Error executing command {command_line}: {status}\n{stdout}{stderr}",
                status = output.status
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    #[cfg(unix)]
    use std::os::unix::fs::PermissionsExt as _;

    use pretty_assertions::assert_eq;
    use tempfile::{NamedTempFile, TempDir};

    use super::*;

    fn target_url() -> Url {
        Url::parse("http://carts.sockshop-dev.io").expect("invalid url")
    }

    #[test]
    fn test_should_build_run_args() {
        let args = ArtilleryGenerator::run_args(
            &target_url(),
            Path::new("/tmp/artillery/load.yaml"),
            Path::new("/tmp/stats.jsonl"),
        );

        let args = args
            .iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect::<Vec<_>>();
        assert_eq!(
            args,
            vec![
                "run",
                "-t",
                "http://carts.sockshop-dev.io/",
                "--overrides",
                r#"{"config":{"plugins":{"save-stats":{"destination":"/tmp/stats.jsonl"}}}}"#,
                "/tmp/artillery/load.yaml",
            ]
        );
    }

    #[test]
    fn test_should_escape_output_path() {
        let args = ArtilleryGenerator::run_args(
            &target_url(),
            Path::new("load.yaml"),
            Path::new(r#"/tmp/odd "name".jsonl"#),
        );

        let overrides: serde_json::Value =
            serde_json::from_str(&args[4].to_string_lossy()).expect("overrides are not JSON");
        assert_eq!(
            overrides["config"]["plugins"]["save-stats"]["destination"],
            r#"/tmp/odd "name".jsonl"#
        );
    }

    #[test]
    fn test_should_not_get_artillery_path_if_not_exist() {
        let result = artillery_path(Some(PathBuf::from("/non/existent/path/to/artillery")));
        assert!(result.is_err());

        let result = artillery_path(Some(PathBuf::new()));
        assert!(result.is_err());
    }

    #[test]
    fn test_should_get_explicit_artillery_path() {
        let temp = NamedTempFile::new().expect("failed to create temp file");
        let result =
            artillery_path(Some(temp.path().to_path_buf())).expect("failed to get artillery path");
        assert_eq!(result, temp.path());
    }

    #[cfg(unix)]
    fn fake_artillery(dir: &TempDir, script: &str) -> PathBuf {
        let path = dir.path().join("artillery");
        std::fs::write(&path, script).expect("failed to write fake artillery");
        let mut perms = std::fs::metadata(&path)
            .expect("failed to read metadata")
            .permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("failed to set permissions");
        path
    }

    #[cfg(unix)]
    #[test]
    fn test_should_run_artillery_and_write_stats() {
        let dir = TempDir::new().expect("failed to create temp dir");
        // The output path is embedded in the --overrides argument, so write to a fixed file and
        // have the test read it back from there.
        let stats = dir.path().join("stats.jsonl");
        let binary = fake_artillery(
            &dir,
            &format!(
                "#!/bin/sh\necho \"$@\" > '{args}'\necho '{{\"errors\":{{}}}}' > '{stats}'\n",
                args = dir.path().join("args").display(),
                stats = stats.display(),
            ),
        );

        ArtilleryGenerator::new(binary)
            .invoke(&target_url(), Path::new("load.yaml"), &stats)
            .expect("failed to run artillery");

        let args = std::fs::read_to_string(dir.path().join("args")).expect("args not written");
        assert!(args.starts_with("run -t http://carts.sockshop-dev.io/ --overrides"));
        assert!(args.trim_end().ends_with("load.yaml"));
        assert_eq!(
            std::fs::read_to_string(&stats).expect("stats not written"),
            "{\"errors\":{}}\n"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_should_surface_artillery_output_on_failure() {
        let dir = TempDir::new().expect("failed to create temp dir");
        let binary = fake_artillery(
            &dir,
            "#!/bin/sh\necho 'Error: connect ECONNREFUSED 127.0.0.1:80' >&2\nexit 1\n",
        );

        let err = ArtilleryGenerator::new(binary)
            .invoke(
                &target_url(),
                Path::new("load.yaml"),
                &dir.path().join("stats.jsonl"),
            )
            .expect_err("artillery should fail");

        let message = err.to_string();
        assert!(message.starts_with("Error executing command"));
        assert!(message.contains("Error: connect ECONNREFUSED 127.0.0.1:80"));
    }

    #[test]
    fn test_should_fail_when_binary_is_missing() {
        let err = ArtilleryGenerator::new("/non/existent/path/to/artillery")
            .invoke(
                &target_url(),
                Path::new("load.yaml"),
                Path::new("stats.jsonl"),
            )
            .expect_err("missing binary should fail");
        assert!(err.to_string().starts_with("Error executing command"));
    }
}
