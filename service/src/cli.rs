use std::path::PathBuf;

use artillery_service_core::prelude::{DEFAULT_SCENARIO_RESOURCE, WORKLOAD_MAPPING_RESOURCE};
use clap::Parser;

#[derive(Parser)]
#[command(about, long_about = None)]
pub struct CliArgs {
    /// Paths to `test.triggered` events to handle, one JSON event per file.
    #[arg(required = true)]
    pub events: Vec<PathBuf>,

    /// Checkout of the configuration repository to read scenarios from.
    ///
    /// Resources are looked up at service, then stage, then project level:
    /// `<resources>/<project>/<stage>/<service>/<name>`, `<resources>/<project>/<stage>/<name>`
    /// and `<resources>/<project>/<name>`.
    #[arg(long, env = "ARTILLERY_RESOURCES", default_value = "resources")]
    pub resources: PathBuf,

    /// Name this service uses as the source of the events it sends.
    #[arg(long, env = "SERVICE_NAME", default_value = "artillery-service")]
    pub service_name: String,

    /// Path to the artillery binary. Looked up in `PATH` if not set.
    #[arg(long, env = "ARTILLERY_PATH")]
    pub artillery_path: Option<PathBuf>,

    /// File to append `test.started` and `test.finished` events to, one JSON event per line.
    ///
    /// Events are written to stdout if not set.
    #[arg(long)]
    pub events_out: Option<PathBuf>,

    /// Resource name of the workload mapping.
    #[arg(long, default_value = WORKLOAD_MAPPING_RESOURCE)]
    pub mapping_resource: String,

    /// Scenario to run when no workload mapping exists.
    #[arg(long, default_value = DEFAULT_SCENARIO_RESOURCE)]
    pub default_scenario: String,
}
