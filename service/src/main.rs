#[macro_use]
extern crate log;

use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context as _};
use artillery_service_core::prelude::{TestTriggeredEvent, TestTriggeredHandler};
use clap::Parser as _;

use crate::artillery::ArtilleryGenerator;
use crate::notifier::JsonlNotifier;
use crate::resources::DirectoryResourceStore;

mod artillery;
mod cli;
mod notifier;
mod resources;

const CRATE_NAME: &str = env!("CARGO_PKG_NAME");
const CRATE_VERSION: &str = env!("CARGO_PKG_VERSION");

fn main() -> anyhow::Result<()> {
    env_logger::try_init()?;

    let args = cli::CliArgs::parse();
    info!("{CRATE_NAME} {CRATE_VERSION}");
    info!("Using resources from: {}", args.resources.display());

    let artillery = artillery::artillery_path(args.artillery_path)?;
    info!("Using artillery binary: {}", artillery.display());

    let writer: Box<dyn Write + Send> = match &args.events_out {
        Some(path) => Box::new(
            std::fs::OpenOptions::new()
                .append(true)
                .create(true)
                .open(path)
                .with_context(|| format!("Failed to open events output {}", path.display()))?,
        ),
        None => Box::new(std::io::stdout()),
    };

    let handler = TestTriggeredHandler::new(
        args.service_name,
        ArtilleryGenerator::new(artillery),
        JsonlNotifier::new(writer),
    )
    .with_mapping_resource(args.mapping_resource)
    .with_default_scenario(args.default_scenario);

    let events = args
        .events
        .iter()
        .map(|path| load_event(path))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let test_events = events
        .iter()
        .filter(|event| {
            if !event.is_test_triggered() {
                info!("Ignoring {} event: {}", event.event_type, event.id);
            }
            event.is_test_triggered()
        })
        .collect::<Vec<_>>();
    debug!("Handling {} test.triggered events", test_events.len());

    // runs share nothing but the notification sink, so each gets its own thread
    let results = std::thread::scope(|s| {
        let runs = test_events
            .iter()
            .map(|event| {
                let store = DirectoryResourceStore::for_trigger(&args.resources, &event.data);
                let handler = &handler;
                s.spawn(move || handler.handle(event, &store))
            })
            .collect::<Vec<_>>();

        runs.into_iter()
            .zip(&test_events)
            .map(|(run, event)| {
                let result = run
                    .join()
                    .map_err(|_| anyhow!("Test run for {} panicked", event.id))
                    .and_then(|result| result.map_err(anyhow::Error::from));
                (event.id.as_str(), result)
            })
            .collect::<Vec<_>>()
    });

    let total = results.len();
    let mut errors = vec![];
    for (id, result) in results {
        match result {
            Ok(outcome) => info!(
                "{id}: {result} ({status}) {message}",
                result = outcome.result(),
                status = outcome.status(),
                message = outcome.message
            ),
            Err(e) => {
                error!("{id}: {e:#}");
                errors.push(format!("{id}: {e:#}"));
            }
        }
    }

    if !errors.is_empty() {
        return Err(anyhow!(
            "{} out of {} test runs could not be reported:\n{:#?}",
            errors.len(),
            total,
            errors
        ));
    }

    Ok(())
}

/// Load a CloudEvent from a JSON file.
fn load_event(path: &Path) -> anyhow::Result<TestTriggeredEvent> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read event {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse event {}", path.display()))
}
