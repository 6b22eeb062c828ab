use std::io::Write;

use artillery_service_core::prelude::{Notifier, NotifyError, TestFinishedEvent, TestStartedEvent};
use parking_lot::Mutex;
use serde_json::to_writer;

/// Writes lifecycle events as JSON Lines, one event per line.
///
/// The writer is shared by every run, each event is written and flushed under the lock so lines
/// from concurrent runs never interleave.
pub struct JsonlNotifier<W> {
    writer: Mutex<W>,
}

impl<W> JsonlNotifier<W>
where
    W: Write + Send,
{
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    #[cfg(test)]
    fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn send<T>(&self, event_type: &str, event: &T) -> Result<(), NotifyError>
    where
        T: serde::Serialize,
    {
        let mut writer = self.writer.lock();
        to_writer(&mut *writer, event).map_err(|e| NotifyError::new(event_type, e))?;
        writer
            .write_all(b"\n")
            .and_then(|()| writer.flush())
            .map_err(|e| NotifyError::new(event_type, e))?;
        debug!("Sent {event_type} event");
        Ok(())
    }
}

impl<W> Notifier for JsonlNotifier<W>
where
    W: Write + Send,
{
    fn started(&self, event: &TestStartedEvent) -> Result<(), NotifyError> {
        self.send(&event.event_type, event)
    }

    fn finished(&self, event: &TestFinishedEvent) -> Result<(), NotifyError> {
        self.send(&event.event_type, event)
    }
}

#[cfg(test)]
mod tests {
    use artillery_service_core::prelude::{RunOutcome, TestTriggeredEvent};

    use super::*;

    fn trigger() -> TestTriggeredEvent {
        serde_json::from_value(serde_json::json!({
            "type": "sh.keptn.event.test.triggered",
            "id": "8d2c0a62-58f8-4bb4-94a6-87bd0f1d4f1d",
            "data": { "project": "sockshop", "stage": "dev", "service": "carts" }
        }))
        .expect("Failed to build trigger")
    }

    #[test]
    fn test_should_write_one_line_per_event() {
        let notifier = JsonlNotifier::new(Vec::new());
        let trigger = trigger();

        notifier
            .started(&TestStartedEvent::new("artillery-service", &trigger))
            .expect("Failed to send started event");
        notifier
            .finished(&TestFinishedEvent::new(
                "artillery-service",
                &trigger,
                &RunOutcome::skipped("performance"),
            ))
            .expect("Failed to send finished event");

        let output = String::from_utf8(notifier.into_inner()).expect("output is not UTF-8");
        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);

        let started: serde_json::Value =
            serde_json::from_str(lines[0]).expect("started event is not JSON");
        assert_eq!(started["type"], "sh.keptn.event.test.started");
        assert_eq!(started["source"], "artillery-service");
        assert_eq!(
            started["triggeredid"],
            "8d2c0a62-58f8-4bb4-94a6-87bd0f1d4f1d"
        );

        let finished: serde_json::Value =
            serde_json::from_str(lines[1]).expect("finished event is not JSON");
        assert_eq!(finished["type"], "sh.keptn.event.test.finished");
        assert_eq!(finished["result"], "pass");
        assert_eq!(finished["status"], "succeeded");
    }

    struct BrokenWriter;

    impl Write for BrokenWriter {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed"))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn test_should_fail_when_writer_is_broken() {
        let notifier = JsonlNotifier::new(BrokenWriter);

        let err = notifier
            .started(&TestStartedEvent::new("artillery-service", &trigger()))
            .expect_err("broken writer should fail");
        assert!(err.to_string().contains("sh.keptn.event.test.started"));
    }
}
