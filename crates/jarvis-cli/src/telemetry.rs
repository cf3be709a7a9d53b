//! NDJSON audit-log sink for the "flush telemetry" step of graceful
//! shutdown, built on `jarvis-core::log_rotation`. Absent `AUDIT_LOG_PATH`,
//! the sink is a no-op — tracing's own stderr output is the only telemetry
//! a deployment gets.

use std::path::PathBuf;

use jarvis_core::log_rotation::{append_line_with_rotation, LogRotationPolicy};
use serde_json::Value;
use tracing::warn;

pub struct TelemetrySink {
    path: Option<PathBuf>,
    policy: LogRotationPolicy,
}

impl TelemetrySink {
    pub fn new(path: Option<PathBuf>) -> Self {
        Self {
            path,
            policy: LogRotationPolicy::from_env(),
        }
    }

    /// Appends one NDJSON event line. Runs the blocking file I/O on a
    /// blocking-pool thread since `jarvis-core`'s rotation helpers are
    /// synchronous `std::fs` calls.
    pub async fn record(&self, event: Value) {
        let Some(path) = self.path.clone() else {
            return;
        };
        let policy = self.policy;
        let line = event.to_string();
        let outcome = tokio::task::spawn_blocking(move || append_line_with_rotation(&path, &line, policy)).await;
        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(error)) => warn!(%error, "failed to append telemetry line"),
            Err(error) => warn!(%error, "telemetry write task panicked"),
        }
    }

    /// Called once at shutdown; currently synonymous with `record`, but
    /// kept as a distinct call site so shutdown's "flush telemetry" step
    /// has one clear line to call regardless of how buffering evolves.
    pub async fn flush(&self, event: Value) {
        self.record(event).await;
    }
}

#[cfg(test)]
mod tests {
    use super::TelemetrySink;
    use serde_json::json;

    #[tokio::test]
    async fn unit_record_with_no_path_is_a_no_op() {
        let sink = TelemetrySink::new(None);
        sink.record(json!({"event": "noop"})).await;
    }

    #[tokio::test]
    async fn functional_record_appends_ndjson_line_to_file() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("audit.ndjson");
        let sink = TelemetrySink::new(Some(path.clone()));
        sink.record(json!({"event": "shutdown", "ok": true})).await;

        let contents = std::fs::read_to_string(&path).expect("read audit log");
        assert_eq!(contents.lines().count(), 1);
        assert!(contents.contains("\"event\":\"shutdown\""));
    }
}
