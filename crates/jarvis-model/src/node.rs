use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::run::RunError;
use crate::{NodeId, RunId};

/// `Completed`, `Failed`, `Cancelled`, and `Skipped` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeStatus {
    Pending,
    Running,
    Waiting,
    Completed,
    Failed,
    Cancelled,
    Skipped,
}

impl NodeStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Waiting => "waiting",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Skipped => "skipped",
        }
    }
}

/// One step of a run's execution, e.g. a single LLM completion or a single
/// browser action. `name`/`node_type` are free-form descriptions
/// (`"llm_completion"`, `"browser_goto"`, ...) used for logs and
/// `/v1/runs/:id/logs`, not parsed by anything.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NodeExecution {
    pub id: NodeId,
    pub run_id: RunId,
    pub name: String,
    pub node_type: String,
    pub status: NodeStatus,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<RunError>,
    pub attempts: u32,
    pub max_attempts: u32,
    pub retry_delay_ms: Option<u64>,
    pub started_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl NodeExecution {
    pub fn start(run_id: RunId, name: impl Into<String>, node_type: impl Into<String>, input: Value) -> Self {
        Self {
            id: NodeId::new(),
            run_id,
            name: name.into(),
            node_type: node_type.into(),
            status: NodeStatus::Running,
            input,
            output: None,
            error: None,
            attempts: 1,
            max_attempts: 1,
            retry_delay_ms: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    pub fn complete(&mut self, output: Value) {
        self.status = NodeStatus::Completed;
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
    }

    pub fn fail(&mut self, error: RunError) {
        self.status = NodeStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        self.status = NodeStatus::Skipped;
        self.output = None;
        self.error = Some(RunError::new("skipped", reason));
        self.completed_at = Some(Utc::now());
    }

    pub fn duration_ms(&self) -> Option<i64> {
        let end = self.completed_at?;
        Some((end - self.started_at).num_milliseconds().max(0))
    }
}

#[cfg(test)]
mod tests {
    use super::NodeExecution;
    use crate::run::RunError;
    use crate::RunId;
    use serde_json::json;

    #[test]
    fn unit_node_execution_complete_sets_terminal_fields() {
        let mut node = NodeExecution::start(RunId::new(), "llm_completion", "gen", json!({}));
        assert!(node.completed_at.is_none());
        node.complete(json!({"text": "ok"}));
        assert_eq!(node.status, super::NodeStatus::Completed);
        assert!(node.completed_at.is_some());
        assert!(node.duration_ms().unwrap() >= 0);
    }

    #[test]
    fn unit_node_execution_fail_records_error() {
        let mut node = NodeExecution::start(RunId::new(), "browser_goto", "browser", json!({}));
        node.fail(RunError::new("timeout", "navigation timed out"));
        assert_eq!(node.status, super::NodeStatus::Failed);
        assert_eq!(node.error.as_ref().map(|e| e.code.as_str()), Some("timeout"));
    }

    #[test]
    fn regression_skip_marks_terminal_without_output() {
        let mut node = NodeExecution::start(RunId::new(), "browser_click", "browser", json!({}));
        node.skip("run cancelled before this step ran");
        assert_eq!(node.status, super::NodeStatus::Skipped);
        assert!(node.output.is_none());
    }
}
