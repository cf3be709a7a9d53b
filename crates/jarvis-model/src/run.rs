use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::JarvisError;
use crate::{AgentId, AgentKind, NodeId, RunId};

/// Lifecycle status of a run. See [`crate::state`] for the legal transition
/// table between these variants. `Completed`/`Failed`/`Cancelled`/`Timeout`
/// are all terminal and absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Pending,
    Running,
    Completed,
    Failed,
    Cancelled,
    Timeout,
}

impl RunStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
            Self::Timeout => "timeout",
        }
    }
}

/// Priority tag carried on a run. Advisory only: nothing in this crate
/// reorders execution by priority, it is surfaced for the queue bridge and
/// any external scheduler to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPriority {
    Low,
    Normal,
    High,
}

impl Default for RunPriority {
    fn default() -> Self {
        Self::Normal
    }
}

/// Structured failure recorded on a run, mirroring the gateway's
/// `{code, message, details}` error shape so the HTTP adapter never has to
/// reshape it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunError {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
}

impl RunError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
            details: None,
        }
    }

    pub fn with_details(mut self, details: Value) -> Self {
        self.details = Some(details);
        self
    }
}

impl From<&JarvisError> for RunError {
    fn from(err: &JarvisError) -> Self {
        Self::new(err.code(), err.to_string())
    }
}

/// A single agent execution requested by `owner_user_id`.
///
/// Runs own an ordered list of node IDs rather than embedding
/// `NodeExecution`s directly — node storage is a separate arena keyed by
/// `NodeId`, per the orchestrator's run/node index (nodes can reference
/// earlier nodes in the same run, e.g. a Browser agent's planning node
/// feeding its action nodes, and an arena sidesteps self-referential
/// ownership).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Run {
    pub id: RunId,
    pub owner_user_id: String,
    pub agent_id: AgentId,
    pub agent_kind: AgentKind,
    pub status: RunStatus,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<RunError>,
    pub node_ids: Vec<NodeId>,
    pub tags: Vec<String>,
    pub priority: RunPriority,
    pub is_async: bool,
    pub llm_call_count: u32,
    pub browser_step_count: u32,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl Run {
    pub fn new(
        owner_user_id: impl Into<String>,
        agent_id: AgentId,
        agent_kind: AgentKind,
        input: Value,
        is_async: bool,
    ) -> Self {
        Self {
            id: RunId::new(),
            owner_user_id: owner_user_id.into(),
            agent_id,
            agent_kind,
            status: RunStatus::Pending,
            input,
            output: None,
            error: None,
            node_ids: Vec::new(),
            tags: Vec::new(),
            priority: RunPriority::default(),
            is_async,
            llm_call_count: 0,
            browser_step_count: 0,
            created_at: Utc::now(),
            started_at: None,
            completed_at: None,
        }
    }

    pub fn duration_ms(&self) -> Option<i64> {
        let started = self.started_at?;
        let completed = self.completed_at?;
        Some((completed - started).num_milliseconds().max(0))
    }

    pub fn is_owned_by(&self, owner_user_id: &str) -> bool {
        self.owner_user_id == owner_user_id
    }

    /// Transitions into `Running` and stamps `started_at`. Caller is
    /// expected to have already validated the transition via
    /// [`crate::state::run_transition_allowed`].
    pub fn mark_running(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    pub fn mark_completed(&mut self, output: Value) {
        self.status = RunStatus::Completed;
        self.output = Some(output);
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_failed(&mut self, error: RunError) {
        self.status = RunStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_timeout(&mut self, error: RunError) {
        self.status = RunStatus::Timeout;
        self.error = Some(error);
        self.completed_at = Some(Utc::now());
    }

    pub fn mark_cancelled(&mut self) {
        self.status = RunStatus::Cancelled;
        self.completed_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::{Run, RunError, RunStatus};
    use crate::{AgentId, AgentKind};
    use serde_json::json;

    fn new_run() -> Run {
        Run::new("user-1", AgentId::new(), AgentKind::Echo, json!({}), false)
    }

    #[test]
    fn unit_new_run_starts_pending_with_no_duration() {
        let run = new_run();
        assert_eq!(run.status, RunStatus::Pending);
        assert!(run.duration_ms().is_none());
    }

    #[test]
    fn unit_mark_completed_sets_terminal_fields_and_duration() {
        let mut run = new_run();
        run.mark_running();
        run.mark_completed(json!({"ok": true}));
        assert_eq!(run.status, RunStatus::Completed);
        assert!(run.duration_ms().unwrap() >= 0);
    }

    #[test]
    fn regression_mark_timeout_uses_distinct_terminal_status_from_failed() {
        let mut run = new_run();
        run.mark_running();
        run.mark_timeout(RunError::new("execution_timeout", "Node execution timeout: 500ms"));
        assert_eq!(run.status, RunStatus::Timeout);
        assert_ne!(run.status.as_str(), RunStatus::Failed.as_str());
    }
}
