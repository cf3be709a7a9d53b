//! Pure run/node state transition rules. No I/O, no clocks except through
//! the caller-supplied timestamps already on `Run`/`NodeExecution` — this
//! module only decides whether a transition is legal and what it implies.

use crate::{NodeStatus, RunStatus};

impl RunStatus {
    /// `Completed`, `Failed`, `Cancelled`, and `Timeout` are terminal: once
    /// reached, a run never transitions again.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::Timeout)
    }
}

impl NodeStatus {
    /// `Completed`, `Failed`, `Cancelled`, and `Skipped` are terminal.
    /// `Waiting` (blocked on another node, or parked mid-retry backoff) is
    /// not: it always resumes into `Running`.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled | Self::Skipped)
    }
}

/// Returns `true` when moving a run from `from` to `to` is a legal
/// transition. `Pending -> Running -> {Completed, Failed, Timeout}`, plus
/// `Pending|Running -> Cancelled` for explicit cancellation. Terminal
/// states never transition anywhere, including to themselves.
pub fn run_transition_allowed(from: RunStatus, to: RunStatus) -> bool {
    use RunStatus::*;
    if from.is_terminal() {
        return false;
    }
    matches!(
        (from, to),
        (Pending, Running)
            | (Pending, Cancelled)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, Cancelled)
            | (Running, Timeout)
    )
}

/// Returns `true` when moving a node from `from` to `to` is legal:
/// `Pending -> Running -> {Completed, Failed, Waiting, Skipped}`,
/// `Waiting -> Running` (resumption), and cancellation from any
/// non-terminal state.
pub fn node_transition_allowed(from: NodeStatus, to: NodeStatus) -> bool {
    use NodeStatus::*;
    if from.is_terminal() {
        return false;
    }
    matches!(
        (from, to),
        (Pending, Running)
            | (Pending, Skipped)
            | (Pending, Cancelled)
            | (Running, Completed)
            | (Running, Failed)
            | (Running, Waiting)
            | (Running, Cancelled)
            | (Waiting, Running)
            | (Waiting, Cancelled)
    )
}

#[cfg(test)]
mod tests {
    use super::{node_transition_allowed, run_transition_allowed};
    use crate::{NodeStatus, RunStatus};

    #[test]
    fn unit_run_transitions_follow_pending_running_terminal_shape() {
        assert!(run_transition_allowed(RunStatus::Pending, RunStatus::Running));
        assert!(run_transition_allowed(RunStatus::Running, RunStatus::Completed));
        assert!(run_transition_allowed(RunStatus::Running, RunStatus::Failed));
        assert!(run_transition_allowed(RunStatus::Running, RunStatus::Timeout));
        assert!(run_transition_allowed(RunStatus::Pending, RunStatus::Cancelled));
        assert!(!run_transition_allowed(RunStatus::Pending, RunStatus::Completed));
    }

    #[test]
    fn regression_terminal_run_states_never_transition_again() {
        let all = [
            RunStatus::Pending,
            RunStatus::Running,
            RunStatus::Completed,
            RunStatus::Failed,
            RunStatus::Cancelled,
            RunStatus::Timeout,
        ];
        for terminal in [RunStatus::Completed, RunStatus::Failed, RunStatus::Cancelled, RunStatus::Timeout] {
            for target in all {
                assert!(!run_transition_allowed(terminal, target));
            }
        }
    }

    #[test]
    fn unit_node_transitions_follow_pending_running_terminal_shape() {
        assert!(node_transition_allowed(NodeStatus::Pending, NodeStatus::Running));
        assert!(node_transition_allowed(NodeStatus::Running, NodeStatus::Completed));
        assert!(!node_transition_allowed(NodeStatus::Completed, NodeStatus::Running));
    }

    #[test]
    fn regression_node_can_wait_then_resume_but_not_skip_to_terminal_after_waiting_started() {
        assert!(node_transition_allowed(NodeStatus::Running, NodeStatus::Waiting));
        assert!(node_transition_allowed(NodeStatus::Waiting, NodeStatus::Running));
        assert!(!node_transition_allowed(NodeStatus::Waiting, NodeStatus::Completed));
    }

    #[test]
    fn regression_pending_node_can_be_skipped_without_running() {
        assert!(node_transition_allowed(NodeStatus::Pending, NodeStatus::Skipped));
    }
}
