//! Run access authorization.
//!
//! Runs belong to the `owner_user_id` that created them. Every read (`GetRun`,
//! `ListRuns`, `ListRunsByAgent`) is scoped to the requesting principal;
//! mismatches return `AccessDenied` without touching run state, matching the
//! error-propagation policy in the taxonomy's access rules.

use jarvis_model::{JarvisError, Run};
use tracing::{debug, warn};

/// Outcome of one authorization check. Kept as a distinct type rather than a
/// bare `bool` so callers can log the reason code even on the allow path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RbacDecision {
    allowed: bool,
    reason_code: &'static str,
}

impl RbacDecision {
    pub fn is_allowed(self) -> bool {
        self.allowed
    }

    pub fn reason_code(self) -> &'static str {
        self.reason_code
    }

    fn allow() -> Self {
        Self {
            allowed: true,
            reason_code: "allow_owner_match",
        }
    }

    fn deny() -> Self {
        Self {
            allowed: false,
            reason_code: "deny_owner_mismatch",
        }
    }
}

/// Authorizes `requesting_user_id` to read `run`, without mutating anything.
pub fn authorize_run_access(run: &Run, requesting_user_id: &str) -> RbacDecision {
    let decision = if run.is_owned_by(requesting_user_id) {
        RbacDecision::allow()
    } else {
        RbacDecision::deny()
    };
    debug!(
        run_id = %run.id,
        requesting_user_id,
        allowed = decision.is_allowed(),
        reason_code = decision.reason_code(),
        "authorized run access"
    );
    decision
}

/// Authorizes and converts a denial into `JarvisError::AccessDenied`, so
/// call sites can use `?` directly.
pub fn enforce_run_access(run: &Run, requesting_user_id: &str) -> Result<(), JarvisError> {
    let decision = authorize_run_access(run, requesting_user_id);
    if decision.is_allowed() {
        return Ok(());
    }
    warn!(
        run_id = %run.id,
        requesting_user_id,
        reason_code = decision.reason_code(),
        "denied run access"
    );
    Err(JarvisError::AccessDenied(format!(
        "run {} is not owned by {}",
        run.id, requesting_user_id
    )))
}

/// Filters a run list down to those owned by `requesting_user_id`, for
/// `ListRuns`/`ListRunsByAgent`.
pub fn filter_runs_for_owner<'a>(
    runs: impl IntoIterator<Item = &'a Run>,
    requesting_user_id: &str,
) -> Vec<&'a Run> {
    runs.into_iter()
        .filter(|run| run.is_owned_by(requesting_user_id))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::{enforce_run_access, filter_runs_for_owner};
    use jarvis_model::{Agent, AgentKind, Run};
    use serde_json::json;

    fn run_for(owner: &str) -> Run {
        let agent = Agent::new("gen", AgentKind::Gen);
        Run::new(owner, agent.id, agent.kind, json!({}), false)
    }

    #[test]
    fn unit_owner_can_access_their_own_run() {
        let run = run_for("user-1");
        assert!(enforce_run_access(&run, "user-1").is_ok());
    }

    #[test]
    fn regression_non_owner_is_denied_and_run_state_is_unchanged() {
        let run = run_for("user-1");
        let error = enforce_run_access(&run, "user-2").expect_err("should deny");
        assert_eq!(error.code(), "access_denied");
        assert_eq!(run.owner_user_id, "user-1");
    }

    #[test]
    fn functional_filter_runs_for_owner_scopes_list_results() {
        let runs = vec![run_for("user-1"), run_for("user-2"), run_for("user-1")];
        let visible = filter_runs_for_owner(&runs, "user-1");
        assert_eq!(visible.len(), 2);
        assert!(visible.iter().all(|run| run.owner_user_id == "user-1"));
    }
}
