use thiserror::Error;

use crate::{NodeId, RunId};

/// Domain error taxonomy shared by every crate that sits above the data
/// model. HTTP/CLI adapters map each variant to a status/exit code; nothing
/// below the adapter layer should need to know what that mapping is.
#[derive(Debug, Error)]
pub enum JarvisError {
    #[error("validation failed: {0}")]
    Validation(String),

    #[error("authentication required")]
    Authentication,

    #[error("access denied: {0}")]
    AccessDenied(String),

    #[error("run {0} not found")]
    RunNotFound(RunId),

    #[error("node {0} not found")]
    NodeNotFound(NodeId),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("rate limit exceeded: {0}")]
    RateLimit(String),

    #[error("capacity exceeded: {0}")]
    CapacityExceeded(String),

    #[error("external service error: {0}")]
    ExternalService(String),

    #[error("policy violation: {0}")]
    PolicyViolation(String),

    #[error("budget exceeded: {0}")]
    BudgetExceeded(String),

    #[error("operation timed out: {0}")]
    Timeout(String),

    #[error("circuit open for {0}")]
    CircuitOpen(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl JarvisError {
    /// Stable machine-readable code, independent of the human message, for
    /// log aggregation and the gateway's `{error}` response field.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation_error",
            Self::Authentication => "authentication_required",
            Self::AccessDenied(_) => "access_denied",
            Self::RunNotFound(_) => "run_not_found",
            Self::NodeNotFound(_) => "node_not_found",
            Self::Conflict(_) => "conflict",
            Self::RateLimit(_) => "rate_limit_exceeded",
            Self::CapacityExceeded(_) => "capacity_exceeded",
            Self::ExternalService(_) => "external_service_error",
            Self::PolicyViolation(_) => "policy_violation",
            Self::BudgetExceeded(_) => "budget_exceeded",
            Self::Timeout(_) => "timeout",
            Self::CircuitOpen(_) => "circuit_open",
            Self::Internal(_) => "internal_error",
        }
    }

    /// True for errors a caller can plausibly retry unchanged (as opposed to
    /// `Validation`/`AccessDenied`, which will fail again on retry).
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::RateLimit(_) | Self::ExternalService(_) | Self::Timeout(_) | Self::CircuitOpen(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::JarvisError;
    use crate::RunId;

    #[test]
    fn unit_error_code_is_stable_and_independent_of_message() {
        let a = JarvisError::RunNotFound(RunId::new());
        let b = JarvisError::RunNotFound(RunId::new());
        assert_eq!(a.code(), b.code());
        assert_eq!(a.code(), "run_not_found");
    }

    #[test]
    fn unit_retryable_classification_matches_taxonomy() {
        assert!(JarvisError::Timeout("node".into()).is_retryable());
        assert!(!JarvisError::Validation("bad input".into()).is_retryable());
        assert!(!JarvisError::AccessDenied("owner mismatch".into()).is_retryable());
    }
}
