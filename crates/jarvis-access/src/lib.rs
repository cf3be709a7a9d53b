//! Owner-scoped access control and per-tenant rate limiting for runs.
//!
//! Provides the narrow authorization checks the orchestrator needs on every
//! `GetRun`/`ListRuns` call plus the token-bucket limiter that gates new run
//! admission, grounded on the same authorize-then-log-then-enforce shape
//! used across the rest of this workspace's access-control code.

pub mod rbac;
pub mod tenant_limiter;

pub use rbac::{authorize_run_access, enforce_run_access, filter_runs_for_owner, RbacDecision};
pub use tenant_limiter::{TenantLimitConfig, TenantLimiter};
