//! Per-user admission control: requests-per-minute and concurrent-run caps.
//!
//! Generalized from the lifecycle authorize/enforce shape used elsewhere in
//! this workspace's access-control code into a counting limiter, since run
//! admission isn't a policy-file decision but a live counter.

use std::collections::HashMap;
use std::sync::Mutex;

use jarvis_model::JarvisError;

#[derive(Debug, Clone, Copy)]
pub struct TenantLimitConfig {
    pub requests_per_minute: u32,
    pub max_concurrent_runs: u32,
}

impl Default for TenantLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: 60,
            max_concurrent_runs: 5,
        }
    }
}

#[derive(Debug, Default)]
struct TenantState {
    window_start_ms: i64,
    requests_in_window: u32,
    concurrent_runs: u32,
}

/// In-memory per-user limiter. One process-wide instance is shared across
/// the orchestrator's run-admission path.
pub struct TenantLimiter {
    config: TenantLimitConfig,
    state: Mutex<HashMap<String, TenantState>>,
}

impl TenantLimiter {
    pub fn new(config: TenantLimitConfig) -> Self {
        Self {
            config,
            state: Mutex::new(HashMap::new()),
        }
    }

    /// Checks and records one admission attempt. Returns `RateLimit` when
    /// the per-minute budget is exhausted, `CapacityExceeded` when the
    /// concurrent-run cap is hit. Call [`Self::release`] when the run
    /// finishes so the concurrency slot is returned.
    pub fn try_admit(&self, owner_user_id: &str, now_unix_ms: i64) -> Result<(), JarvisError> {
        let mut state = self.state.lock().expect("tenant limiter mutex poisoned");
        let entry = state.entry(owner_user_id.to_string()).or_default();

        if now_unix_ms - entry.window_start_ms >= 60_000 {
            entry.window_start_ms = now_unix_ms;
            entry.requests_in_window = 0;
        }

        if entry.requests_in_window >= self.config.requests_per_minute {
            return Err(JarvisError::RateLimit(format!(
                "user {owner_user_id} exceeded {} requests/minute",
                self.config.requests_per_minute
            )));
        }
        if entry.concurrent_runs >= self.config.max_concurrent_runs {
            return Err(JarvisError::CapacityExceeded(format!(
                "user {owner_user_id} already has {} concurrent runs",
                self.config.max_concurrent_runs
            )));
        }

        entry.requests_in_window += 1;
        entry.concurrent_runs += 1;
        Ok(())
    }

    pub fn release(&self, owner_user_id: &str) {
        let mut state = self.state.lock().expect("tenant limiter mutex poisoned");
        if let Some(entry) = state.get_mut(owner_user_id) {
            entry.concurrent_runs = entry.concurrent_runs.saturating_sub(1);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{TenantLimitConfig, TenantLimiter};

    #[test]
    fn unit_try_admit_allows_up_to_the_configured_budget() {
        let limiter = TenantLimiter::new(TenantLimitConfig {
            requests_per_minute: 2,
            max_concurrent_runs: 10,
        });
        assert!(limiter.try_admit("user-1", 0).is_ok());
        assert!(limiter.try_admit("user-1", 0).is_ok());
        let error = limiter.try_admit("user-1", 0).expect_err("third should be denied");
        assert_eq!(error.code(), "rate_limit_exceeded");
    }

    #[test]
    fn functional_window_resets_after_sixty_seconds() {
        let limiter = TenantLimiter::new(TenantLimitConfig {
            requests_per_minute: 1,
            max_concurrent_runs: 10,
        });
        assert!(limiter.try_admit("user-1", 0).is_ok());
        assert!(limiter.try_admit("user-1", 30_000).is_err());
        assert!(limiter.try_admit("user-1", 61_000).is_ok());
    }

    #[test]
    fn regression_concurrent_run_cap_is_independent_of_request_rate() {
        let limiter = TenantLimiter::new(TenantLimitConfig {
            requests_per_minute: 100,
            max_concurrent_runs: 1,
        });
        assert!(limiter.try_admit("user-1", 0).is_ok());
        let error = limiter.try_admit("user-1", 0).expect_err("second concurrent run denied");
        assert_eq!(error.code(), "capacity_exceeded");
        limiter.release("user-1");
        assert!(limiter.try_admit("user-1", 0).is_ok());
    }
}
