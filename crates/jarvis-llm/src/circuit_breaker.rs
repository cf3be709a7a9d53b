//! Per-route circuit breaker with an explicit half-open probing state.
//!
//! Grounded on the open/cooldown tracking used by the provider fallback
//! router this facade replaces, extended with a half-open state: the
//! teacher's version only tracked `open_until_unix_ms` and implicitly
//! treated "cooldown elapsed" as fully closed again, which under load lets
//! a still-unhealthy route absorb a full burst of traffic the instant its
//! cooldown expires. Half-open limits that burst to `half_open_max_attempts`
//! trial requests before deciding to re-close or re-open.

use std::sync::Mutex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CircuitBreakerConfig {
    pub enabled: bool,
    pub failure_threshold: usize,
    pub recovery_timeout_ms: u64,
    pub half_open_max_attempts: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            failure_threshold: 5,
            recovery_timeout_ms: 60_000,
            half_open_max_attempts: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
struct RouteCircuit {
    consecutive_failures: usize,
    open_until_unix_ms: Option<u64>,
    half_open_attempts: usize,
}

impl Default for RouteCircuit {
    fn default() -> Self {
        Self {
            consecutive_failures: 0,
            open_until_unix_ms: None,
            half_open_attempts: 0,
        }
    }
}

/// Decision returned by [`CircuitBreaker::poll`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitDecision {
    /// Route may be called now. Carries the state the call is made under,
    /// since a `HalfOpen` call must be followed by `record_success`/
    /// `record_failure` to resolve the probe.
    Allow(CircuitState),
    /// Route is open; `retry_after_unix_ms` says when it may reopen.
    Skip { retry_after_unix_ms: u64 },
}

pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    routes: Mutex<Vec<RouteCircuit>>,
}

impl CircuitBreaker {
    pub fn new(config: CircuitBreakerConfig, route_count: usize) -> Self {
        Self {
            config,
            routes: Mutex::new(vec![RouteCircuit::default(); route_count]),
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<RouteCircuit>> {
        match self.routes.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    pub fn poll(&self, route_index: usize, now_unix_ms: u64) -> CircuitDecision {
        if !self.config.enabled {
            return CircuitDecision::Allow(CircuitState::Closed);
        }
        let mut routes = self.lock();
        let Some(route) = routes.get_mut(route_index) else {
            return CircuitDecision::Allow(CircuitState::Closed);
        };

        match route.open_until_unix_ms {
            None => CircuitDecision::Allow(CircuitState::Closed),
            Some(open_until) if now_unix_ms < open_until => {
                CircuitDecision::Skip { retry_after_unix_ms: open_until }
            }
            Some(_) => {
                // Cooldown elapsed: enter half-open and allow a bounded probe.
                if route.half_open_attempts < self.config.half_open_max_attempts.max(1) {
                    route.half_open_attempts += 1;
                    CircuitDecision::Allow(CircuitState::HalfOpen)
                } else {
                    CircuitDecision::Skip { retry_after_unix_ms: now_unix_ms }
                }
            }
        }
    }

    pub fn record_success(&self, route_index: usize) {
        let mut routes = self.lock();
        if let Some(route) = routes.get_mut(route_index) {
            *route = RouteCircuit::default();
        }
    }

    /// Returns `Some(open_until_unix_ms)` when this failure (re)opened the
    /// circuit.
    pub fn record_failure(&self, route_index: usize, now_unix_ms: u64) -> Option<u64> {
        if !self.config.enabled {
            return None;
        }
        let mut routes = self.lock();
        let route = routes.get_mut(route_index)?;

        let was_half_open = route.half_open_attempts > 0 && route.open_until_unix_ms.is_some();
        if was_half_open {
            let open_until = now_unix_ms.saturating_add(self.config.recovery_timeout_ms);
            route.open_until_unix_ms = Some(open_until);
            route.half_open_attempts = 0;
            route.consecutive_failures = 0;
            return Some(open_until);
        }

        route.consecutive_failures = route.consecutive_failures.saturating_add(1);
        if route.consecutive_failures < self.config.failure_threshold.max(1) {
            return None;
        }
        let open_until = now_unix_ms.saturating_add(self.config.recovery_timeout_ms);
        route.open_until_unix_ms = Some(open_until);
        route.consecutive_failures = 0;
        Some(open_until)
    }
}

#[cfg(test)]
mod tests {
    use super::{CircuitBreaker, CircuitBreakerConfig, CircuitDecision, CircuitState};

    fn breaker(failure_threshold: usize, recovery_timeout_ms: u64, half_open_max_attempts: usize) -> CircuitBreaker {
        CircuitBreaker::new(
            CircuitBreakerConfig {
                enabled: true,
                failure_threshold,
                recovery_timeout_ms,
                half_open_max_attempts,
            },
            1,
        )
    }

    #[test]
    fn unit_circuit_opens_after_failure_threshold() {
        let breaker = breaker(2, 10_000, 1);
        assert_eq!(breaker.record_failure(0, 0), None);
        assert_eq!(breaker.record_failure(0, 0), Some(10_000));
        assert_eq!(breaker.poll(0, 5_000), CircuitDecision::Skip { retry_after_unix_ms: 10_000 });
    }

    #[test]
    fn functional_half_open_allows_bounded_probes_after_cooldown() {
        let breaker = breaker(1, 10_000, 2);
        assert_eq!(breaker.record_failure(0, 0), Some(10_000));

        assert_eq!(breaker.poll(0, 10_001), CircuitDecision::Allow(CircuitState::HalfOpen));
        assert_eq!(breaker.poll(0, 10_001), CircuitDecision::Allow(CircuitState::HalfOpen));
        assert!(matches!(breaker.poll(0, 10_001), CircuitDecision::Skip { .. }));
    }

    #[test]
    fn regression_half_open_failure_reopens_circuit_immediately() {
        let breaker = breaker(1, 10_000, 3);
        breaker.record_failure(0, 0);
        assert_eq!(breaker.poll(0, 10_001), CircuitDecision::Allow(CircuitState::HalfOpen));
        let reopened_until = breaker.record_failure(0, 10_001).expect("half-open failure reopens");
        assert_eq!(reopened_until, 20_001);
        assert!(matches!(breaker.poll(0, 10_500), CircuitDecision::Skip { .. }));
    }

    #[test]
    fn regression_success_fully_resets_route_state() {
        let breaker = breaker(1, 10_000, 2);
        breaker.record_failure(0, 0);
        assert_eq!(breaker.poll(0, 10_001), CircuitDecision::Allow(CircuitState::HalfOpen));
        breaker.record_success(0);
        assert_eq!(breaker.poll(0, 10_002), CircuitDecision::Allow(CircuitState::Closed));
    }
}
