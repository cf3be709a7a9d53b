//! `Cli`: one `#[arg(long, env = "...")]` field per environment variable in
//! spec.md §6, mirroring the teacher's `tau-cli::Cli` derive shape.

use clap::{ArgAction, Parser};

fn parse_positive_u32(value: &str) -> Result<u32, String> {
    let parsed = value.parse::<u32>().map_err(|error| format!("failed to parse integer: {error}"))?;
    if parsed == 0 {
        return Err("value must be greater than 0".to_string());
    }
    Ok(parsed)
}

fn parse_browser_max_concurrent(value: &str) -> Result<usize, String> {
    let parsed = value.parse::<usize>().map_err(|error| format!("failed to parse integer: {error}"))?;
    if !(1..=10).contains(&parsed) {
        return Err("BROWSER_MAX_CONCURRENT must be in range 1..=10".to_string());
    }
    Ok(parsed)
}

#[derive(Debug, Clone, Parser)]
#[command(name = "jarvis", about = "Jarvis agent execution platform gateway", version)]
pub struct Cli {
    /// Bind port for the HTTP listener.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Session semaphore capacity (1..10).
    #[arg(long, env = "BROWSER_MAX_CONCURRENT", default_value_t = 10, value_parser = parse_browser_max_concurrent)]
    pub browser_max_concurrent: usize,

    /// Reap sessions idle longer than this, in milliseconds.
    #[arg(long, env = "SESSION_IDLE_MS", default_value_t = 300_000)]
    pub session_idle_ms: i64,

    /// Default per-action timeout, in milliseconds.
    #[arg(long, env = "MAX_NAVIGATION_TIMEOUT_MS", default_value_t = 30_000)]
    pub max_navigation_timeout_ms: u64,

    /// Enable the `evaluate` action, subject to the script safety policy.
    #[arg(
        long,
        env = "ALLOW_EVALUATE",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub allow_evaluate: bool,

    /// Reject private/loopback/link-local addresses at the URL policy.
    #[arg(
        long,
        env = "BLOCK_PRIVATE_ADDR",
        default_value_t = true,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub block_private_addr: bool,

    /// Exempt literal loopback hosts from `BLOCK_PRIVATE_ADDR`.
    #[arg(
        long,
        env = "ALLOW_LOCALHOST",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub allow_localhost: bool,

    /// Permit browser downloads to proceed instead of being cancelled.
    #[arg(
        long,
        env = "ALLOW_DOWNLOADS",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub allow_downloads: bool,

    /// Per-run budget for LLM completions.
    #[arg(long, env = "MAX_LLM_CALLS_PER_RUN", default_value_t = 10, value_parser = parse_positive_u32)]
    pub max_llm_calls_per_run: u32,

    /// Per-run budget for browser actions.
    #[arg(long, env = "MAX_BROWSER_STEPS_PER_RUN", default_value_t = 20, value_parser = parse_positive_u32)]
    pub max_browser_steps_per_run: u32,

    /// Wall-clock deadline for one node's execution, in milliseconds.
    #[arg(long, env = "AGENT_NODE_TIMEOUT_MS", default_value_t = 30_000)]
    pub agent_node_timeout_ms: u64,

    /// Wall-clock deadline for a run as a whole, in milliseconds.
    #[arg(long, env = "AGENT_RUN_TIMEOUT_MS", default_value_t = 120_000)]
    pub agent_run_timeout_ms: u64,

    /// Route new runs through the queue bridge instead of executing inline.
    #[arg(
        long,
        env = "ASYNC_JOBS",
        default_value_t = false,
        action = ArgAction::Set,
        num_args = 0..=1,
        require_equals = true,
        default_missing_value = "true"
    )]
    pub async_jobs: bool,

    /// Per-user requests-per-minute admission budget.
    #[arg(long, env = "USER_RATE_LIMIT_PER_MINUTE", default_value_t = 60, value_parser = parse_positive_u32)]
    pub user_rate_limit_per_minute: u32,

    /// Per-user concurrent-run admission budget.
    #[arg(long, env = "USER_MAX_CONCURRENT_RUNS", default_value_t = 5, value_parser = parse_positive_u32)]
    pub user_max_concurrent_runs: u32,

    /// `memory` (the only backend this binary implements) or the name of an
    /// external session store a future adapter would plug in.
    #[arg(long, env = "SESSION_STORE_TYPE", default_value = "memory")]
    pub session_store_type: String,

    /// Idempotency-key replay window, in milliseconds.
    #[arg(long, env = "IDEMPOTENCY_TTL_MS", default_value_t = 24 * 60 * 60 * 1_000)]
    pub idempotency_ttl_ms: i64,

    /// Optional NDJSON audit-log path the shutdown drain flushes to.
    /// Grounded on `jarvis-core`'s log rotation; absent disables the sink.
    #[arg(long, env = "AUDIT_LOG_PATH")]
    pub audit_log_path: Option<std::path::PathBuf>,
}

impl Cli {
    pub fn bind_addr(&self) -> std::net::SocketAddr {
        std::net::SocketAddr::from(([0, 0, 0, 0], self.port))
    }
}

#[cfg(test)]
mod tests {
    use super::Cli;
    use clap::Parser;

    #[test]
    fn unit_defaults_match_spec_defaults_when_no_flags_given() {
        let cli = Cli::parse_from(["jarvis"]);
        assert_eq!(cli.port, 8080);
        assert_eq!(cli.browser_max_concurrent, 10);
        assert_eq!(cli.session_idle_ms, 300_000);
        assert!(!cli.async_jobs);
        assert_eq!(cli.session_store_type, "memory");
    }

    #[test]
    fn unit_browser_max_concurrent_out_of_range_is_rejected() {
        let result = Cli::try_parse_from(["jarvis", "--browser-max-concurrent", "11"]);
        assert!(result.is_err());
    }

    #[test]
    fn functional_explicit_flags_override_defaults() {
        let cli = Cli::parse_from(["jarvis", "--port", "9090", "--allow-evaluate", "--async-jobs"]);
        assert_eq!(cli.port, 9090);
        assert!(cli.allow_evaluate);
        assert!(cli.async_jobs);
    }
}
