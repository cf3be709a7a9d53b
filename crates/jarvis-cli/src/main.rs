//! `jarvis`: parses environment/flags into a [`jarvis_cli::Cli`], bootstraps
//! the orchestrator and browser stack, spawns the idle reaper and (if
//! `ASYNC_JOBS` is set) the queue worker, then serves the HTTP gateway
//! until a termination signal drains everything in order.

use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use jarvis_cli::{bootstrap, Cli, TelemetrySink};
use jarvis_gateway::GatewayState;
use jarvis_orchestrator::{run_queue_worker, run_until_shutdown, spawn_idle_reaper, ShutdownCoordinator};
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let telemetry = TelemetrySink::new(cli.audit_log_path.clone());

    let wired = bootstrap(&cli).await;
    let coordinator = Arc::new(ShutdownCoordinator::new(wired.session_manager.clone(), wired.queue.clone()));

    if let Some(session_manager) = wired.session_manager.clone() {
        let handle = spawn_idle_reaper(session_manager, Duration::from_millis(cli.session_idle_ms.max(0) as u64));
        coordinator.set_reaper_handle(handle);
    }

    let queue_worker = wired.queue.clone().map(|queue| {
        let orchestrator = Arc::clone(&wired.orchestrator);
        tokio::spawn(run_queue_worker(orchestrator, queue, Duration::from_millis(500)))
    });

    let state = Arc::new(GatewayState::new(Arc::clone(&wired.orchestrator), wired.session_manager.clone(), wired.action_engine_config));

    info!(port = cli.port, async_jobs = cli.async_jobs, browser_enabled = wired.session_manager.is_some(), "jarvis starting");

    let addr = cli.bind_addr();
    // The gateway runs as its own task so a termination signal can drive
    // the ordered shutdown drain below without the two racing each other
    // away mid-drain: `serve` has its own `ctrl_c`-triggered graceful stop,
    // but the coordinator's stop-reaper/close-sessions/drain-queue sequence
    // must run to completion regardless of which future notices the signal
    // first.
    let gateway_handle = tokio::spawn(jarvis_gateway::serve(state, addr));

    run_until_shutdown(Arc::clone(&coordinator)).await;

    if let Some(handle) = queue_worker {
        handle.abort();
    }
    gateway_handle.abort();
    telemetry.flush(serde_json::json!({"event": "shutdown_complete"})).await;

    Ok(())
}
