//! Periodic idle-session reaping: spec.md §5 — "a periodic task (period =
//! `SESSION_IDLE_MS`) calls `CloseIdle(SESSION_IDLE_MS)`." Spawned once at
//! bootstrap; its `JoinHandle` is handed to the [`crate::shutdown::ShutdownCoordinator`]
//! so shutdown can stop it before draining sessions itself.

use std::sync::Arc;
use std::time::Duration;

use jarvis_browser::SessionManager;
use tokio::task::JoinHandle;
use tracing::info;

pub fn spawn_idle_reaper(session_manager: Arc<SessionManager>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            let reaped = session_manager.close_idle().await;
            if reaped > 0 {
                info!(reaped, "idle reaper closed stale sessions");
            }
        }
    })
}
