//! Session Store and Session Manager: admission-controlled pool of leased
//! browser sessions. A session exclusively owns its own browser process;
//! `create` calls the `BrowserLauncher` once per session, so `maxConcurrent`
//! bounds the number of live browser processes, not pages sharing one.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedSemaphorePermit, Semaphore};
use tracing::info;

use jarvis_model::{JarvisError, Session, SessionId};

use crate::browser_backend::{BrowserBackend, BrowserLauncher};

#[derive(Debug, Clone, Copy)]
pub struct SessionManagerConfig {
    pub max_concurrent_sessions: usize,
    pub session_idle_ms: i64,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_sessions: 10,
            session_idle_ms: 300_000,
        }
    }
}

struct ManagedSession {
    record: Session,
    backend: Arc<dyn BrowserBackend>,
    _permit: OwnedSemaphorePermit,
}

/// Owns the browser launcher and every live session leased from it. Session
/// admission is gated by a semaphore sized to `max_concurrent_sessions`;
/// once exhausted, `create` fails fast with `CapacityExceeded` rather than
/// queuing, so callers see backpressure immediately instead of stalling.
/// Dropping a session's `ManagedSession` drops its `Arc<dyn BrowserBackend>`,
/// which for the real Chromium backend tears down that session's browser
/// process; by the time a session closes, its last action has already
/// closed its own page (see `ActionEngine::execute`), so the drop order —
/// no open page, then the browser — matches "context then browser".
pub struct SessionManager {
    launcher: Arc<dyn BrowserLauncher>,
    config: SessionManagerConfig,
    semaphore: Arc<Semaphore>,
    sessions: Mutex<HashMap<SessionId, ManagedSession>>,
}

impl SessionManager {
    pub fn new(launcher: Arc<dyn BrowserLauncher>, config: SessionManagerConfig) -> Self {
        Self {
            launcher,
            semaphore: Arc::new(Semaphore::new(config.max_concurrent_sessions)),
            config,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    pub fn max_concurrent(&self) -> usize {
        self.config.max_concurrent_sessions
    }

    pub fn permits_available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub async fn active_count(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub async fn create(&self, owner_user_id: impl Into<String>) -> Result<Session, JarvisError> {
        let permit = Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .map_err(|_| JarvisError::CapacityExceeded(format!("max_concurrent_sessions={} in use", self.config.max_concurrent_sessions)))?;

        let backend = self.launcher.launch().await?;
        let record = Session::new(owner_user_id);
        let session_id = record.id;
        let mut sessions = self.sessions.lock().await;
        sessions.insert(
            session_id,
            ManagedSession {
                record: record.clone(),
                backend,
                _permit: permit,
            },
        );
        info!(session_id = %session_id, "session created");
        Ok(record)
    }

    /// Returns the session record if it exists and is owned by
    /// `owner_user_id`; scoping is enforced here so callers can't probe for
    /// the existence of another tenant's session via a 404-vs-403 timing
    /// difference.
    pub async fn get(&self, session_id: SessionId, owner_user_id: &str) -> Result<Session, JarvisError> {
        let sessions = self.sessions.lock().await;
        let managed = sessions
            .get(&session_id)
            .filter(|managed| managed.record.owner_user_id == owner_user_id)
            .ok_or_else(|| JarvisError::AccessDenied(format!("session {session_id} not found")))?;
        Ok(managed.record.clone())
    }

    pub async fn touch(&self, session_id: SessionId, owner_user_id: &str) -> Result<(), JarvisError> {
        let mut sessions = self.sessions.lock().await;
        let managed = sessions
            .get_mut(&session_id)
            .filter(|managed| managed.record.owner_user_id == owner_user_id)
            .ok_or_else(|| JarvisError::AccessDenied(format!("session {session_id} not found")))?;
        managed.record.touch();
        Ok(())
    }

    pub async fn list(&self, owner_user_id: &str) -> Vec<Session> {
        self.sessions
            .lock()
            .await
            .values()
            .filter(|managed| managed.record.owner_user_id == owner_user_id)
            .map(|managed| managed.record.clone())
            .collect()
    }

    pub async fn close(&self, session_id: SessionId, owner_user_id: &str) -> Result<(), JarvisError> {
        let mut sessions = self.sessions.lock().await;
        sessions
            .get(&session_id)
            .filter(|managed| managed.record.owner_user_id == owner_user_id)
            .ok_or_else(|| JarvisError::AccessDenied(format!("session {session_id} not found")))?;
        sessions.remove(&session_id);
        info!(session_id = %session_id, "session closed");
        Ok(())
    }

    /// Closes every session idle for at least `session_idle_ms`. Called
    /// from a periodic reaper task; approximate by design, a session can
    /// live up to `2 * session_idle_ms` depending on reaper cadence (see
    /// the idle-reaper staleness tradeoff noted in the design ledger).
    pub async fn close_idle(&self) -> usize {
        let idle_ms = self.config.session_idle_ms;
        let mut sessions = self.sessions.lock().await;
        let idle_ids: Vec<SessionId> = sessions
            .iter()
            .filter(|(_, managed)| managed.record.is_idle(idle_ms))
            .map(|(id, _)| *id)
            .collect();
        for session_id in &idle_ids {
            sessions.remove(session_id);
            info!(session_id = %session_id, "idle session reaped");
        }
        idle_ids.len()
    }

    /// Closes every live session regardless of owner or idle state. Used by
    /// the graceful shutdown coordinator.
    pub async fn close_all(&self) -> usize {
        let mut sessions = self.sessions.lock().await;
        let count = sessions.len();
        sessions.clear();
        count
    }

    /// Clones out the session's browser handle and releases the sessions
    /// lock before returning, so a slow action on one session never blocks
    /// lookups or actions on any other session. The action engine opens and
    /// closes its own page against this backend per call.
    pub(crate) async fn leased_backend(&self, session_id: SessionId, owner_user_id: &str) -> Result<Arc<dyn BrowserBackend>, JarvisError> {
        let mut sessions = self.sessions.lock().await;
        let managed = sessions
            .get_mut(&session_id)
            .filter(|managed| managed.record.owner_user_id == owner_user_id)
            .ok_or_else(|| JarvisError::AccessDenied(format!("session {session_id} not found")))?;
        managed.record.touch();
        Ok(Arc::clone(&managed.backend))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{SessionManager, SessionManagerConfig};
    use crate::browser_backend::fake::FakeLauncher;

    fn manager(max: usize) -> SessionManager {
        SessionManager::new(
            Arc::new(FakeLauncher),
            SessionManagerConfig {
                max_concurrent_sessions: max,
                session_idle_ms: 1_000,
            },
        )
    }

    #[tokio::test]
    async fn unit_create_and_get_round_trips_for_owner() {
        let manager = manager(2);
        let session = manager.create("user-1").await.expect("create");
        let fetched = manager.get(session.id, "user-1").await.expect("get");
        assert_eq!(fetched.id, session.id);
    }

    #[tokio::test]
    async fn functional_get_denies_non_owner() {
        let manager = manager(2);
        let session = manager.create("user-1").await.expect("create");
        let err = manager.get(session.id, "user-2").await.expect_err("should be denied");
        assert!(matches!(err, jarvis_model::JarvisError::AccessDenied(_)));
    }

    #[tokio::test]
    async fn regression_create_fails_with_capacity_exceeded_once_semaphore_is_exhausted() {
        let manager = manager(1);
        let _first = manager.create("user-1").await.expect("first session");
        let err = manager.create("user-1").await.expect_err("second session should be denied");
        assert!(matches!(err, jarvis_model::JarvisError::CapacityExceeded(_)));
        assert_eq!(manager.permits_available(), 0);
    }

    #[tokio::test]
    async fn unit_close_releases_the_permit() {
        let manager = manager(1);
        let session = manager.create("user-1").await.expect("create");
        manager.close(session.id, "user-1").await.expect("close");
        assert_eq!(manager.permits_available(), 1);
        manager.create("user-1").await.expect("should admit again");
    }

    #[tokio::test]
    async fn integration_close_idle_reaps_only_stale_sessions() {
        let manager = manager(2);
        let fresh = manager.create("user-1").await.expect("fresh session");
        let stale = manager.create("user-1").await.expect("stale session");
        tokio::time::sleep(std::time::Duration::from_millis(1_100)).await;
        manager.touch(fresh.id, "user-1").await.expect("touch");
        let reaped = manager.close_idle().await;
        assert_eq!(reaped, 1);
        assert!(manager.get(stale.id, "user-1").await.is_err());
        assert!(manager.get(fresh.id, "user-1").await.is_ok());
    }

    #[tokio::test]
    async fn regression_close_all_empties_the_pool() {
        let manager = manager(3);
        manager.create("user-1").await.expect("a");
        manager.create("user-2").await.expect("b");
        let closed = manager.close_all().await;
        assert_eq!(closed, 2);
        assert_eq!(manager.active_count().await, 0);
        assert_eq!(manager.permits_available(), 3);
    }

    #[tokio::test]
    async fn regression_each_session_owns_a_distinct_backend() {
        let manager = manager(2);
        let a = manager.create("user-1").await.expect("a");
        let b = manager.create("user-1").await.expect("b");
        let backend_a = manager.leased_backend(a.id, "user-1").await.expect("backend a");
        let backend_b = manager.leased_backend(b.id, "user-1").await.expect("backend b");
        assert!(!Arc::ptr_eq(&backend_a, &backend_b), "each session must launch its own browser");
    }
}
