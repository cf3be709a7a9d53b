use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::SessionId;

/// A leased browser session. The session manager owns the actual browser
/// handle; this struct is the bookkeeping record returned to callers and
/// used for idle-reaping decisions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub owner_user_id: String,
    pub created_at: DateTime<Utc>,
    pub last_used_at: DateTime<Utc>,
    pub closed: bool,
}

impl Session {
    pub fn new(owner_user_id: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            owner_user_id: owner_user_id.into(),
            created_at: now,
            last_used_at: now,
            closed: false,
        }
    }

    pub fn touch(&mut self) {
        self.last_used_at = Utc::now();
    }

    /// A session is idle once it has sat unused for `idle_ms`. The reaper
    /// additionally waits for `2 * idle_ms` of true staleness before forcing
    /// a close out from under a caller that might still be mid-action — see
    /// the idle-reaper Open Question in the design notes.
    pub fn is_idle(&self, idle_ms: i64) -> bool {
        (Utc::now() - self.last_used_at).num_milliseconds() >= idle_ms
    }
}

#[cfg(test)]
mod tests {
    use super::Session;

    #[test]
    fn unit_new_session_is_not_idle() {
        let session = Session::new("user-1");
        assert!(!session.is_idle(1_000));
    }

    #[test]
    fn unit_touch_resets_idle_clock() {
        let mut session = Session::new("user-1");
        session.last_used_at -= chrono::Duration::milliseconds(5_000);
        assert!(session.is_idle(1_000));
        session.touch();
        assert!(!session.is_idle(1_000));
    }
}
