//! Idempotency-key store: spec.md §6/§8 require that replaying a request
//! with the same `Idempotency-Key` within its TTL returns the original
//! run's identifier and never creates a new one. The gateway validates the
//! header's charset; this crate only needs `get`/`put` with expiry.

use std::collections::HashMap;
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use jarvis_model::RunId;

#[async_trait::async_trait]
pub trait IdempotencyStore: Send + Sync {
    async fn get(&self, key: &str) -> Option<RunId>;
    async fn put(&self, key: String, run_id: RunId, ttl_ms: i64);
}

struct Entry {
    run_id: RunId,
    expires_at: DateTime<Utc>,
}

#[derive(Default)]
pub struct InMemoryIdempotencyStore {
    entries: Mutex<HashMap<String, Entry>>,
}

impl InMemoryIdempotencyStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl IdempotencyStore for InMemoryIdempotencyStore {
    async fn get(&self, key: &str) -> Option<RunId> {
        let mut entries = self.entries.lock().expect("idempotency store mutex poisoned");
        match entries.get(key) {
            Some(entry) if entry.expires_at > Utc::now() => Some(entry.run_id),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    async fn put(&self, key: String, run_id: RunId, ttl_ms: i64) {
        let mut entries = self.entries.lock().expect("idempotency store mutex poisoned");
        entries.insert(
            key,
            Entry {
                run_id,
                expires_at: Utc::now() + chrono::Duration::milliseconds(ttl_ms),
            },
        );
    }
}
