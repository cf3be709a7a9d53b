//! Queue Bridge: sends/receives queued run requests to/from a durable
//! queue. `InMemoryQueueBridge` is the default, process-local
//! implementation; `QueueBridge` is the seam a future durable backend
//! (SQS, Redis streams, Postgres-backed queue) plugs into without the
//! orchestrator changing.

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jarvis_model::{AgentKind, NodeId, RunId};
use tokio::sync::{Mutex, Notify};
use tracing::{info, warn};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const BASE_BACKOFF_MS: i64 = 500;
const MAX_BACKOFF_MS: i64 = 30_000;

/// One enqueued unit of work: `{runId, nodeId, agentKind, userId}` plus the
/// retry bookkeeping the bridge itself owns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueuedJob {
    pub run_id: RunId,
    pub node_id: NodeId,
    pub agent_kind: AgentKind,
    pub owner_user_id: String,
    pub attempts: u32,
    pub max_attempts: u32,
    pub available_at: DateTime<Utc>,
}

impl QueuedJob {
    pub fn new(run_id: RunId, node_id: NodeId, agent_kind: AgentKind, owner_user_id: impl Into<String>) -> Self {
        Self {
            run_id,
            node_id,
            agent_kind,
            owner_user_id: owner_user_id.into(),
            attempts: 0,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            available_at: Utc::now(),
        }
    }

    pub fn exhausted(&self) -> bool {
        self.attempts >= self.max_attempts
    }
}

/// Exponential backoff with no jitter, capped at `MAX_BACKOFF_MS`: the
/// queue bridge is a local-retry concern, not a provider call, so jitter
/// against thundering herds matters less than it does in the LLM client.
fn backoff_delay_ms(attempts: u32) -> i64 {
    let shift = attempts.min(10);
    (BASE_BACKOFF_MS.saturating_mul(1i64 << shift)).min(MAX_BACKOFF_MS)
}

#[async_trait]
pub trait QueueBridge: Send + Sync {
    async fn send(&self, job: QueuedJob);

    /// Pops the next job whose `available_at` has passed, if any.
    async fn receive(&self) -> Option<QueuedJob>;

    /// Re-enqueues a failed job with its attempt counter incremented and an
    /// exponential backoff delay applied. Returns `false` (and drops the
    /// job) once `max_attempts` is exhausted.
    async fn requeue_with_backoff(&self, job: QueuedJob) -> bool;

    async fn len(&self) -> usize;

    /// Removes and returns every job still queued, regardless of
    /// `available_at`. Used by the graceful shutdown coordinator to drain
    /// the queue before exit.
    async fn drain(&self) -> Vec<QueuedJob>;
}

#[derive(Default)]
struct QueueState {
    jobs: VecDeque<QueuedJob>,
}

/// Process-local queue. Jobs are held in creation order; `receive` returns
/// the first job whose delay has elapsed, skipping over still-delayed jobs
/// behind it rather than blocking the whole queue on one backoff.
pub struct InMemoryQueueBridge {
    state: Mutex<QueueState>,
    notify: Notify,
}

impl Default for InMemoryQueueBridge {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryQueueBridge {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(QueueState::default()),
            notify: Notify::new(),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl QueueBridge for InMemoryQueueBridge {
    async fn send(&self, job: QueuedJob) {
        info!(run_id = %job.run_id, node_id = %job.node_id, agent_kind = %job.agent_kind, "job enqueued");
        self.state.lock().await.jobs.push_back(job);
        self.notify.notify_one();
    }

    async fn receive(&self) -> Option<QueuedJob> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let ready_index = state.jobs.iter().position(|job| job.available_at <= now)?;
        state.jobs.remove(ready_index)
    }

    async fn requeue_with_backoff(&self, mut job: QueuedJob) -> bool {
        job.attempts += 1;
        if job.exhausted() {
            warn!(run_id = %job.run_id, node_id = %job.node_id, attempts = job.attempts, "job exhausted retry budget, dropping");
            return false;
        }
        let delay_ms = backoff_delay_ms(job.attempts);
        job.available_at = Utc::now() + chrono::Duration::milliseconds(delay_ms);
        info!(run_id = %job.run_id, node_id = %job.node_id, attempts = job.attempts, delay_ms, "job requeued with backoff");
        self.state.lock().await.jobs.push_back(job);
        self.notify.notify_one();
        true
    }

    async fn len(&self) -> usize {
        self.state.lock().await.jobs.len()
    }

    async fn drain(&self) -> Vec<QueuedJob> {
        let mut state = self.state.lock().await;
        state.jobs.drain(..).collect()
    }
}
