//! Drains the queue bridge and runs each job through
//! [`crate::orchestrator::Orchestrator::run_sync`], matching spec.md §4.7's
//! "queued runs stay in `pending` until a worker picks them up and sets
//! `running`." A job whose failure is retryable re-enters the bridge with
//! backoff via [`jarvis_queue::QueueBridge::requeue_with_backoff`]; anything
//! else is left as the run's terminal failure.

use std::sync::Arc;
use std::time::Duration;

use jarvis_model::JarvisError;
use jarvis_queue::QueueBridge;
use tracing::{info, warn};

use crate::orchestrator::Orchestrator;

/// Runs forever, polling `queue` for ready jobs. Intended to be spawned as
/// a background task; cancel by aborting its `JoinHandle` (the shutdown
/// coordinator does this indirectly by draining the queue rather than
/// racing the worker, since a job already in flight should finish).
pub async fn run_queue_worker(orchestrator: Arc<Orchestrator>, queue: Arc<dyn QueueBridge>, poll_interval: Duration) {
    loop {
        match queue.receive().await {
            Some(job) => {
                info!(run_id = %job.run_id, agent_kind = %job.agent_kind, "queue worker picked up job");
                let result = orchestrator
                    .run_sync(job.run_id, &job.owner_user_id, job.agent_kind, None)
                    .await;
                match result {
                    Ok(run) => {
                        info!(run_id = %run.id, status = run.status.as_str(), "queued run finished");
                    }
                    Err(error) if is_retryable_queue_error(&error) => {
                        warn!(run_id = %job.run_id, error = %error, "queued run failed with a retryable error, requeuing");
                        queue.requeue_with_backoff(job).await;
                    }
                    Err(error) => {
                        warn!(run_id = %job.run_id, error = %error, "queued run failed terminally");
                    }
                }
            }
            None => tokio::time::sleep(poll_interval).await,
        }
    }
}

fn is_retryable_queue_error(error: &JarvisError) -> bool {
    error.is_retryable()
}
