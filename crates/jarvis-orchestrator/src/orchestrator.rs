//! The Jarvis Orchestrator: spec.md §4.7. Accepts run requests, selects an
//! agent, enforces owner-scoped access and per-tenant admission, and
//! dispatches either inline (under a wall-clock deadline) or through the
//! queue bridge.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use jarvis_access::{enforce_run_access, filter_runs_for_owner, TenantLimiter};
use jarvis_llm::LlmFacade;
use jarvis_model::{Agent, AgentId, AgentKind, JarvisError, NodeExecution, NodeId, Run, RunError, RunId};
use jarvis_queue::{QueueBridge, QueuedJob};
use serde_json::Value;
use tracing::{info, warn};

use crate::agent_handler::{AgentHandler, BudgetLimits, HandlerContext};
use crate::agent_selection::select_agent_kind;
use crate::idempotency::IdempotencyStore;
use crate::request::RunInput;
use crate::run_store::RunStore;

#[derive(Debug, Clone, Copy)]
pub struct OrchestratorConfig {
    pub agent_node_timeout_ms: u64,
    pub agent_run_timeout_ms: u64,
    pub async_jobs: bool,
    pub idempotency_ttl_ms: i64,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            agent_node_timeout_ms: 30_000,
            agent_run_timeout_ms: 120_000,
            async_jobs: false,
            idempotency_ttl_ms: 24 * 60 * 60 * 1_000,
        }
    }
}

/// One page of a run's node log, per spec.md §6's cursor-paged
/// `/v1/runs/:id/logs`. `next_cursor` is the opaque string the caller
/// replays to fetch the next page; `None` means there is none.
#[derive(Debug, Clone, serde::Serialize)]
pub struct LogPage {
    pub nodes: Vec<NodeExecution>,
    pub next_cursor: Option<String>,
}

/// Outcome of [`Orchestrator::create_run`]: the run plus whether it was
/// served from the idempotency store rather than freshly created. The
/// gateway needs this distinction to pick 200-on-replay vs. 200-sync/
/// 202-async per spec.md §6 ("on a replay... the response of the original
/// run is returned with status 200 instead of 201").
#[derive(Debug, Clone)]
pub struct RunAdmission {
    pub run: Run,
    pub replayed: bool,
}

/// Registers `AgentHandler`s alongside a static `Agent` descriptor, the way
/// [`jarvis_llm::LlmFacadeBuilder`] registers provider routes. `Browser` is
/// typically absent unless a browser backend was wired at bootstrap.
#[derive(Default)]
pub struct OrchestratorBuilder {
    handlers: HashMap<AgentKind, Arc<dyn AgentHandler>>,
    agents: HashMap<AgentKind, Agent>,
    config: OrchestratorConfig,
    budgets: BudgetLimits,
}

impl OrchestratorBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn config(mut self, config: OrchestratorConfig) -> Self {
        self.config = config;
        self
    }

    pub fn budgets(mut self, budgets: BudgetLimits) -> Self {
        self.budgets = budgets;
        self
    }

    pub fn register(mut self, kind: AgentKind, handler: Arc<dyn AgentHandler>) -> Self {
        self.agents.insert(kind, Agent::new(kind.as_str(), kind));
        self.handlers.insert(kind, handler);
        self
    }

    pub fn build(
        self,
        run_store: Arc<RunStore>,
        llm_facade: Arc<LlmFacade>,
        session_manager: Option<Arc<jarvis_browser::SessionManager>>,
        action_engine_config: jarvis_browser::ActionEngineConfig,
        tenant_limiter: Arc<TenantLimiter>,
        idempotency: Arc<dyn IdempotencyStore>,
        queue: Option<Arc<dyn QueueBridge>>,
    ) -> Orchestrator {
        Orchestrator {
            config: self.config,
            handlers: self.handlers,
            agents: self.agents,
            ctx: HandlerContext {
                llm_facade,
                session_manager,
                action_engine_config,
                budgets: self.budgets,
                run_store: Arc::clone(&run_store),
            },
            run_store,
            tenant_limiter,
            idempotency,
            queue,
        }
    }
}

pub struct Orchestrator {
    config: OrchestratorConfig,
    handlers: HashMap<AgentKind, Arc<dyn AgentHandler>>,
    agents: HashMap<AgentKind, Agent>,
    run_store: Arc<RunStore>,
    ctx: HandlerContext,
    tenant_limiter: Arc<TenantLimiter>,
    idempotency: Arc<dyn IdempotencyStore>,
    queue: Option<Arc<dyn QueueBridge>>,
}

impl Orchestrator {
    fn agent_for(&self, kind: AgentKind) -> Result<(&Agent, &Arc<dyn AgentHandler>), JarvisError> {
        let agent = self
            .agents
            .get(&kind)
            .ok_or_else(|| JarvisError::Validation(format!("agent kind '{kind}' is not registered")))?;
        let handler = self.handlers.get(&kind).expect("handler registered alongside agent descriptor");
        Ok((agent, handler))
    }

    /// spec.md §4.7: select an agent, admit the run against the tenant
    /// limiter, persist it `pending`, then either enqueue it or execute it
    /// inline under a deadline. Returns the run's state as of the call's
    /// return — `pending` for async dispatch, a terminal status for sync.
    pub async fn create_run(
        &self,
        owner_user_id: &str,
        input: RunInput,
        idempotency_key: Option<&str>,
    ) -> Result<RunAdmission, JarvisError> {
        if let Some(key) = idempotency_key {
            if let Some(existing_run_id) = self.idempotency.get(key).await {
                if let Some(run) = self.run_store.get_run(existing_run_id) {
                    info!(run_id = %run.id, idempotency_key = key, "idempotent replay, returning original run");
                    return Ok(RunAdmission { run, replayed: true });
                }
            }
        }

        self.tenant_limiter.try_admit(owner_user_id, Utc::now().timestamp_millis())?;

        let kind = select_agent_kind(&input);
        let dispatched = self.dispatch(owner_user_id, kind, input, idempotency_key).await;
        self.tenant_limiter.release(owner_user_id);
        dispatched.map(|run| RunAdmission { run, replayed: false })
    }

    async fn dispatch(&self, owner_user_id: &str, kind: AgentKind, input: RunInput, idempotency_key: Option<&str>) -> Result<Run, JarvisError> {
        let (agent, _) = self.agent_for(kind)?;
        let is_async = self.config.async_jobs;
        let run = Run::new(owner_user_id, agent.id, kind, input.to_value(), is_async);
        let run_id = run.id;
        self.run_store.insert_run(run);

        if let Some(key) = idempotency_key {
            self.idempotency.put(key.to_string(), run_id, self.config.idempotency_ttl_ms).await;
        }

        if is_async {
            let queue = self
                .queue
                .as_ref()
                .ok_or_else(|| JarvisError::Internal("ASYNC_JOBS is enabled but no queue bridge is configured".to_string()))?;
            let job = QueuedJob::new(run_id, NodeId::new(), kind, owner_user_id);
            queue.send(job).await;
            return self.run_store.get_run(run_id).ok_or(JarvisError::RunNotFound(run_id));
        }

        self.run_sync(run_id, owner_user_id, kind, input.options.timeout_ms).await
    }

    /// Runs one node synchronously under `min(AGENT_NODE_TIMEOUT_MS,
    /// caller_timeout_ms)`. Used both for inline dispatch from
    /// [`Self::create_run`] and by a queue worker picking up an async job.
    pub async fn run_sync(&self, run_id: RunId, owner_user_id: &str, kind: AgentKind, caller_timeout_ms: Option<u64>) -> Result<Run, JarvisError> {
        let (_, handler) = self.agent_for(kind)?;
        self.run_store.mutate_run(run_id, Run::mark_running)?;

        let deadline_ms = caller_timeout_ms
            .map(|t| t.min(self.config.agent_node_timeout_ms))
            .unwrap_or(self.config.agent_node_timeout_ms)
            .min(self.config.agent_run_timeout_ms);

        let run_for_input = self.run_store.get_run(run_id).ok_or(JarvisError::RunNotFound(run_id))?;
        let outcome = tokio::time::timeout(
            Duration::from_millis(deadline_ms),
            handler.execute(&self.ctx, owner_user_id, run_id, &run_for_input.input),
        )
        .await;

        match outcome {
            Ok(Ok(output)) => {
                self.run_store.mutate_run(run_id, |run| run.mark_completed(output))?;
            }
            Ok(Err(error)) => {
                warn!(run_id = %run_id, error = %error, "run failed");
                let run_error = RunError::from(&error);
                self.run_store.mutate_run(run_id, |run| run.mark_failed(run_error))?;
            }
            Err(_elapsed) => {
                warn!(run_id = %run_id, deadline_ms, "run exceeded its deadline");
                let run_error = RunError::new("execution_timeout", format!("Node execution timeout: {deadline_ms}ms"));
                self.run_store.mutate_run(run_id, |run| run.mark_timeout(run_error))?;
            }
        }

        self.run_store.get_run(run_id).ok_or(JarvisError::RunNotFound(run_id))
    }

    pub fn get_run(&self, run_id: RunId, requester_user_id: &str) -> Result<Run, JarvisError> {
        let run = self.run_store.get_run(run_id).ok_or(JarvisError::RunNotFound(run_id))?;
        enforce_run_access(&run, requester_user_id)?;
        Ok(run)
    }

    pub fn list_runs(&self, requester_user_id: &str) -> Vec<Run> {
        let runs = self.run_store.list_runs();
        filter_runs_for_owner(&runs, requester_user_id).into_iter().cloned().collect()
    }

    pub fn list_runs_by_agent(&self, kind: AgentKind, requester_user_id: &str) -> Vec<Run> {
        let runs = self.run_store.list_runs_by_agent(kind);
        filter_runs_for_owner(&runs, requester_user_id).into_iter().cloned().collect()
    }

    /// Cursor-paged node log for a run: RBAC-checked exactly like
    /// [`Self::get_run`], then a window over `nodes_for_run` starting after
    /// the node named by `cursor` (an opaque `NodeId` string).
    pub fn get_logs(&self, run_id: RunId, requester_user_id: &str, cursor: Option<&str>, limit: usize) -> Result<LogPage, JarvisError> {
        let run = self.run_store.get_run(run_id).ok_or(JarvisError::RunNotFound(run_id))?;
        enforce_run_access(&run, requester_user_id)?;

        let all_nodes = self.run_store.nodes_for_run(run_id);
        let start = match cursor {
            None => 0,
            Some(raw) => {
                let cursor_id: NodeId = raw
                    .parse()
                    .map_err(|_| JarvisError::Validation("invalid logs cursor".to_string()))?;
                all_nodes
                    .iter()
                    .position(|node| node.id == cursor_id)
                    .map(|index| index + 1)
                    .unwrap_or(all_nodes.len())
            }
        };

        let page: Vec<NodeExecution> = all_nodes.iter().skip(start).take(limit).cloned().collect();
        let next_cursor = if start + page.len() < all_nodes.len() {
            page.last().map(|node| node.id.to_string())
        } else {
            None
        };
        Ok(LogPage { nodes: page, next_cursor })
    }

    pub fn registered_agent_ids(&self) -> HashMap<AgentKind, AgentId> {
        self.agents.iter().map(|(kind, agent)| (*kind, agent.id)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent_handlers::{EchoHandler, GenHandler};
    use jarvis_access::TenantLimitConfig;
    use jarvis_browser::ActionEngineConfig;
    use jarvis_llm::LlmFacade;

    fn test_orchestrator() -> Orchestrator {
        let run_store = Arc::new(RunStore::new());
        let llm_facade = Arc::new(LlmFacade::builder().build());
        let tenant_limiter = Arc::new(TenantLimiter::new(TenantLimitConfig::default()));
        let idempotency: Arc<dyn IdempotencyStore> = Arc::new(crate::idempotency::InMemoryIdempotencyStore::new());

        OrchestratorBuilder::new()
            .register(AgentKind::Echo, Arc::new(EchoHandler))
            .register(AgentKind::Gen, Arc::new(GenHandler))
            .build(
                Arc::clone(&run_store),
                Arc::clone(&llm_facade),
                None,
                ActionEngineConfig::default(),
                tenant_limiter,
                idempotency,
                None,
            )
    }

    #[tokio::test]
    async fn functional_echo_run_completes_synchronously_with_matching_output() {
        let orchestrator = test_orchestrator();
        let mut input = RunInput::prompt("hello there");
        input.options.agent_kind = Some(AgentKind::Echo);
        let admission = orchestrator.create_run("user-1", input, None).await.expect("run should complete");
        assert!(!admission.replayed);
        assert_eq!(admission.run.status, jarvis_model::RunStatus::Completed);
        assert_eq!(admission.run.output.unwrap()["prompt"], "hello there");
    }

    #[tokio::test]
    async fn functional_gen_run_uses_mock_provider_when_none_configured() {
        let orchestrator = test_orchestrator();
        let input = RunInput::prompt("write a haiku");
        let admission = orchestrator.create_run("user-1", input, None).await.expect("run should complete");
        assert_eq!(admission.run.status, jarvis_model::RunStatus::Completed);
        assert_eq!(admission.run.llm_call_count, 1);
    }

    #[tokio::test]
    async fn regression_rbac_denies_non_owner_reads() {
        let orchestrator = test_orchestrator();
        let input = RunInput::prompt("hello");
        let admission = orchestrator.create_run("user-1", input, None).await.expect("run should complete");
        let error = orchestrator.get_run(admission.run.id, "user-2").expect_err("should deny");
        assert_eq!(error.code(), "access_denied");
    }

    #[tokio::test]
    async fn integration_idempotency_key_replay_returns_the_original_run() {
        let orchestrator = test_orchestrator();
        let mut input = RunInput::prompt("hello");
        input.options.agent_kind = Some(AgentKind::Echo);
        let first = orchestrator
            .create_run("user-1", input.clone(), Some("key-1"))
            .await
            .expect("first run");
        assert!(!first.replayed);
        let second = orchestrator
            .create_run("user-1", input, Some("key-1"))
            .await
            .expect("replay should succeed");
        assert!(second.replayed);
        assert_eq!(first.run.id, second.run.id);
    }

    #[tokio::test]
    async fn unit_unregistered_agent_kind_is_rejected_before_a_run_is_created() {
        let orchestrator = test_orchestrator();
        let mut input = RunInput::prompt("open https://example.com");
        input.options.agent_kind = Some(AgentKind::Browser);
        let error = orchestrator.create_run("user-1", input, None).await.expect_err("browser is unregistered here");
        assert_eq!(error.code(), "validation_error");
        assert!(orchestrator.list_runs("user-1").is_empty());
    }
}
