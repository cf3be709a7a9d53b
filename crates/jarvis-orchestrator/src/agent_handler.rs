//! `AgentHandler`: the narrow capability spec.md §9 asks for — `{Execute(run,
//! node) -> RunOutput}` — plus the shared context handlers need (run store,
//! LLM facade, optional browser stack, per-run budgets). The orchestrator's
//! registry resolves a handler by `AgentKind` and never reaches past this
//! trait into a handler's internals.

use std::sync::Arc;

use async_trait::async_trait;
use jarvis_browser::{ActionEngine, ActionEngineConfig, SessionManager};
use jarvis_llm::LlmFacade;
use jarvis_model::{JarvisError, RunId};
use serde_json::Value;

use crate::run_store::RunStore;

#[derive(Debug, Clone, Copy)]
pub struct BudgetLimits {
    pub max_llm_calls_per_run: u32,
    pub max_browser_steps_per_run: u32,
}

impl Default for BudgetLimits {
    fn default() -> Self {
        Self {
            max_llm_calls_per_run: 10,
            max_browser_steps_per_run: 20,
        }
    }
}

/// Everything an `AgentHandler` can reach. Browser sessions are optional:
/// a deployment that never registers the `Browser` handler (no browser
/// backend configured) simply never constructs this with `session_manager`
/// set.
pub struct HandlerContext {
    pub run_store: Arc<RunStore>,
    pub llm_facade: Arc<LlmFacade>,
    pub session_manager: Option<Arc<SessionManager>>,
    pub action_engine_config: ActionEngineConfig,
    pub budgets: BudgetLimits,
}

impl HandlerContext {
    pub fn action_engine(&self) -> Result<ActionEngine<'_>, JarvisError> {
        let session_manager = self
            .session_manager
            .as_deref()
            .ok_or_else(|| JarvisError::ExternalService("no browser backend configured".to_string()))?;
        Ok(ActionEngine::new(session_manager, self.action_engine_config))
    }
}

/// One agent kind's execution behavior. `execute` receives the run's
/// `input` JSON verbatim (the orchestrator has already selected this
/// handler and marked the run `Running`) and returns the `output` JSON to
/// store on success, or a taxonomized error to store as the run's failure.
#[async_trait]
pub trait AgentHandler: Send + Sync {
    async fn execute(&self, ctx: &HandlerContext, owner_user_id: &str, run_id: RunId, input: &Value) -> Result<Value, JarvisError>;
}
