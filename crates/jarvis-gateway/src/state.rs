//! Shared router state. Holds exactly what the route table in spec.md §6
//! needs to reach: the orchestrator for everything run-shaped, and the raw
//! session manager / action engine config for the session and action
//! routes that bypass the orchestrator entirely (they operate on sessions
//! directly, not on runs).

use std::sync::Arc;

use jarvis_browser::{ActionEngine, ActionEngineConfig, SessionManager};
use jarvis_orchestrator::Orchestrator;

use crate::diagnostics::Metrics;

#[derive(Clone)]
pub struct GatewayState {
    pub orchestrator: Arc<Orchestrator>,
    pub session_manager: Option<Arc<SessionManager>>,
    pub action_engine_config: ActionEngineConfig,
    pub metrics: Arc<Metrics>,
}

impl GatewayState {
    pub fn new(orchestrator: Arc<Orchestrator>, session_manager: Option<Arc<SessionManager>>, action_engine_config: ActionEngineConfig) -> Self {
        Self {
            orchestrator,
            session_manager,
            action_engine_config,
            metrics: Arc::new(Metrics::default()),
        }
    }

    pub fn action_engine(&self) -> Option<ActionEngine<'_>> {
        self.session_manager.as_deref().map(|manager| ActionEngine::new(manager, self.action_engine_config))
    }
}
