//! Wire-adjacent shape of a run request, once it has crossed the gateway's
//! validation boundary. `jarvis-orchestrator` is the first layer that needs
//! `prompt`/`data`/`context` as distinct fields (agent selection reads all
//! three); everything below this stays on `serde_json::Value`.

use jarvis_llm_client::Provider;
use jarvis_model::{ActionKind, AgentKind};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One deterministic browser step, as accepted in `options.steps`. Mirrors
/// `jarvis_model::ActionRequest` minus `session_id`, which the Browser
/// handler fills in once it has leased (or been handed) a session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrowserStepSpec {
    pub kind: ActionKind,
    #[serde(default)]
    pub target: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunOptions {
    /// Caller's explicit agent choice. When present, bypasses the keyword
    /// heuristic in [`crate::agent_selection`] entirely.
    #[serde(default)]
    pub agent_kind: Option<AgentKind>,
    /// Caller-supplied deadline; the effective node deadline is
    /// `min(AGENT_NODE_TIMEOUT_MS, this)`, matching the "caller-supplied
    /// timeout" input to the orchestrator's deadline in spec §5.
    #[serde(default)]
    pub timeout_ms: Option<u64>,
    #[serde(default)]
    pub provider: Option<Provider>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub system: Option<String>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Deterministic step list for the Browser handler. When absent, the
    /// handler synthesizes one via a single LLM planning call.
    #[serde(default)]
    pub steps: Option<Vec<BrowserStepSpec>>,
    /// Reuse an already-open session instead of leasing a new one.
    #[serde(default)]
    pub session_id: Option<jarvis_model::SessionId>,
    /// Leave the session open after the run finishes.
    #[serde(default)]
    pub keep_alive: bool,
}

/// `{prompt? + structured data + context + options}` from spec.md §3. This
/// is both the shape callers POST to `/v1/runs` and the contents stored
/// verbatim as `Run::input`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunInput {
    #[serde(default)]
    pub prompt: Option<String>,
    #[serde(default)]
    pub data: Value,
    #[serde(default)]
    pub context: Value,
    #[serde(default)]
    pub options: RunOptions,
}

impl RunInput {
    pub fn prompt(text: impl Into<String>) -> Self {
        Self {
            prompt: Some(text.into()),
            ..Self::default()
        }
    }

    pub fn to_value(&self) -> Value {
        serde_json::to_value(self).unwrap_or(Value::Null)
    }
}
