use serde::{Deserialize, Serialize};

use crate::AgentId;

/// The three handler kinds a run can be dispatched to. `Echo` and `Gen` are
/// always registered; `Browser` is registered only when the session manager
/// is wired up (see `jarvis-orchestrator`'s bootstrap).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentKind {
    Echo,
    Gen,
    Browser,
}

impl AgentKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Echo => "echo",
            Self::Gen => "gen",
            Self::Browser => "browser",
        }
    }
}

impl std::fmt::Display for AgentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A registered agent. Agents are configuration, not behavior — the
/// behavior lives in the `AgentHandler` implementations in
/// `jarvis-orchestrator` keyed by `kind`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub name: String,
    pub kind: AgentKind,
}

impl Agent {
    pub fn new(name: impl Into<String>, kind: AgentKind) -> Self {
        Self {
            id: AgentId::new(),
            name: name.into(),
            kind,
        }
    }
}
