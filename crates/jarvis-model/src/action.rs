use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::SessionId;

/// The action vocabulary the Action Engine supports. `Evaluate` is gated
/// separately by `ALLOW_EVALUATE` since it is the only action that accepts
/// caller-supplied script text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActionKind {
    Goto,
    Click,
    Type,
    WaitFor,
    Select,
    Evaluate,
    Screenshot,
    Pdf,
}

impl ActionKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Goto => "goto",
            Self::Click => "click",
            Self::Type => "type",
            Self::WaitFor => "wait_for",
            Self::Select => "select",
            Self::Evaluate => "evaluate",
            Self::Screenshot => "screenshot",
            Self::Pdf => "pdf",
        }
    }
}

/// One request against a leased session. `target` is the URL (`Goto`), CSS
/// selector (`Click`/`Type`/`WaitFor`/`Select`), or script body
/// (`Evaluate`) depending on `kind`; `value` carries the typed text or the
/// selected option value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionRequest {
    pub session_id: SessionId,
    pub kind: ActionKind,
    pub target: Option<String>,
    pub value: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl ActionRequest {
    pub fn goto(session_id: SessionId, url: impl Into<String>) -> Self {
        Self {
            session_id,
            kind: ActionKind::Goto,
            target: Some(url.into()),
            value: None,
            timeout_ms: None,
        }
    }
}

/// Outcome of one action. `data` holds the action-specific payload: text
/// content for `Evaluate`, base64 bytes for `Screenshot`/`Pdf`, nothing for
/// `Click`/`Type`/`WaitFor`/`Select`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionResult {
    pub kind: ActionKind,
    pub data: Option<Value>,
    pub duration_ms: u64,
}
