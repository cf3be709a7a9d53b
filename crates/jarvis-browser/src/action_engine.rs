//! The Action Engine: validates an `ActionRequest` against the safety
//! policy, opens a fresh page in the session's browser for the single call,
//! enforces a per-action timeout, closes that page regardless of outcome,
//! and reports step duration back to the caller so the orchestrator can
//! account it against the run's browser-step budget.

use std::time::{Duration, Instant};

use serde_json::json;
use tracing::{info, warn};

use jarvis_model::{ActionKind, ActionRequest, ActionResult, JarvisError};

use crate::browser_backend::BackendPage;
use crate::safety_policy::{check_and_sanitize_url, script_is_unsafe, UrlPolicyConfig};
use crate::session_manager::SessionManager;

#[derive(Debug, Clone, Copy)]
pub struct ActionEngineConfig {
    pub default_action_timeout_ms: u64,
    pub url_policy: UrlPolicyConfig,
    pub allow_evaluate: bool,
}

impl Default for ActionEngineConfig {
    fn default() -> Self {
        Self {
            default_action_timeout_ms: 15_000,
            url_policy: UrlPolicyConfig::default(),
            allow_evaluate: false,
        }
    }
}

pub struct ActionEngine<'a> {
    session_manager: &'a SessionManager,
    config: ActionEngineConfig,
}

impl<'a> ActionEngine<'a> {
    pub fn new(session_manager: &'a SessionManager, config: ActionEngineConfig) -> Self {
        Self { session_manager, config }
    }

    /// Executes one action on behalf of `owner_user_id`. `owner_user_id`
    /// must match the session's owner; `Goto` targets and `Evaluate`
    /// scripts are checked against the safety policy before a page is ever
    /// opened, so a rejected action never touches the backend. Once a page
    /// is open, it is closed on every outcome: success, error, or timeout.
    pub async fn execute(&self, owner_user_id: &str, request: &ActionRequest) -> Result<ActionResult, JarvisError> {
        let timeout_ms = request.timeout_ms.unwrap_or(self.config.default_action_timeout_ms);
        let started = Instant::now();

        let prepared = self.prepare(request).await?;
        let backend = self.session_manager.leased_backend(request.session_id, owner_user_id).await?;
        let page = backend.open_page().await?;

        let outcome = tokio::time::timeout(Duration::from_millis(timeout_ms), invoke(page.as_ref(), &prepared)).await;

        if let Err(err) = page.close().await {
            warn!(session_id = %request.session_id, kind = request.kind.as_str(), error = %err, "error closing action page");
        }

        let data = match outcome {
            Ok(result) => result?,
            Err(_) => {
                warn!(session_id = %request.session_id, kind = request.kind.as_str(), timeout_ms, "action timed out");
                return Err(JarvisError::Timeout(format!(
                    "{} action exceeded {}ms",
                    request.kind.as_str(),
                    timeout_ms
                )));
            }
        };

        let duration_ms = started.elapsed().as_millis() as u64;
        info!(session_id = %request.session_id, kind = request.kind.as_str(), duration_ms, "action completed");
        Ok(ActionResult {
            kind: request.kind,
            data,
            duration_ms,
        })
    }

    /// Validates the request and applies the safety policy, entirely
    /// independent of any session or backend: a validation or policy
    /// failure here never opens a page and never touches the session
    /// manager, matching the no-page-opened boundary behavior on rejection.
    async fn prepare<'a>(&self, request: &'a ActionRequest) -> Result<PreparedAction<'a>, JarvisError> {
        match request.kind {
            ActionKind::Goto => {
                let raw = require_target(request)?;
                let sanitized_url = check_and_sanitize_url(raw, self.config.url_policy)
                    .await
                    .map_err(|violation| JarvisError::PolicyViolation(violation.to_string()))?;
                Ok(PreparedAction::Goto { sanitized_url })
            }
            ActionKind::Click => Ok(PreparedAction::Click { selector: require_target(request)? }),
            ActionKind::Type => {
                let selector = require_target(request)?;
                let text = request
                    .value
                    .as_deref()
                    .ok_or_else(|| JarvisError::Validation("type action requires a value".into()))?;
                Ok(PreparedAction::Type { selector, text })
            }
            ActionKind::WaitFor => Ok(PreparedAction::WaitFor { selector: require_target(request)? }),
            ActionKind::Select => {
                let selector = require_target(request)?;
                let value = request
                    .value
                    .as_deref()
                    .ok_or_else(|| JarvisError::Validation("select action requires a value".into()))?;
                Ok(PreparedAction::Select { selector, value })
            }
            ActionKind::Evaluate => {
                if !self.config.allow_evaluate {
                    return Err(JarvisError::PolicyViolation("evaluate action is disabled".into()));
                }
                let script = require_target(request)?;
                if script_is_unsafe(script) {
                    return Err(JarvisError::PolicyViolation("script rejected by safety policy".into()));
                }
                Ok(PreparedAction::Evaluate { script })
            }
            ActionKind::Screenshot => Ok(PreparedAction::Screenshot),
            ActionKind::Pdf => Ok(PreparedAction::Pdf),
        }
    }
}

/// A validated, policy-checked action ready to run against a freshly opened
/// page. Carries owned data only where the source needed sanitizing
/// (`Goto`); everything else borrows straight from the `ActionRequest`.
enum PreparedAction<'a> {
    Goto { sanitized_url: String },
    Click { selector: &'a str },
    Type { selector: &'a str, text: &'a str },
    WaitFor { selector: &'a str },
    Select { selector: &'a str, value: &'a str },
    Evaluate { script: &'a str },
    Screenshot,
    Pdf,
}

async fn invoke(page: &dyn BackendPage, prepared: &PreparedAction<'_>) -> Result<Option<serde_json::Value>, JarvisError> {
    match prepared {
        PreparedAction::Goto { sanitized_url } => {
            page.goto(sanitized_url).await?;
            Ok(Some(json!({ "url": sanitized_url })))
        }
        PreparedAction::Click { selector } => {
            page.click(selector).await?;
            Ok(None)
        }
        PreparedAction::Type { selector, text } => {
            page.type_text(selector, text).await?;
            Ok(None)
        }
        PreparedAction::WaitFor { selector } => {
            page.wait_for(selector).await?;
            Ok(None)
        }
        PreparedAction::Select { selector, value } => {
            page.select(selector, value).await?;
            Ok(None)
        }
        PreparedAction::Evaluate { script } => Ok(Some(page.evaluate(script).await?)),
        PreparedAction::Screenshot => Ok(Some(json!({ "base64": base64_encode(&page.screenshot().await?) }))),
        PreparedAction::Pdf => Ok(Some(json!({ "base64": base64_encode(&page.pdf().await?) }))),
    }
}

fn require_target(request: &ActionRequest) -> Result<&str, JarvisError> {
    request
        .target
        .as_deref()
        .filter(|target| !target.trim().is_empty())
        .ok_or_else(|| JarvisError::Validation(format!("{} action requires a target", request.kind.as_str())))
}

fn base64_encode(bytes: &[u8]) -> String {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    STANDARD.encode(bytes)
}
