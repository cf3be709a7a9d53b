//! Turns a parsed [`crate::Cli`] into the fully wired runtime: the LLM
//! facade with whatever provider credentials are present in the
//! environment, an optional Chromium-backed session manager, the
//! orchestrator with its three handlers, and the tenant limiter /
//! idempotency store / queue bridge it all depends on.

use std::sync::Arc;

use jarvis_access::{TenantLimitConfig, TenantLimiter};
use jarvis_browser::browser_backend::chromium::{ChromiumBackend, ChromiumLauncher};
use jarvis_browser::browser_backend::BrowserLauncher;
use jarvis_browser::{ActionEngineConfig, SessionManager, SessionManagerConfig};
use jarvis_browser::safety_policy::UrlPolicyConfig;
use jarvis_llm::{LlmFacade, LlmFacadeBuilder};
use jarvis_llm_client::{AuthScheme, HttpChatClient, HttpClientConfig, Provider};
use jarvis_model::AgentKind;
use jarvis_orchestrator::{
    AgentHandler, BrowserHandler, BudgetLimits, EchoHandler, GenHandler, IdempotencyStore, InMemoryIdempotencyStore,
    Orchestrator, OrchestratorBuilder, OrchestratorConfig, RunStore,
};
use jarvis_queue::{InMemoryQueueBridge, QueueBridge};
use tracing::{info, warn};

use crate::cli_args::Cli;

/// Everything `main` needs to start serving: the orchestrator, the
/// optional session manager (routes and the idle reaper both need it
/// directly, not just through the orchestrator), the action engine config
/// the gateway's session/action routes use, and the queue bridge the
/// optional background worker drains.
pub struct Bootstrapped {
    pub orchestrator: Arc<Orchestrator>,
    pub session_manager: Option<Arc<SessionManager>>,
    pub action_engine_config: ActionEngineConfig,
    pub queue: Option<Arc<dyn QueueBridge>>,
}

fn http_client_for(provider: Provider, api_key: String) -> Arc<dyn jarvis_llm_client::LlmClient> {
    let (base_url, auth_scheme) = match provider {
        Provider::OpenAi => ("https://api.openai.com/v1", AuthScheme::Bearer),
        Provider::Anthropic => ("https://api.anthropic.com/v1", AuthScheme::Header("x-api-key")),
        Provider::Google => ("https://generativelanguage.googleapis.com/v1beta/openai", AuthScheme::Bearer),
        Provider::Mock => unreachable!("mock never reaches http_client_for"),
    };
    Arc::new(HttpChatClient::new(HttpClientConfig {
        base_url: base_url.to_string(),
        api_key,
        auth_scheme,
        max_attempts: 4,
        jitter_enabled: true,
    }))
}

/// Registers one route per provider with a non-empty API key env var.
/// A deployment with no credentials at all still gets a working facade —
/// [`LlmFacadeBuilder::build`] always appends the `mock` route.
fn build_llm_facade() -> Arc<LlmFacade> {
    let mut builder = LlmFacadeBuilder::new();
    for (provider, model) in [
        (Provider::OpenAi, "gpt-4o-mini"),
        (Provider::Anthropic, "claude-3-5-haiku-latest"),
        (Provider::Google, "gemini-1.5-flash"),
    ] {
        let Some(env_var) = provider.api_key_env_var() else { continue };
        match std::env::var(env_var) {
            Ok(api_key) if !api_key.trim().is_empty() => {
                info!(provider = %provider, "registered LLM provider route");
                builder = builder.register(provider, model, http_client_for(provider, api_key));
            }
            _ => info!(provider = %provider, env_var, "no API key set, skipping provider route"),
        }
    }
    Arc::new(builder.build())
}

/// Probes Chromium availability with one throwaway launch-and-drop before
/// wiring the session manager. A probe failure (missing browser binary,
/// sandbox restrictions, ...) is logged and treated as "no browser backend
/// configured" rather than a fatal bootstrap error — the gateway still
/// serves `echo`/`gen` runs and every non-browser route. The probe result
/// isn't reused: every session launches its own Chromium process through
/// [`ChromiumLauncher`] when it's created, not once at bootstrap.
async fn build_session_manager(cli: &Cli) -> Option<Arc<SessionManager>> {
    match ChromiumBackend::launch().await {
        Ok(probe) => {
            drop(probe);
            let launcher: Arc<dyn BrowserLauncher> = Arc::new(ChromiumLauncher);
            Some(Arc::new(SessionManager::new(
                launcher,
                SessionManagerConfig {
                    max_concurrent_sessions: cli.browser_max_concurrent,
                    session_idle_ms: cli.session_idle_ms,
                },
            )))
        }
        Err(error) => {
            warn!(%error, "failed to launch browser backend, browser actions will be unavailable");
            None
        }
    }
}

pub async fn bootstrap(cli: &Cli) -> Bootstrapped {
    let llm_facade = build_llm_facade();
    let session_manager = build_session_manager(cli).await;

    let action_engine_config = ActionEngineConfig {
        default_action_timeout_ms: cli.max_navigation_timeout_ms,
        url_policy: UrlPolicyConfig {
            block_private_addr: cli.block_private_addr,
            allow_localhost: cli.allow_localhost,
        },
        allow_evaluate: cli.allow_evaluate,
    };

    let tenant_limiter = Arc::new(TenantLimiter::new(TenantLimitConfig {
        requests_per_minute: cli.user_rate_limit_per_minute,
        max_concurrent_runs: cli.user_max_concurrent_runs,
    }));
    let idempotency: Arc<dyn IdempotencyStore> = Arc::new(InMemoryIdempotencyStore::new());
    let queue: Option<Arc<dyn QueueBridge>> = cli.async_jobs.then(|| InMemoryQueueBridge::shared() as Arc<dyn QueueBridge>);

    let mut builder = OrchestratorBuilder::new()
        .config(OrchestratorConfig {
            agent_node_timeout_ms: cli.agent_node_timeout_ms,
            agent_run_timeout_ms: cli.agent_run_timeout_ms,
            async_jobs: cli.async_jobs,
            idempotency_ttl_ms: cli.idempotency_ttl_ms,
        })
        .budgets(BudgetLimits {
            max_llm_calls_per_run: cli.max_llm_calls_per_run,
            max_browser_steps_per_run: cli.max_browser_steps_per_run,
        })
        .register(AgentKind::Echo, Arc::new(EchoHandler) as Arc<dyn AgentHandler>)
        .register(AgentKind::Gen, Arc::new(GenHandler) as Arc<dyn AgentHandler>);
    if session_manager.is_some() {
        builder = builder.register(AgentKind::Browser, Arc::new(BrowserHandler) as Arc<dyn AgentHandler>);
    } else {
        info!("no browser backend configured, browser agent runs will fail admission with a validation error");
    }

    let orchestrator = Arc::new(builder.build(
        Arc::new(RunStore::new()),
        llm_facade,
        session_manager.clone(),
        action_engine_config,
        tenant_limiter,
        idempotency,
        queue.clone(),
    ));

    Bootstrapped {
        orchestrator,
        session_manager,
        action_engine_config,
        queue,
    }
}
