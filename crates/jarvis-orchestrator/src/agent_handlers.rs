//! The three `AgentHandler` implementations named in spec.md §4.6.

use async_trait::async_trait;
use jarvis_llm::CompleteOptions;
use jarvis_llm_client::Message;
use jarvis_model::{ActionRequest, JarvisError, NodeExecution, RunId};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::agent_handler::{AgentHandler, HandlerContext};
use crate::browser_planner::synthesize_steps;
use crate::request::RunInput;

fn parse_input(input: &Value) -> Result<RunInput, JarvisError> {
    serde_json::from_value(input.clone()).map_err(|err| JarvisError::Validation(format!("invalid run input: {err}")))
}

/// Returns the input verbatim as the output. No external calls, no budget
/// to track — the handler still records one completed node so
/// `/v1/runs/:id/logs` has something to show.
pub struct EchoHandler;

#[async_trait]
impl AgentHandler for EchoHandler {
    async fn execute(&self, ctx: &HandlerContext, _owner_user_id: &str, run_id: RunId, input: &Value) -> Result<Value, JarvisError> {
        let parsed = parse_input(input)?;
        let output = json!({
            "prompt": parsed.prompt,
            "data": parsed.data,
            "context": parsed.context,
        });
        let mut node = NodeExecution::start(run_id, "echo", "echo", input.clone());
        node.complete(output.clone());
        ctx.run_store.append_node(node)?;
        Ok(output)
    }
}

/// Issues one LLM completion via the facade per call, incrementing the
/// run's `llm_call_count` first so a denied reservation never reaches the
/// network.
pub struct GenHandler;

#[async_trait]
impl AgentHandler for GenHandler {
    async fn execute(&self, ctx: &HandlerContext, _owner_user_id: &str, run_id: RunId, input: &Value) -> Result<Value, JarvisError> {
        let parsed = parse_input(input)?;
        let prompt = parsed
            .prompt
            .clone()
            .filter(|p| !p.trim().is_empty())
            .ok_or_else(|| JarvisError::Validation("gen agent requires a non-empty prompt".to_string()))?;

        ctx.run_store.try_reserve_llm_call(run_id, ctx.budgets.max_llm_calls_per_run)?;

        let mut node = NodeExecution::start(run_id, "llm_completion", "gen", input.clone());
        let node_id = node.id;
        ctx.run_store.append_node(node.clone())?;

        let mut messages = Vec::new();
        if let Some(system) = &parsed.options.system {
            messages.push(Message::system(system.clone()));
        }
        messages.push(Message::user(prompt));

        let outcome = ctx
            .llm_facade
            .complete(CompleteOptions {
                provider: parsed.options.provider,
                model: parsed.options.model.clone(),
                messages,
                max_tokens: parsed.options.max_tokens,
                temperature: parsed.options.temperature,
            })
            .await;

        match outcome {
            Ok(completion) => {
                let output = json!({
                    "text": completion.response.message.text_content(),
                    "usage": {
                        "provider": completion.provider.as_str(),
                        "model": completion.model,
                        "input_tokens": completion.response.usage.input_tokens,
                        "output_tokens": completion.response.usage.output_tokens,
                        "cost_usd": completion.cost_usd,
                    },
                });
                node.complete(output.clone());
                ctx.run_store.update_node(node_id, |n| *n = node.clone())?;
                Ok(output)
            }
            Err(error) => {
                let mapped = map_facade_error(&error);
                node.fail((&mapped).into());
                ctx.run_store.update_node(node_id, |n| *n = node.clone())?;
                Err(mapped)
            }
        }
    }
}

fn map_facade_error(error: &jarvis_llm::FacadeError) -> JarvisError {
    match error {
        jarvis_llm::FacadeError::UnknownProvider(name) => JarvisError::Validation(format!("unknown provider '{name}'")),
        jarvis_llm::FacadeError::InvalidRequest(message) => JarvisError::Validation(message.clone()),
        jarvis_llm::FacadeError::AllRoutesUnavailable => JarvisError::CircuitOpen("all provider routes are unavailable".to_string()),
        jarvis_llm::FacadeError::Provider(inner) => JarvisError::ExternalService(inner.to_string()),
    }
}

/// Executes a deterministic step list (`options.steps`) or, absent one,
/// synthesizes a single-step plan via one LLM planning call. Each step
/// reserves one browser-step budget unit before it runs; the session is
/// closed on completion unless `options.keep_alive` is set.
pub struct BrowserHandler;

#[async_trait]
impl AgentHandler for BrowserHandler {
    async fn execute(&self, ctx: &HandlerContext, owner_user_id: &str, run_id: RunId, input: &Value) -> Result<Value, JarvisError> {
        let parsed = parse_input(input)?;
        let session_manager = ctx
            .session_manager
            .as_ref()
            .ok_or_else(|| JarvisError::ExternalService("no browser backend configured".to_string()))?;

        let steps = match &parsed.options.steps {
            Some(steps) if !steps.is_empty() => steps.clone(),
            _ => synthesize_steps(ctx, run_id, &parsed).await?,
        };

        let (session_id, own_session) = match parsed.options.session_id {
            Some(id) => (id, false),
            None => {
                let session = session_manager.create(owner_user_id).await?;
                (session.id, true)
            }
        };

        let engine = ctx.action_engine()?;
        let mut results = Vec::with_capacity(steps.len());
        let mut step_error = None;

        for step in &steps {
            if let Err(err) = ctx.run_store.try_reserve_browser_step(run_id, ctx.budgets.max_browser_steps_per_run) {
                step_error = Some(err);
                break;
            }

            let mut node = NodeExecution::start(
                run_id,
                format!("browser_{}", step.kind.as_str()),
                "browser",
                json!({"kind": step.kind, "target": step.target, "value": step.value}),
            );
            let node_id = node.id;
            ctx.run_store.append_node(node.clone())?;

            let request = ActionRequest {
                session_id,
                kind: step.kind,
                target: step.target.clone(),
                value: step.value.clone(),
                timeout_ms: None,
            };

            match engine.execute(owner_user_id, &request).await {
                Ok(result) => {
                    let output = json!({ "data": result.data, "duration_ms": result.duration_ms });
                    node.complete(output.clone());
                    ctx.run_store.update_node(node_id, |n| *n = node.clone())?;
                    results.push(output);
                }
                Err(err) => {
                    node.fail((&err).into());
                    ctx.run_store.update_node(node_id, |n| *n = node.clone())?;
                    step_error = Some(err);
                    break;
                }
            }
        }

        if !parsed.options.keep_alive {
            if own_session || step_error.is_some() {
                if let Err(err) = session_manager.close(session_id, owner_user_id).await {
                    warn!(session_id = %session_id, error = %err, "failed to close session after browser run");
                }
            }
        } else {
            info!(session_id = %session_id, "leaving browser session open at caller's request");
        }

        match step_error {
            Some(err) => Err(err),
            None => Ok(json!({ "session_id": session_id, "steps": results })),
        }
    }
}
