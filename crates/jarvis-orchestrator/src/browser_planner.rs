//! Single-call LLM planning for the Browser handler, used only when a run
//! doesn't supply a deterministic `options.steps` list. Spec.md §4.6 calls
//! for "one synthesized by a single LLM planning call"; multi-step
//! replanning is out of scope (spec.md §1 Non-goals: "multi-step agent
//! planning").

use jarvis_llm::CompleteOptions;
use jarvis_llm_client::Message;
use jarvis_model::{ActionKind, JarvisError, RunId};
use regex::Regex;
use std::sync::OnceLock;

use crate::agent_handler::HandlerContext;
use crate::request::{BrowserStepSpec, RunInput};

const PLANNER_SYSTEM_PROMPT: &str = "You plan a single browser action for an automation agent. \
Respond with a JSON array of 1 to 3 steps, each an object with \"kind\" (one of goto, click, type, \
wait_for, select, evaluate, screenshot, pdf), optional \"target\", and optional \"value\". Respond \
with JSON only.";

fn url_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"https?://[^\s]+").expect("valid url regex"))
}

/// Extracts the first absolute URL mentioned in the prompt, used as a
/// fallback plan when the planning call's response can't be parsed as a
/// step list.
fn first_url_in(text: &str) -> Option<String> {
    url_pattern().find(text).map(|m| m.as_str().trim_end_matches(['.', ',', ')']).to_string())
}

pub async fn synthesize_steps(ctx: &HandlerContext, run_id: RunId, input: &RunInput) -> Result<Vec<BrowserStepSpec>, JarvisError> {
    let prompt = input
        .prompt
        .clone()
        .filter(|p| !p.trim().is_empty())
        .ok_or_else(|| JarvisError::Validation("browser agent requires a prompt or an explicit steps list".to_string()))?;

    ctx.run_store.try_reserve_llm_call(run_id, ctx.budgets.max_llm_calls_per_run)?;

    let mut node = jarvis_model::NodeExecution::start(run_id, "browser_planning", "gen", serde_json::json!({"prompt": prompt}));
    let node_id = node.id;
    ctx.run_store.append_node(node.clone())?;

    let outcome = ctx
        .llm_facade
        .complete(CompleteOptions {
            provider: input.options.provider,
            model: input.options.model.clone(),
            messages: vec![Message::system(PLANNER_SYSTEM_PROMPT), Message::user(prompt.clone())],
            max_tokens: Some(256),
            temperature: Some(0.0),
        })
        .await
        .map_err(|err| JarvisError::ExternalService(format!("browser planning call failed: {err}")))?;

    let text = outcome.response.message.text_content();
    let steps = serde_json::from_str::<Vec<BrowserStepSpec>>(text.trim())
        .ok()
        .filter(|steps| !steps.is_empty())
        .or_else(|| {
            first_url_in(&prompt).or_else(|| first_url_in(&text)).map(|url| {
                vec![BrowserStepSpec {
                    kind: ActionKind::Goto,
                    target: Some(url),
                    value: None,
                }]
            })
        });

    match steps {
        Some(steps) => {
            node.complete(serde_json::json!({ "steps": steps }));
            ctx.run_store.update_node(node_id, |n| *n = node.clone())?;
            Ok(steps)
        }
        None => {
            let error = JarvisError::Validation(
                "unable to synthesize a browser step: no URL in prompt and planner response was not a step list".to_string(),
            );
            node.fail((&error).into());
            ctx.run_store.update_node(node_id, |n| *n = node.clone())?;
            Err(error)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::first_url_in;

    #[test]
    fn unit_first_url_in_extracts_trailing_punctuation_free_url() {
        let found = first_url_in("please open https://example.com/page, thanks");
        assert_eq!(found.as_deref(), Some("https://example.com/page"));
    }

    #[test]
    fn regression_first_url_in_returns_none_without_a_url() {
        assert_eq!(first_url_in("no link here"), None);
    }
}
