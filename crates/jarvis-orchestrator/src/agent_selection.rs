//! Agent-kind selection: spec.md §4.7. Explicit `agentKind` wins outright;
//! otherwise a fixed keyword set over the lower-cased concatenation of
//! `prompt + data + context` picks `Browser` over `Gen`. `Echo` is never
//! chosen by the heuristic — it is reachable only via an explicit request.

use jarvis_model::AgentKind;

use crate::request::RunInput;

/// Deliberately unchanged from spec.md despite the Open Question about
/// `open` matching benign prompts like "open the schedule for me" — see
/// `DESIGN.md`'s Open Question log for why this stays as specified.
const BROWSER_KEYWORDS: [&str; 10] = [
    "open", "click", "visit", "navigate", "browse", "web", "url", "page", "site", "website",
];

fn stringify(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

pub fn select_agent_kind(input: &RunInput) -> AgentKind {
    if let Some(kind) = input.options.agent_kind {
        return kind;
    }
    let haystack = format!(
        "{} {} {}",
        input.prompt.clone().unwrap_or_default(),
        stringify(&input.data),
        stringify(&input.context)
    )
    .to_lowercase();
    if BROWSER_KEYWORDS.iter().any(|keyword| haystack.contains(keyword)) {
        AgentKind::Browser
    } else {
        AgentKind::Gen
    }
}

#[cfg(test)]
mod tests {
    use super::select_agent_kind;
    use crate::request::RunInput;
    use jarvis_model::AgentKind;
    use serde_json::json;

    #[test]
    fn unit_explicit_agent_kind_bypasses_the_heuristic() {
        let mut input = RunInput::prompt("open google.com");
        input.options.agent_kind = Some(AgentKind::Echo);
        assert_eq!(select_agent_kind(&input), AgentKind::Echo);
    }

    #[test]
    fn functional_browser_keyword_in_prompt_selects_browser() {
        let input = RunInput::prompt("please visit https://example.com and tell me the title");
        assert_eq!(select_agent_kind(&input), AgentKind::Browser);
    }

    #[test]
    fn functional_browser_keyword_in_structured_data_also_counts() {
        let mut input = RunInput::prompt("summarize this for me");
        input.data = json!({"target": "https://example.com/page"});
        assert_eq!(select_agent_kind(&input), AgentKind::Browser);
    }

    #[test]
    fn regression_plain_text_prompt_defaults_to_gen_not_echo() {
        let input = RunInput::prompt("write me a haiku about the ocean");
        assert_eq!(select_agent_kind(&input), AgentKind::Gen);
    }
}
