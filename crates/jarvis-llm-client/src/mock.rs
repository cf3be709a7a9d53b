//! Always-available, network-free provider. Registered under
//! [`crate::provider::Provider::Mock`] so the facade and its tests never
//! depend on live credentials.

use async_trait::async_trait;

use crate::types::{ChatResponse, ChatUsage, JarvisLlmClientError, LlmClient, Message};

/// Echoes the last user message back as the assistant reply, with a token
/// count derived from character length so cost-accounting tests have a
/// stable, deterministic `usage` to assert against.
pub struct MockClient;

#[async_trait]
impl LlmClient for MockClient {
    async fn complete(
        &self,
        request: crate::types::ChatRequest,
    ) -> Result<ChatResponse, JarvisLlmClientError> {
        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|message| message.role == crate::types::MessageRole::User)
            .map(|message| message.text_content())
            .unwrap_or_default();
        if prompt.trim().is_empty() {
            return Err(JarvisLlmClientError::InvalidResponse(
                "mock provider requires a non-empty user message".into(),
            ));
        }
        let reply = format!("mock response to: {prompt}");
        let input_tokens = estimate_tokens(&prompt);
        let output_tokens = estimate_tokens(&reply);
        Ok(ChatResponse {
            message: Message::assistant_text(reply),
            finish_reason: Some("stop".to_string()),
            usage: ChatUsage {
                input_tokens,
                output_tokens,
                total_tokens: input_tokens + output_tokens,
                cached_input_tokens: 0,
            },
        })
    }
}

/// Character-based token estimator: `ceil(len / 4)`, the common rough
/// approximation used when no provider-reported tokenizer is available.
fn estimate_tokens(text: &str) -> u64 {
    let len = text.chars().count() as u64;
    len.div_ceil(4).max(1)
}

#[cfg(test)]
mod tests {
    use super::MockClient;
    use crate::types::{ChatRequest, LlmClient, Message, PromptCacheConfig};

    fn request(prompt: &str) -> ChatRequest {
        ChatRequest {
            model: "mock-1".to_string(),
            messages: vec![Message::user(prompt)],
            tools: vec![],
            tool_choice: None,
            json_mode: false,
            max_tokens: None,
            temperature: None,
            prompt_cache: PromptCacheConfig::default(),
        }
    }

    #[tokio::test]
    async fn unit_mock_client_echoes_prompt_with_nonzero_usage() {
        let client = MockClient;
        let response = client.complete(request("hello")).await.expect("should succeed");
        assert!(response.message.text_content().contains("hello"));
        assert!(response.usage.total_tokens > 0);
    }

    #[tokio::test]
    async fn regression_mock_client_rejects_empty_prompt() {
        let client = MockClient;
        let error = client.complete(request("   ")).await.expect_err("should fail");
        assert!(error.to_string().contains("non-empty"));
    }
}
