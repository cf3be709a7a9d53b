//! A single HTTP-backed [`LlmClient`] implementation, configured per
//! provider rather than duplicated per provider.
//!
//! Real backends differ mostly in base URL, auth header, and response
//! envelope; this client speaks the OpenAI-compatible chat-completions wire
//! format (widely supported as a compatibility mode by other vendors too)
//! and is instantiated once per registered provider with that provider's
//! endpoint and credentials.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;

use crate::retry::{
    is_retryable_http_error, new_request_id, next_backoff_ms_with_jitter, parse_retry_after_ms,
    provider_retry_delay_ms, should_retry_status,
};
use crate::types::{ChatRequest, ChatResponse, ChatUsage, JarvisLlmClientError, LlmClient, Message};

const DEFAULT_MAX_ATTEMPTS: usize = 4;

/// Auth scheme used to attach the API key to outgoing requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthScheme {
    /// `Authorization: Bearer <key>`
    Bearer,
    /// Custom header, e.g. `x-api-key: <key>`.
    Header(&'static str),
}

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    pub base_url: String,
    pub api_key: String,
    pub auth_scheme: AuthScheme,
    pub max_attempts: usize,
    pub jitter_enabled: bool,
}

pub struct HttpChatClient {
    http: Client,
    config: HttpClientConfig,
}

impl HttpChatClient {
    pub fn new(config: HttpClientConfig) -> Self {
        Self {
            http: Client::new(),
            config,
        }
    }

    fn build_request(&self, request: &ChatRequest) -> serde_json::Value {
        json!({
            "model": request.model,
            "messages": request
                .messages
                .iter()
                .map(message_to_json)
                .collect::<Vec<_>>(),
            "max_tokens": request.max_tokens,
            "temperature": request.temperature,
        })
    }

    async fn send_once(
        &self,
        request: &ChatRequest,
    ) -> Result<ChatResponse, (JarvisLlmClientError, Option<u16>, Option<reqwest::header::HeaderMap>)>
    {
        if self.config.api_key.is_empty() {
            return Err((JarvisLlmClientError::MissingApiKey, None, None));
        }

        let mut builder = self
            .http
            .post(format!("{}/chat/completions", self.config.base_url))
            .header("x-request-id", new_request_id())
            .json(&self.build_request(request));
        builder = match self.config.auth_scheme {
            AuthScheme::Bearer => builder.bearer_auth(&self.config.api_key),
            AuthScheme::Header(name) => builder.header(name, &self.config.api_key),
        };

        let response = builder
            .send()
            .await
            .map_err(|err| (JarvisLlmClientError::Http(err), None, None))?;

        let status = response.status();
        let headers = response.headers().clone();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err((
                JarvisLlmClientError::HttpStatus {
                    status: status.as_u16(),
                    body,
                },
                Some(status.as_u16()),
                Some(headers),
            ));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|err| (JarvisLlmClientError::Http(err), None, None))?;
        parse_chat_response(&body).map_err(|err| (err, None, None))
    }
}

#[async_trait]
impl LlmClient for HttpChatClient {
    async fn complete(&self, request: ChatRequest) -> Result<ChatResponse, JarvisLlmClientError> {
        let mut attempt = 0usize;
        let max_attempts = self.config.max_attempts.max(1);
        loop {
            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err((error, status, headers)) => {
                    let retryable = status.map(should_retry_status).unwrap_or(false)
                        || matches!(&error, JarvisLlmClientError::Http(http_error) if is_retryable_http_error(http_error));
                    if !retryable || attempt + 1 >= max_attempts {
                        return Err(error);
                    }
                    let retry_after_ms = headers.as_ref().and_then(parse_retry_after_ms);
                    let delay_ms = provider_retry_delay_ms(
                        attempt,
                        self.config.jitter_enabled,
                        retry_after_ms,
                    );
                    let _ = next_backoff_ms_with_jitter(attempt, self.config.jitter_enabled);
                    tokio::time::sleep(std::time::Duration::from_millis(delay_ms)).await;
                    attempt += 1;
                }
            }
        }
    }
}

fn message_to_json(message: &Message) -> serde_json::Value {
    json!({
        "role": role_str(message.role),
        "content": message.text_content(),
    })
}

fn role_str(role: crate::types::MessageRole) -> &'static str {
    match role {
        crate::types::MessageRole::System => "system",
        crate::types::MessageRole::User => "user",
        crate::types::MessageRole::Assistant => "assistant",
        crate::types::MessageRole::Tool => "tool",
    }
}

fn parse_chat_response(body: &serde_json::Value) -> Result<ChatResponse, JarvisLlmClientError> {
    let text = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("message"))
        .and_then(|message| message.get("content"))
        .and_then(|content| content.as_str())
        .ok_or_else(|| JarvisLlmClientError::InvalidResponse("missing choices[0].message.content".into()))?;

    let finish_reason = body
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("finish_reason"))
        .and_then(|value| value.as_str())
        .map(|value| value.to_string());

    let usage = body.get("usage");
    let input_tokens = usage
        .and_then(|usage| usage.get("prompt_tokens"))
        .and_then(|value| value.as_u64())
        .unwrap_or(0);
    let output_tokens = usage
        .and_then(|usage| usage.get("completion_tokens"))
        .and_then(|value| value.as_u64())
        .unwrap_or(0);

    Ok(ChatResponse {
        message: Message::assistant_text(text),
        finish_reason,
        usage: ChatUsage {
            input_tokens,
            output_tokens,
            total_tokens: input_tokens + output_tokens,
            cached_input_tokens: 0,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::parse_chat_response;
    use serde_json::json;

    #[test]
    fn unit_parse_chat_response_extracts_text_and_usage() {
        let body = json!({
            "choices": [{"message": {"content": "hello there"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4},
        });
        let response = parse_chat_response(&body).expect("should parse");
        assert_eq!(response.message.text_content(), "hello there");
        assert_eq!(response.usage.total_tokens, 14);
        assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    }

    #[test]
    fn regression_parse_chat_response_rejects_missing_content() {
        let body = json!({"choices": [{}]});
        let error = parse_chat_response(&body).expect_err("should fail");
        assert!(error.to_string().contains("invalid response"));
    }
}
