//! Low-level multi-backend LLM HTTP client.
//!
//! One [`LlmClient`] implementation per transport: [`http_client::HttpChatClient`]
//! for any OpenAI-compatible-wire-format backend, and [`mock::MockClient`]
//! for the always-present default route. `jarvis-llm` builds the provider
//! registry, circuit breaker, and retry policy on top of these.

mod http_client;
mod mock;
mod provider;
mod retry;
mod types;

pub use http_client::{AuthScheme, HttpChatClient, HttpClientConfig};
pub use mock::MockClient;
pub use provider::{ModelRef, ModelRefParseError, Provider};
pub use retry::{
    is_retryable_http_error, new_request_id, next_backoff_ms, next_backoff_ms_with_jitter,
    parse_retry_after_ms, provider_retry_delay_ms, retry_budget_allows_delay, should_retry_status,
    BASE_BACKOFF_MS,
};
pub use types::{
    ChatRequest, ChatResponse, ChatUsage, ContentBlock, JarvisLlmClientError, LlmClient,
    MediaSource, Message, MessageRole, PromptCacheConfig, StreamDeltaHandler, ToolCall,
    ToolChoice, ToolDefinition,
};
