//! Multi-provider LLM facade: registry, retry, circuit breaker, and cost
//! accounting wrapped around a `Complete` call, replacing the
//! single-purpose fallback router this crate started from.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use jarvis_llm_client::{
    ChatRequest, ChatResponse, JarvisLlmClientError, LlmClient, Message, PromptCacheConfig,
    Provider,
};
use tracing::{info, warn};

use crate::circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitDecision, CircuitState};
use crate::pricing::PriceTable;

fn now_unix_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

#[derive(Clone)]
struct Route {
    provider: Provider,
    model: String,
    client: Arc<dyn LlmClient>,
}

#[derive(Debug, thiserror::Error)]
pub enum FacadeError {
    #[error("unknown provider '{0}'")]
    UnknownProvider(String),
    #[error("invalid request: {0}")]
    InvalidRequest(String),
    #[error("all provider routes are temporarily unavailable")]
    AllRoutesUnavailable,
    #[error(transparent)]
    Provider(#[from] JarvisLlmClientError),
}

#[derive(Debug, Clone)]
pub struct CompleteOptions {
    pub provider: Option<Provider>,
    pub model: Option<String>,
    pub messages: Vec<Message>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl CompleteOptions {
    pub fn prompt(provider: Option<Provider>, prompt: impl Into<String>) -> Self {
        Self {
            provider,
            model: None,
            messages: vec![Message::user(prompt)],
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompletionOutcome {
    pub response: ChatResponse,
    pub provider: Provider,
    pub model: String,
    pub cost_usd: f64,
}

/// Registers provider routes, resolves `defaultProvider`/`defaultModel`
/// precedence, and dispatches `Complete` through retry + circuit breaker.
///
/// Registration order matters: when a caller doesn't pin a provider, the
/// facade tries routes in registration order starting from the default.
pub struct LlmFacade {
    routes: Vec<Route>,
    default_provider: Provider,
    circuit_breaker: CircuitBreaker,
    prices: PriceTable,
}

pub struct LlmFacadeBuilder {
    routes: Vec<Route>,
    default_provider: Option<Provider>,
    circuit_breaker: CircuitBreakerConfig,
    prices: PriceTable,
}

impl LlmFacadeBuilder {
    pub fn new() -> Self {
        Self {
            routes: Vec::new(),
            default_provider: None,
            circuit_breaker: CircuitBreakerConfig::default(),
            prices: PriceTable::default(),
        }
    }

    /// Registers a provider route. The first non-mock provider registered
    /// becomes the default unless [`Self::default_provider`] is called
    /// explicitly.
    pub fn register(mut self, provider: Provider, model: impl Into<String>, client: Arc<dyn LlmClient>) -> Self {
        if self.default_provider.is_none() && provider != Provider::Mock {
            self.default_provider = Some(provider);
        }
        self.routes.push(Route { provider, model: model.into(), client });
        self
    }

    pub fn default_provider(mut self, provider: Provider) -> Self {
        self.default_provider = Some(provider);
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = config;
        self
    }

    pub fn prices(mut self, prices: PriceTable) -> Self {
        self.prices = prices;
        self
    }

    /// Always registers `mock` as a trailing route if the caller hasn't
    /// already added one, so a facade with zero configured credentials
    /// still has a working route.
    pub fn build(mut self) -> LlmFacade {
        if !self.routes.iter().any(|route| route.provider == Provider::Mock) {
            self.routes.push(Route {
                provider: Provider::Mock,
                model: "mock-1".to_string(),
                client: Arc::new(jarvis_llm_client::MockClient),
            });
        }
        let default_provider = self.default_provider.unwrap_or(Provider::Mock);
        let route_count = self.routes.len();
        LlmFacade {
            routes: self.routes,
            default_provider,
            circuit_breaker: CircuitBreaker::new(self.circuit_breaker, route_count),
            prices: self.prices,
        }
    }
}

impl Default for LlmFacadeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl LlmFacade {
    pub fn builder() -> LlmFacadeBuilder {
        LlmFacadeBuilder::new()
    }

    fn route_indices_for(&self, provider: Provider) -> Vec<usize> {
        self.routes
            .iter()
            .enumerate()
            .filter(|(_, route)| route.provider == provider)
            .map(|(index, _)| index)
            .collect()
    }

    /// Ordered candidate list for a request without a pinned provider:
    /// default provider's routes first, then every other route in
    /// registration order, `mock` last.
    fn fallback_order(&self) -> Vec<usize> {
        let mut order = self.route_indices_for(self.default_provider);
        for (index, route) in self.routes.iter().enumerate() {
            if route.provider != self.default_provider && !order.contains(&index) {
                order.push(index);
            }
        }
        order
    }

    pub async fn complete(&self, opts: CompleteOptions) -> Result<CompletionOutcome, FacadeError> {
        if opts.messages.is_empty() || opts.messages.iter().all(|m| m.text_content().trim().is_empty()) {
            return Err(FacadeError::InvalidRequest(
                "request must include at least one non-empty message".to_string(),
            ));
        }

        let candidate_indices = match opts.provider {
            Some(provider) => {
                let matches = self.route_indices_for(provider);
                if matches.is_empty() {
                    return Err(FacadeError::UnknownProvider(provider.as_str().to_string()));
                }
                matches
            }
            None => self.fallback_order(),
        };

        let mut last_error: Option<JarvisLlmClientError> = None;
        for (position, &route_index) in candidate_indices.iter().enumerate() {
            let route = &self.routes[route_index];
            let now = now_unix_ms();
            let circuit_state = match self.circuit_breaker.poll(route_index, now) {
                CircuitDecision::Allow(state) => state,
                CircuitDecision::Skip { retry_after_unix_ms } => {
                    warn!(provider = %route.provider, retry_after_unix_ms, "skipping route with open circuit");
                    continue;
                }
            };

            let mut request = build_request(&opts, route.model.clone());
            if circuit_state == CircuitState::HalfOpen {
                request.max_tokens = request.max_tokens.or(Some(64));
            }

            match route.client.complete(request).await {
                Ok(response) => {
                    self.circuit_breaker.record_success(route_index);
                    let cost_usd = self.prices.cost_usd(route.provider, &route.model, &response.usage);
                    info!(provider = %route.provider, model = %route.model, cost_usd, "completion succeeded");
                    return Ok(CompletionOutcome {
                        response,
                        provider: route.provider,
                        model: route.model.clone(),
                        cost_usd,
                    });
                }
                Err(error) => {
                    let retryable = is_retryable(&error);
                    if retryable {
                        if let Some(open_until) = self.circuit_breaker.record_failure(route_index, now) {
                            warn!(provider = %route.provider, open_until, "circuit opened for route");
                        }
                    }
                    let has_more = position + 1 < candidate_indices.len();
                    if !retryable || opts.provider.is_some() || !has_more {
                        return Err(FacadeError::Provider(error));
                    }
                    last_error = Some(error);
                }
            }
        }

        match last_error {
            Some(error) => Err(FacadeError::Provider(error)),
            None => Err(FacadeError::AllRoutesUnavailable),
        }
    }
}

fn build_request(opts: &CompleteOptions, model: String) -> ChatRequest {
    ChatRequest {
        model,
        messages: opts.messages.clone(),
        tools: Vec::new(),
        tool_choice: None,
        json_mode: false,
        max_tokens: opts.max_tokens,
        temperature: opts.temperature,
        prompt_cache: PromptCacheConfig::default(),
    }
}

fn is_retryable(error: &JarvisLlmClientError) -> bool {
    matches!(error, JarvisLlmClientError::HttpStatus { status, .. } if jarvis_llm_client::should_retry_status(*status))
        || matches!(error, JarvisLlmClientError::Http(inner) if jarvis_llm_client::is_retryable_http_error(inner))
}
