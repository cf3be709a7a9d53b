//! LLM provider facade: registry, retry/circuit-breaking, and cost
//! accounting on top of the low-level clients in `jarvis-llm-client`.

pub mod circuit_breaker;
pub mod facade;
pub mod pricing;

pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitDecision, CircuitState};
pub use facade::{CompleteOptions, CompletionOutcome, FacadeError, LlmFacade, LlmFacadeBuilder};
pub use pricing::{PricePerMillionTokens, PriceTable};
