//! Token/cost accounting for facade completions.

use std::collections::HashMap;

use jarvis_llm_client::{ChatUsage, Provider};

#[derive(Debug, Clone, Copy, Default)]
pub struct PricePerMillionTokens {
    pub input_usd: f64,
    pub output_usd: f64,
}

/// Price table keyed by `(provider, model)`. Models absent from the table
/// (including every `mock` model) price at zero rather than erroring, so
/// `Complete` never fails on an unpriced model — cost is best-effort
/// telemetry, not a billing system of record.
pub struct PriceTable {
    prices: HashMap<(Provider, String), PricePerMillionTokens>,
}

impl PriceTable {
    pub fn new() -> Self {
        let mut prices = HashMap::new();
        prices.insert(
            (Provider::OpenAi, "gpt-4o-mini".to_string()),
            PricePerMillionTokens { input_usd: 0.15, output_usd: 0.60 },
        );
        prices.insert(
            (Provider::Anthropic, "claude-sonnet".to_string()),
            PricePerMillionTokens { input_usd: 3.00, output_usd: 15.00 },
        );
        prices.insert(
            (Provider::Google, "gemini-flash".to_string()),
            PricePerMillionTokens { input_usd: 0.075, output_usd: 0.30 },
        );
        Self { prices }
    }

    pub fn insert(&mut self, provider: Provider, model: impl Into<String>, price: PricePerMillionTokens) {
        self.prices.insert((provider, model.into()), price);
    }

    pub fn cost_usd(&self, provider: Provider, model: &str, usage: &ChatUsage) -> f64 {
        let price = self
            .prices
            .get(&(provider, model.to_string()))
            .copied()
            .unwrap_or_default();
        let input_cost = (usage.input_tokens as f64 / 1_000_000.0) * price.input_usd;
        let output_cost = (usage.output_tokens as f64 / 1_000_000.0) * price.output_usd;
        input_cost + output_cost
    }
}

impl Default for PriceTable {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::PriceTable;
    use jarvis_llm_client::{ChatUsage, Provider};

    #[test]
    fn unit_known_model_computes_nonzero_cost() {
        let table = PriceTable::new();
        let usage = ChatUsage {
            input_tokens: 1_000_000,
            output_tokens: 1_000_000,
            total_tokens: 2_000_000,
            cached_input_tokens: 0,
        };
        let cost = table.cost_usd(Provider::OpenAi, "gpt-4o-mini", &usage);
        assert!((cost - 0.75).abs() < 1e-9);
    }

    #[test]
    fn regression_unpriced_model_costs_zero_instead_of_erroring() {
        let table = PriceTable::new();
        let usage = ChatUsage {
            input_tokens: 500,
            output_tokens: 500,
            total_tokens: 1_000,
            cached_input_tokens: 0,
        };
        assert_eq!(table.cost_usd(Provider::Mock, "mock-1", &usage), 0.0);
    }
}
