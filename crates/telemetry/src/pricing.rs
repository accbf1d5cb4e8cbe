//! Model pricing used to estimate the monetary cost of a run.
//!
//! Prices are in USD per 1 million tokens, split into input and output.
//! The table is built at startup (defaults + config overrides) and then
//! shared read-only.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::TelemetryError;

/// Per-million-token pricing for a model.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ModelPricing {
    /// Price per 1M input tokens in USD.
    pub input_per_m: f64,
    /// Price per 1M output tokens in USD.
    pub output_per_m: f64,
}

impl ModelPricing {
    pub fn new(input_per_m: f64, output_per_m: f64) -> Self {
        Self {
            input_per_m,
            output_per_m,
        }
    }

    /// Compute cost for the given token counts.
    pub fn cost(&self, input_tokens: u32, output_tokens: u32) -> f64 {
        (input_tokens as f64 * self.input_per_m + output_tokens as f64 * self.output_per_m)
            / 1_000_000.0
    }

    fn is_valid(&self) -> bool {
        self.input_per_m.is_finite()
            && self.output_per_m.is_finite()
            && self.input_per_m >= 0.0
            && self.output_per_m >= 0.0
    }
}

/// Provider prefixes tried when a reply reports a bare model name.
const PROVIDER_PREFIXES: &[&str] = &["openai", "anthropic", "google", "mistral", "deepseek", "meta-llama"];

/// Model name → pricing.
#[derive(Debug, Clone, Default)]
pub struct PricingTable {
    prices: HashMap<String, ModelPricing>,
}

impl PricingTable {
    /// A table pre-filled with common hosted models.
    pub fn with_defaults() -> Self {
        let defaults: &[(&str, f64, f64)] = &[
            ("anthropic/claude-sonnet-4", 3.0, 15.0),
            ("anthropic/claude-opus-4", 15.0, 75.0),
            ("anthropic/claude-3.5-haiku", 0.8, 4.0),
            ("openai/gpt-4o", 2.5, 10.0),
            ("openai/gpt-4o-mini", 0.15, 0.6),
            ("openai/o3-mini", 1.1, 4.4),
            ("google/gemini-2.0-flash", 0.1, 0.4),
            ("google/gemini-1.5-pro", 1.25, 5.0),
            ("mistral/mistral-large", 2.0, 6.0),
            ("mistral/codestral", 0.3, 0.9),
            ("deepseek/deepseek-v3", 0.27, 1.1),
            ("meta-llama/llama-3.1-70b", 0.52, 0.75),
        ];
        Self {
            prices: defaults
                .iter()
                .map(|(name, input, output)| (name.to_string(), ModelPricing::new(*input, *output)))
                .collect(),
        }
    }

    /// Create an empty pricing table.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Add or replace pricing for a model.
    pub fn set(&mut self, model: impl Into<String>, pricing: ModelPricing) -> Result<(), TelemetryError> {
        let model = model.into();
        if !pricing.is_valid() {
            return Err(TelemetryError::InvalidPricing(format!(
                "{model}: prices must be finite and non-negative"
            )));
        }
        self.prices.insert(model, pricing);
        Ok(())
    }

    /// Resolve pricing for a model name.
    ///
    /// Tries an exact match, then known provider prefixes
    /// (`gpt-4o` → `openai/gpt-4o`), then the longest known bare name that
    /// prefixes the requested one (`gpt-4o-mini-2024-07-18` → `gpt-4o-mini`).
    pub fn resolve(&self, model: &str) -> Option<ModelPricing> {
        if let Some(p) = self.prices.get(model) {
            return Some(*p);
        }

        if let Some(p) = PROVIDER_PREFIXES
            .iter()
            .find_map(|prefix| self.prices.get(&format!("{prefix}/{model}")))
        {
            return Some(*p);
        }

        let requested = model.to_lowercase();
        let bare = requested.rsplit('/').next().unwrap_or(&requested);
        self.prices
            .iter()
            .filter_map(|(key, pricing)| {
                let key_bare = key.rsplit('/').next().unwrap_or(key).to_lowercase();
                bare.starts_with(&key_bare).then_some((key_bare.len(), *pricing))
            })
            .max_by_key(|(len, _)| *len)
            .map(|(_, pricing)| pricing)
    }

    /// Cost of one call, or 0.0 for an unknown model.
    pub fn compute_cost(&self, model: &str, input_tokens: u32, output_tokens: u32) -> f64 {
        match self.resolve(model) {
            Some(p) => p.cost(input_tokens, output_tokens),
            None => {
                tracing::debug!(model, "No pricing for model, counting as free");
                0.0
            }
        }
    }

    /// All known model names, sorted.
    pub fn models(&self) -> Vec<String> {
        let mut names: Vec<String> = self.prices.keys().cloned().collect();
        names.sort();
        names
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}
