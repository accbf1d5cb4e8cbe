//! Per-invocation metrics.
//!
//! A [`MetricsAggregator`] is owned by exactly one orchestration run and is
//! frozen into an immutable [`Metrics`] snapshot when the run terminates.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::pricing::PricingTable;

/// Frozen metrics of one run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metrics {
    /// Tool-call batches dispatched
    pub iteration_count: u32,
    /// Tool name → number of calls (successful or not)
    pub tool_usage_counts: BTreeMap<String, u32>,
    /// Tool calls whose outcome was a failure
    pub failed_tool_calls: u32,
    /// Passages returned by retrieval tools, before deduplication
    pub documents_retrieved: usize,
    /// Calls made to the reasoning capability
    pub chat_calls: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    /// Wall-clock time of the whole run
    #[serde(with = "duration_ms", rename = "total_duration_ms")]
    pub total_duration: Duration,
    /// Estimated spend in USD
    pub estimated_cost_usd: f64,
}

impl Metrics {
    pub fn total_tool_calls(&self) -> u32 {
        self.tool_usage_counts.values().sum()
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens + self.completion_tokens
    }
}

/// Mutable accumulator for one run.
#[derive(Debug)]
pub struct MetricsAggregator {
    started: Instant,
    pricing: Arc<PricingTable>,
    /// Model charged when a reply does not say which model answered
    default_model: Option<String>,
    metrics: Metrics,
}

impl MetricsAggregator {
    pub fn new(pricing: Arc<PricingTable>) -> Self {
        Self {
            started: Instant::now(),
            pricing,
            default_model: None,
            metrics: Metrics::default(),
        }
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Count one dispatched batch and return the new iteration count.
    pub fn record_iteration(&mut self) -> u32 {
        self.metrics.iteration_count += 1;
        self.metrics.iteration_count
    }

    pub fn iteration_count(&self) -> u32 {
        self.metrics.iteration_count
    }

    pub fn record_tool(&mut self, tool_name: &str, success: bool) {
        *self
            .metrics
            .tool_usage_counts
            .entry(tool_name.to_string())
            .or_default() += 1;
        if !success {
            self.metrics.failed_tool_calls += 1;
        }
    }

    pub fn record_documents(&mut self, count: usize) {
        self.metrics.documents_retrieved += count;
    }

    /// Count one reasoning call and price its token usage. Returns the cost
    /// attributed to this call.
    pub fn record_chat(&mut self, model: Option<&str>, prompt_tokens: u32, completion_tokens: u32) -> f64 {
        self.metrics.chat_calls += 1;
        self.metrics.prompt_tokens += u64::from(prompt_tokens);
        self.metrics.completion_tokens += u64::from(completion_tokens);

        let cost = match model.or(self.default_model.as_deref()) {
            Some(model) => self.pricing.compute_cost(model, prompt_tokens, completion_tokens),
            None => 0.0,
        };
        self.metrics.estimated_cost_usd += cost;
        cost
    }

    /// Count a reasoning call that reported no usage.
    pub fn record_unmetered_chat(&mut self) {
        self.metrics.chat_calls += 1;
    }

    /// Stop the clock and freeze the snapshot.
    pub fn finish(mut self) -> Metrics {
        self.metrics.total_duration = self.started.elapsed();
        self.metrics
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis().min(u128::from(u64::MAX)) as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::ModelPricing;

    fn aggregator() -> MetricsAggregator {
        let mut pricing = PricingTable::empty();
        pricing.set("test/model", ModelPricing::new(1.0, 2.0)).unwrap();
        MetricsAggregator::new(Arc::new(pricing))
    }

    #[test]
    fn counts_tools_per_name() {
        let mut agg = aggregator();
        agg.record_tool("document_search", true);
        agg.record_tool("document_search", false);
        agg.record_tool("code_search", true);

        let metrics = agg.finish();
        assert_eq!(metrics.tool_usage_counts["document_search"], 2);
        assert_eq!(metrics.tool_usage_counts["code_search"], 1);
        assert_eq!(metrics.failed_tool_calls, 1);
        assert_eq!(metrics.total_tool_calls(), 3);
    }

    #[test]
    fn prices_chat_usage() {
        let mut agg = aggregator();
        let cost = agg.record_chat(Some("test/model"), 1_000_000, 500_000);
        assert!((cost - 2.0).abs() < 1e-10);

        let metrics = agg.finish();
        assert_eq!(metrics.chat_calls, 1);
        assert_eq!(metrics.total_tokens(), 1_500_000);
        assert!((metrics.estimated_cost_usd - 2.0).abs() < 1e-10);
    }

    #[test]
    fn falls_back_to_default_model() {
        let mut agg = aggregator().with_default_model("test/model");
        let cost = agg.record_chat(None, 1_000_000, 0);
        assert!((cost - 1.0).abs() < 1e-10);
    }

    #[test]
    fn iterations_accumulate() {
        let mut agg = aggregator();
        assert_eq!(agg.record_iteration(), 1);
        assert_eq!(agg.record_iteration(), 2);
        assert_eq!(agg.iteration_count(), 2);
    }

    #[test]
    fn duration_serializes_as_millis() {
        let metrics = Metrics {
            total_duration: Duration::from_millis(1500),
            ..Default::default()
        };
        let json = serde_json::to_value(&metrics).unwrap();
        assert_eq!(json["total_duration_ms"], 1500);
    }
}
