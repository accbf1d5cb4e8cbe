//! Run metrics and cost estimation for conductor.
//!
//! Each orchestration run owns a [`MetricsAggregator`]; the shared
//! [`PricingTable`] turns reported token usage into an estimated spend.

pub mod metrics;
pub mod pricing;

pub use metrics::{Metrics, MetricsAggregator};
pub use pricing::{ModelPricing, PricingTable};

/// Errors from the telemetry subsystem.
#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("invalid pricing: {0}")]
    InvalidPricing(String),
}
