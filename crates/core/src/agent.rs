//! Per-invocation agent configuration and tenant scope.

use serde::{Deserialize, Serialize};

use crate::error::Error;

/// How one orchestration invocation behaves. Supplied by the caller and never
/// mutated by the orchestrator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentConfig {
    /// Hard ceiling on tool-call batches (≥ 1)
    #[serde(default = "default_max_tool_calls")]
    pub max_tool_calls: u32,

    /// Run the calls of one batch concurrently
    #[serde(default)]
    pub allow_parallel_tool_calls: bool,

    /// Pre-fetch retrieval results before the first reasoning call
    #[serde(default)]
    pub use_retrieval_context: bool,

    #[serde(default = "default_top_k")]
    pub top_k: usize,

    #[serde(default)]
    pub min_relevance_score: f32,

    /// Overrides the built-in system prompt
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

fn default_max_tool_calls() -> u32 {
    5
}
fn default_top_k() -> usize {
    5
}

impl AgentConfig {
    pub fn validate(&self) -> Result<(), Error> {
        if self.max_tool_calls == 0 {
            return Err(Error::Config {
                message: "max_tool_calls must be at least 1".into(),
            });
        }
        if self.top_k == 0 {
            return Err(Error::Config {
                message: "top_k must be at least 1".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.min_relevance_score) {
            return Err(Error::Config {
                message: "min_relevance_score must be between 0.0 and 1.0".into(),
            });
        }
        Ok(())
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_tool_calls: default_max_tool_calls(),
            allow_parallel_tool_calls: false,
            use_retrieval_context: false,
            top_k: default_top_k(),
            min_relevance_score: 0.0,
            system_prompt: None,
        }
    }
}

/// The tenant whose data tools may touch. Opaque to the orchestrator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TenantScope(pub String);

impl TenantScope {
    pub fn new(tenant: impl Into<String>) -> Self {
        Self(tenant.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(AgentConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_ceiling_is_rejected() {
        let config = AgentConfig {
            max_tool_calls: 0,
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(Error::Config { .. })));
    }

    #[test]
    fn relevance_out_of_range_is_rejected() {
        let config = AgentConfig {
            min_relevance_score: 1.5,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }
}
