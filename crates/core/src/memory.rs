//! Memory store — long-term facts the agent can read and write through tools.
//!
//! Persistence lives outside this crate; the orchestrator only sees this
//! trait, exposed to the reasoning capability as `memory_read` / `memory_write`.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::agent::TenantScope;
use crate::error::MemoryError;

/// A single memory record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryRecord {
    /// Unique ID (assigned by the store when empty)
    pub id: String,

    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    pub created_at: DateTime<Utc>,

    /// Relevance score (set by search operations)
    #[serde(default)]
    pub score: f32,
}

impl MemoryRecord {
    pub fn new(content: impl Into<String>, tags: Vec<String>) -> Self {
        Self {
            id: String::new(),
            content: content.into(),
            tags,
            created_at: Utc::now(),
            score: 0.0,
        }
    }
}

/// A query for searching memories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryQuery {
    pub text: String,

    #[serde(default = "default_limit")]
    pub limit: usize,

    /// Only records carrying at least one of these tags
    #[serde(default)]
    pub tags: Vec<String>,
}

fn default_limit() -> usize {
    5
}

/// Tenant-scoped memory persistence.
#[async_trait]
pub trait MemoryStore: Send + Sync {
    fn name(&self) -> &str;

    /// Store a record, returning its id.
    async fn store(&self, tenant: &TenantScope, record: MemoryRecord) -> Result<String, MemoryError>;

    /// Search records visible to `tenant`, best first.
    async fn search(&self, tenant: &TenantScope, query: MemoryQuery) -> Result<Vec<MemoryRecord>, MemoryError>;
}
