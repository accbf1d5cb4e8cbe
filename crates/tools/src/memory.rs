//! `memory_read` / `memory_write` tools and an in-memory store backing them.

use async_trait::async_trait;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

use conductor_core::agent::TenantScope;
use conductor_core::error::{MemoryError, ToolError};
use conductor_core::memory::{MemoryQuery, MemoryRecord, MemoryStore};
use conductor_core::tool::{
    Arguments, ParamType, ParameterSpec, ToolCapability, ToolContext, ToolDefinition, ToolOutput,
};

use crate::BuiltinTool;

pub const READ_TOOL: &str = "memory_read";
pub const WRITE_TOOL: &str = "memory_write";

/// Tenant-partitioned memory kept in process. Useful for tests and
/// ephemeral sessions.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    records: RwLock<HashMap<TenantScope, Vec<MemoryRecord>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn count(&self, tenant: &TenantScope) -> usize {
        self.records.read().await.get(tenant).map_or(0, Vec::len)
    }
}

#[async_trait]
impl MemoryStore for InMemoryStore {
    fn name(&self) -> &str {
        "in_memory"
    }

    async fn store(&self, tenant: &TenantScope, mut record: MemoryRecord) -> Result<String, MemoryError> {
        if record.content.trim().is_empty() {
            return Err(MemoryError::Storage("record content is empty".into()));
        }
        if record.id.is_empty() {
            record.id = Uuid::new_v4().to_string();
        }
        let id = record.id.clone();
        self.records
            .write()
            .await
            .entry(tenant.clone())
            .or_default()
            .push(record);
        Ok(id)
    }

    async fn search(&self, tenant: &TenantScope, query: MemoryQuery) -> Result<Vec<MemoryRecord>, MemoryError> {
        // An empty needle would match every record.
        let needle = query.text.trim().to_lowercase();
        if needle.is_empty() {
            return Err(MemoryError::QueryFailed("query text is empty".into()));
        }

        let records = self.records.read().await;
        let Some(records) = records.get(tenant) else {
            return Ok(Vec::new());
        };

        let mut results: Vec<MemoryRecord> = records
            .iter()
            .filter(|r| query.tags.is_empty() || query.tags.iter().any(|t| r.tags.contains(t)))
            .filter_map(|r| {
                let content = r.content.to_lowercase();
                let occurrences = content.matches(&needle).count();
                (occurrences > 0).then(|| {
                    let mut hit = r.clone();
                    hit.score = occurrences as f32 / (content.len() as f32 / 100.0).max(1.0);
                    hit
                })
            })
            .collect();

        results.sort_by(|a, b| b.score.total_cmp(&a.score));
        results.truncate(query.limit);
        Ok(results)
    }
}

/// Searches the tenant's memory.
pub struct MemoryReadTool {
    store: Arc<dyn MemoryStore>,
}

impl MemoryReadTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

impl BuiltinTool for MemoryReadTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            READ_TOOL,
            "Search long-term memory for facts saved in earlier conversations.",
        )
        .param(ParameterSpec::required("query", ParamType::String).with_description("Text to look for"))
        .param(
            ParameterSpec::optional("limit", ParamType::Integer)
                .with_default(json!(5))
                .with_description("Maximum number of memories to return"),
        )
        .param(
            ParameterSpec::optional("tags", ParamType::Array)
                .with_description("Only return memories carrying one of these tags"),
        )
    }
}

#[async_trait]
impl ToolCapability for MemoryReadTool {
    async fn invoke(&self, arguments: Arguments, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let text = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if text.is_empty() {
            return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
        }

        let query = MemoryQuery {
            text: text.to_string(),
            limit: arguments
                .get("limit")
                .and_then(|v| v.as_u64())
                .unwrap_or(5)
                .clamp(1, 50) as usize,
            tags: string_list(arguments.get("tags")),
        };

        let records = self
            .store
            .search(&ctx.tenant, query)
            .await
            .map_err(|e| ToolError::failed(READ_TOOL, e.to_string()))?;

        let content = if records.is_empty() {
            "No matching memories.".to_string()
        } else {
            records
                .iter()
                .map(|r| format!("- {} (id: {})", r.content, r.id))
                .collect::<Vec<_>>()
                .join("\n")
        };
        let data = serde_json::to_value(&records).map_err(|e| ToolError::failed(READ_TOOL, e.to_string()))?;
        Ok(ToolOutput::text(content).with_data(data))
    }
}

/// Saves a fact to the tenant's memory.
pub struct MemoryWriteTool {
    store: Arc<dyn MemoryStore>,
}

impl MemoryWriteTool {
    pub fn new(store: Arc<dyn MemoryStore>) -> Self {
        Self { store }
    }
}

impl BuiltinTool for MemoryWriteTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(WRITE_TOOL, "Save a fact to long-term memory for later conversations.")
            .param(ParameterSpec::required("content", ParamType::String).with_description("The fact to remember"))
            .param(ParameterSpec::optional("tags", ParamType::Array).with_description("Labels for later filtering"))
    }
}

#[async_trait]
impl ToolCapability for MemoryWriteTool {
    async fn invoke(&self, arguments: Arguments, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let content = arguments
            .get("content")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .trim();
        if content.is_empty() {
            return Err(ToolError::InvalidArguments("'content' must not be empty".into()));
        }

        let record = MemoryRecord::new(content, string_list(arguments.get("tags")));
        let id = self
            .store
            .store(&ctx.tenant, record)
            .await
            .map_err(|e| ToolError::failed(WRITE_TOOL, e.to_string()))?;

        tracing::debug!(tenant = %ctx.tenant, id = %id, "Stored memory");
        Ok(ToolOutput::text(format!("Saved memory {id}.")).with_data(json!({ "id": id })))
    }
}

fn string_list(value: Option<&serde_json::Value>) -> Vec<String> {
    value
        .and_then(|v| v.as_array())
        .map(|items| items.iter().filter_map(|i| i.as_str().map(String::from)).collect())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(value: serde_json::Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    fn ctx(tenant: &str) -> ToolContext {
        ToolContext {
            tenant: TenantScope::new(tenant),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn write_then_read() {
        let store: Arc<dyn MemoryStore> = Arc::new(InMemoryStore::new());
        let write = MemoryWriteTool::new(store.clone());
        let read = MemoryReadTool::new(store);

        write
            .invoke(args(json!({"content": "User prefers Rust over Go", "tags": ["prefs"]})), &ctx("acme"))
            .await
            .unwrap();

        let output = read
            .invoke(args(json!({"query": "rust", "limit": 5})), &ctx("acme"))
            .await
            .unwrap();
        assert!(output.content.contains("User prefers Rust over Go"));
    }

    #[tokio::test]
    async fn memories_are_tenant_scoped() {
        let store = Arc::new(InMemoryStore::new());
        let write = MemoryWriteTool::new(store.clone());
        write
            .invoke(args(json!({"content": "secret roadmap"})), &ctx("acme"))
            .await
            .unwrap();

        assert_eq!(store.count(&TenantScope::new("acme")).await, 1);
        let read = MemoryReadTool::new(store);
        let output = read
            .invoke(args(json!({"query": "roadmap"})), &ctx("globex"))
            .await
            .unwrap();
        assert_eq!(output.content, "No matching memories.");
    }

    #[tokio::test]
    async fn tag_filter() {
        let store = InMemoryStore::new();
        let tenant = TenantScope::new("t");
        store
            .store(&tenant, MemoryRecord::new("deploy on fridays", vec!["ops".into()]))
            .await
            .unwrap();
        store
            .store(&tenant, MemoryRecord::new("deploy with care", vec![]))
            .await
            .unwrap();

        let results = store
            .search(
                &tenant,
                MemoryQuery {
                    text: "deploy".into(),
                    limit: 10,
                    tags: vec!["ops".into()],
                },
            )
            .await
            .unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].content, "deploy on fridays");
    }

    #[tokio::test]
    async fn blank_query_is_rejected() {
        let store = Arc::new(InMemoryStore::new());
        let write = MemoryWriteTool::new(store.clone());
        write
            .invoke(args(json!({"content": "private note"})), &ctx("acme"))
            .await
            .unwrap();

        let read = MemoryReadTool::new(store.clone());
        for query in ["", "   "] {
            let err = read
                .invoke(args(json!({"query": query})), &ctx("acme"))
                .await
                .unwrap_err();
            assert!(matches!(err, ToolError::InvalidArguments(_)));
        }

        let err = store
            .search(
                &TenantScope::new("acme"),
                MemoryQuery {
                    text: " ".into(),
                    limit: 10,
                    tags: vec![],
                },
            )
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::QueryFailed(_)));
    }

    #[tokio::test]
    async fn store_rejects_blank_records() {
        let store = InMemoryStore::new();
        let tenant = TenantScope::new("t");
        let err = store
            .store(&tenant, MemoryRecord::new("  ", vec![]))
            .await
            .unwrap_err();
        assert!(matches!(err, MemoryError::Storage(_)));
        assert_eq!(store.count(&tenant).await, 0);
    }

    #[tokio::test]
    async fn empty_content_is_rejected() {
        let write = MemoryWriteTool::new(Arc::new(InMemoryStore::new()));
        let err = write
            .invoke(args(json!({"content": "   "})), &ctx("t"))
            .await
            .unwrap_err();
        assert!(matches!(err, ToolError::InvalidArguments(_)));
    }
}
