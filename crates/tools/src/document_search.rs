//! `document_search`: retrieval over the tenant's documents.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;

use conductor_core::error::ToolError;
use conductor_core::retrieval::RetrievalCapability;
use conductor_core::tool::{
    Arguments, ParamType, ParameterSpec, ToolCapability, ToolContext, ToolDefinition, ToolOutput,
};

use crate::BuiltinTool;

pub const NAME: &str = "document_search";

/// Upper bound on `top_k`, whatever the caller asks for.
const MAX_TOP_K: u64 = 50;

/// Wraps a [`RetrievalCapability`] as a tool, filters by minimum score and
/// reports every kept passage as a citation.
pub struct DocumentSearchTool {
    retrieval: Arc<dyn RetrievalCapability>,
    default_top_k: usize,
    default_min_score: f32,
}

impl DocumentSearchTool {
    pub fn new(retrieval: Arc<dyn RetrievalCapability>) -> Self {
        Self {
            retrieval,
            default_top_k: 5,
            default_min_score: 0.0,
        }
    }

    pub fn with_defaults(mut self, top_k: usize, min_score: f32) -> Self {
        self.default_top_k = top_k;
        self.default_min_score = min_score;
        self
    }
}

impl BuiltinTool for DocumentSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            NAME,
            "Search the document collection. Returns the most relevant passages with their source document and relevance score.",
        )
        .param(ParameterSpec::required("query", ParamType::String).with_description("What to search for"))
        .param(
            ParameterSpec::optional("top_k", ParamType::Integer)
                .with_default(json!(self.default_top_k))
                .with_description("Maximum number of passages to return"),
        )
        .param(
            ParameterSpec::optional("min_score", ParamType::Number)
                .with_default(json!(self.default_min_score))
                .with_description("Minimum relevance score between 0.0 and 1.0"),
        )
    }
}

#[async_trait]
impl ToolCapability for DocumentSearchTool {
    async fn invoke(&self, arguments: Arguments, ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
        }

        let top_k = arguments
            .get("top_k")
            .and_then(|v| v.as_u64())
            .unwrap_or(self.default_top_k as u64)
            .clamp(1, MAX_TOP_K) as usize;
        let min_score = arguments
            .get("min_score")
            .and_then(|v| v.as_f64())
            .map_or(self.default_min_score, |s| s as f32);

        let passages = self
            .retrieval
            .search(query, top_k, &ctx.tenant)
            .await
            .map_err(|e| ToolError::failed(NAME, e.to_string()))?;

        let passages: Vec<_> = passages.into_iter().filter(|p| p.score >= min_score).collect();

        tracing::debug!(
            backend = self.retrieval.name(),
            tenant = %ctx.tenant,
            hits = passages.len(),
            "Document search finished"
        );

        let content = if passages.is_empty() {
            format!("No documents matched \"{query}\".")
        } else {
            passages
                .iter()
                .enumerate()
                .map(|(i, p)| {
                    format!(
                        "[{}] {} #{} (score {:.2})\n{}",
                        i + 1,
                        p.document_id,
                        p.chunk_index,
                        p.score,
                        p.text
                    )
                })
                .collect::<Vec<_>>()
                .join("\n\n")
        };

        let citations = passages.iter().map(|p| p.to_citation()).collect();
        let data = json!({
            "query": query,
            "passages": passages,
        });

        Ok(ToolOutput::text(content)
            .with_data(data)
            .with_citations(citations))
    }
}
