//! `code_search`: search source code in external repositories.
//!
//! The tool talks to a [`CodeSearchBackend`]; [`GithubCodeSearch`] is the
//! stock backend over the GitHub REST API.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use conductor_core::error::ToolError;
use conductor_core::tool::{
    Arguments, ParamType, ParameterSpec, ToolCapability, ToolContext, ToolDefinition, ToolOutput,
};

use crate::BuiltinTool;

pub const NAME: &str = "code_search";

/// One matching file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeHit {
    pub repository: String,
    pub path: String,
    pub url: String,
}

/// A repository search service.
#[async_trait]
pub trait CodeSearchBackend: Send + Sync {
    fn name(&self) -> &str;

    /// Files matching `query`, optionally restricted to `owner/name`.
    async fn search_code(
        &self,
        query: &str,
        repository: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CodeHit>, ToolError>;
}

/// GitHub code search (`GET /search/code`). Code search requires an
/// authenticated request.
pub struct GithubCodeSearch {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl GithubCodeSearch {
    pub fn new(token: impl Into<String>) -> Result<Self, reqwest::Error> {
        Self::with_api_url("https://api.github.com", token)
    }

    /// Point at a GitHub Enterprise instance or a test server.
    pub fn with_api_url(api_url: impl Into<String>, token: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .user_agent(concat!("conductor/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        })
    }
}

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Deserialize)]
struct SearchItem {
    path: String,
    html_url: String,
    repository: SearchRepository,
}

#[derive(Deserialize)]
struct SearchRepository {
    full_name: String,
}

#[async_trait]
impl CodeSearchBackend for GithubCodeSearch {
    fn name(&self) -> &str {
        "github"
    }

    async fn search_code(
        &self,
        query: &str,
        repository: Option<&str>,
        limit: usize,
    ) -> Result<Vec<CodeHit>, ToolError> {
        let q = match repository {
            Some(repo) => format!("{query} repo:{repo}"),
            None => query.to_string(),
        };
        let per_page = limit.to_string();

        let response = self
            .client
            .get(format!("{}/search/code", self.api_url))
            .bearer_auth(&self.token)
            .header(reqwest::header::ACCEPT, "application/vnd.github+json")
            .query(&[("q", q.as_str()), ("per_page", per_page.as_str())])
            .send()
            .await
            .map_err(|e| ToolError::failed(NAME, format!("GitHub request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(status = status.as_u16(), "GitHub code search rejected request");
            return Err(ToolError::failed(
                NAME,
                format!("GitHub API returned {status}: {}", truncate(&body, 200)),
            ));
        }

        let parsed: SearchResponse = response
            .json()
            .await
            .map_err(|e| ToolError::failed(NAME, format!("unexpected GitHub response: {e}")))?;

        Ok(parsed
            .items
            .into_iter()
            .take(limit)
            .map(|item| CodeHit {
                repository: item.repository.full_name,
                path: item.path,
                url: item.html_url,
            })
            .collect())
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &s[..idx]),
        None => s.to_string(),
    }
}

/// Exposes a [`CodeSearchBackend`] as a tool.
pub struct CodeSearchTool {
    backend: Arc<dyn CodeSearchBackend>,
}

impl CodeSearchTool {
    pub fn new(backend: Arc<dyn CodeSearchBackend>) -> Self {
        Self { backend }
    }
}

impl BuiltinTool for CodeSearchTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition::new(
            NAME,
            "Search source code in external repositories. Returns matching file paths and links.",
        )
        .param(ParameterSpec::required("query", ParamType::String).with_description("Code or identifier to search for"))
        .param(
            ParameterSpec::optional("repository", ParamType::String)
                .with_description("Restrict the search to one repository, as owner/name"),
        )
        .param(
            ParameterSpec::optional("limit", ParamType::Integer)
                .with_default(json!(5))
                .with_description("Maximum number of files to return"),
        )
    }
}

#[async_trait]
impl ToolCapability for CodeSearchTool {
    async fn invoke(&self, arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let query = arguments
            .get("query")
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or_default();
        if query.is_empty() {
            return Err(ToolError::InvalidArguments("'query' must not be empty".into()));
        }
        let repository = arguments.get("repository").and_then(|v| v.as_str());
        let limit = arguments
            .get("limit")
            .and_then(|v| v.as_u64())
            .unwrap_or(5)
            .clamp(1, 30) as usize;

        let hits = self.backend.search_code(query, repository, limit).await?;

        let content = if hits.is_empty() {
            format!("No code matched \"{query}\".")
        } else {
            hits.iter()
                .map(|h| format!("- {}: {} ({})", h.repository, h.path, h.url))
                .collect::<Vec<_>>()
                .join("\n")
        };

        Ok(ToolOutput::text(content).with_data(json!({
            "backend": self.backend.name(),
            "hits": hits,
        })))
    }
}
