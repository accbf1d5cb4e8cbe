pub mod config_cmd;
pub mod replay;
pub mod tools;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use conductor_config::AppConfig;
use conductor_core::tool::ToolRegistry;
use conductor_tools::{BuiltinTools, GithubCodeSearch, InMemoryStore, KeywordIndex};

/// File extensions indexed when a documents directory is given.
const DOCUMENT_EXTENSIONS: &[&str] = &["md", "markdown", "txt", "rst"];

/// Build the built-in tool registry from config, serving `index` through
/// `document_search`. `code_search` is registered only when a GitHub token
/// is configured.
pub fn build_registry(
    config: &AppConfig,
    index: KeywordIndex,
) -> Result<ToolRegistry, Box<dyn std::error::Error>> {
    let mut tools = BuiltinTools::new()
        .retrieval(Arc::new(index))
        .retrieval_defaults(config.agent.top_k, config.agent.min_relevance_score)
        .memory(Arc::new(InMemoryStore::new()));

    if let Some(token) = &config.tools.github_token {
        let backend = GithubCodeSearch::new(token.clone())
            .map_err(|e| format!("Failed to build GitHub client: {e}"))?;
        tools = tools.code_search(Arc::new(backend));
    }

    Ok(tools.into_registry()?)
}

/// Index every file in `paths`. Directories contribute their documents
/// (non-recursively, sorted by name); each document id is its file name.
pub fn load_documents(paths: &[PathBuf]) -> std::io::Result<KeywordIndex> {
    let mut index = KeywordIndex::new();
    for path in paths {
        if path.is_dir() {
            let mut files: Vec<PathBuf> = std::fs::read_dir(path)?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_document(p))
                .collect();
            files.sort();
            for file in files {
                index_file(&mut index, &file)?;
            }
        } else {
            index_file(&mut index, path)?;
        }
    }
    tracing::info!(chunks = index.len(), "Document index ready");
    Ok(index)
}

fn is_document(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| DOCUMENT_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

fn index_file(index: &mut KeywordIndex, path: &Path) -> std::io::Result<()> {
    let text = std::fs::read_to_string(path)?;
    let id = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    index.add_document(id, &text);
    Ok(())
}
