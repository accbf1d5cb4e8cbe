//! Tool execution and built-in tools for conductor.
//!
//! The [`ToolExecutor`] is the only way the orchestrator runs a tool; it
//! validates arguments, bounds each call with a timeout and turns every
//! failure into a [`ToolOutcome`](conductor_core::ToolOutcome).
//!
//! Built-in tools:
//! - `document_search` over any [`RetrievalCapability`]
//! - `code_search` over a [`CodeSearchBackend`] (GitHub provided)
//! - `memory_read` / `memory_write` over a [`MemoryStore`]

pub mod code_search;
pub mod document_search;
pub mod executor;
pub mod keyword_index;
pub mod memory;
pub mod validation;

use std::sync::Arc;

use conductor_core::error::RegistryError;
use conductor_core::memory::MemoryStore;
use conductor_core::retrieval::RetrievalCapability;
use conductor_core::tool::{ToolCapability, ToolDefinition, ToolRegistry};

pub use code_search::{CodeHit, CodeSearchBackend, CodeSearchTool, GithubCodeSearch};
pub use document_search::DocumentSearchTool;
pub use executor::{DEFAULT_TIMEOUT, ToolExecutor};
pub use keyword_index::KeywordIndex;
pub use memory::{InMemoryStore, MemoryReadTool, MemoryWriteTool};
pub use validation::validate_arguments;

/// A capability that knows its own definition.
pub trait BuiltinTool: ToolCapability {
    fn definition(&self) -> ToolDefinition;
}

/// Register a built-in tool under its own definition.
pub fn register<T: BuiltinTool + 'static>(registry: &mut ToolRegistry, tool: T) -> Result<(), RegistryError> {
    let definition = tool.definition();
    registry.register(definition, Arc::new(tool))
}

/// Collaborators the built-in tools are wired to. A tool is registered only
/// when its collaborator is present.
#[derive(Default)]
pub struct BuiltinTools {
    retrieval: Option<Arc<dyn RetrievalCapability>>,
    code_search: Option<Arc<dyn CodeSearchBackend>>,
    memory: Option<Arc<dyn MemoryStore>>,
    top_k: Option<usize>,
    min_score: Option<f32>,
}

impl BuiltinTools {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retrieval(mut self, retrieval: Arc<dyn RetrievalCapability>) -> Self {
        self.retrieval = Some(retrieval);
        self
    }

    /// Defaults advertised for `document_search`'s optional parameters.
    pub fn retrieval_defaults(mut self, top_k: usize, min_score: f32) -> Self {
        self.top_k = Some(top_k);
        self.min_score = Some(min_score);
        self
    }

    pub fn code_search(mut self, backend: Arc<dyn CodeSearchBackend>) -> Self {
        self.code_search = Some(backend);
        self
    }

    pub fn memory(mut self, store: Arc<dyn MemoryStore>) -> Self {
        self.memory = Some(store);
        self
    }

    /// Register the configured tools into `registry`, in a fixed order.
    pub fn register_into(self, registry: &mut ToolRegistry) -> Result<(), RegistryError> {
        if let Some(retrieval) = self.retrieval {
            let mut tool = DocumentSearchTool::new(retrieval);
            if let (Some(top_k), Some(min_score)) = (self.top_k, self.min_score) {
                tool = tool.with_defaults(top_k, min_score);
            }
            register(registry, tool)?;
        }
        if let Some(backend) = self.code_search {
            register(registry, CodeSearchTool::new(backend))?;
        }
        if let Some(store) = self.memory {
            register(registry, MemoryReadTool::new(store.clone()))?;
            register(registry, MemoryWriteTool::new(store))?;
        }
        Ok(())
    }

    /// A fresh registry holding only the configured built-ins.
    pub fn into_registry(self) -> Result<ToolRegistry, RegistryError> {
        let mut registry = ToolRegistry::new();
        self.register_into(&mut registry)?;
        Ok(registry)
    }
}
