//! # conductor core
//!
//! Domain types, collaborator traits, and error definitions for the
//! conductor agent orchestration engine. Every other crate depends inward on
//! this one.
//!
//! Collaborators (reasoning backend, retrieval, memory, individual tools)
//! are traits here; implementations live elsewhere so orchestrations can be
//! tested against stubs.

pub mod agent;
pub mod chat;
pub mod error;
pub mod event;
pub mod memory;
pub mod message;
pub mod retrieval;
pub mod tool;

// Re-export key types at crate root for ergonomics
pub use agent::{AgentConfig, TenantScope};
pub use chat::{ChatCapability, ChatReply, ChatRequest, ChatToolCall, Usage};
pub use error::{ChatError, ConversationError, Error, RegistryError, Result, ToolError};
pub use event::{DomainEvent, EventBus};
pub use memory::{MemoryQuery, MemoryRecord, MemoryStore};
pub use message::{Conversation, ConversationId, Message};
pub use retrieval::{RankedPassage, RetrievalCapability};
pub use tool::{
    Arguments, Citation, ParamType, ParameterSpec, ToolCallRequest, ToolCapability, ToolContext,
    ToolDefinition, ToolOutcome, ToolOutput, ToolRegistry,
};
pub use tokio_util::sync::CancellationToken;
