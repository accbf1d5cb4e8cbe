//! Error types for the conductor domain.
//!
//! Uses `thiserror` for ergonomic error definitions.
//! Each bounded context has its own error enum; only [`Error`] ever crosses
//! the orchestrator boundary.

use thiserror::Error;

/// The top-level error type returned to callers of the orchestrator.
#[derive(Debug, Error)]
pub enum Error {
    // --- Reasoning capability (fatal for the invocation) ---
    #[error("Reasoning capability unavailable: {0}")]
    ReasoningUnavailable(#[from] ChatError),

    // --- Conversation ordering ---
    #[error("Conversation error: {0}")]
    Conversation(#[from] ConversationError),

    // --- Configuration errors ---
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Invocation cancelled")]
    Cancelled,
}

/// Result type alias using our Error.
pub type Result<T> = std::result::Result<T, Error>;

// --- Bounded context errors ---

/// Failures reported by the Chat/Reasoning capability.
#[derive(Debug, Clone, Error)]
pub enum ChatError {
    #[error("API request failed: {message} (status: {status_code})")]
    ApiError { status_code: u16, message: String },

    #[error("Rate limited by reasoning backend, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    #[error("Reasoning backend unavailable: {0}")]
    Unavailable(String),
}

/// Tool-level failures. All of these are recoverable: the executor turns
/// them into failed outcomes that are replayed to the reasoning capability,
/// so none of them has a conversion into [`Error`].
#[derive(Debug, Clone, Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    NotFound(String),

    #[error("invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("timeout after {timeout_ms}ms")]
    Timeout { tool_name: String, timeout_ms: u64 },

    #[error("{reason}")]
    ExecutionFailed { tool_name: String, reason: String },

    #[error("cancelled")]
    Cancelled,
}

impl ToolError {
    /// Convenience constructor for capability-level failures.
    pub fn failed(tool_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ExecutionFailed {
            tool_name: tool_name.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("Tool already registered: {0}")]
    DuplicateTool(String),

    #[error("Tool not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConversationError {
    #[error("Tool result for call '{0}' has no matching issued call")]
    UnmatchedToolResult(String),

    #[error("Tool call '{0}' already has a result")]
    DuplicateToolResult(String),

    #[error("Tool call id '{0}' was already issued")]
    DuplicateToolCall(String),
}

#[derive(Debug, Error)]
pub enum MemoryError {
    /// The record could not be stored
    #[error("Storage error: {0}")]
    Storage(String),

    /// The query could not be run
    #[error("Query failed: {0}")]
    QueryFailed(String),
}

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Search backend failed: {0}")]
    Backend(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chat_error_displays_correctly() {
        let err = Error::ReasoningUnavailable(ChatError::ApiError {
            status_code: 503,
            message: "overloaded".into(),
        });
        assert!(err.to_string().contains("503"));
        assert!(err.to_string().contains("overloaded"));
    }

    #[test]
    fn timeout_names_the_budget() {
        let err = ToolError::Timeout {
            tool_name: "document_search".into(),
            timeout_ms: 250,
        };
        assert_eq!(err.to_string(), "timeout after 250ms");
    }

    #[test]
    fn config_error_names_the_problem() {
        let err = Error::Config {
            message: "max_tool_calls must be at least 1".into(),
        };
        assert_eq!(err.to_string(), "Configuration error: max_tool_calls must be at least 1");
    }

    #[test]
    fn unknown_tool_message() {
        assert_eq!(ToolError::NotFound("nope".into()).to_string(), "unknown tool: nope");
    }
}
