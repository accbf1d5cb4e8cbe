//! Chat capability — the abstraction over the reasoning backend.
//!
//! Given a system prompt, the ordered conversation, and the tool catalog,
//! the backend replies with natural-language text, tool calls, or both.
//! The orchestrator decides how to interpret the reply; retries are the
//! backend's own business.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::ChatError;
use crate::message::Message;
use crate::tool::ToolDefinition;

/// One reasoning request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatRequest {
    pub system_prompt: String,

    /// The full ordered conversation
    pub messages: Vec<Message>,

    /// Tools the backend may call. Empty when the orchestrator wants a final answer.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<ToolDefinition>,
}

/// A tool call as emitted by the backend, before validation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatToolCall {
    /// Backend-assigned call id, if it provides one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    pub name: String,

    /// Arguments as a raw JSON string
    #[serde(default)]
    pub arguments: String,

    /// Rationale the backend attached to this call
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
}

/// Token usage information.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

impl Usage {
    /// Saturates instead of overflowing on backend-reported counts.
    pub fn total_tokens(&self) -> u32 {
        self.prompt_tokens.saturating_add(self.completion_tokens)
    }
}

/// A complete reply from the reasoning backend.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatReply {
    /// Generated text (may be empty when only tool calls are returned)
    #[serde(default)]
    pub content: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ChatToolCall>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub usage: Option<Usage>,

    /// Which model actually responded
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl ChatReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn tool_calls(calls: Vec<ChatToolCall>) -> Self {
        Self {
            tool_calls: calls,
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, usage: Usage, model: impl Into<String>) -> Self {
        self.usage = Some(usage);
        self.model = Some(model.into());
        self
    }
}

/// The reasoning backend.
#[async_trait]
pub trait ChatCapability: Send + Sync {
    /// A human-readable name for this backend.
    fn name(&self) -> &str;

    /// Produce the next decision for the given conversation.
    async fn decide(&self, request: ChatRequest) -> Result<ChatReply, ChatError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reply_deserializes_with_defaults() {
        let reply: ChatReply = serde_json::from_str(r#"{"content": "hi"}"#).unwrap();
        assert_eq!(reply.content, "hi");
        assert!(reply.tool_calls.is_empty());
        assert!(reply.usage.is_none());
    }

    #[test]
    fn tool_call_reply_from_json() {
        let reply: ChatReply = serde_json::from_str(
            r#"{"tool_calls": [{"name": "document_search", "arguments": "{\"query\":\"rust\"}"}]}"#,
        )
        .unwrap();
        assert_eq!(reply.tool_calls.len(), 1);
        assert_eq!(reply.tool_calls[0].id, None);
    }

    #[test]
    fn usage_total() {
        let usage = Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
        };
        assert_eq!(usage.total_tokens(), 15);
    }

    #[test]
    fn usage_total_saturates() {
        let usage = Usage {
            prompt_tokens: u32::MAX,
            completion_tokens: 1,
        };
        assert_eq!(usage.total_tokens(), u32::MAX);
    }
}
