//! Message and Conversation domain types.
//!
//! A conversation is the ordered, append-only log the reasoning capability
//! "sees". Messages are a closed sum type; a tool result can only be appended
//! after the call it answers has been issued.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::error::ConversationError;
use crate::tool::{ToolCallRequest, ToolOutcome};

/// Unique identifier for a conversation (one orchestration invocation).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConversationId(pub String);

impl ConversationId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

impl Default for ConversationId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConversationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A single entry in the conversation log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// A user turn
    UserText { text: String },

    /// A natural-language assistant turn
    AssistantText { text: String },

    /// The reasoning capability asked for a tool call
    ToolCallIssued { request: ToolCallRequest },

    /// The outcome of a previously issued call
    ToolResultReceived {
        request: ToolCallRequest,
        outcome: ToolOutcome,
    },
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::UserText { text: text.into() }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::AssistantText { text: text.into() }
    }

    /// The call id, for tool-call and tool-result messages.
    pub fn call_id(&self) -> Option<&str> {
        match self {
            Self::ToolCallIssued { request } | Self::ToolResultReceived { request, .. } => {
                Some(&request.id)
            }
            _ => None,
        }
    }
}

/// An ordered, append-only sequence of messages.
///
/// Serialize-only: restore a stored log through [`Conversation::from_history`]
/// so the ordering checks run again.
#[derive(Debug, Clone, Serialize)]
pub struct Conversation {
    pub id: ConversationId,

    messages: Vec<Message>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,

    #[serde(skip)]
    issued: HashSet<String>,

    #[serde(skip)]
    answered: HashSet<String>,
}

impl Conversation {
    /// Create a new empty conversation.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            id: ConversationId::new(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
            issued: HashSet::new(),
            answered: HashSet::new(),
        }
    }

    /// Rebuild a conversation from prior messages, checking the ordering
    /// invariant along the way.
    pub fn from_history(history: impl IntoIterator<Item = Message>) -> Result<Self, ConversationError> {
        let mut conversation = Self::new();
        for message in history {
            conversation.push(message)?;
        }
        Ok(conversation)
    }

    /// Append a message.
    ///
    /// Rejects a tool result whose call was never issued, a second result for
    /// the same call, and a re-used call id.
    pub fn push(&mut self, message: Message) -> Result<(), ConversationError> {
        match &message {
            Message::ToolCallIssued { request } => {
                if !self.issued.insert(request.id.clone()) {
                    return Err(ConversationError::DuplicateToolCall(request.id.clone()));
                }
            }
            Message::ToolResultReceived { request, .. } => {
                if !self.issued.contains(&request.id) {
                    return Err(ConversationError::UnmatchedToolResult(request.id.clone()));
                }
                if !self.answered.insert(request.id.clone()) {
                    return Err(ConversationError::DuplicateToolResult(request.id.clone()));
                }
            }
            _ => {}
        }
        self.updated_at = Utc::now();
        self.messages.push(message);
        Ok(())
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Whether a call with this id has already been issued.
    pub fn has_call(&self, id: &str) -> bool {
        self.issued.contains(id)
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tool::{Arguments, ToolOutput};

    fn call(id: &str) -> ToolCallRequest {
        ToolCallRequest::new(id, "echo", Arguments::new())
    }

    fn result(id: &str) -> Message {
        Message::ToolResultReceived {
            request: call(id),
            outcome: ToolOutcome::success(ToolOutput::text("ok")),
        }
    }

    #[test]
    fn conversation_tracks_updates() {
        let mut conv = Conversation::new();
        let created = conv.created_at;

        conv.push(Message::user("First message")).unwrap();
        assert_eq!(conv.len(), 1);
        assert!(conv.updated_at >= created);
    }

    #[test]
    fn result_requires_issued_call() {
        let mut conv = Conversation::new();
        let err = conv.push(result("c1")).unwrap_err();
        assert_eq!(err, ConversationError::UnmatchedToolResult("c1".into()));
        assert!(conv.is_empty());
    }

    #[test]
    fn issued_then_result_is_accepted_once() {
        let mut conv = Conversation::new();
        conv.push(Message::ToolCallIssued { request: call("c1") }).unwrap();
        assert!(conv.has_call("c1"));
        conv.push(result("c1")).unwrap();
        assert_eq!(conv.len(), 2);

        let err = conv.push(result("c1")).unwrap_err();
        assert_eq!(err, ConversationError::DuplicateToolResult("c1".into()));
    }

    #[test]
    fn reused_call_id_is_rejected() {
        let mut conv = Conversation::new();
        conv.push(Message::ToolCallIssued { request: call("c1") }).unwrap();
        assert!(conv.push(Message::ToolCallIssued { request: call("c1") }).is_err());
    }

    #[test]
    fn from_history_validates_order() {
        let ok = Conversation::from_history(vec![
            Message::user("hi"),
            Message::ToolCallIssued { request: call("a") },
            result("a"),
            Message::assistant("done"),
        ]);
        assert_eq!(ok.unwrap().len(), 4);

        let bad = Conversation::from_history(vec![result("a"), Message::ToolCallIssued { request: call("a") }]);
        assert!(bad.is_err());
    }

    #[test]
    fn message_serialization_is_tagged() {
        let json = serde_json::to_value(Message::user("Test message")).unwrap();
        assert_eq!(json["type"], "user_text");
        let back: Message = serde_json::from_value(json).unwrap();
        assert_eq!(back, Message::user("Test message"));
    }
}
