//! A chat capability that replays recorded replies.
//!
//! Used to re-run an orchestration deterministically: the same script and
//! the same tools produce the same conversation.

use async_trait::async_trait;
use serde::Deserialize;
use std::collections::VecDeque;
use std::sync::Mutex;

use conductor_core::chat::{ChatCapability, ChatReply, ChatRequest, ChatToolCall, Usage};
use conductor_core::error::ChatError;

/// Replays a fixed list of replies, one per `decide` call, and records every
/// request it receives.
pub struct ScriptedChat {
    replies: Mutex<VecDeque<ChatReply>>,
    requests: Mutex<Vec<ChatRequest>>,
    total: usize,
}

impl ScriptedChat {
    pub fn new(replies: Vec<ChatReply>) -> Self {
        Self {
            total: replies.len(),
            replies: Mutex::new(replies.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Parse a script: a JSON array of replies.
    ///
    /// ```json
    /// [
    ///   {"tool_calls": [{"name": "document_search", "arguments": {"query": "tokio"}}]},
    ///   {"content": "Tokio is an async runtime.", "model": "openai/gpt-4o"}
    /// ]
    /// ```
    ///
    /// Tool-call `arguments` may be an object or a raw JSON string.
    pub fn from_json(script: &str) -> Result<Self, serde_json::Error> {
        let steps: Vec<ScriptStep> = serde_json::from_str(script)?;
        Ok(Self::new(steps.into_iter().map(ChatReply::from).collect()))
    }

    /// Requests received so far, in order.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Replies not yet consumed.
    pub fn remaining(&self) -> usize {
        self.replies.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl ChatCapability for ScriptedChat {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(&self, request: ChatRequest) -> Result<ChatReply, ChatError> {
        self.requests
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(request);

        self.replies
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .ok_or_else(|| {
                ChatError::Unavailable(format!("script exhausted after {} replies", self.total))
            })
    }
}

#[derive(Deserialize)]
struct ScriptStep {
    #[serde(default)]
    content: String,
    #[serde(default)]
    tool_calls: Vec<ScriptToolCall>,
    #[serde(default)]
    usage: Option<Usage>,
    #[serde(default)]
    model: Option<String>,
}

#[derive(Deserialize)]
struct ScriptToolCall {
    #[serde(default)]
    id: Option<String>,
    name: String,
    #[serde(default)]
    arguments: serde_json::Value,
    #[serde(default)]
    reasoning: Option<String>,
}

impl From<ScriptStep> for ChatReply {
    fn from(step: ScriptStep) -> Self {
        Self {
            content: step.content,
            tool_calls: step
                .tool_calls
                .into_iter()
                .map(|call| ChatToolCall {
                    id: call.id,
                    name: call.name,
                    arguments: match call.arguments {
                        serde_json::Value::Null => String::new(),
                        serde_json::Value::String(raw) => raw,
                        other => other.to_string(),
                    },
                    reasoning: call.reasoning,
                })
                .collect(),
            usage: step.usage,
            model: step.model,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ChatRequest {
        ChatRequest {
            system_prompt: "sys".into(),
            messages: vec![],
            tools: vec![],
        }
    }

    #[tokio::test]
    async fn replays_in_order_then_fails() {
        let chat = ScriptedChat::new(vec![ChatReply::text("one"), ChatReply::text("two")]);

        assert_eq!(chat.decide(request()).await.unwrap().content, "one");
        assert_eq!(chat.decide(request()).await.unwrap().content, "two");
        let err = chat.decide(request()).await.unwrap_err();
        assert!(matches!(err, ChatError::Unavailable(_)));
        assert_eq!(chat.requests().len(), 3);
        assert_eq!(chat.remaining(), 0);
    }

    #[test]
    fn parses_object_and_string_arguments() {
        let chat = ScriptedChat::from_json(
            r#"[
                {"tool_calls": [
                    {"name": "document_search", "arguments": {"query": "tokio"}},
                    {"id": "x", "name": "echo", "arguments": "{\"text\": \"hi\"}"}
                ]},
                {"content": "done", "usage": {"prompt_tokens": 3, "completion_tokens": 1}}
            ]"#,
        )
        .unwrap();

        let replies = chat.replies.lock().unwrap();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0].tool_calls[0].arguments, r#"{"query":"tokio"}"#);
        assert_eq!(replies[0].tool_calls[1].id.as_deref(), Some("x"));
        assert_eq!(replies[0].tool_calls[1].arguments, r#"{"text": "hi"}"#);
        assert_eq!(replies[1].usage.unwrap().total_tokens(), 4);
    }

    #[test]
    fn rejects_non_array_script() {
        assert!(ScriptedChat::from_json(r#"{"content": "x"}"#).is_err());
    }
}
