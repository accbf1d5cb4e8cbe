//! Shared test helpers: deterministic tools and scripted replies.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use conductor_core::chat::{ChatReply, ChatToolCall, Usage};
use conductor_core::error::ToolError;
use conductor_core::tool::{
    Arguments, Citation, ParamType, ParameterSpec, ToolCallRequest, ToolCapability, ToolContext,
    ToolDefinition, ToolOutput, ToolRegistry,
};

/// Returns its `text` argument.
pub struct EchoTool;

#[async_trait]
impl ToolCapability for EchoTool {
    async fn invoke(&self, arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let text = arguments.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        Ok(ToolOutput::text(text))
    }
}

/// Sleeps `ms` milliseconds, then returns `text`.
pub struct SlowTool;

#[async_trait]
impl ToolCapability for SlowTool {
    async fn invoke(&self, arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let ms = arguments.get("ms").and_then(|v| v.as_u64()).unwrap_or(0);
        tokio::time::sleep(Duration::from_millis(ms)).await;
        let text = arguments.get("text").and_then(|v| v.as_str()).unwrap_or_default();
        Ok(ToolOutput::text(text))
    }
}

/// Always returns an error.
pub struct FailingTool;

#[async_trait]
impl ToolCapability for FailingTool {
    async fn invoke(&self, _arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        Err(ToolError::failed("failing", "backend exploded"))
    }
}

/// Always panics.
pub struct PanickingTool;

#[async_trait]
impl ToolCapability for PanickingTool {
    async fn invoke(&self, _arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        panic!("tool blew up");
    }
}

/// Cites the document chunk named in its arguments.
pub struct CitingTool;

#[async_trait]
impl ToolCapability for CitingTool {
    async fn invoke(&self, arguments: Arguments, _ctx: &ToolContext) -> Result<ToolOutput, ToolError> {
        let citation = Citation {
            document_id: arguments["document_id"].as_str().unwrap_or_default().to_string(),
            chunk_index: arguments["chunk_index"].as_u64().unwrap_or_default() as usize,
            score: arguments["score"].as_f64().unwrap_or_default() as f32,
            text: "cited passage".into(),
        };
        Ok(ToolOutput::text(format!("{}#{}", citation.document_id, citation.chunk_index))
            .with_citations(vec![citation]))
    }
}

/// A registry with every test tool.
pub fn registry() -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    registry
        .register(
            ToolDefinition::new("echo", "Echo text back")
                .param(ParameterSpec::required("text", ParamType::String)),
            Arc::new(EchoTool),
        )
        .unwrap();
    registry
        .register(
            ToolDefinition::new("slow", "Sleep, then echo")
                .param(ParameterSpec::required("ms", ParamType::Integer))
                .param(ParameterSpec::optional("text", ParamType::String).with_default(json!("done"))),
            Arc::new(SlowTool),
        )
        .unwrap();
    registry
        .register(ToolDefinition::new("failing", "Always fails"), Arc::new(FailingTool))
        .unwrap();
    registry
        .register(ToolDefinition::new("panicking", "Always panics"), Arc::new(PanickingTool))
        .unwrap();
    registry
        .register(
            ToolDefinition::new("citing", "Cite one chunk")
                .param(ParameterSpec::required("document_id", ParamType::String))
                .param(ParameterSpec::required("chunk_index", ParamType::Integer))
                .param(ParameterSpec::required("score", ParamType::Number)),
            Arc::new(CitingTool),
        )
        .unwrap();
    registry
}

pub fn tool_call(id: &str, name: &str, args: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest::new(id, name, args.as_object().cloned().unwrap_or_default())
}

/// A backend tool call without an id.
pub fn chat_call(name: &str, args: serde_json::Value) -> ChatToolCall {
    ChatToolCall {
        id: None,
        name: name.into(),
        arguments: args.to_string(),
        reasoning: None,
    }
}

pub fn tool_reply(calls: Vec<ChatToolCall>) -> ChatReply {
    ChatReply::tool_calls(calls).with_usage(
        Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
        },
        "mock-model",
    )
}

pub fn text_reply(text: &str) -> ChatReply {
    ChatReply::text(text).with_usage(
        Usage {
            prompt_tokens: 10,
            completion_tokens: 5,
        },
        "mock-model",
    )
}
