//! The value one invocation returns.

use serde::Serialize;

use conductor_core::message::Conversation;
use conductor_core::tool::{Citation, ToolCallRequest, ToolOutcome};
use conductor_telemetry::Metrics;

/// Why the loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// The reasoning capability produced a final answer
    Answered,
    /// The tool-call ceiling was reached
    Exhausted,
}

/// One executed tool call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallRecord {
    pub request: ToolCallRequest,
    pub outcome: ToolOutcome,
    /// Batch the call belonged to; 0 for the retrieval pre-fetch
    pub iteration: u32,
}

/// Produced once per invocation and never mutated afterwards.
#[derive(Debug, Clone, Serialize)]
pub struct AgentResult {
    /// Never empty
    pub final_answer: String,

    /// Every executed call, in the order it was issued
    pub tool_calls_executed: Vec<ToolCallRecord>,

    /// Deduplicated per document chunk, best first
    pub citations: Vec<Citation>,

    pub metrics: Metrics,

    pub termination: Termination,

    pub conversation: Conversation,
}

impl AgentResult {
    pub fn exhausted(&self) -> bool {
        self.termination == Termination::Exhausted
    }
}
