//! The agent orchestrator: the Decide → Dispatch loop at the heart of conductor.
//!
//! One invocation follows a **Decide → Dispatch** cycle:
//!
//! 1. **Seed** the conversation with prior history and the user's message,
//!    optionally pre-fetching retrieval results
//! 2. **Decide**: send the system prompt, the conversation and the tool
//!    catalog to the reasoning capability
//! 3. **If tool calls**: run the batch (serially or concurrently), append one
//!    call/result pair per call, loop back to step 2
//! 4. **If text**: that is the final answer
//!
//! The loop stops at the first answer or when `max_tool_calls` batches have
//! run, in which case a best-effort answer is still produced.

pub mod citations;
pub mod decision;
pub mod dispatch;
pub mod orchestrator;
pub mod prompt;
pub mod replay;
pub mod result;

#[cfg(test)]
mod test_helpers;

pub use decision::Decision;
pub use orchestrator::{DEFAULT_RETRIEVAL_TOOL, Orchestrator};
pub use replay::ScriptedChat;
pub use result::{AgentResult, Termination, ToolCallRecord};
