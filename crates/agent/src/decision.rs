//! Interpreting a chat reply as exactly one decision.

use std::collections::HashSet;

use conductor_core::chat::{ChatReply, ChatToolCall};
use conductor_core::message::Conversation;
use conductor_core::tool::{Arguments, ToolCallRequest};

/// What the orchestrator does next with a reply.
#[derive(Debug, Clone, PartialEq)]
pub enum Decision {
    /// A final natural-language answer
    Answer(String),

    /// One batch of tool calls, in the order the backend issued them
    Dispatch(Vec<ToolCallRequest>),

    /// Neither a usable answer nor well-formed tool calls. Carries the raw
    /// reply text, which may be empty.
    Malformed { raw: String, reason: String },
}

/// Interpret `reply`.
///
/// Tool calls win over text: text that accompanies tool calls becomes each
/// call's reasoning trace unless the call carries its own. Calls without an
/// id, or with an id already used in `conversation`, get
/// `call_<iteration>_<index>`.
pub fn interpret(reply: &ChatReply, iteration: u32, conversation: &Conversation) -> Decision {
    if reply.tool_calls.is_empty() {
        let text = reply.content.trim();
        if text.is_empty() {
            return Decision::Malformed {
                raw: reply.content.clone(),
                reason: "reply has neither text nor tool calls".into(),
            };
        }
        return Decision::Answer(text.to_string());
    }

    let mut batch = Vec::with_capacity(reply.tool_calls.len());
    let mut taken: HashSet<String> = HashSet::new();

    for (index, call) in reply.tool_calls.iter().enumerate() {
        let arguments = match parse_arguments(call) {
            Ok(args) => args,
            Err(reason) => {
                return Decision::Malformed {
                    raw: reply.content.clone(),
                    reason,
                };
            }
        };

        let id = match call.id.as_deref().map(str::trim) {
            Some(id) if !id.is_empty() && !conversation.has_call(id) && !taken.contains(id) => {
                id.to_string()
            }
            _ => assign_id(iteration, index, conversation, &taken),
        };
        taken.insert(id.clone());

        let mut request = ToolCallRequest::new(id, call.name.clone(), arguments);
        request.reasoning_trace = call
            .reasoning
            .clone()
            .or_else(|| Some(reply.content.trim().to_string()).filter(|t| !t.is_empty()));
        batch.push(request);
    }

    Decision::Dispatch(batch)
}

fn parse_arguments(call: &ChatToolCall) -> Result<Arguments, String> {
    let raw = call.arguments.trim();
    if raw.is_empty() {
        return Ok(Arguments::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(other) => Err(format!(
            "arguments for '{}' are not a JSON object: {other}",
            call.name
        )),
        Err(e) => Err(format!("arguments for '{}' are not valid JSON: {e}", call.name)),
    }
}

pub(crate) fn assign_id(
    iteration: u32,
    index: usize,
    conversation: &Conversation,
    taken: &HashSet<String>,
) -> String {
    let base = format!("call_{iteration}_{index}");
    let mut id = base.clone();
    let mut suffix = 1;
    while conversation.has_call(&id) || taken.contains(&id) {
        id = format!("{base}_{suffix}");
        suffix += 1;
    }
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_core::message::Message;

    fn call(id: Option<&str>, name: &str, args: &str) -> ChatToolCall {
        ChatToolCall {
            id: id.map(String::from),
            name: name.into(),
            arguments: args.into(),
            reasoning: None,
        }
    }

    #[test]
    fn text_is_an_answer() {
        let decision = interpret(&ChatReply::text("  42  "), 1, &Conversation::new());
        assert_eq!(decision, Decision::Answer("42".into()));
    }

    #[test]
    fn empty_reply_is_malformed() {
        let decision = interpret(&ChatReply::default(), 1, &Conversation::new());
        assert!(matches!(decision, Decision::Malformed { .. }));
    }

    #[test]
    fn tool_calls_become_a_batch_in_order() {
        let mut reply = ChatReply::tool_calls(vec![
            call(Some("a"), "search", r#"{"query": "x"}"#),
            call(None, "lookup", ""),
        ]);
        reply.content = "Need both".into();

        let Decision::Dispatch(batch) = interpret(&reply, 2, &Conversation::new()) else {
            panic!("expected a batch");
        };
        assert_eq!(batch.len(), 2);
        assert_eq!(batch[0].id, "a");
        assert_eq!(batch[0].arguments["query"], "x");
        assert_eq!(batch[0].reasoning_trace.as_deref(), Some("Need both"));
        assert_eq!(batch[1].id, "call_2_1");
        assert!(batch[1].arguments.is_empty());
    }

    #[test]
    fn non_object_arguments_are_malformed() {
        let mut reply = ChatReply::tool_calls(vec![call(None, "search", "[1, 2]")]);
        reply.content = "raw text".into();

        match interpret(&reply, 1, &Conversation::new()) {
            Decision::Malformed { raw, reason } => {
                assert_eq!(raw, "raw text");
                assert!(reason.contains("not a JSON object"));
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn invalid_json_is_malformed() {
        let reply = ChatReply::tool_calls(vec![call(None, "search", "{query:")]);
        assert!(matches!(
            interpret(&reply, 1, &Conversation::new()),
            Decision::Malformed { .. }
        ));
    }

    #[test]
    fn reused_ids_are_reassigned() {
        let mut conversation = Conversation::new();
        conversation
            .push(Message::ToolCallIssued {
                request: ToolCallRequest::new("call_1", "search", Arguments::new()),
            })
            .unwrap();

        let reply = ChatReply::tool_calls(vec![
            call(Some("call_1"), "search", "{}"),
            call(Some("dup"), "search", "{}"),
            call(Some("dup"), "search", "{}"),
        ]);
        let Decision::Dispatch(batch) = interpret(&reply, 3, &conversation) else {
            panic!("expected a batch");
        };
        let ids: Vec<_> = batch.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, ["call_3_0", "dup", "call_3_2"]);
    }
}
