//! Prompt text and best-effort answer synthesis.

use crate::result::ToolCallRecord;

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a research assistant. Answer the user's question. \
When you need more information, call one or more of the available tools; you may call several \
tools in one turn. Tool results are returned to you before your next turn. Cite the documents you \
rely on. When you have enough information, reply with the final answer as plain text.";

/// Appended to the system prompt for the wrap-up call after the tool budget
/// is spent.
pub const WRAP_UP_INSTRUCTION: &str = "The tool budget for this question is exhausted and no \
further tool calls will be executed. Using only the information already gathered above, write the \
best final answer you can. Say plainly what remains unknown.";

/// Used when a malformed reply carried no text at all.
pub const EMPTY_REPLY_NOTICE: &str =
    "The reasoning service returned an empty reply, so no answer could be produced.";

/// Per-outcome excerpt length in a synthesized answer.
const EXCERPT_CHARS: usize = 300;

pub fn system_prompt(custom: Option<&str>) -> String {
    match custom.map(str::trim) {
        Some(prompt) if !prompt.is_empty() => prompt.to_string(),
        _ => DEFAULT_SYSTEM_PROMPT.to_string(),
    }
}

pub fn wrap_up_prompt(system_prompt: &str) -> String {
    format!("{system_prompt}\n\n{WRAP_UP_INSTRUCTION}")
}

/// Build an answer out of the tool results gathered so far. Never empty.
pub fn synthesize_partial_answer(records: &[ToolCallRecord]) -> String {
    let mut answer = format!(
        "Partial answer based on {} tool call{}:",
        records.len(),
        if records.len() == 1 { "" } else { "s" }
    );

    let successes: Vec<_> = records.iter().filter(|r| r.outcome.success).collect();
    if successes.is_empty() {
        answer.push_str(" no tool returned usable results.");
        return answer;
    }

    for record in successes {
        let content = record.outcome.content.trim();
        if content.is_empty() {
            continue;
        }
        answer.push_str(&format!(
            "\n- {}: {}",
            record.request.tool_name,
            excerpt(content, EXCERPT_CHARS)
        ));
    }
    answer
}

fn excerpt(text: &str, max_chars: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    match flat.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}...", &flat[..idx]),
        None => flat,
    }
}
