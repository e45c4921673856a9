//! Prompt construction

use peanut_executor::{ErrorKind, ToolCall, ToolResult};

use crate::reward::RewardMode;

/// System prompt for the tool-selection request
pub fn system_prompt(mode: RewardMode, hints: &str) -> String {
    let mut prompt = match mode {
        RewardMode::Normal => "You are Peanut, an autonomous task agent. Break the user's task \
             into tool calls using only the tools provided, one call at a time. \
             Prefer the smallest action that makes progress. If the task needs \
             no tool, answer directly and concisely."
            .to_string(),
        RewardMode::Expert => "You are Peanut, a seasoned autonomous task agent with a long record \
             of solved tasks. Work with precision: pick the single most \
             effective tool call, one at a time, using only the tools provided. \
             If the task needs no tool, answer directly."
            .to_string(),
    };

    if !hints.is_empty() {
        prompt.push_str("\n\n");
        prompt.push_str(hints);
    }

    prompt
}

/// Structured-output request for the reflection audit
pub fn audit_prompt(task: &str, call: &ToolCall, result: &ToolResult) -> String {
    let error = result
        .error
        .map(|e| e.to_string())
        .unwrap_or_else(|| "none".to_string());

    format!(
        "You are auditing a tool execution against the user's intent.\n\
         \n\
         Task: {task}\n\
         Tool called: {name}\n\
         Arguments: {args}\n\
         Execution ok: {ok}\n\
         Error kind: {error}\n\
         Output:\n{output}\n\
         \n\
         Reply with ONLY a JSON object, no prose:\n\
         {{\"success\": true|false, \"analysis\": \"one or two sentences\", \
         \"next_action\": \"retry\"|\"finalize\", \
         \"improved_input\": {{\"name\": \"...\", \"arguments\": {{...}}}} or null}}\n\
         \n\
         Set success=true only if the output actually satisfies the task. \
         If the error kind is forbidden or path_traversal the action itself \
         was invalid: do not propose the same call again; suggest a different \
         tool or different arguments, or finalize.",
        task = task,
        name = call.name,
        args = call.arguments,
        ok = result.ok,
        error = error,
        output = result.output,
    )
}

/// Context note appended before asking for a corrected call
pub fn retry_note(analysis: &str, result: &ToolResult) -> String {
    let violation = match result.error {
        Some(ErrorKind::Forbidden) => {
            "\nThe previous action was rejected by the allowlist. Do not repeat it; \
             choose a different tool or different arguments."
        }
        Some(ErrorKind::PathTraversal) => {
            "\nThe previous path escaped the workspace. Use paths inside the \
             workspace only; do not repeat the same call."
        }
        _ => "",
    };

    format!(
        "The last attempt did not satisfy the task. Audit: {}{}\nPropose the next tool call.",
        analysis, violation
    )
}
