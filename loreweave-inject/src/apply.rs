//! Stages 4 and 5: merge rules that share a target into one payload, then
//! materialize the payloads without splitting tool-call chains.

use std::collections::BTreeMap;

use loreweave_types::{Anchor, ContentBlock, InjectionRule, Message, Role};
use tracing::trace;

use crate::position::{InsertPoint, resolve_insert_point};

/// Separator between rule contents merged into one payload.
const MERGE_SEPARATOR: &str = "\n";

/// Apply grouped injection rules to a conversation, producing the final
/// message list.
///
/// Rules are re-flattened into global priority order (ties broken by anchor
/// declaration order, since `grouped` is a `BTreeMap`), resolved to their
/// targets, and merged: rules sharing an exact resolved index become one
/// newline-joined payload, as do rules sharing a system-prompt anchor.
///
/// Every chat payload is inserted at [`find_safe_insert_index`] of its
/// resolved index, wrapped as a user message:
/// `"<system>\n" + payload + "\n</system>"`. System-prompt payloads rewrite
/// the system message's text directly, with no wrapper; when no system
/// message exists one is created at index 0 holding only the payloads.
///
/// All insertion indices are computed against the original list, and the
/// output is assembled in a single pass, so multiple insertions cannot
/// drift relative to one another.
#[must_use]
pub fn apply_injections(
    messages: &[Message],
    grouped: &BTreeMap<Anchor, Vec<InjectionRule>>,
) -> Vec<Message> {
    // Global priority order across anchors; the per-group order from the
    // collector is already priority-descending, and the sort is stable.
    let mut rules: Vec<&InjectionRule> = grouped.values().flatten().collect();
    rules.sort_by(|a, b| b.priority.cmp(&a.priority));

    let mut prepend_parts: Vec<&str> = Vec::new();
    let mut append_parts: Vec<&str> = Vec::new();
    let mut chat_parts: BTreeMap<usize, Vec<&str>> = BTreeMap::new();

    for rule in rules {
        match resolve_insert_point(rule, messages) {
            InsertPoint::PrependSystem => prepend_parts.push(&rule.content),
            InsertPoint::AppendSystem => append_parts.push(&rule.content),
            InsertPoint::Chat(index) => {
                chat_parts.entry(index).or_default().push(&rule.content);
            }
        }
    }

    // Merge each slot, then shift its index out of any tool-call chain.
    // Two slots may land on the same safe index; they stay separate
    // messages, emitted in ascending resolved-index order.
    let mut insertions: BTreeMap<usize, Vec<Message>> = BTreeMap::new();
    for (index, parts) in chat_parts {
        let safe_index = find_safe_insert_index(messages, index);
        if safe_index != index {
            trace!(index, safe_index, "moved insertion out of tool-call chain");
        }
        insertions
            .entry(safe_index)
            .or_default()
            .push(injected_message(&parts.join(MERGE_SEPARATOR)));
    }

    let inserted_count = insertions.values().map(Vec::len).sum::<usize>();
    let mut out: Vec<Message> = Vec::with_capacity(messages.len() + inserted_count + 1);
    for (index, message) in messages.iter().enumerate() {
        if let Some(pending) = insertions.remove(&index) {
            out.extend(pending);
        }
        out.push(message.clone());
    }
    // A resolved index of `len` (e.g. `AtDepth` with depth 0) appends.
    for pending in insertions.into_values() {
        out.extend(pending);
    }

    apply_system_payloads(
        &mut out,
        (!prepend_parts.is_empty()).then(|| prepend_parts.join(MERGE_SEPARATOR)),
        (!append_parts.is_empty()).then(|| append_parts.join(MERGE_SEPARATOR)),
    );

    out
}

/// Shift a candidate insertion index so it cannot separate an assistant
/// tool call from its tool result.
///
/// Two positions are unsafe: strictly between a call message and its result
/// message, and immediately after such a pair. In both cases the index
/// moves back to the assistant message issuing the call, and the check
/// repeats, so a run of consecutive call/result pairs is hopped whole. A
/// candidate beyond the list clamps to the list length.
#[must_use]
pub fn find_safe_insert_index(messages: &[Message], candidate: usize) -> usize {
    let mut index = candidate.min(messages.len());
    loop {
        // Between a call and its result: back up onto the call.
        if index > 0
            && index < messages.len()
            && is_tool_result_message(&messages[index])
            && is_tool_use_message(&messages[index - 1])
        {
            index -= 1;
            continue;
        }
        // Directly after a completed pair: hop the pair.
        if index >= 2
            && is_tool_result_message(&messages[index - 1])
            && is_tool_use_message(&messages[index - 2])
        {
            index -= 2;
            continue;
        }
        break;
    }
    index
}

fn is_tool_use_message(message: &Message) -> bool {
    message.role == Role::Assistant
        && message
            .content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolUse { .. }))
}

fn is_tool_result_message(message: &Message) -> bool {
    message.role == Role::Tool
        && message
            .content
            .iter()
            .any(|block| matches!(block, ContentBlock::ToolResult { .. }))
}

/// Wrap a merged payload as a synthetic user message.
fn injected_message(payload: &str) -> Message {
    Message {
        role: Role::User,
        content: vec![ContentBlock::Text(format!("<system>\n{payload}\n</system>"))],
    }
}

/// Mutate (or create) the system message with the merged system-prompt
/// payloads. Prepended content goes before the original text, appended
/// content after, newline-joined at the seam.
fn apply_system_payloads(
    messages: &mut Vec<Message>,
    prepend: Option<String>,
    append: Option<String>,
) {
    if prepend.is_none() && append.is_none() {
        return;
    }

    if let Some(system) = messages.iter_mut().find(|m| m.role == Role::System) {
        if let Some(payload) = prepend {
            prepend_text(system, &payload);
        }
        if let Some(payload) = append {
            append_text(system, &payload);
        }
        return;
    }

    // No system message anywhere: create one at index 0 holding only the
    // payloads, prepended content first.
    let text = prepend
        .into_iter()
        .chain(append)
        .collect::<Vec<_>>()
        .join("\n");
    messages.insert(0, Message::system(text));
}

fn prepend_text(message: &mut Message, payload: &str) {
    match message
        .content
        .iter_mut()
        .find_map(|block| match block {
            ContentBlock::Text(text) => Some(text),
            _ => None,
        }) {
        Some(text) => *text = format!("{payload}\n{text}"),
        None => message
            .content
            .insert(0, ContentBlock::Text(payload.to_string())),
    }
}

fn append_text(message: &mut Message, payload: &str) {
    match message
        .content
        .iter_mut()
        .rev()
        .find_map(|block| match block {
            ContentBlock::Text(text) => Some(text),
            _ => None,
        }) {
        Some(text) => *text = format!("{text}\n{payload}"),
        None => message
            .content
            .push(ContentBlock::Text(payload.to_string())),
    }
}
