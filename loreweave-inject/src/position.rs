//! Stage 3: map a rule's declared anchor to a concrete target in the
//! message sequence.

use loreweave_types::{Anchor, InjectionRule, Message, Role};

/// A rule's resolved target: either a mutation of the system message's text
/// or an insertion index into the chat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPoint {
    /// Prepend to the system message's text.
    PrependSystem,
    /// Append to the system message's text.
    AppendSystem,
    /// Insert a new message before this index.
    Chat(usize),
}

/// Resolve a rule's anchor against the current message list.
///
/// `TopOfChat` targets the first non-system message (the list length when
/// every message is a system message). `BottomOfChat` targets the position
/// immediately before the last message. `AtDepth` counts `inject_depth`
/// messages back from the end, role-blind: a depth exceeding the history
/// degrades to index 0, in front of the system message.
#[must_use]
pub fn resolve_insert_point(rule: &InjectionRule, messages: &[Message]) -> InsertPoint {
    match rule.position {
        Anchor::BeforeSystemPrompt => InsertPoint::PrependSystem,
        Anchor::AfterSystemPrompt => InsertPoint::AppendSystem,
        Anchor::TopOfChat => InsertPoint::Chat(
            messages
                .iter()
                .position(|m| m.role != Role::System)
                .unwrap_or(messages.len()),
        ),
        Anchor::BottomOfChat => InsertPoint::Chat(messages.len().saturating_sub(1)),
        Anchor::AtDepth => InsertPoint::Chat(messages.len().saturating_sub(rule.inject_depth)),
    }
}
