#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod apply;
pub mod collect;
pub mod position;
pub mod trigger;

pub use apply::{apply_injections, find_safe_insert_index};
pub use collect::{collect_injections, group_by_anchor};
pub use position::{InsertPoint, resolve_insert_point};
pub use trigger::is_triggered;

use loreweave_types::{ActiveConfig, Lorebook, Message, ModeInjection};

/// Rewrite a conversation by applying every eligible injection rule.
///
/// Runs the full pipeline: collect linked and triggered rules, resolve their
/// anchors, merge rules sharing a target, and insert the payloads without
/// splitting tool-call chains. The inputs are read-only snapshots; the
/// result is a freshly built list. Identical inputs always yield identical
/// output, and when nothing is eligible the output equals the input.
#[must_use]
pub fn transform(
    messages: &[Message],
    config: &ActiveConfig,
    mode_injections: &[ModeInjection],
    lorebooks: &[Lorebook],
) -> Vec<Message> {
    let rules = collect_injections(messages, config, mode_injections, lorebooks);
    if rules.is_empty() {
        return messages.to_vec();
    }
    let grouped = group_by_anchor(rules);
    apply_injections(messages, &grouped)
}
