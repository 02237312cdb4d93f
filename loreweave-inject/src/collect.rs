//! Stage 1: filter the rule catalogs down to the eligible, priority-ordered
//! subset for one conversation.

use std::collections::BTreeMap;

use loreweave_types::{ActiveConfig, Anchor, InjectionRule, Lorebook, Message, ModeInjection};
use tracing::debug;

use crate::trigger::is_triggered;

/// Collect every rule that is eligible for this conversation.
///
/// A mode injection is eligible when it is enabled and linked in `config`.
/// A lorebook entry is eligible when its book is enabled and linked, the
/// entry itself is enabled, and its trigger criteria hold against the
/// recent history (see [`is_triggered`]).
///
/// The result is sorted by `priority` descending; ties keep catalog
/// iteration order (mode injections first, then lorebooks, each in catalog
/// order — the sort is stable).
#[must_use]
pub fn collect_injections(
    messages: &[Message],
    config: &ActiveConfig,
    mode_injections: &[ModeInjection],
    lorebooks: &[Lorebook],
) -> Vec<InjectionRule> {
    let mut eligible: Vec<InjectionRule> = Vec::new();

    for injection in mode_injections {
        if injection.rule.enabled && config.linked_mode_injection_ids.contains(&injection.rule.id)
        {
            eligible.push(injection.rule.clone());
        }
    }

    for book in lorebooks {
        if !book.enabled || !config.linked_lorebook_ids.contains(&book.id) {
            continue;
        }
        for entry in &book.entries {
            if entry.rule.enabled && is_triggered(&entry.trigger, messages) {
                eligible.push(entry.rule.clone());
            }
        }
    }

    eligible.sort_by(|a, b| b.priority.cmp(&a.priority));

    debug!(count = eligible.len(), "collected eligible injection rules");
    eligible
}

/// Group collected rules by anchor, preserving their priority order within
/// each group.
///
/// Returns a `BTreeMap` so downstream iteration over anchors is
/// deterministic.
#[must_use]
pub fn group_by_anchor(rules: Vec<InjectionRule>) -> BTreeMap<Anchor, Vec<InjectionRule>> {
    let mut grouped: BTreeMap<Anchor, Vec<InjectionRule>> = BTreeMap::new();
    for rule in rules {
        grouped.entry(rule.position).or_default().push(rule);
    }
    grouped
}
