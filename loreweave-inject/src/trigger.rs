//! Stage 2: decide whether a lorebook entry's activation criteria hold
//! against a bounded recent window of the conversation.

use loreweave_types::{ContentBlock, Message, TriggerCriteria};
use regex::RegexBuilder;
use tracing::warn;

/// Evaluate trigger criteria against the most recent messages.
///
/// `constant_active` short-circuits to true with no scan. Otherwise the
/// last `scan_depth` messages (clamped to the available history) form the
/// window; their `Text` block contents, newline-joined, are the haystack.
/// The criteria hold if any keyword matches. An empty window or empty
/// keyword list never triggers.
#[must_use]
pub fn is_triggered(trigger: &TriggerCriteria, messages: &[Message]) -> bool {
    if trigger.constant_active {
        return true;
    }
    if trigger.keywords.is_empty() {
        return false;
    }

    let window_start = messages.len().saturating_sub(trigger.scan_depth);
    let window = &messages[window_start..];
    if window.is_empty() {
        return false;
    }

    let haystack = window
        .iter()
        .flat_map(|message| &message.content)
        .filter_map(|block| match block {
            ContentBlock::Text(text) => Some(text.as_str()),
            _ => None,
        })
        .collect::<Vec<_>>()
        .join("\n");

    // Lowercase once for the substring path rather than per keyword.
    let haystack_lower = if trigger.case_sensitive || trigger.use_regex {
        None
    } else {
        Some(haystack.to_lowercase())
    };

    trigger.keywords.iter().any(|keyword| {
        if trigger.use_regex {
            regex_matches(keyword, &haystack, trigger.case_sensitive)
        } else if let Some(lower) = &haystack_lower {
            lower.contains(&keyword.to_lowercase())
        } else {
            haystack.contains(keyword.as_str())
        }
    })
}

/// Test one regex keyword. A keyword that fails to compile is a non-match;
/// it never aborts the transform.
fn regex_matches(keyword: &str, haystack: &str, case_sensitive: bool) -> bool {
    match RegexBuilder::new(keyword)
        .case_insensitive(!case_sensitive)
        .build()
    {
        Ok(re) => re.is_match(haystack),
        Err(err) => {
            warn!(keyword, %err, "skipping malformed regex keyword");
            false
        }
    }
}
