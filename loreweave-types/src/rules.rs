//! Injection catalog types: anchors, rules, lorebooks, and the active config.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};

/// The symbolic position at which an injection rule requests placement.
///
/// The variant order is meaningful: when rules resolving to the same target
/// tie on priority, anchor declaration order breaks the tie, so grouping by
/// `Anchor` stays deterministic.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
pub enum Anchor {
    /// Prepend to the system message's text (creating one if absent).
    BeforeSystemPrompt,
    /// Append to the system message's text (creating one if absent).
    AfterSystemPrompt,
    /// Insert immediately after any leading system message.
    TopOfChat,
    /// Insert immediately before the last message.
    BottomOfChat,
    /// Insert `inject_depth` messages back from the end of the conversation.
    AtDepth,
}

/// The shared shape of every injection rule.
///
/// Both [`ModeInjection`] and [`LorebookEntry`] embed one of these; the
/// transformer's later stages operate on this shape alone.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InjectionRule {
    /// Unique identifier within the catalog.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Disabled rules are never eligible.
    pub enabled: bool,
    /// Higher priorities sort first; ties keep catalog order.
    pub priority: i32,
    /// Where the rule's content is placed.
    pub position: Anchor,
    /// Distance from the end of the conversation; only meaningful for
    /// [`Anchor::AtDepth`].
    #[serde(default)]
    pub inject_depth: usize,
    /// The text to inject.
    pub content: String,
}

impl InjectionRule {
    /// Create an enabled rule with priority 0 and no depth.
    #[must_use]
    pub fn new(id: impl Into<String>, position: Anchor, content: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            enabled: true,
            priority: 0,
            position,
            inject_depth: 0,
            content: content.into(),
        }
    }

    /// Set the rule's priority.
    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Set the inject depth (for [`Anchor::AtDepth`] rules).
    #[must_use]
    pub fn with_depth(mut self, depth: usize) -> Self {
        self.inject_depth = depth;
        self
    }

    /// Mark the rule as disabled.
    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// An always-on injection rule tied to the active persona.
///
/// Applies unconditionally once linked in [`ActiveConfig`] and enabled.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModeInjection {
    /// The rule itself.
    #[serde(flatten)]
    pub rule: InjectionRule,
}

impl From<InjectionRule> for ModeInjection {
    fn from(rule: InjectionRule) -> Self {
        Self { rule }
    }
}

/// Activation criteria for a [`LorebookEntry`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TriggerCriteria {
    /// Keywords searched for in the scan window; any match triggers.
    pub keywords: Vec<String>,
    /// Treat each keyword as a regular expression instead of a substring.
    pub use_regex: bool,
    /// Whether matching distinguishes letter case.
    pub case_sensitive: bool,
    /// How many of the most-recent messages to search.
    pub scan_depth: usize,
    /// Bypass keyword evaluation entirely; the entry always triggers.
    pub constant_active: bool,
}

impl TriggerCriteria {
    /// Criteria that always trigger, with no scanning.
    #[must_use]
    pub fn constant() -> Self {
        Self {
            keywords: Vec::new(),
            use_regex: false,
            case_sensitive: false,
            scan_depth: 0,
            constant_active: true,
        }
    }

    /// Case-insensitive substring criteria over the given keywords.
    #[must_use]
    pub fn keywords<I, S>(keywords: I, scan_depth: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keywords: keywords.into_iter().map(Into::into).collect(),
            use_regex: false,
            case_sensitive: false,
            scan_depth,
            constant_active: false,
        }
    }

    /// Treat keywords as regular expressions.
    #[must_use]
    pub fn with_regex(mut self) -> Self {
        self.use_regex = true;
        self
    }

    /// Make matching case-sensitive.
    #[must_use]
    pub fn case_sensitive(mut self) -> Self {
        self.case_sensitive = true;
        self
    }
}

/// A conditionally-triggered injection rule gated by keyword matching over
/// recent history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LorebookEntry {
    /// The rule itself.
    #[serde(flatten)]
    pub rule: InjectionRule,
    /// When the rule fires.
    #[serde(flatten)]
    pub trigger: TriggerCriteria,
}

/// A named, ordered collection of lorebook entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lorebook {
    /// Unique identifier within the catalog.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Disabled books make all their entries ineligible.
    pub enabled: bool,
    /// Entries in catalog order.
    pub entries: Vec<LorebookEntry>,
}

impl Lorebook {
    /// Create an enabled lorebook.
    #[must_use]
    pub fn new(id: impl Into<String>, entries: Vec<LorebookEntry>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            enabled: true,
            entries,
        }
    }
}

/// The active persona's linkage sets: which mode injections and lorebooks
/// participate in the current conversation.
///
/// Plain immutable configuration passed by value into the transformer; ids
/// that match nothing in the catalogs are silently inert.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ActiveConfig {
    /// Ids of linked [`ModeInjection`]s.
    pub linked_mode_injection_ids: HashSet<String>,
    /// Ids of linked [`Lorebook`]s.
    pub linked_lorebook_ids: HashSet<String>,
}

impl ActiveConfig {
    /// Link a mode injection by id.
    #[must_use]
    pub fn with_mode_injection(mut self, id: impl Into<String>) -> Self {
        self.linked_mode_injection_ids.insert(id.into());
        self
    }

    /// Link a lorebook by id.
    #[must_use]
    pub fn with_lorebook(mut self, id: impl Into<String>) -> Self {
        self.linked_lorebook_ids.insert(id.into());
        self
    }
}
