#![doc = include_str!("../README.md")]
#![deny(missing_docs)]

pub mod message;
pub mod rules;

pub use message::{ContentBlock, ContentItem, ImageSource, Message, Role};
pub use rules::{
    ActiveConfig, Anchor, InjectionRule, Lorebook, LorebookEntry, ModeInjection, TriggerCriteria,
};
