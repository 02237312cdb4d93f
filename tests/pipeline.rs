//! Workspace-level test: the stage-by-stage contract of the injection
//! pipeline, exercised through the public helper entry points the same way
//! a provider-request builder would use them.

use loreweave_inject::{apply_injections, collect_injections, group_by_anchor, transform};
use loreweave_types::{
    ActiveConfig, Anchor, ContentBlock, InjectionRule, Lorebook, LorebookEntry, Message,
    ModeInjection, Role, TriggerCriteria,
};

fn try_text_of(msg: &Message) -> Option<&str> {
    msg.content.iter().find_map(|b| match b {
        ContentBlock::Text(t) => Some(t.as_str()),
        _ => None,
    })
}

fn text_of(msg: &Message) -> &str {
    try_text_of(msg).expect("message should carry text")
}

fn fixture() -> (
    Vec<Message>,
    ActiveConfig,
    Vec<ModeInjection>,
    Vec<Lorebook>,
) {
    let messages = vec![
        Message::system("You are the narrator."),
        Message::user("I enter the dragon's lair."),
        Message::tool_use("c1", "roll_dice", serde_json::json!({"sides": 20})),
        Message::tool_result("c1", "roll_dice", "17"),
        Message::assistant("The beast stirs."),
        Message::user("I draw my sword."),
    ];
    let config = ActiveConfig::default()
        .with_mode_injection("persona")
        .with_lorebook("bestiary");
    let injections = vec![ModeInjection::from(
        InjectionRule::new("persona", Anchor::AfterSystemPrompt, "Narrate in second person.")
            .with_priority(10),
    )];
    let books = vec![Lorebook::new(
        "bestiary",
        vec![
            LorebookEntry {
                rule: InjectionRule::new("dragons", Anchor::BottomOfChat, "Dragons fear silver.")
                    .with_priority(5),
                trigger: TriggerCriteria::keywords(["dragon"], 10),
            },
            LorebookEntry {
                rule: InjectionRule::new("unused", Anchor::TopOfChat, "Never appears."),
                trigger: TriggerCriteria::keywords(["kraken"], 10),
            },
        ],
    )];
    (messages, config, injections, books)
}

#[test]
fn staged_helpers_agree_with_transform() {
    let (messages, config, injections, books) = fixture();

    let rules = collect_injections(&messages, &config, &injections, &books);
    let ids: Vec<&str> = rules.iter().map(|r| r.id.as_str()).collect();
    assert_eq!(ids, ["persona", "dragons"]);

    let staged = apply_injections(&messages, &group_by_anchor(rules));
    let direct = transform(&messages, &config, &injections, &books);
    assert_eq!(staged, direct);
}

#[test]
fn full_pipeline_end_to_end() {
    let (messages, config, injections, books) = fixture();

    let out = transform(&messages, &config, &injections, &books);

    // One chat insertion; the system message is rewritten, not duplicated.
    assert_eq!(out.len(), 7);
    assert_eq!(out[0].role, Role::System);
    assert_eq!(
        text_of(&out[0]),
        "You are the narrator.\nNarrate in second person."
    );

    // BottomOfChat resolved to index 5, already outside the tool pair.
    assert_eq!(
        text_of(&out[5]),
        "<system>\nDragons fear silver.\n</system>"
    );

    // The untriggered entry left no trace, and the output reads like
    // hand-authored history: plain user/assistant/tool turns throughout.
    assert!(
        !out.iter()
            .any(|m| try_text_of(m).is_some_and(|t| t.contains("Never appears")))
    );
    let call_index = out
        .iter()
        .position(|m| m.content.iter().any(|b| matches!(b, ContentBlock::ToolUse { .. })))
        .unwrap();
    assert_eq!(out[call_index + 1].role, Role::Tool);
}
