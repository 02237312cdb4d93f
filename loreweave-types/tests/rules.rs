use loreweave_types::*;

#[test]
fn injection_rule_builder_defaults() {
    let rule = InjectionRule::new("greeting", Anchor::TopOfChat, "Be formal.");
    assert_eq!(rule.id, "greeting");
    assert_eq!(rule.name, "greeting");
    assert!(rule.enabled);
    assert_eq!(rule.priority, 0);
    assert_eq!(rule.position, Anchor::TopOfChat);
    assert_eq!(rule.inject_depth, 0);
    assert_eq!(rule.content, "Be formal.");
}

#[test]
fn injection_rule_builder_chain() {
    let rule = InjectionRule::new("deep", Anchor::AtDepth, "lore")
        .with_priority(7)
        .with_depth(3)
        .disabled();
    assert_eq!(rule.priority, 7);
    assert_eq!(rule.inject_depth, 3);
    assert!(!rule.enabled);
}

#[test]
fn mode_injection_serde_flattens_rule() {
    let injection = ModeInjection::from(
        InjectionRule::new("tone", Anchor::AfterSystemPrompt, "Answer tersely.")
            .with_priority(5),
    );
    let json = serde_json::to_value(&injection).unwrap();
    // Flattened: rule fields sit at the top level.
    assert_eq!(json["id"], "tone");
    assert_eq!(json["priority"], 5);
    let rt: ModeInjection = serde_json::from_value(json).unwrap();
    assert_eq!(rt, injection);
}

#[test]
fn lorebook_entry_serde_flattens_rule_and_trigger() {
    let entry = LorebookEntry {
        rule: InjectionRule::new("dragons", Anchor::AtDepth, "Dragons fear silver.")
            .with_depth(2),
        trigger: TriggerCriteria::keywords(["dragon", "wyrm"], 4),
    };
    let json = serde_json::to_value(&entry).unwrap();
    assert_eq!(json["id"], "dragons");
    assert_eq!(json["scan_depth"], 4);
    assert_eq!(json["keywords"][1], "wyrm");
    let rt: LorebookEntry = serde_json::from_value(json).unwrap();
    assert_eq!(rt, entry);
}

#[test]
fn inject_depth_defaults_when_absent() {
    let json = serde_json::json!({
        "id": "r1",
        "name": "r1",
        "enabled": true,
        "priority": 0,
        "position": "TopOfChat",
        "content": "x",
    });
    let rule: InjectionRule = serde_json::from_value(json).unwrap();
    assert_eq!(rule.inject_depth, 0);
}

#[test]
fn trigger_criteria_constructors() {
    let constant = TriggerCriteria::constant();
    assert!(constant.constant_active);
    assert!(constant.keywords.is_empty());

    let keyed = TriggerCriteria::keywords(["magic"], 2)
        .with_regex()
        .case_sensitive();
    assert!(!keyed.constant_active);
    assert!(keyed.use_regex);
    assert!(keyed.case_sensitive);
    assert_eq!(keyed.scan_depth, 2);
}

#[test]
fn active_config_builders_link_ids() {
    let config = ActiveConfig::default()
        .with_mode_injection("tone")
        .with_mode_injection("tone") // idempotent
        .with_lorebook("world");
    assert_eq!(config.linked_mode_injection_ids.len(), 1);
    assert!(config.linked_mode_injection_ids.contains("tone"));
    assert!(config.linked_lorebook_ids.contains("world"));
}

#[test]
fn anchor_order_follows_declaration() {
    // Grouping relies on this order for deterministic tie-breaking.
    assert!(Anchor::BeforeSystemPrompt < Anchor::AfterSystemPrompt);
    assert!(Anchor::AfterSystemPrompt < Anchor::TopOfChat);
    assert!(Anchor::TopOfChat < Anchor::BottomOfChat);
    assert!(Anchor::BottomOfChat < Anchor::AtDepth);
}

#[test]
fn lorebook_serde_roundtrip() {
    let book = Lorebook::new(
        "world",
        vec![LorebookEntry {
            rule: InjectionRule::new("e1", Anchor::BottomOfChat, "entry"),
            trigger: TriggerCriteria::constant(),
        }],
    );
    let json = serde_json::to_string(&book).unwrap();
    let rt: Lorebook = serde_json::from_str(&json).unwrap();
    assert_eq!(rt, book);
    assert!(rt.enabled);
}
