use super::*;

#[test]
fn bridge_user_text_includes_required_fields() {
    let context = ChatContext {
        app: "agentmc".into(),
        source: "browser".into(),
        intent_scope: "session".into(),
        ..Default::default()
    };
    let bridged = bridge_user_text(&context, "hello there");
    assert!(bridged.starts_with("[AgentMC Context]"));
    assert!(bridged.contains("app: agentmc"));
    assert!(bridged.ends_with("hello there"));
}

#[test]
fn bridge_user_text_includes_optional_fields_when_present() {
    let context = ChatContext {
        app: "a".into(),
        source: "s".into(),
        intent_scope: "i".into(),
        timezone: Some("UTC".into()),
        actor_user_id: Some(7),
        default_assignee_user_id: None,
    };
    let bridged = bridge_user_text(&context, "text");
    assert!(bridged.contains("timezone: UTC"));
    assert!(bridged.contains("actor_user_id: 7"));
    assert!(!bridged.contains("default_assignee_user_id"));
}

#[test]
fn resolve_actor_prefers_payload_actor() {
    assert_eq!(resolve_actor(Some(1), Some(2)), Some(1));
}

#[test]
fn resolve_actor_falls_back_to_session_requester() {
    assert_eq!(resolve_actor(None, Some(2)), Some(2));
}

#[test]
fn bridge_recurring_prompt_adds_context_when_absent() {
    let bridged = bridge_recurring_prompt("task-1", &["RULES.md".into()], "do the thing");
    assert!(bridged.starts_with("[AgentMC Context]"));
    assert!(bridged.contains("task_id: task-1"));
    assert!(bridged.contains("skill_refs: RULES.md"));
    assert!(bridged.ends_with("do the thing"));
}

#[test]
fn bridge_recurring_prompt_is_idempotent() {
    let already = "[AgentMC Context]\nscope: recurring-task\n\ndo it";
    assert_eq!(bridge_recurring_prompt("task-1", &[], already), already);
}
