use std::fs;

use agent_run::{AgentEvent, AgentRun, StepStatus};
use conversation_store::{
    state_path_under, ConversationMessage, ConversationStore, ConversationStoreError, Role,
    Settings, Theme, DEFAULT_TITLE,
};
use serde_json::json;
use tempfile::TempDir;

fn sample_run() -> AgentRun {
    let mut run = AgentRun::new();
    run.apply(AgentEvent::TaskStart {
        id: "1".to_string(),
        tool: Some("web_search".to_string()),
        input: Some(json!("rust sse")),
        thought: None,
    });
    run.apply(AgentEvent::TaskEnd {
        id: "1".to_string(),
        output: Some(json!("see https://example.com/page")),
    });
    run.apply(AgentEvent::FinalAnswer {
        reply: "done".to_string(),
    });
    run
}

#[test]
fn missing_file_loads_default_state() {
    let dir = TempDir::new().expect("tempdir");
    let path = state_path_under(dir.path());

    let store = ConversationStore::load(&path);

    assert_eq!(store.path(), Some(path.as_path()));
    assert_eq!(store.theme(), Theme::Dark);
    assert_eq!(store.settings(), &Settings::default());
    assert!(store.state().conversations.is_empty());
}

#[test]
fn corrupt_file_falls_back_to_defaults_but_strict_load_reports_it() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("state.json");
    fs::write(&path, "{ not json").expect("write corrupt state");

    let error = ConversationStore::try_load(&path).expect_err("strict load fails");
    assert!(matches!(error, ConversationStoreError::Json { .. }));

    let store = ConversationStore::load(&path);
    assert!(store.state().conversations.is_empty());
}

#[test]
fn partial_state_fills_missing_fields_with_defaults() {
    let dir = TempDir::new().expect("tempdir");
    let path = dir.path().join("state.json");
    fs::write(&path, r#"{"theme":"light","settings":{"backend":"nvidia"}}"#)
        .expect("write partial state");

    let store = ConversationStore::try_load(&path).expect("load partial state");

    assert_eq!(store.theme(), Theme::Light);
    assert_eq!(store.settings().backend, "nvidia");
    assert_eq!(store.settings().api_key, "");
    assert_eq!(store.state().current_conversation_id, None);
}

#[test]
fn save_then_load_preserves_conversations_and_snapshots() {
    let dir = TempDir::new().expect("tempdir");
    let path = state_path_under(dir.path());

    let mut store = ConversationStore::load(&path);
    let id = store.new_conversation();
    let mut assistant = ConversationMessage::assistant("asst_1");
    assistant.apply_run(&sample_run());
    store
        .append_messages(
            &id,
            [ConversationMessage::user("msg_1", "search rust sse"), assistant],
        )
        .expect("append");
    store.update_settings(Settings {
        backend: "aistudio".to_string(),
        api_key: "secret".to_string(),
        model: Some("gemini-pro".to_string()),
    });
    store.save().expect("save");

    let raw = fs::read_to_string(&path).expect("state written");
    assert!(raw.contains("\"currentConversationId\""));
    assert!(raw.contains("\"apiKey\""));

    let reloaded = ConversationStore::try_load(&path).expect("reload");
    let conversation = reloaded.conversation(&id).expect("conversation persisted");
    assert_eq!(conversation.messages.len(), 2);
    let assistant = conversation.message("asst_1").expect("assistant message");
    assert_eq!(assistant.role, Role::Assistant);
    assert_eq!(assistant.content, "done");
    assert_eq!(assistant.steps[0].status, StepStatus::Completed);
    assert_eq!(assistant.sources, vec!["https://example.com/page".to_string()]);
    assert_eq!(reloaded.settings().model.as_deref(), Some("gemini-pro"));
    assert_eq!(reloaded.current_conversation().map(|c| c.id.as_str()), Some(id.as_str()));
}

#[test]
fn new_conversation_becomes_current_with_default_title() {
    let mut store = ConversationStore::in_memory();
    let id = store.new_conversation();

    let conversation = store.current_conversation().expect("current");
    assert_eq!(conversation.id, id);
    assert_eq!(conversation.title, DEFAULT_TITLE);
    assert!(id.starts_with("convo_"));
}

#[test]
fn deleting_current_conversation_clears_selection() {
    let mut store = ConversationStore::in_memory();
    let first = store.new_conversation();
    let second = store.new_conversation();

    store.select(&first).expect("select first");
    assert!(store.delete_conversation(&second));
    assert_eq!(store.state().current_conversation_id.as_deref(), Some(first.as_str()));

    assert!(store.delete_conversation(&first));
    assert_eq!(store.state().current_conversation_id, None);
    assert!(!store.delete_conversation(&first));

    let error = store.select(&first).expect_err("deleted conversation");
    assert!(matches!(error, ConversationStoreError::UnknownConversation { .. }));
}

#[test]
fn delete_all_and_theme_toggle() {
    let mut store = ConversationStore::in_memory();
    store.new_conversation();
    store.new_conversation();
    store.delete_all();
    assert!(store.sorted_conversations().is_empty());
    assert_eq!(store.state().current_conversation_id, None);

    assert_eq!(store.toggle_theme(), Theme::Light);
    assert_eq!(store.toggle_theme(), Theme::Dark);
}

#[test]
fn update_message_is_a_no_op_for_missing_targets() {
    let mut store = ConversationStore::in_memory();
    let id = store.new_conversation();
    store
        .append_messages(&id, [ConversationMessage::assistant("asst_1")])
        .expect("append");

    assert!(!store.update_message(&id, "asst_missing", |message| {
        message.content = "nope".to_string();
    }));
    assert!(!store.update_message("convo_gone", "asst_1", |message| {
        message.content = "nope".to_string();
    }));
    assert!(store.conversation("convo_gone").is_none());
    assert_eq!(
        store.conversation(&id).and_then(|c| c.message("asst_1")).map(|m| m.content.as_str()),
        Some("")
    );
}

#[test]
fn title_is_only_set_while_default() {
    let mut store = ConversationStore::in_memory();
    let id = store.new_conversation();

    assert!(store.set_title_if_default(&id, "first prompt"));
    assert!(!store.set_title_if_default(&id, "second prompt"));
    assert_eq!(store.conversation(&id).map(|c| c.title.as_str()), Some("first prompt"));
}

#[test]
fn remove_messages_counts_removed_entries() {
    let mut store = ConversationStore::in_memory();
    let id = store.new_conversation();
    store
        .append_messages(
            &id,
            [
                ConversationMessage::user("msg_1", "a"),
                ConversationMessage::assistant("asst_1"),
            ],
        )
        .expect("append");

    assert_eq!(store.remove_messages(&id, &["msg_1", "asst_1", "other"]), 2);
    assert_eq!(store.remove_messages("convo_gone", &["msg_1"]), 0);
}

#[test]
fn sorted_conversations_are_newest_first() {
    let mut store = ConversationStore::in_memory();
    let older = store.new_conversation();
    std::thread::sleep(std::time::Duration::from_millis(3));
    let newer = store.new_conversation();

    let ids: Vec<&str> = store
        .sorted_conversations()
        .into_iter()
        .map(|conversation| conversation.id.as_str())
        .collect();
    assert_eq!(ids, vec![newer.as_str(), older.as_str()]);
}
