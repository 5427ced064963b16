use std::sync::Arc;

use serde_json::json;
use tempfile::tempdir;

use repuragent_demo::episodic::{EpisodicMemoryService, EpisodicStore};
use repuragent_demo::history::{ConversationStore, WELCOME_MESSAGE};
use repuragent_demo::ui::components;

const ASSISTANT_REPLY: &str = "**RESEARCH_AGENT**\nPulled sales history for the retail line.\n\n**REPORT_AGENT**\nQ3 demand is projected at 12,400 units, up 8% year over year.";

#[tokio::test]
async fn demo_flow_from_empty_store_to_rendered_page() {
    let dir = tempdir().unwrap();
    let store = ConversationStore::new(dir.path().join("conversations.db"))
        .await
        .unwrap();

    let snapshot = store
        .create_thread(Some("Forecast Q3 demand for the retail line".into()))
        .await
        .unwrap();
    let thread_id = snapshot.thread_id.clone();
    assert_eq!(snapshot.messages.len(), 1);
    assert_eq!(snapshot.messages[0].content, WELCOME_MESSAGE);

    store
        .add_message(&thread_id, "user", "Forecast Q3 demand", None)
        .await
        .unwrap();
    store
        .add_message(
            &thread_id,
            "assistant",
            ASSISTANT_REPLY,
            Some(json!([{"name": "query_sales", "args": {"quarter": "Q3"}}])),
        )
        .await
        .unwrap();

    let conversation = store.load_conversation(&thread_id).await.unwrap();
    assert_eq!(conversation.messages.len(), 3);
    assert_eq!(conversation.processed_tool_ids.len(), 1);

    let episodes = EpisodicStore::with_path(dir.path().join("episodic.db"))
        .await
        .unwrap();
    let service = EpisodicMemoryService::with_store_for_test(Arc::new(episodes), true);

    let report = service
        .extract_from_thread(&thread_id, &conversation.messages)
        .await
        .unwrap();
    assert_eq!(report.extracted, 1);
    assert_eq!(report.skipped_duplicates, 0);

    let rerun = service
        .extract_from_thread(&thread_id, &conversation.messages)
        .await
        .unwrap();
    assert_eq!(rerun.extracted, 0);
    assert_eq!(rerun.skipped_duplicates, 1);

    let status = service.status().await.unwrap();
    assert_eq!(status.total_episodes, 1);

    let threads = store.list_threads().await.unwrap();
    let sidebar = components::render_sidebar(
        &status,
        &threads,
        &thread_id,
        30,
        "repuragent_memory.db",
        store.db_size_bytes(),
    );
    assert!(sidebar.contains("Forecast Q3 demand for the ret..."));
    assert!(sidebar.contains("📊 Stored patterns: 1"));
    assert!(sidebar.contains("💾 Memory: repuragent_memory.db"));

    let chat = components::render_chat_messages(&conversation.messages);
    assert!(chat.contains("🔄 Processing Progress"));
    assert!(chat.contains("Q3 demand is projected at 12,400 units"));
    assert!(chat.contains("query_sales"));

    let header = components::render_header("RepurAgent", &dir.path().join("images/logo.png"));
    let page = components::render_page(
        "RepurAgent",
        &header,
        &components::render_demo_banner(),
        &sidebar,
        &chat,
    );
    assert!(page.contains("<title>RepurAgent - Demo</title>"));
    assert!(page.contains("Demo Mode"));
    assert!(page.contains("<h1>RepurAgent</h1>"));
}

#[tokio::test]
async fn welcome_thread_renders_without_progress_panel() {
    let dir = tempdir().unwrap();
    let store = ConversationStore::new(dir.path().join("conversations.db"))
        .await
        .unwrap();

    let snapshot = store.create_thread(None).await.unwrap();
    let chat = components::render_chat_messages(&snapshot.messages);

    assert!(chat.contains("I&#39;m RepurAgent"));
    assert!(!chat.contains("<details class=\"progress\">"));
}

#[tokio::test]
async fn deleted_threads_disappear_from_the_sidebar() {
    let dir = tempdir().unwrap();
    let store = ConversationStore::new(dir.path().join("conversations.db"))
        .await
        .unwrap();

    let snapshot = store.create_thread(Some("Throwaway".into())).await.unwrap();
    store.delete_thread(&snapshot.thread_id).await.unwrap();

    let threads = store.list_threads().await.unwrap();
    assert!(threads.is_empty());

    let service = EpisodicMemoryService::disabled();
    let status = service.status().await.unwrap();
    let sidebar = components::render_sidebar(&status, &threads, "", 30, "repuragent_memory.db", None);

    assert!(!sidebar.contains("Throwaway"));
    assert!(!sidebar.contains("🧠 Episodic Learning"));
    assert!(!sidebar.contains("📊 Size:"));
}
