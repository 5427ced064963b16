use std::sync::Arc;

use serde::Serialize;
use serde_json::Value;

use crate::core::config::{AppPaths, ConfigService};
use crate::core::errors::ApiError;
use crate::history::StoredMessage;

use super::store::EpisodicStore;

#[derive(Debug, Clone, Serialize)]
pub struct EpisodicSystemStatus {
    pub enabled: bool,
    pub total_episodes: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ExtractReport {
    pub extracted: usize,
    pub skipped_duplicates: usize,
}

/// Records user/assistant exchanges as episodes so the sidebar can show
/// how many patterns the system has stored. Pairing and hash dedup only;
/// what the agent system learns from the episodes happens elsewhere.
#[derive(Clone)]
pub struct EpisodicMemoryService {
    store: Option<Arc<EpisodicStore>>,
    enabled: bool,
}

impl EpisodicMemoryService {
    pub async fn new(paths: &AppPaths, config_service: &ConfigService) -> Result<Self, ApiError> {
        let config = config_service
            .load_config()
            .unwrap_or_else(|_| Value::Object(Default::default()));

        let enabled = config
            .get("episodic")
            .and_then(|v| v.get("enabled"))
            .and_then(|v| v.as_bool())
            .unwrap_or(true);

        if !enabled {
            return Ok(Self {
                store: None,
                enabled: false,
            });
        }

        let store = Arc::new(EpisodicStore::new(paths).await?);

        Ok(Self {
            store: Some(store),
            enabled: true,
        })
    }

    /// Fallback when the episodic store cannot be opened. The panel is
    /// hidden and every operation degrades to a harmless no-op.
    pub fn disabled() -> Self {
        Self {
            store: None,
            enabled: false,
        }
    }

    pub fn with_store_for_test(store: Arc<EpisodicStore>, enabled: bool) -> Self {
        Self {
            store: Some(store),
            enabled,
        }
    }

    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// Pairs each user message with the assistant reply that follows it
    /// and stores the pair as one episode. Duplicate exchanges count as
    /// skipped, not errors.
    pub async fn extract_from_thread(
        &self,
        thread_id: &str,
        messages: &[StoredMessage],
    ) -> Result<ExtractReport, ApiError> {
        let Some(store) = self.store.as_ref().filter(|_| self.enabled) else {
            return Ok(ExtractReport::default());
        };

        let mut report = ExtractReport::default();
        let mut pending_user: Option<&str> = None;

        for message in messages {
            match message.role.as_str() {
                "user" => pending_user = Some(message.content.as_str()),
                "assistant" => {
                    let Some(user_input) = pending_user.take() else {
                        continue;
                    };
                    if user_input.trim().is_empty() || message.content.trim().is_empty() {
                        continue;
                    }
                    let content = build_memory_text(user_input, &message.content);

                    let episode_id = uuid::Uuid::new_v4().to_string();
                    let added = store
                        .insert_episode(
                            &episode_id,
                            thread_id,
                            user_input,
                            &message.content,
                            &content,
                        )
                        .await?;

                    if added {
                        report.extracted += 1;
                    } else {
                        report.skipped_duplicates += 1;
                    }
                }
                _ => {}
            }
        }

        Ok(report)
    }

    pub async fn status(&self) -> Result<EpisodicSystemStatus, ApiError> {
        let total_episodes = match self.store.as_ref() {
            Some(store) if self.enabled => store.count_episodes(None).await?,
            _ => 0,
        };

        Ok(EpisodicSystemStatus {
            enabled: self.enabled,
            total_episodes,
        })
    }
}

fn build_memory_text(user_input: &str, assistant_output: &str) -> String {
    format!(
        "User: {}\nAssistant: {}",
        user_input.trim(),
        assistant_output.trim()
    )
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::episodic::store::EpisodicStore;

    async fn test_service() -> EpisodicMemoryService {
        let tmp = std::env::temp_dir().join(format!(
            "repuragent-episodic-service-test-{}.db",
            uuid::Uuid::new_v4()
        ));
        let store = Arc::new(EpisodicStore::with_path(tmp).await.unwrap());
        EpisodicMemoryService::with_store_for_test(store, true)
    }

    fn message(id: i64, role: &str, content: &str) -> StoredMessage {
        StoredMessage {
            id,
            thread_id: "t1".into(),
            role: role.into(),
            content: content.into(),
            tool_calls: None,
            created_at: "2026-01-01T00:00:00Z".into(),
        }
    }

    #[tokio::test]
    async fn extract_pairs_user_with_following_assistant() {
        let service = test_service().await;
        let messages = vec![
            message(1, "assistant", "Hello! I'm RepurAgent."),
            message(2, "user", "Analyze Q3 revenue"),
            message(3, "assistant", "**REPORT_AGENT**\nRevenue grew 12%."),
            message(4, "user", "And Q4?"),
            message(5, "assistant", "**REPORT_AGENT**\nQ4 is projected flat."),
        ];

        let report = service.extract_from_thread("t1", &messages).await.unwrap();

        assert_eq!(
            report,
            ExtractReport {
                extracted: 2,
                skipped_duplicates: 0
            }
        );
        assert_eq!(service.status().await.unwrap().total_episodes, 2);
    }

    #[tokio::test]
    async fn re_extraction_skips_known_exchanges() {
        let service = test_service().await;
        let messages = vec![
            message(1, "user", "Analyze Q3 revenue"),
            message(2, "assistant", "Revenue grew 12%."),
        ];

        let first = service.extract_from_thread("t1", &messages).await.unwrap();
        let second = service.extract_from_thread("t1", &messages).await.unwrap();

        assert_eq!(first.extracted, 1);
        assert_eq!(second.extracted, 0);
        assert_eq!(second.skipped_duplicates, 1);
        assert_eq!(service.status().await.unwrap().total_episodes, 1);
    }

    #[tokio::test]
    async fn disabled_service_is_a_no_op() {
        let service = EpisodicMemoryService::disabled();
        let messages = vec![
            message(1, "user", "anything"),
            message(2, "assistant", "reply"),
        ];

        let report = service.extract_from_thread("t1", &messages).await.unwrap();
        let status = service.status().await.unwrap();

        assert_eq!(report, ExtractReport::default());
        assert!(!status.enabled);
        assert_eq!(status.total_episodes, 0);
    }
}
