use std::path::PathBuf;
use std::sync::Arc;

use crate::core::config::{env_file, AppPaths, ConfigService};
use crate::core::errors::ApiError;
use crate::episodic::EpisodicMemoryService;
use crate::history::ConversationStore;

/// Global application state shared across all routes.
///
/// Contains references to:
/// - Configuration and paths
/// - The conversation database
/// - The episodic memory service
#[derive(Clone)]
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: ConfigService,
    pub conversations: ConversationStore,
    pub episodic: EpisodicMemoryService,
}

impl AppState {
    /// Initializes the application state.
    ///
    /// This process includes:
    /// 1. Setting up paths and the configuration service
    /// 2. Opening the conversation database
    /// 3. Starting the episodic memory service, degrading to disabled
    ///    when its store cannot be opened
    pub async fn initialize(data_dir: Option<PathBuf>) -> Result<Arc<Self>, ApiError> {
        let paths = Arc::new(AppPaths::with_data_dir(data_dir));
        env_file::load_into_env(&paths.env_path);
        let config = ConfigService::new(paths.clone());

        let conversations = ConversationStore::new(paths.db_path.clone()).await?;

        let episodic = match EpisodicMemoryService::new(paths.as_ref(), &config).await {
            Ok(service) => service,
            Err(err) => {
                tracing::warn!("Could not initialize episodic learning: {}", err);
                EpisodicMemoryService::disabled()
            }
        };

        Ok(Arc::new(AppState {
            paths,
            config,
            conversations,
            episodic,
        }))
    }
}
