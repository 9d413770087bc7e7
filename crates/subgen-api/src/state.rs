//! Application state.

use std::sync::Arc;

use subgen_media::{ArtifactStore, MediaResult, SubtitleGenerator};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<ApiConfig>,
    pub store: ArtifactStore,
    pub generator: Arc<SubtitleGenerator>,
}

impl AppState {
    /// Create application state, creating the work directory if needed.
    pub async fn new(config: ApiConfig) -> MediaResult<Self> {
        let store = ArtifactStore::new(&config.work_dir).with_prefix("upload-");
        store.ensure_root().await?;

        let generator = SubtitleGenerator::new(config.whisper.clone());

        Ok(Self {
            config: Arc::new(config),
            store,
            generator: Arc::new(generator),
        })
    }
}
