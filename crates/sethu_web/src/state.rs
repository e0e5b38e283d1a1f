use sethu_core::{Config, ContentSource, Result, SiteStorage};
use sethu_scrapers::ScraperManager;
use sethu_storage::{build_content_source, create_storage};
use std::sync::Arc;

use crate::hub::KnowledgeHub;
use crate::proxy::ChatProxy;

pub struct AppState {
    pub hub: KnowledgeHub,
    pub storage: Arc<dyn SiteStorage>,
    pub scrapers: Arc<ScraperManager>,
    pub chat: ChatProxy,
    pub page_size: usize,
}

impl AppState {
    pub fn new(
        source: Arc<dyn ContentSource>,
        storage: Arc<dyn SiteStorage>,
        scrapers: Arc<ScraperManager>,
        chat: ChatProxy,
        page_size: usize,
    ) -> Self {
        Self {
            hub: KnowledgeHub::new(source),
            storage,
            scrapers,
            chat,
            page_size,
        }
    }

    pub async fn from_config(config: &Config) -> Result<Self> {
        let source = build_content_source(config).await?;
        let storage = create_storage(&config.storage, config.database_url.as_deref()).await?;
        let scrapers = Arc::new(ScraperManager::new(storage.clone())?);
        let chat = ChatProxy::new(&config.chat_backend_url, config.chat_timeout)?;
        tracing::info!(
            "📚 Content source: {}, storage: {}, chat backend: {}",
            source.name(),
            config.storage,
            chat.target()
        );
        Ok(Self::new(source, storage, scrapers, chat, config.page_size))
    }
}
