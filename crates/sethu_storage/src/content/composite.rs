use async_trait::async_trait;
use std::sync::Arc;

use sethu_core::{Article, ContentSource, Listing, Query, Result};

/// Tries `primary` first and serves `fallback` when it fails.
///
/// Detail lookups the primary reports as missing are also retried against
/// the fallback, so legacy slugs stay reachable.
pub struct CompositeSource {
    primary: Arc<dyn ContentSource>,
    fallback: Arc<dyn ContentSource>,
}

impl CompositeSource {
    pub fn new(primary: Arc<dyn ContentSource>, fallback: Arc<dyn ContentSource>) -> Self {
        Self { primary, fallback }
    }
}

#[async_trait]
impl ContentSource for CompositeSource {
    fn name(&self) -> &str {
        self.primary.name()
    }

    async fn list_articles(&self, query: &Query, page_size: usize) -> Result<Listing> {
        match self.primary.list_articles(query, page_size).await {
            Ok(listing) => Ok(listing),
            Err(e) => {
                tracing::warn!(
                    "⚠️ {} source failed ({}), falling back to {}",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
                self.fallback.list_articles(query, page_size).await
            }
        }
    }

    async fn get_article(&self, slug: &str) -> Result<Option<Article>> {
        match self.primary.get_article(slug).await {
            Ok(Some(article)) => Ok(Some(article)),
            Ok(None) => self.fallback.get_article(slug).await,
            Err(e) => {
                tracing::warn!("⚠️ {} lookup of {} failed ({}), trying {}", self.primary.name(), slug, e, self.fallback.name());
                self.fallback.get_article(slug).await
            }
        }
    }

    async fn all_articles(&self) -> Result<Vec<Article>> {
        match self.primary.all_articles().await {
            Ok(articles) => Ok(articles),
            Err(e) => {
                tracing::warn!("⚠️ {} catalogue failed ({}), using {}", self.primary.name(), e, self.fallback.name());
                self.fallback.all_articles().await
            }
        }
    }
}
