use async_trait::async_trait;
use serde::Serialize;

use crate::filter::Query;
use crate::pagination::Page;
use crate::types::Article;
use crate::Result;

/// One page of search results plus the name of the source that answered.
#[derive(Debug, Clone, Serialize)]
pub struct Listing {
    pub source: String,
    #[serde(flatten)]
    pub page: Page<Article>,
}

/// Somewhere articles can be listed and looked up from.
#[async_trait]
pub trait ContentSource: Send + Sync {
    /// Short identifier, used in logs and responses.
    fn name(&self) -> &str;

    /// Filters and paginates according to `query`.
    async fn list_articles(&self, query: &Query, page_size: usize) -> Result<Listing>;

    /// Looks up one article. `Ok(None)` when the slug is unknown.
    async fn get_article(&self, slug: &str) -> Result<Option<Article>>;

    /// The whole catalogue, in source order.
    async fn all_articles(&self) -> Result<Vec<Article>>;
}
